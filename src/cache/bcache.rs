//! 缓冲缓存核心
//!
//! [`BufCache`] 是一个定容量的缓冲槽池：按块号哈希分成 `nbuckets` 个桶，
//! 每个桶有自己的忙等锁和 MRU 链表；所有槽位在构造时一次性分配并
//! 轮转分布到各桶，此后永不增减。
//!
//! # 分配协议（`bget`）
//!
//! 三个阶段依次尝试，任一成功立即返回：
//!
//! 1. **快路径**：只锁 home 桶。命中则递增引用计数；否则在同桶内找
//!    `refcnt == 0` 的槽位就地复用。全程不碰全局锁，也不会阻塞。
//! 2. **慢路径入口**：放开桶锁后按 全局锁 → home 桶锁 的顺序重新上锁，
//!    再做一遍命中与同桶复用检查（锁空窗期间其他线程可能已经填充
//!    或释放了槽位）。
//! 3. **跨桶窃取**：仍持有全局锁和 home 桶锁，按 `home+1, home+2, ...`
//!    的环序逐桶上锁，从各桶链表的 LRU 端找 `refcnt == 0` 的槽位，
//!    摘下、改写映射、挂到 home 桶 MRU 端。任意时刻至多持有两把桶锁。
//!    整圈扫描落空说明缓存相对并发工作集不足，直接中止进程。
//!
//! # 锁序
//!
//! 慢路径的加锁顺序恒为 全局锁 → home 桶锁 → 候选桶锁，按相反顺序
//! 释放；快路径只短暂持有单把桶锁，不参与该顺序。全局锁把所有窃取
//! 尝试彼此串行化，这是跨桶扫描不会死锁、也不会互相抢同一槽位的
//! 全部依据。桶锁临界区只做元数据和链表修改，设备 I/O 一律在槽位的
//! 阻塞锁下进行。

use core::sync::atomic::{AtomicU64, Ordering};

use alloc::vec::Vec;

use crate::cache::handle::Buf;
use crate::cache::list::MruList;
use crate::cache::slot::{Slot, SlotMeta};
use crate::device::BlockDevice;
use crate::error::Result;
use crate::sync::SleepLock;

/// 默认槽位数
pub const DEFAULT_NBUF: usize = 30;

/// 默认桶数
pub const DEFAULT_NBUCKETS: usize = 13;

/// 默认块大小（字节）
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// 缓存配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// 槽位总数
    pub nbuf: usize,
    /// 桶数（块号按 `blockno % nbuckets` 归桶）
    pub nbuckets: usize,
    /// 块大小（字节）
    pub block_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            nbuf: DEFAULT_NBUF,
            nbuckets: DEFAULT_NBUCKETS,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 命中次数
    pub hits: u64,
    /// 未命中次数（同桶复用 + 跨桶窃取）
    pub misses: u64,
    /// 跨桶窃取次数
    pub steals: u64,
    /// 设备读次数
    pub disk_reads: u64,
    /// 设备写次数
    pub disk_writes: u64,
}

impl CacheStats {
    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    steals: AtomicU64,
    disk_reads: AtomicU64,
    disk_writes: AtomicU64,
}

/// 一个哈希桶：MRU 链表加上本桶所辖槽位的元数据
///
/// 整个结构放在桶的忙等锁内部，"持有桶锁才能动元数据" 由所有权表达。
/// 窃取把槽位的元数据项从候选桶移到 home 桶，两边都在各自的锁下。
struct Bucket {
    list: MruList,
    meta: Vec<Option<SlotMeta>>,
}

impl Bucket {
    fn new(nbuf: usize) -> Self {
        Self {
            list: MruList::new(nbuf),
            meta: alloc::vec![None; nbuf],
        }
    }

    fn meta_mut(&mut self, idx: usize) -> &mut SlotMeta {
        self.meta[idx]
            .as_mut()
            .expect("slot not resident in this bucket")
    }

    /// 命中检查：当前映射等于 `(dev, blockno)` 的槽位
    fn find_mapped(&self, dev: u32, blockno: u32) -> Option<usize> {
        self.list
            .iter_mru()
            .find(|&i| matches!(self.meta[i], Some(m) if m.dev == dev && m.blockno == blockno))
    }

    /// 同桶复用检查：任意 `refcnt == 0` 的槽位
    fn find_free(&self) -> Option<usize> {
        self.list
            .iter_mru()
            .find(|&i| matches!(self.meta[i], Some(m) if m.refcnt == 0))
    }

    /// 驱逐扫描：从 LRU 端找 `refcnt == 0` 的槽位
    fn find_victim(&self) -> Option<usize> {
        self.list
            .iter_lru()
            .find(|&i| matches!(self.meta[i], Some(m) if m.refcnt == 0))
    }

    /// 把槽位改写为新映射并由调用者独占（refcnt = 1）
    fn assign(&mut self, idx: usize, dev: u32, blockno: u32) {
        self.meta[idx] = Some(SlotMeta {
            dev,
            blockno,
            refcnt: 1,
        });
    }
}

/// 并发块缓冲缓存
///
/// 进程级状态：在任何并发访问开始前构造一次，正常运行期间不销毁。
/// 所有方法都以 `&self` 工作，实例可以直接在线程间共享引用。
pub struct BufCache<D: BlockDevice> {
    buckets: Vec<spin::Mutex<Bucket>>,
    slots: Vec<Slot>,
    /// 全局窃取锁：只在慢路径上获取，串行化所有驱逐尝试
    steal_lock: spin::Mutex<()>,
    /// 设备串行化：阻塞锁，可跨 I/O 持有
    device: SleepLock<D>,
    counters: Counters,
    block_size: usize,
}

impl<D: BlockDevice> BufCache<D> {
    /// 创建缓存并接管设备
    ///
    /// 所有槽位在此处一次性分配，并按 `i % nbuckets` 轮转挂进各桶，
    /// 初始映射为占位的 `(0, 0)`、未填充、未被引用。
    ///
    /// # Panics
    ///
    /// 配置中的任一字段为 0 时 panic。
    pub fn new(device: D, config: CacheConfig) -> Self {
        assert!(config.nbuf > 0, "nbuf must be nonzero");
        assert!(config.nbuckets > 0, "nbuckets must be nonzero");
        assert!(config.block_size > 0, "block_size must be nonzero");

        let mut raw: Vec<Bucket> = (0..config.nbuckets).map(|_| Bucket::new(config.nbuf)).collect();
        for i in 0..config.nbuf {
            let b = i % config.nbuckets;
            raw[b].meta[i] = Some(SlotMeta::unassigned());
            raw[b].list.insert_head(i);
        }

        log::debug!(
            "[BCACHE] init nbuf={} nbuckets={} block_size={}",
            config.nbuf,
            config.nbuckets,
            config.block_size
        );

        Self {
            buckets: raw.into_iter().map(spin::Mutex::new).collect(),
            slots: (0..config.nbuf).map(|_| Slot::new(config.block_size)).collect(),
            steal_lock: spin::Mutex::new(()),
            device: SleepLock::new(device),
            counters: Counters::default(),
            block_size: config.block_size,
        }
    }

    /// 块号的 home 桶
    pub fn home_bucket(&self, blockno: u32) -> usize {
        blockno as usize % self.buckets.len()
    }

    /// 槽位总数
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 桶数
    pub fn nbuckets(&self) -> usize {
        self.buckets.len()
    }

    /// 块大小（字节）
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// 获取统计信息快照
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            steals: self.counters.steals.load(Ordering::Relaxed),
            disk_reads: self.counters.disk_reads.load(Ordering::Relaxed),
            disk_writes: self.counters.disk_writes.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn slot(&self, idx: usize) -> &Slot {
        &self.slots[idx]
    }

    /// 读取块：返回已锁定且载荷有效的缓冲句柄
    ///
    /// 未命中时同步从设备读入载荷。设备错误原样向上传播，此时槽位
    /// 随句柄的丢弃一并释放（保持无效，下次请求会重读）。
    pub fn bread(&self, dev: u32, blockno: u32) -> Result<Buf<'_, D>> {
        let mut buf = self.bget(dev, blockno);
        if !buf.is_valid() {
            {
                let mut device = self.device.lock();
                device.read_block(dev, blockno, buf.data_mut())?;
            }
            buf.mark_valid();
            self.counters.disk_reads.fetch_add(1, Ordering::Relaxed);
        }
        Ok(buf)
    }

    /// 将句柄的当前载荷同步写入设备
    ///
    /// 不改变引用计数和链表位置。持有 `&Buf` 即持有槽位的独占锁，
    /// 写回的持锁前提由类型系统保证。
    pub fn bwrite(&self, buf: &Buf<'_, D>) -> Result<()> {
        debug_assert!(
            core::ptr::eq(self, buf.cache),
            "buffer belongs to a different cache"
        );
        {
            let mut device = self.device.lock();
            device.write_block(buf.dev(), buf.blockno(), buf.data())?;
        }
        self.counters.disk_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// 释放句柄
    ///
    /// 等价于直接丢弃：先放开独占锁，再在 home 桶锁下递减引用计数，
    /// 归零时把槽位挂回桶链表的 MRU 端。
    pub fn brelse(&self, buf: Buf<'_, D>) {
        debug_assert!(
            core::ptr::eq(self, buf.cache),
            "buffer belongs to a different cache"
        );
        drop(buf);
    }

    /// 钉住槽位：递增引用计数，不动链表位置和有效性
    ///
    /// 被钉住的槽位在句柄释放后仍不参与驱逐，供日志层等协作者跨越
    /// 多次获取/释放保持块驻留。
    pub fn bpin(&self, buf: &Buf<'_, D>) {
        let home = self.home_bucket(buf.blockno());
        let mut bucket = self.buckets[home].lock();
        bucket.meta_mut(buf.idx).refcnt += 1;
    }

    /// 解除钉住：递减引用计数
    ///
    /// # Panics
    ///
    /// 槽位未被钉住时 panic（引用计数契约被破坏）。
    pub fn bunpin(&self, buf: &Buf<'_, D>) {
        let home = self.home_bucket(buf.blockno());
        let mut bucket = self.buckets[home].lock();
        let meta = bucket.meta_mut(buf.idx);
        assert!(meta.refcnt > 1, "bunpin: buffer not pinned");
        meta.refcnt -= 1;
    }

    /// 查找或分配 `(dev, blockno)` 的槽位，返回已独占锁定的句柄
    fn bget(&self, dev: u32, blockno: u32) -> Buf<'_, D> {
        let home = self.home_bucket(blockno);

        // 阶段 1：快路径，只碰 home 桶锁
        {
            let mut bucket = self.buckets[home].lock();
            if let Some(idx) = bucket.find_mapped(dev, blockno) {
                bucket.meta_mut(idx).refcnt += 1;
                drop(bucket);
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                log::trace!("[BCACHE] bget dev={} blockno={} hit slot={}", dev, blockno, idx);
                return self.lock_slot(idx, dev, blockno);
            }
            if let Some(idx) = bucket.find_free() {
                bucket.assign(idx, dev, blockno);
                self.slots[idx].valid.store(false, Ordering::Release);
                drop(bucket);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                log::trace!("[BCACHE] bget dev={} blockno={} reuse slot={}", dev, blockno, idx);
                return self.lock_slot(idx, dev, blockno);
            }
        }

        // 阶段 2：慢路径入口，全局锁 → home 桶锁，双重检查
        let steal_guard = self.steal_lock.lock();
        let mut home_bucket = self.buckets[home].lock();
        if let Some(idx) = home_bucket.find_mapped(dev, blockno) {
            home_bucket.meta_mut(idx).refcnt += 1;
            drop(home_bucket);
            drop(steal_guard);
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            log::trace!("[BCACHE] bget dev={} blockno={} late hit slot={}", dev, blockno, idx);
            return self.lock_slot(idx, dev, blockno);
        }
        if let Some(idx) = home_bucket.find_free() {
            home_bucket.assign(idx, dev, blockno);
            self.slots[idx].valid.store(false, Ordering::Release);
            drop(home_bucket);
            drop(steal_guard);
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            log::trace!("[BCACHE] bget dev={} blockno={} late reuse slot={}", dev, blockno, idx);
            return self.lock_slot(idx, dev, blockno);
        }

        // 阶段 3：跨桶窃取，环序扫描其余各桶的 LRU 端。
        // 至多同时持有 home 和一个候选桶的锁，按候选 → home → 全局的
        // 顺序释放。
        for step in 1..self.buckets.len() {
            let cand = (home + step) % self.buckets.len();
            let mut cand_bucket = self.buckets[cand].lock();
            if let Some(idx) = cand_bucket.find_victim() {
                cand_bucket.list.unlink(idx);
                cand_bucket.meta[idx] = None;
                home_bucket.assign(idx, dev, blockno);
                self.slots[idx].valid.store(false, Ordering::Release);
                home_bucket.list.insert_head(idx);
                drop(cand_bucket);
                drop(home_bucket);
                drop(steal_guard);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.counters.steals.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "[BCACHE] bget dev={} blockno={} steal slot={} bucket {} -> {}",
                    dev,
                    blockno,
                    idx,
                    cand,
                    home
                );
                return self.lock_slot(idx, dev, blockno);
            }
        }

        // 每个槽位都被引用：缓存相对并发工作集不足，属于配置错误
        log::error!(
            "[BCACHE] bget dev={} blockno={}: all {} slots referenced",
            dev,
            blockno,
            self.slots.len()
        );
        panic!("bget: no free buffer slots");
    }

    /// 获取槽位的独占锁并包装为句柄（调用前引用计数已计入本线程）
    fn lock_slot(&self, idx: usize, dev: u32, blockno: u32) -> Buf<'_, D> {
        let data = self.slots[idx].data.lock();
        Buf::new(self, idx, dev, blockno, data)
    }

    /// 句柄释放路径：递减引用计数，归零时挂回 MRU 端
    pub(crate) fn release_slot(&self, idx: usize, blockno: u32) {
        let home = self.home_bucket(blockno);
        let mut bucket = self.buckets[home].lock();
        let meta = bucket.meta_mut(idx);
        assert!(meta.refcnt > 0, "brelse: refcnt underflow");
        meta.refcnt -= 1;
        if meta.refcnt == 0 {
            bucket.list.unlink(idx);
            bucket.list.insert_head(idx);
        }
    }
}

impl<D: BlockDevice> core::fmt::Debug for BufCache<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufCache")
            .field("capacity", &self.slots.len())
            .field("nbuckets", &self.buckets.len())
            .field("block_size", &self.block_size)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::thread;
    use std::vec;
    use std::vec::Vec;

    /// 共享存储的内存设备：克隆后指向同一份数据，便于在测试中
    /// 观察设备流量或在同一份存储上再建一个缓存。
    #[derive(Clone)]
    struct MockDevice {
        storage: Arc<StdMutex<Vec<Vec<u8>>>>,
        reads: Arc<AtomicU64>,
        writes: Arc<AtomicU64>,
        fail_read_block: Option<u32>,
    }

    impl MockDevice {
        /// 每个块填充为 `blockno + 100 * dev` 的低 8 位，便于校验
        fn new(ndev: usize, nblocks: usize, block_size: usize) -> Self {
            let mut devs = Vec::new();
            for d in 0..ndev {
                let mut bytes = vec![0u8; nblocks * block_size];
                for b in 0..nblocks {
                    let fill = (b as u8).wrapping_add(100u8.wrapping_mul(d as u8));
                    bytes[b * block_size..(b + 1) * block_size].fill(fill);
                }
                devs.push(bytes);
            }
            Self {
                storage: Arc::new(StdMutex::new(devs)),
                reads: Arc::new(AtomicU64::new(0)),
                writes: Arc::new(AtomicU64::new(0)),
                fail_read_block: None,
            }
        }

        fn read_count(&self) -> u64 {
            self.reads.load(Ordering::Relaxed)
        }
    }

    impl BlockDevice for MockDevice {
        fn read_block(&mut self, dev: u32, blockno: u32, buf: &mut [u8]) -> crate::Result<()> {
            if self.fail_read_block == Some(blockno) {
                return Err(Error::new(ErrorKind::Io, "injected read failure"));
            }
            let storage = self.storage.lock().unwrap();
            let bs = buf.len();
            let start = blockno as usize * bs;
            buf.copy_from_slice(&storage[dev as usize][start..start + bs]);
            self.reads.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn write_block(&mut self, dev: u32, blockno: u32, buf: &[u8]) -> crate::Result<()> {
            let mut storage = self.storage.lock().unwrap();
            let bs = buf.len();
            let start = blockno as usize * bs;
            storage[dev as usize][start..start + bs].copy_from_slice(buf);
            self.writes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn build(nbuf: usize, nbuckets: usize, block_size: usize, nblocks: usize) -> (BufCache<MockDevice>, MockDevice) {
        let device = MockDevice::new(1, nblocks, block_size);
        let cache = BufCache::new(
            device.clone(),
            CacheConfig {
                nbuf,
                nbuckets,
                block_size,
            },
        );
        (cache, device)
    }

    #[test]
    fn test_bread_miss_then_hit() {
        let (cache, device) = build(30, 13, 64, 64);

        let buf = cache.bread(0, 5).unwrap();
        assert_eq!(buf.blockno(), 5);
        assert!(buf.data().iter().all(|&b| b == 5));
        cache.brelse(buf);

        let buf = cache.bread(0, 5).unwrap();
        assert!(buf.data().iter().all(|&b| b == 5));
        drop(buf);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.disk_reads, 1);
        assert_eq!(device.read_count(), 1);
    }

    #[test]
    fn test_distinct_devices_distinct_slots() {
        let device = MockDevice::new(2, 16, 32);
        let cache = BufCache::new(
            device,
            CacheConfig {
                nbuf: 8,
                nbuckets: 4,
                block_size: 32,
            },
        );

        let a = cache.bread(0, 5).unwrap();
        let b = cache.bread(1, 5).unwrap();
        assert_ne!(a.idx, b.idx);
        assert!(a.data().iter().all(|&x| x == 5));
        assert!(b.data().iter().all(|&x| x == 105));
    }

    #[test]
    fn test_payload_round_trip() {
        let (cache, device) = build(8, 4, 32, 16);

        let mut buf = cache.bread(0, 3).unwrap();
        buf.data_mut().fill(0xAB);
        cache.bwrite(&buf).unwrap();
        cache.brelse(buf);
        assert_eq!(cache.stats().disk_writes, 1);

        // 在同一份存储上另建缓存，强制从设备重新读取
        let fresh = BufCache::new(
            device,
            CacheConfig {
                nbuf: 8,
                nbuckets: 4,
                block_size: 32,
            },
        );
        let buf = fresh.bread(0, 3).unwrap();
        assert!(buf.data().iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_release_moves_slot_to_mru_head() {
        let (cache, _) = build(30, 13, 32, 64);

        let buf = cache.bread(0, 5).unwrap();
        let idx = buf.idx;
        drop(buf);

        let home = cache.home_bucket(5);
        let bucket = cache.buckets[home].lock();
        assert_eq!(bucket.list.head(), Some(idx));
        assert_eq!(bucket.meta[idx].unwrap().refcnt, 0);
    }

    #[test]
    fn test_eviction_skips_referenced_slot() {
        // 单桶两个槽位：一个被持有，新映射必须落在空闲的那个上
        let (cache, _) = build(2, 1, 32, 16);

        let held = cache.bread(0, 0).unwrap();
        let other = cache.bread(0, 1).unwrap();
        let free_idx = other.idx;
        drop(other);

        let buf = cache.bread(0, 2).unwrap();
        assert_eq!(buf.idx, free_idx);
        assert_ne!(buf.idx, held.idx);
    }

    #[test]
    fn test_steal_from_other_bucket() {
        // 4 槽位轮转进 4 个桶；占住桶 0/1/2 各自的槽位后，哈希到
        // 桶 0 的新块只能从桶 3 窃取
        let (cache, _) = build(4, 4, 32, 16);

        let b0 = cache.bread(0, 0).unwrap();
        let b1 = cache.bread(0, 1).unwrap();
        let b2 = cache.bread(0, 2).unwrap();

        let stolen = cache.bread(0, 4).unwrap();
        assert_eq!(stolen.idx, 3);
        assert_eq!(cache.stats().steals, 1);

        let idx = stolen.idx;
        drop(stolen);

        // 释放后挂在 home 桶（桶 0）的 MRU 端
        let bucket = cache.buckets[0].lock();
        assert_eq!(bucket.list.head(), Some(idx));
        drop(bucket);

        // 候选桶不再辖有该槽位
        assert!(cache.buckets[3].lock().meta[idx].is_none());

        drop(b0);
        drop(b1);
        drop(b2);
    }

    #[test]
    fn test_concurrent_bread_converges_on_one_slot() {
        let (cache, device) = build(30, 13, 64, 64);
        let indices = StdMutex::new(Vec::new());

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let buf = cache.bread(0, 5).unwrap();
                    assert!(buf.data().iter().all(|&b| b == 5));
                    indices.lock().unwrap().push(buf.idx);
                    thread::yield_now();
                    drop(buf);
                });
            }
        });

        let indices = indices.into_inner().unwrap();
        assert_eq!(indices.len(), 4);
        assert!(indices.iter().all(|&i| i == indices[0]));
        // 四个并发请求只触发一次设备读
        assert_eq!(device.read_count(), 1);
    }

    #[test]
    #[should_panic(expected = "bget: no free buffer slots")]
    fn test_exhaustion_aborts() {
        let (cache, _) = build(30, 13, 32, 64);

        // 30 个槽位全部被持有后，第 31 个不同块的请求中止
        let held: Vec<_> = (0u32..30).map(|b| cache.bread(0, b).unwrap()).collect();
        assert_eq!(held.len(), 30);

        let _ = cache.bread(0, 30);
    }

    #[test]
    #[should_panic(expected = "bget: no free buffer slots")]
    fn test_pinned_slot_is_not_reclaimed() {
        let (cache, _) = build(1, 1, 32, 16);

        let buf = cache.bread(0, 0).unwrap();
        cache.bpin(&buf);
        cache.brelse(buf);

        // 唯一的槽位被钉住，换入别的块无从谈起
        let _ = cache.bread(0, 1);
    }

    #[test]
    fn test_unpin_restores_reclaim_eligibility() {
        let (cache, _) = build(1, 1, 32, 16);

        let buf = cache.bread(0, 0).unwrap();
        let idx = buf.idx;
        cache.bpin(&buf);
        cache.brelse(buf);

        let buf = cache.bread(0, 0).unwrap();
        cache.bunpin(&buf);
        cache.brelse(buf);

        let buf = cache.bread(0, 1).unwrap();
        assert_eq!(buf.idx, idx);
    }

    #[test]
    #[should_panic(expected = "bunpin: buffer not pinned")]
    fn test_bunpin_without_pin_aborts() {
        let (cache, _) = build(2, 1, 32, 16);

        let buf = cache.bread(0, 0).unwrap();
        cache.bunpin(&buf);
    }

    #[test]
    fn test_read_error_propagates_and_releases_slot() {
        let block_size = 32;
        let mut device = MockDevice::new(1, 16, block_size);
        device.fail_read_block = Some(7);
        let cache = BufCache::new(
            device,
            CacheConfig {
                nbuf: 2,
                nbuckets: 1,
                block_size,
            },
        );

        let err = cache.bread(0, 7).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);

        // 失败的槽位已随句柄释放，缓存照常工作
        let a = cache.bread(0, 1).unwrap();
        let b = cache.bread(0, 2).unwrap();
        assert!(a.data().iter().all(|&x| x == 1));
        assert!(b.data().iter().all(|&x| x == 2));
    }

    #[test]
    fn test_concurrent_stress_integrity() {
        // 工作集大于容量，驱逐和窃取都会被反复触发；每个块的载荷
        // 恒为其块号字节，任何串扰都会被断言捉到
        let (cache, _) = build(30, 13, 16, 64);
        let cache = &cache;

        thread::scope(|s| {
            for t in 0..4u32 {
                s.spawn(move || {
                    let mut state = 0x9e37_79b9u32.wrapping_add(t);
                    for _ in 0..200 {
                        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                        let blockno = state % 64;
                        let buf = cache.bread(0, blockno).unwrap();
                        assert!(
                            buf.data().iter().all(|&b| b == blockno as u8),
                            "payload mismatch for block {}",
                            blockno
                        );
                        if blockno % 7 == 0 {
                            cache.bwrite(&buf).unwrap();
                        }
                        drop(buf);
                    }
                });
            }
        });

        let stats = cache.stats();
        assert!(stats.hits + stats.misses >= 800);
    }
}
