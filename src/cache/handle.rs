//! 缓冲句柄 - RAII 风格的块访问
//!
//! [`Buf`] 是 `bread` 的返回值：一个已按当前映射填充、且被本线程
//! 独占锁定的缓冲槽。句柄持有槽位数据锁的守卫，因此：
//!
//! - 持有句柄期间没有其他线程能读写同一块的载荷——这就是缓存对
//!   单块访问的串行化保证；
//! - `bwrite` 以 `&Buf` 为参数，"未持锁就写回" 在类型上不可表达，
//!   不需要运行时的持锁检查；
//! - 丢弃句柄即释放：先放开独占锁（唤醒等待同一块的线程），再在
//!   home 桶锁下递减引用计数，归零时把槽位挂回桶链表的 MRU 端。
//!
//! 句柄不要长期持有：它串行化了所有对同一块的访问。

use core::sync::atomic::Ordering;

use alloc::vec::Vec;

use crate::cache::bcache::BufCache;
use crate::device::BlockDevice;
use crate::sync::SleepLockGuard;

/// 已锁定的缓冲槽句柄
///
/// 由 [`BufCache::bread`] 返回，丢弃时自动释放（等价于显式调用
/// [`BufCache::brelse`]）。
pub struct Buf<'a, D: BlockDevice> {
    pub(crate) cache: &'a BufCache<D>,
    pub(crate) idx: usize,
    dev: u32,
    blockno: u32,
    // 仅在 Drop 中取出；句柄存活期间恒为 Some
    data: Option<SleepLockGuard<'a, Vec<u8>>>,
}

impl<'a, D: BlockDevice> Buf<'a, D> {
    pub(crate) fn new(
        cache: &'a BufCache<D>,
        idx: usize,
        dev: u32,
        blockno: u32,
        data: SleepLockGuard<'a, Vec<u8>>,
    ) -> Self {
        Self {
            cache,
            idx,
            dev,
            blockno,
            data: Some(data),
        }
    }

    /// 设备号
    pub fn dev(&self) -> u32 {
        self.dev
    }

    /// 块号
    pub fn blockno(&self) -> u32 {
        self.blockno
    }

    /// 载荷的只读视图
    pub fn data(&self) -> &[u8] {
        self.data.as_ref().unwrap()
    }

    /// 载荷的可写视图
    ///
    /// 修改只作用于缓存副本；持久化需要显式调用 [`BufCache::bwrite`]。
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut().unwrap()
    }

    /// 载荷是否已从设备填充
    pub(crate) fn is_valid(&self) -> bool {
        self.cache.slot(self.idx).valid.load(Ordering::Acquire)
    }

    /// 标记载荷已按当前映射填充（持有数据锁时调用）
    pub(crate) fn mark_valid(&self) {
        self.cache.slot(self.idx).valid.store(true, Ordering::Release);
    }
}

impl<D: BlockDevice> Drop for Buf<'_, D> {
    fn drop(&mut self) {
        // 先释放独占锁再动引用计数：等待同一槽位的线程可以立即继续，
        // 而 refcnt 仍然保护槽位不被窃取，直到下面的递减完成。
        self.data.take();
        self.cache.release_slot(self.idx, self.blockno);
    }
}

impl<D: BlockDevice> core::fmt::Debug for Buf<'_, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Buf")
            .field("dev", &self.dev)
            .field("blockno", &self.blockno)
            .field("slot", &self.idx)
            .finish()
    }
}
