//! 块缓冲缓存模块
//!
//! 这个模块提供一个并发的、定容量的磁盘块缓冲缓存：既减少设备读写，
//! 也是多线程访问同一块的唯一同步点。
//!
//! # 主要组件
//!
//! - [`BufCache`] - 缓存本体：分桶索引、桶锁、全局窃取锁、三阶段分配
//! - [`Buf`] - `bread` 返回的 RAII 句柄，持有槽位的独占锁
//! - [`CacheConfig`] - 容量 / 桶数 / 块大小配置
//! - [`CacheStats`] - 命中、窃取与设备流量统计
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use bcache_core::{BufCache, CacheConfig};
//!
//! let cache = BufCache::new(my_device, CacheConfig::default());
//!
//! // 读块（未缓存时自动从设备载入）
//! let mut buf = cache.bread(0, 42)?;
//! buf.data_mut()[0] = 0x7f;
//!
//! // 持久化并释放；释放后槽位回到其桶链表的 MRU 端
//! cache.bwrite(&buf)?;
//! cache.brelse(buf);
//! ```
//!
//! # 锁的分工
//!
//! 桶锁和全局窃取锁是忙等锁，只保护元数据和链表；每个槽位的载荷由
//! 阻塞的独占锁保护，可以跨设备 I/O 持有。加锁顺序见 [`bcache`] 的
//! 模块文档。

mod bcache;
mod handle;
mod list;
mod slot;

pub use bcache::{
    BufCache, CacheConfig, CacheStats, DEFAULT_BLOCK_SIZE, DEFAULT_NBUCKETS, DEFAULT_NBUF,
};
pub use handle::Buf;
