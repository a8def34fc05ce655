//! bcache_core: 并发块缓冲缓存
//!
//! 一个定容量的内存缓冲池，缓存定长磁盘块的副本，由所有线程共享：
//! 既是读写缓存（减少设备 I/O），也是并发访问同一块的唯一同步点。
//!
//! 常见路径下只用细粒度的桶锁；仅当需要驱逐时退回由一把全局锁
//! 串行化的跨桶窃取协议。返回的缓冲句柄始终处于独占锁定状态，
//! 调用者读写载荷后释放，槽位回到所属桶的 MRU 端等待复用。
//!
//! # 示例
//!
//! ```rust,ignore
//! use bcache_core::{BlockDevice, BufCache, CacheConfig, Result};
//!
//! struct MyDisk { /* ... */ }
//!
//! impl BlockDevice for MyDisk {
//!     // 实现 read_block / write_block
//!     # fn read_block(&mut self, _: u32, _: u32, _: &mut [u8]) -> Result<()> { Ok(()) }
//!     # fn write_block(&mut self, _: u32, _: u32, _: &[u8]) -> Result<()> { Ok(()) }
//! }
//!
//! fn run(disk: MyDisk) -> Result<()> {
//!     let cache = BufCache::new(disk, CacheConfig::default());
//!     let buf = cache.bread(0, 1)?;
//!     // 读写 buf.data() / buf.data_mut() ...
//!     cache.brelse(buf);
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`device`] - 块设备抽象
//! - [`sync`] - 阻塞式独占锁
//! - [`cache`] - 缓存本体

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 块设备抽象
pub mod device;

/// 阻塞式独占锁
pub mod sync;

/// 块缓冲缓存
pub mod cache;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 块设备
pub use device::BlockDevice;

// 同步原语
pub use sync::{SleepLock, SleepLockGuard};

// 缓存
pub use cache::{
    Buf, BufCache, CacheConfig, CacheStats, DEFAULT_BLOCK_SIZE, DEFAULT_NBUCKETS, DEFAULT_NBUF,
};
