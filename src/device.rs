//! 块设备抽象
//!
//! 缓存层通过此 trait 与底层设备交互。读写都是同步的，以
//! `(设备号, 块号)` 定位一个定长块；缓冲区长度等于缓存配置的块大小。
//!
//! 实现者只需提供裸的读写原语，串行化由缓存层负责：设备实例被一把
//! 阻塞锁保护，任意时刻至多一个线程调用这些方法。重试、校验等策略
//! 不属于本层，设备错误原样向上传播。
//!
//! # 示例
//!
//! ```rust,ignore
//! use bcache_core::{BlockDevice, Result};
//!
//! struct MyDisk {
//!     // ...
//! }
//!
//! impl BlockDevice for MyDisk {
//!     fn read_block(&mut self, dev: u32, blockno: u32, buf: &mut [u8]) -> Result<()> {
//!         // 从介质读取一个块到 buf
//!         Ok(())
//!     }
//!
//!     fn write_block(&mut self, dev: u32, blockno: u32, buf: &[u8]) -> Result<()> {
//!         // 将 buf 写入介质
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::Result;

/// 块设备接口
///
/// `Send` 约束来自缓存的共享方式：设备随缓存一起被多个线程访问
/// （但访问本身已被缓存层串行化）。
pub trait BlockDevice: Send {
    /// 读取一个块
    ///
    /// # 参数
    ///
    /// * `dev` - 设备号
    /// * `blockno` - 块号
    /// * `buf` - 目标缓冲区，长度等于块大小
    fn read_block(&mut self, dev: u32, blockno: u32, buf: &mut [u8]) -> Result<()>;

    /// 写入一个块
    ///
    /// # 参数
    ///
    /// * `dev` - 设备号
    /// * `blockno` - 块号
    /// * `buf` - 源缓冲区，长度等于块大小
    fn write_block(&mut self, dev: u32, blockno: u32, buf: &[u8]) -> Result<()>;
}
