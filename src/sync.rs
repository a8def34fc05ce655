//! 阻塞式独占锁（sleep lock）
//!
//! 提供可以跨设备 I/O 持有的独占锁，与 `spin::Mutex` 构成缓存使用的两类锁：
//!
//! - 桶锁和全局窃取锁是忙等锁（`spin::Mutex`），临界区只做元数据和链表修改，
//!   绝不在其中执行 I/O 或阻塞等待；
//! - 每个缓冲槽的数据以及设备本身由 `SleepLock` 保护，竞争时让出处理器而
//!   不是空转，因此可以在持有期间执行同步 I/O。
//!
//! 在启用 `std`（或测试）时，等待通过 `std::thread::yield_now` 让出 CPU；
//! 纯 `no_std` 环境下退化为 `core::hint::spin_loop` 提示。

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

/// 阻塞式独占锁
///
/// 与忙等锁不同，`SleepLock` 允许持有者在持锁期间执行耗时操作（设备读写），
/// 等待者让出处理器直到锁被释放。
///
/// # 字段说明
/// - `locked`: 锁状态（false = 空闲）
/// - `data`: 被保护的数据，通过 `UnsafeCell` 实现内部可变性
pub struct SleepLock<T: ?Sized> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// 守卫模式保证任意时刻至多一个线程访问 data
unsafe impl<T: ?Sized + Send> Sync for SleepLock<T> {}
unsafe impl<T: ?Sized + Send> Send for SleepLock<T> {}

impl<T> SleepLock<T> {
    /// 创建一个新的锁实例
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }
}

impl<T: ?Sized> SleepLock<T> {
    /// 获取锁（可能阻塞）
    ///
    /// 锁被占用时当前线程让出处理器并重试，直到成功为止。
    /// 不支持超时或取消：调用者要么拿到锁，要么一直等待。
    pub fn lock(&self) -> SleepLockGuard<'_, T> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            relax();
        }
        SleepLockGuard { lock: self }
    }

    /// 查询锁当前是否被持有（仅用于诊断，结果可能立即过期）
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

#[inline]
fn relax() {
    #[cfg(any(test, feature = "std"))]
    std::thread::yield_now();
    #[cfg(not(any(test, feature = "std")))]
    core::hint::spin_loop();
}

/// 锁守卫，提供对受保护数据的独占访问
///
/// 守卫存在即表示锁被持有；离开作用域时自动释放。
pub struct SleepLockGuard<'a, T: ?Sized> {
    lock: &'a SleepLock<T>,
}

impl<T: ?Sized> Deref for SleepLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for SleepLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for SleepLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
