//! 缓冲槽
//!
//! 一个槽位的状态被拆成两部分，各自归属不同的锁：
//!
//! - [`SlotMeta`]（映射与引用计数）存放在槽位当前所属桶的忙等锁内部，
//!   跨桶窃取时在两把桶锁下从候选桶整体移动到 home 桶，从而保证
//!   "桶锁保护其链表上所有槽位的元数据" 这一不变量由类型系统承担；
//! - 定长数据载荷由槽位自己的阻塞锁保护，`valid` 以原子布尔存放在
//!   槽位侧：分配方在桶锁下（refcnt == 0，无人持有数据锁）清除它，
//!   读取方在数据锁下检查并设置它，两类访问不会重叠。

use core::sync::atomic::AtomicBool;

use alloc::vec::Vec;

use crate::sync::SleepLock;

/// 槽位元数据：当前映射与引用计数
///
/// 只在持有槽位所属桶锁时读写。`refcnt` 统计所有未完成的持有者
/// （`bread` 返回的句柄和 `bpin` 的钉住），为 0 时槽位可被复用或窃取。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotMeta {
    /// 设备号
    pub dev: u32,
    /// 块号
    pub blockno: u32,
    /// 引用计数
    pub refcnt: u32,
}

impl SlotMeta {
    /// 启动时的占位映射（设备 0 块 0，未被引用）
    pub const fn unassigned() -> Self {
        Self {
            dev: 0,
            blockno: 0,
            refcnt: 0,
        }
    }
}

/// 缓冲槽的数据侧：载荷与有效标志
///
/// 槽位在启动时一次性分配进定长数组，此后只有映射、有效性和链表
/// 位置会变化，槽位本身永不创建或销毁。
pub(crate) struct Slot {
    /// 载荷是否已按当前映射从设备填充
    pub valid: AtomicBool,
    /// 块大小的数据载荷，独占锁可跨设备 I/O 持有
    pub data: SleepLock<Vec<u8>>,
}

impl Slot {
    /// 创建一个空槽位
    pub fn new(block_size: usize) -> Self {
        Self {
            valid: AtomicBool::new(false),
            data: SleepLock::new(alloc::vec![0u8; block_size]),
        }
    }
}
