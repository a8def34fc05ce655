//! 桶内 MRU 链表
//!
//! 基于索引的双向环形链表，带哨兵节点，按最近释放顺序排列：
//! 哨兵的 next 是 MRU 端（最近释放），prev 是 LRU 端（驱逐候选）。
//!
//! 不使用裸指针：`next`/`prev` 是以槽位下标寻址的定长表，哨兵占用
//! 下标 `nbuf`。释放、同桶复用、跨桶窃取共用 `unlink` 和 `insert_head`
//! 两个原语。

/// 未链入链表的标记
const UNLINKED: usize = usize::MAX;

/// MRU 顺序的槽位下标链表
pub(crate) struct MruList {
    next: alloc::vec::Vec<usize>,
    prev: alloc::vec::Vec<usize>,
}

impl MruList {
    /// 创建容量为 `nbuf` 的空链表（哨兵自环）
    pub fn new(nbuf: usize) -> Self {
        let mut next = alloc::vec![UNLINKED; nbuf + 1];
        let mut prev = alloc::vec![UNLINKED; nbuf + 1];
        next[nbuf] = nbuf;
        prev[nbuf] = nbuf;
        Self { next, prev }
    }

    fn sentinel(&self) -> usize {
        self.next.len() - 1
    }

    /// 将槽位 `idx` 插入 MRU 端
    pub fn insert_head(&mut self, idx: usize) {
        debug_assert!(!self.contains(idx), "slot already linked");
        let s = self.sentinel();
        let first = self.next[s];
        self.next[idx] = first;
        self.prev[idx] = s;
        self.prev[first] = idx;
        self.next[s] = idx;
    }

    /// 将槽位 `idx` 从链表中摘除
    pub fn unlink(&mut self, idx: usize) {
        debug_assert!(self.contains(idx), "slot not linked");
        let (p, n) = (self.prev[idx], self.next[idx]);
        self.next[p] = n;
        self.prev[n] = p;
        self.next[idx] = UNLINKED;
        self.prev[idx] = UNLINKED;
    }

    /// 槽位是否属于本链表
    pub fn contains(&self, idx: usize) -> bool {
        self.next[idx] != UNLINKED
    }

    /// MRU 端第一个槽位
    pub fn head(&self) -> Option<usize> {
        let s = self.sentinel();
        let first = self.next[s];
        (first != s).then_some(first)
    }

    /// 从 MRU 端到 LRU 端遍历
    pub fn iter_mru(&self) -> Iter<'_> {
        Iter {
            list: self,
            cur: self.next[self.sentinel()],
            forward: true,
        }
    }

    /// 从 LRU 端到 MRU 端遍历（驱逐扫描方向）
    pub fn iter_lru(&self) -> Iter<'_> {
        Iter {
            list: self,
            cur: self.prev[self.sentinel()],
            forward: false,
        }
    }
}

/// 链表遍历器
pub(crate) struct Iter<'a> {
    list: &'a MruList,
    cur: usize,
    forward: bool,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.cur == self.list.sentinel() {
            return None;
        }
        let idx = self.cur;
        self.cur = if self.forward {
            self.list.next[idx]
        } else {
            self.list.prev[idx]
        };
        Some(idx)
    }
}
