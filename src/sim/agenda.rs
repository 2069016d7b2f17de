//! 待执行事件表
//!
//! `BinaryHeap` 是大顶堆，`Entry` 的比较方向取反，使最早时刻、最小序号在堆顶。

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::event::Event;
use super::time::SimTime;

pub(super) struct Entry {
    pub(super) at: SimTime,
    pub(super) seq: u64,
    pub(super) ev: Box<dyn Event>,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.at, other.seq).cmp(&(self.at, self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        (self.at, self.seq) == (other.at, other.seq)
    }
}

impl Eq for Entry {}

#[derive(Default)]
pub(super) struct Agenda {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl Agenda {
    pub(super) fn push(&mut self, at: SimTime, ev: Box<dyn Event>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { at, seq, ev });
        seq
    }

    /// 取出堆顶事件，前提是它不晚于 `until`
    pub(super) fn pop_due(&mut self, until: SimTime) -> Option<Entry> {
        if self.heap.peek()?.at > until {
            return None;
        }
        self.heap.pop()
    }

    pub(super) fn next_at(&self) -> Option<SimTime> {
        self.heap.peek().map(|e| e.at)
    }

    pub(super) fn len(&self) -> usize {
        self.heap.len()
    }

    /// 清空并返回被丢弃的数量
    pub(super) fn clear(&mut self) -> usize {
        let n = self.heap.len();
        self.heap.clear();
        n
    }
}
