//! 出口队列
//!
//! 链路每个方向一个队列，容量以字节计；配置里按包数给出的容量用
//! `bytes_for_packets` 换算。

use serde::Serialize;

use crate::net::Packet;

mod drop_tail;

pub use drop_tail::DropTailQueue;

/// 按包数换算容量时使用的包大小
pub const DEFAULT_PKT_BYTES: u64 = 1500;

pub fn bytes_for_packets(pkts: u64) -> u64 {
    pkts.saturating_mul(DEFAULT_PKT_BYTES)
}

/// 队列的累计计数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub enqueued_pkts: u64,
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
    /// 出现过的最大占用
    pub peak_bytes: u64,
}

pub trait PacketQueue: std::fmt::Debug {
    /// 放不下时把包原样还给调用方
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet>;
    fn dequeue(&mut self) -> Option<Packet>;

    fn len(&self) -> usize;
    fn bytes(&self) -> u64;
    fn capacity_bytes(&self) -> u64;
    fn stats(&self) -> QueueStats;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
