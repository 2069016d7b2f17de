//! 链路类型
//!
//! 点到点双向链路：两个方向各自有串行化时钟和出口队列。

use super::addr::Ipv4Net;
use super::id::NodeId;
use crate::lte::BearerRateModel;
use crate::queue::{DropTailQueue, PacketQueue, QueueStats};
use crate::sim::SimTime;

/// 链路种类
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkKind {
    /// 有线点到点链路，速率固定
    Wired,
    /// UE 与基站之间的无线承载，速率随两端距离变化
    RadioBearer {
        ue: NodeId,
        ap: NodeId,
        model: BearerRateModel,
    },
}

/// 单方向状态
#[derive(Debug)]
pub(crate) struct LinkDir {
    pub(crate) busy: bool,
    pub(crate) queue: Box<dyn PacketQueue>,
}

/// 网络链路
#[derive(Debug)]
pub struct Link {
    pub a: NodeId,
    pub b: NodeId,
    pub kind: LinkKind,
    pub bandwidth_bps: u64,
    pub delay: SimTime,
    /// 链路拥有的地址段（无线承载的地址来自 UE 网段，不单独拥有）
    pub subnet: Option<Ipv4Net>,
    pub(crate) dirs: [LinkDir; 2],
}

impl Link {
    /// 创建新链路，两个方向的队列容量均为 `queue_bytes`
    pub fn new(
        a: NodeId,
        b: NodeId,
        kind: LinkKind,
        bandwidth_bps: u64,
        delay: SimTime,
        queue_bytes: u64,
    ) -> Self {
        let dir = || LinkDir {
            busy: false,
            queue: Box::new(DropTailQueue::new(queue_bytes)),
        };
        Self {
            a,
            b,
            kind,
            bandwidth_bps,
            delay,
            subnet: None,
            dirs: [dir(), dir()],
        }
    }

    /// `from` 发出方向的下标（0: a->b，1: b->a）
    pub fn dir_from(&self, from: NodeId) -> Option<usize> {
        if from == self.a {
            Some(0)
        } else if from == self.b {
            Some(1)
        } else {
            None
        }
    }

    /// 方向 `dir` 的接收端
    pub fn receiver(&self, dir: usize) -> NodeId {
        if dir == 0 { self.b } else { self.a }
    }

    pub fn peer_of(&self, node: NodeId) -> Option<NodeId> {
        self.dir_from(node).map(|d| self.receiver(d))
    }

    pub fn connects(&self, x: NodeId, y: NodeId) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    pub fn queued_bytes(&self, dir: usize) -> u64 {
        self.dirs[dir].queue.bytes()
    }

    pub fn queue_stats(&self, dir: usize) -> QueueStats {
        self.dirs[dir].queue.stats()
    }
}

/// 按给定速率传输 `bytes` 所需的时间：ceil(bytes*8 / bps) 秒 -> 纳秒
pub(crate) fn tx_time(bytes: u32, bandwidth_bps: u64) -> SimTime {
    if bandwidth_bps == 0 {
        return SimTime(u64::MAX / 4);
    }
    let bits = (bytes as u128).saturating_mul(8);
    let nanos = (bits.saturating_mul(1_000_000_000u128) + (bandwidth_bps as u128 - 1))
        / bandwidth_bps as u128;
    SimTime(nanos.min(u64::MAX as u128) as u64)
}
