//! 链路层事件
//!
//! 一次发送产生两个事件：串行化结束时发送方向空闲（`LinkReady`），
//! 再经过传播时延包到达对端（`DeliverPacket`）。

use tracing::trace;

use super::id::{LinkId, NodeId};
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};

/// 链路 `link_id` 的 `dir` 方向发完一个包，可以取下一个
#[derive(Debug)]
pub struct LinkReady {
    pub link_id: LinkId,
    pub dir: usize,
}

impl Event for LinkReady {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        w.net.on_link_ready(self.link_id, self.dir, sim);
    }
}

/// 包到达下一跳节点
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, pkt } = *self;
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        trace!(pkt_id = pkt.id, ?to, dst = %pkt.dst, size = pkt.size_bytes, "📨 包到达");
        w.net.deliver(to, pkt, sim);
    }
}
