//! 接收器（Packet Sink）
//!
//! 按 (节点, 端口, 协议) 登记。登记后处于未监听状态，`StartSink` 事件到来后开始计数；
//! 未监听端口上收到的字节单独记为 `unbound_bytes`。

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::net::{NetWorld, NodeId, Protocol};
use crate::sim::{Event, SimTime, Simulator, World};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sink {
    pub listening: bool,
    pub rx_bytes: u64,
    pub rx_events: u64,
    pub first_rx: Option<SimTime>,
    pub last_rx: Option<SimTime>,
}

type SinkKey = (NodeId, u16, Protocol);

#[derive(Debug, Default)]
pub struct SinkTable {
    sinks: BTreeMap<SinkKey, Sink>,
    unbound_bytes: u64,
}

impl SinkTable {
    pub fn install(&mut self, node: NodeId, port: u16, protocol: Protocol) {
        self.sinks.entry((node, port, protocol)).or_default();
    }

    /// 开始监听；未登记的端口会被隐式登记
    pub fn start(&mut self, node: NodeId, port: u16, protocol: Protocol) {
        self.sinks.entry((node, port, protocol)).or_default().listening = true;
    }

    pub fn is_listening(&self, node: NodeId, port: u16, protocol: Protocol) -> bool {
        self.sinks
            .get(&(node, port, protocol))
            .is_some_and(|s| s.listening)
    }

    pub fn get(&self, node: NodeId, port: u16, protocol: Protocol) -> Option<&Sink> {
        self.sinks.get(&(node, port, protocol))
    }

    pub fn unbound_bytes(&self) -> u64 {
        self.unbound_bytes
    }

    pub fn on_receive(&mut self, node: NodeId, port: u16, protocol: Protocol, bytes: u64, now: SimTime) {
        match self.sinks.get_mut(&(node, port, protocol)) {
            Some(s) if s.listening => {
                s.rx_bytes += bytes;
                s.rx_events += 1;
                s.first_rx.get_or_insert(now);
                s.last_rx = Some(now);
            }
            _ => {
                trace!(?node, port, ?protocol, bytes, "端口无监听");
                self.unbound_bytes += bytes;
            }
        }
    }
}

/// 事件：接收器开始监听
#[derive(Debug)]
pub struct StartSink {
    pub node: NodeId,
    pub port: u16,
    pub protocol: Protocol,
}

impl Event for StartSink {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        debug!(now = ?sim.now(), node = ?self.node, port = self.port, "👂 接收器开始监听");
        w.net.sinks.start(self.node, self.port, self.protocol);
    }
}
