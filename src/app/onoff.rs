//! On/Off UDP 源：on 时段内以恒定速率发包，off 时段静默
//!
//! 源自身就是一个不断重新调度的事件，不在世界状态中保留任何表项。

use tracing::trace;

use crate::error::ConfigError;
use crate::net::{Endpoint, NetWorld, Protocol, Transport, tx_time};
use crate::sim::{Event, SimTime, Simulator, World};

/// UDP/IP 头部开销（字节）
pub const UDP_HEADER_BYTES: u32 = 28;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnOffParams {
    pub rate_bps: u64,
    /// 载荷字节数；发包间隔按载荷计算
    pub packet_size: u32,
    pub header_bytes: u32,
    pub on_time: SimTime,
    /// 为 0 时始终处于 on 状态
    pub off_time: SimTime,
}

impl Default for OnOffParams {
    fn default() -> Self {
        Self {
            rate_bps: 5_000_000,
            packet_size: 1024,
            header_bytes: UDP_HEADER_BYTES,
            on_time: SimTime::from_secs(1),
            off_time: SimTime::ZERO,
        }
    }
}

impl OnOffParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_bps == 0 {
            return Err(ConfigError::invalid("burst_rate_bps", "must be positive"));
        }
        if self.packet_size == 0 {
            return Err(ConfigError::invalid("burst_packet_size", "must be positive"));
        }
        if self.on_time == SimTime::ZERO {
            return Err(ConfigError::invalid("burst_on_time_s", "must be positive"));
        }
        Ok(())
    }

    pub fn interval(&self) -> SimTime {
        tx_time(self.packet_size, self.rate_bps)
    }

    pub fn wire_bytes(&self) -> u32 {
        self.packet_size.saturating_add(self.header_bytes)
    }
}

#[derive(Debug, Clone)]
pub struct OnOffApp {
    pub src: Endpoint,
    pub dst: Endpoint,
    pub params: OnOffParams,
    pub start: SimTime,
    pub stop: SimTime,
}

impl OnOffApp {
    /// `t` 之后（含）最早的可发送时刻
    pub fn next_send_at(&self, t: SimTime) -> SimTime {
        let t = t.max(self.start);
        if self.params.off_time == SimTime::ZERO {
            return t;
        }
        let cycle = self.params.on_time.0.saturating_add(self.params.off_time.0);
        let phase = (t.0 - self.start.0) % cycle;
        if phase < self.params.on_time.0 {
            t
        } else {
            SimTime(t.0.saturating_add(cycle - phase))
        }
    }
}

/// 事件：On/Off 源发出一个包并调度下一次发送
#[derive(Debug)]
pub struct OnOffTick {
    pub app: OnOffApp,
}

impl Event for OnOffTick {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let OnOffTick { app } = *self;
        let now = sim.now();
        if now >= app.stop {
            return;
        }
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        let pkt = w.net.make_packet(
            app.src.addr,
            app.src.port,
            app.dst.addr,
            app.dst.port,
            Protocol::Udp,
            app.params.wire_bytes(),
            Transport::Udp,
        );
        trace!(pkt_id = pkt.id, dst = %app.dst.addr, "UDP 发包");
        w.net.send(app.src.node, pkt, sim);

        let next = app.next_send_at(now.saturating_add(app.params.interval()));
        if next < app.stop {
            sim.schedule(next, OnOffTick { app });
        }
    }
}
