//! 流统计（Flow Monitor）
//!
//! 按五元组对所有经过 `Network::send` 发出的包分类：
//! - 发送侧：每次发送（含重传）计入 tx
//! - 接收侧：到达目的节点计入 rx，并累计时延/抖动、按时间分桶的接收字节
//! - 丢包：计入 lost，并按原因计数
//!
//! 流号按首次出现的顺序从 1 开始分配。未登记的流照常统计，首次出现时告警一次。
//! `finalize` 时仍在途的包计为丢失，因此每条流满足 `tx == rx + lost`。

mod report;

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::app::TrafficClass;
use crate::error::ConfigError;
use crate::net::{DropReason, FlowKey, Packet};
use crate::sim::SimTime;

pub use report::{FlowCounters, FlowMonitorReport, FlowReport};

pub type FlowId = u32;

/// 每条流的接收分桶数上限
pub const MAX_RX_BINS: u64 = 100_000;

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    /// 接收字节分桶宽度；为 0 时所有字节计入同一个桶
    pub bin_width: SimTime,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bin_width: SimTime::from_secs(1),
        }
    }
}

impl MonitorConfig {
    /// 分桶宽度必须为正，且在 `horizon` 内产生的桶数不超过 `MAX_RX_BINS`。
    pub fn validate(&self, horizon: SimTime) -> Result<(), ConfigError> {
        if self.bin_width == SimTime::ZERO {
            return Err(ConfigError::invalid(
                "bin_width_s",
                "rounds to 0 at nanosecond resolution",
            ));
        }
        let bins = self.bin_count(horizon);
        if bins > MAX_RX_BINS {
            return Err(ConfigError::TooFineResolution {
                name: "bin_width_s",
                what: "receive bins per flow",
                count: bins,
                limit: MAX_RX_BINS,
            });
        }
        Ok(())
    }

    fn bin_of(&self, t: SimTime) -> u64 {
        t.0.checked_div(self.bin_width.0).unwrap_or(0)
    }

    fn bin_count(&self, horizon: SimTime) -> u64 {
        match self.bin_width.0 {
            0 => 1,
            w => horizon.0.div_ceil(w),
        }
    }
}

/// 流方向：正向数据或反向确认
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirection {
    Forward,
    Ack,
}

/// 登记流的描述信息
#[derive(Debug, Clone, PartialEq)]
pub struct FlowLabel {
    pub name: String,
    pub class: TrafficClass,
    pub direction: FlowDirection,
    pub start: SimTime,
    pub stop: SimTime,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    flow: FlowId,
    bytes: u64,
}

#[derive(Debug, Default, Clone)]
struct FlowState {
    counters: FlowCounters,
    last_delay: Option<SimTime>,
    rx_bins: BTreeMap<u64, u64>,
}

#[derive(Debug, Default)]
pub struct FlowMonitor {
    config: MonitorConfig,
    ids: HashMap<FlowKey, FlowId>,
    keys: Vec<FlowKey>,
    flows: Vec<FlowState>,
    registered: HashMap<FlowKey, FlowLabel>,
    registration_order: Vec<FlowKey>,
    in_flight: HashMap<u64, InFlight>,
}

impl FlowMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// 登记一条预期出现的流。重复登记同一五元组以最后一次为准。
    pub fn register(&mut self, key: FlowKey, label: FlowLabel) {
        if self.registered.insert(key, label).is_none() {
            self.registration_order.push(key);
        }
    }

    pub fn is_registered(&self, key: &FlowKey) -> bool {
        self.registered.contains_key(key)
    }

    /// 已观察到的流数
    pub fn observed(&self) -> usize {
        self.keys.len()
    }

    pub fn flow_id(&self, key: &FlowKey) -> Option<FlowId> {
        self.ids.get(key).copied()
    }

    pub fn counters(&self, key: &FlowKey) -> Option<&FlowCounters> {
        self.ids
            .get(key)
            .map(|&id| &self.flows[(id - 1) as usize].counters)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn classify(&mut self, key: FlowKey) -> FlowId {
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = self.keys.len() as FlowId + 1;
        self.ids.insert(key, id);
        self.keys.push(key);
        self.flows.push(FlowState::default());
        if self.registered.contains_key(&key) {
            debug!(flow_id = id, %key, "新流");
        } else {
            warn!(flow_id = id, %key, "⚠️  观察到未登记的流");
        }
        id
    }

    fn state(&mut self, id: FlowId) -> &mut FlowState {
        &mut self.flows[(id - 1) as usize]
    }

    pub fn on_tx(&mut self, pkt: &Packet, now: SimTime) {
        let id = self.classify(pkt.flow_key());
        let bytes = pkt.size_bytes as u64;
        let c = &mut self.state(id).counters;
        c.tx_bytes += bytes;
        c.tx_packets += 1;
        c.first_tx.get_or_insert(now);
        c.last_tx = Some(now);
        self.in_flight.insert(pkt.id, InFlight { flow: id, bytes });
    }

    pub fn on_rx(&mut self, pkt: &Packet, now: SimTime) {
        let Some(f) = self.in_flight.remove(&pkt.id) else {
            return;
        };
        let delay = now.saturating_sub(pkt.sent_at);
        let bin = self.config.bin_of(now);
        let st = self.state(f.flow);
        let c = &mut st.counters;
        c.rx_bytes += f.bytes;
        c.rx_packets += 1;
        c.first_rx.get_or_insert(now);
        c.last_rx = Some(now);
        c.delay_sum = c.delay_sum.saturating_add(delay);
        if let Some(prev) = st.last_delay {
            c.jitter_sum = c.jitter_sum.saturating_add(SimTime(delay.0.abs_diff(prev.0)));
        }
        st.last_delay = Some(delay);
        *st.rx_bins.entry(bin).or_default() += f.bytes;
    }

    pub fn on_drop(&mut self, pkt: &Packet, reason: DropReason, _now: SimTime) {
        let Some(f) = self.in_flight.remove(&pkt.id) else {
            return;
        };
        let c = &mut self.state(f.flow).counters;
        c.lost_bytes += f.bytes;
        c.lost_packets += 1;
        *c.drops.entry(reason).or_default() += 1;
    }

    /// 结束统计：在途包计为丢失，生成报告。
    pub fn finalize(&mut self, now: SimTime, cancelled_events: usize) -> FlowMonitorReport {
        for f in std::mem::take(&mut self.in_flight).into_values() {
            let c = &mut self.flows[(f.flow - 1) as usize].counters;
            c.lost_bytes += f.bytes;
            c.lost_packets += 1;
            c.in_flight_at_stop_bytes += f.bytes;
            c.in_flight_at_stop_packets += 1;
        }

        let bins = self.config.bin_count(now);
        let mut next_id = self.keys.len() as FlowId + 1;
        let mut flows = Vec::with_capacity(self.registration_order.len());
        for key in &self.registration_order {
            let Some(label) = self.registered.get(key) else {
                continue;
            };
            let (id, counters, rx_bins) = match self.ids.get(key) {
                Some(&id) => {
                    let st = &self.flows[(id - 1) as usize];
                    (id, st.counters.clone(), bin_series(&st.rx_bins, bins))
                }
                None => {
                    let id = next_id;
                    next_id += 1;
                    (id, FlowCounters::default(), vec![0; bins as usize])
                }
            };
            flows.push(FlowReport::new(id, *key, Some(label), counters, rx_bins));
        }
        flows.sort_by_key(|f| f.flow_id);

        let unmatched_flows = self
            .keys
            .iter()
            .enumerate()
            .filter(|(_, k)| !self.registered.contains_key(k))
            .map(|(i, k)| {
                let st = &self.flows[i];
                FlowReport::new(
                    i as FlowId + 1,
                    *k,
                    None,
                    st.counters.clone(),
                    bin_series(&st.rx_bins, bins),
                )
            })
            .collect();

        FlowMonitorReport {
            sim_duration_s: now.as_secs_f64(),
            bin_width_s: self.config.bin_width.as_secs_f64(),
            flows,
            unmatched_flows,
            cancelled_events,
        }
    }
}

/// 补齐为连续序列；落在结束时刻上的包会多出一个桶
fn bin_series(bins: &BTreeMap<u64, u64>, count: u64) -> Vec<u64> {
    let count = bins.keys().next_back().map_or(count, |&last| count.max(last + 1));
    (0..count).map(|i| bins.get(&i).copied().unwrap_or(0)).collect()
}
