use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use super::{FlowDirection, FlowId, FlowLabel};
use crate::app::TrafficClass;
use crate::error::ReportError;
use crate::net::{DropReason, FlowKey};
use crate::sim::SimTime;

/// 每条流的原始计数
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FlowCounters {
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub lost_bytes: u64,
    pub lost_packets: u64,
    pub in_flight_at_stop_bytes: u64,
    pub in_flight_at_stop_packets: u64,
    pub delay_sum: SimTime,
    pub jitter_sum: SimTime,
    pub first_tx: Option<SimTime>,
    pub last_tx: Option<SimTime>,
    pub first_rx: Option<SimTime>,
    pub last_rx: Option<SimTime>,
    pub drops: BTreeMap<DropReason, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub flow_id: FlowId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<TrafficClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<FlowDirection>,
    #[serde(flatten)]
    pub key: FlowKey,
    pub start_time_s: Option<f64>,
    pub stop_time_s: Option<f64>,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub lost_bytes: u64,
    pub lost_packets: u64,
    pub in_flight_at_stop_bytes: u64,
    pub in_flight_at_stop_packets: u64,
    pub drops: BTreeMap<DropReason, u64>,
    pub delay_sum_s: f64,
    pub jitter_sum_s: f64,
    pub mean_delay_s: Option<f64>,
    pub mean_jitter_s: Option<f64>,
    pub first_tx_s: Option<f64>,
    pub last_rx_s: Option<f64>,
    pub throughput_bps: f64,
    pub rx_bytes_per_bin: Vec<u64>,
}

impl FlowReport {
    pub(super) fn new(
        flow_id: FlowId,
        key: FlowKey,
        label: Option<&FlowLabel>,
        c: FlowCounters,
        rx_bytes_per_bin: Vec<u64>,
    ) -> Self {
        let mean = |sum: SimTime, n: u64| (n > 0).then(|| sum.as_secs_f64() / n as f64);
        let throughput_bps = match (c.first_tx, c.last_rx) {
            (Some(a), Some(b)) if b > a => c.rx_bytes as f64 * 8.0 / b.saturating_sub(a).as_secs_f64(),
            _ => 0.0,
        };
        Self {
            flow_id,
            name: label.map(|l| l.name.clone()),
            class: label.map(|l| l.class),
            direction: label.map(|l| l.direction),
            key,
            start_time_s: label.map(|l| l.start.as_secs_f64()),
            stop_time_s: label.map(|l| l.stop.as_secs_f64()),
            tx_bytes: c.tx_bytes,
            tx_packets: c.tx_packets,
            rx_bytes: c.rx_bytes,
            rx_packets: c.rx_packets,
            lost_bytes: c.lost_bytes,
            lost_packets: c.lost_packets,
            in_flight_at_stop_bytes: c.in_flight_at_stop_bytes,
            in_flight_at_stop_packets: c.in_flight_at_stop_packets,
            drops: c.drops,
            delay_sum_s: c.delay_sum.as_secs_f64(),
            jitter_sum_s: c.jitter_sum.as_secs_f64(),
            mean_delay_s: mean(c.delay_sum, c.rx_packets),
            mean_jitter_s: mean(c.jitter_sum, c.rx_packets.saturating_sub(1)),
            first_tx_s: c.first_tx.map(SimTime::as_secs_f64),
            last_rx_s: c.last_rx.map(SimTime::as_secs_f64),
            throughput_bps,
            rx_bytes_per_bin,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowMonitorReport {
    pub sim_duration_s: f64,
    pub bin_width_s: f64,
    pub flows: Vec<FlowReport>,
    pub unmatched_flows: Vec<FlowReport>,
    pub cancelled_events: usize,
}

impl FlowMonitorReport {
    pub fn flow(&self, name: &str) -> Option<&FlowReport> {
        self.flows.iter().find(|f| f.name.as_deref() == Some(name))
    }

    pub fn flows_of(&self, class: TrafficClass) -> impl Iterator<Item = &FlowReport> {
        self.flows.iter().filter(move |f| f.class == Some(class))
    }

    pub fn write_json<W: Write>(&self, mut w: W) -> Result<(), ReportError> {
        serde_json::to_writer_pretty(&mut w, self)?;
        writeln!(w).map_err(|source| ReportError::Io {
            path: "<writer>".to_string(),
            source,
        })?;
        Ok(())
    }

    /// 写出到文件；路径为 `-` 时写到标准输出
    pub fn write_to_path(&self, path: &Path) -> Result<(), ReportError> {
        if path.as_os_str() == "-" {
            return self.write_json(std::io::stdout().lock());
        }
        let file = File::create(path).map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut w = BufWriter::new(file);
        self.write_json(&mut w)?;
        w.flush().map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), flows = self.flows.len(), "📊 流统计已写出");
        Ok(())
    }
}
