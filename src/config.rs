//! 场景配置
//!
//! JSON 格式，所有字段都有默认值，缺省时与原始场景一致：
//! 4 个基站、10 个 UE、2 个远端主机，仿真 20 秒。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::{OnOffParams, TrafficPlan, UDP_HEADER_BYTES};
use crate::error::ConfigError;
use crate::lte::{RadioConfig, RemConfig};
use crate::mobility::{
    Bounds, MAX_WALK_LEGS, MobilityPlan, Position, RandomWalkParams, Waypoint,
};
use crate::monitor::MonitorConfig;
use crate::proto::tcp::TcpConfig;
use crate::queue::bytes_for_packets;
use crate::sim::SimTime;
use crate::topo::{LteTopologyOpts, WiredLinkOpts};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiredLinkConfig {
    pub rate_bps: u64,
    pub delay_s: f64,
    pub queue_packets: u64,
}

impl Default for WiredLinkConfig {
    fn default() -> Self {
        Self {
            rate_bps: 1_000_000_000,
            delay_s: 0.002,
            queue_packets: 100,
        }
    }
}

impl WiredLinkConfig {
    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.rate_bps == 0 {
            return Err(ConfigError::invalid(name, "rate_bps must be positive"));
        }
        if !(self.delay_s.is_finite() && self.delay_s >= 0.0) {
            return Err(ConfigError::invalid(
                name,
                format!("delay_s {} is not a non-negative duration", self.delay_s),
            ));
        }
        Ok(())
    }

    fn to_opts(self) -> WiredLinkOpts {
        WiredLinkOpts {
            rate_bps: self.rate_bps,
            delay: SimTime::from_secs_f64(self.delay_s),
            queue_bytes: bytes_for_packets(self.queue_packets),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub access_point_count: usize,
    pub ue_count: usize,
    pub remote_host_count: usize,
    pub sim_duration_s: f64,
    pub seed: u64,
    pub ap_positions: Vec<Position>,
    pub walk_speed_mps: f64,
    pub walk_bounds: Bounds,
    pub walk_dwell_s: f64,
    pub waypoint_schedule: Vec<Waypoint>,
    /// 0 表示不限量
    pub bulk_max_bytes: u64,
    pub burst_rate_bps: u64,
    pub burst_packet_size: u32,
    pub burst_on_time_s: f64,
    pub burst_off_time_s: f64,
    pub backhaul: WiredLinkConfig,
    pub s1: WiredLinkConfig,
    pub radio: RadioConfig,
    pub tcp_mss: u32,
    pub bin_width_s: f64,
    pub rem: Option<RemConfig>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            access_point_count: 4,
            ue_count: 10,
            remote_host_count: 2,
            sim_duration_s: 20.0,
            seed: 1,
            ap_positions: vec![
                Position::new(0.0, 0.0, 20.0),
                Position::new(200.0, 0.0, 20.0),
                Position::new(0.0, 200.0, 20.0),
                Position::new(200.0, 200.0, 20.0),
            ],
            walk_speed_mps: 5.0,
            walk_bounds: Bounds::default(),
            walk_dwell_s: 1.0,
            waypoint_schedule: vec![
                Waypoint::new(0.0, Position::new(10.0, 10.0, 0.0)),
                Waypoint::new(5.0, Position::new(150.0, 10.0, 0.0)),
                Waypoint::new(10.0, Position::new(150.0, 150.0, 0.0)),
                Waypoint::new(15.0, Position::new(10.0, 150.0, 0.0)),
                Waypoint::new(20.0, Position::new(10.0, 10.0, 0.0)),
            ],
            bulk_max_bytes: 0,
            burst_rate_bps: 5_000_000,
            burst_packet_size: 1024,
            burst_on_time_s: 1.0,
            burst_off_time_s: 0.0,
            backhaul: WiredLinkConfig::default(),
            s1: WiredLinkConfig {
                rate_bps: 10_000_000_000,
                delay_s: 0.0,
                queue_packets: 100,
            },
            radio: RadioConfig::default(),
            tcp_mss: 1460,
            bin_width_s: 1.0,
            rem: None,
        }
    }
}

impl ScenarioConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&s)
    }

    /// 只做数值合法性检查；拓扑相关的一致性（如基站位置个数）在搭建时检查
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sim_duration_s.is_finite() && self.sim_duration_s >= 0.0) {
            return Err(ConfigError::invalid(
                "sim_duration_s",
                format!("{} is not a non-negative duration", self.sim_duration_s),
            ));
        }
        for (name, v) in [
            ("walk_dwell_s", self.walk_dwell_s),
            ("burst_on_time_s", self.burst_on_time_s),
            ("bin_width_s", self.bin_width_s),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(ConfigError::invalid(name, format!("{v} must be positive")));
            }
            if SimTime::from_secs_f64(v) == SimTime::ZERO {
                return Err(ConfigError::invalid(
                    name,
                    format!("{v}s rounds to 0 at nanosecond resolution"),
                ));
            }
        }
        let horizon = self.sim_duration();
        self.monitor_config().validate(horizon)?;
        let legs = horizon.0.div_ceil(SimTime::from_secs_f64(self.walk_dwell_s).0);
        if legs > MAX_WALK_LEGS {
            return Err(ConfigError::TooFineResolution {
                name: "walk_dwell_s",
                what: "random walk legs per UE",
                count: legs,
                limit: MAX_WALK_LEGS,
            });
        }
        if !(self.burst_off_time_s.is_finite() && self.burst_off_time_s >= 0.0) {
            return Err(ConfigError::invalid(
                "burst_off_time_s",
                format!("{} is not a non-negative duration", self.burst_off_time_s),
            ));
        }
        if self.tcp_mss == 0 {
            return Err(ConfigError::invalid("tcp_mss", "must be positive"));
        }
        self.walk_bounds.validate()?;
        self.backhaul.validate("backhaul")?;
        self.s1.validate("s1")?;
        self.radio.validate()?;
        if let Some(rem) = &self.rem {
            rem.validate()?;
        }
        self.burst_params().validate()
    }

    pub fn sim_duration(&self) -> SimTime {
        SimTime::from_secs_f64(self.sim_duration_s)
    }

    pub fn topology_opts(&self) -> LteTopologyOpts {
        LteTopologyOpts {
            remote_hosts: self.remote_host_count,
            access_points: self.access_point_count,
            ues: self.ue_count,
            backhaul: self.backhaul.to_opts(),
            s1: self.s1.to_opts(),
        }
    }

    pub fn mobility_plan(&self) -> MobilityPlan {
        MobilityPlan {
            ap_positions: self.ap_positions.clone(),
            walk: RandomWalkParams {
                speed: self.walk_speed_mps,
                bounds: self.walk_bounds,
                dwell: SimTime::from_secs_f64(self.walk_dwell_s),
            },
            waypoints: self.waypoint_schedule.clone(),
            seed: self.seed,
            horizon: self.sim_duration(),
        }
    }

    fn burst_params(&self) -> OnOffParams {
        OnOffParams {
            rate_bps: self.burst_rate_bps,
            packet_size: self.burst_packet_size,
            header_bytes: UDP_HEADER_BYTES,
            on_time: SimTime::from_secs_f64(self.burst_on_time_s),
            off_time: SimTime::from_secs_f64(self.burst_off_time_s),
        }
    }

    pub fn traffic_plan(&self) -> TrafficPlan {
        let defaults = TrafficPlan::default();
        TrafficPlan {
            bulk: defaults.bulk,
            bulk_max_bytes: (self.bulk_max_bytes > 0).then_some(self.bulk_max_bytes),
            web: defaults.web,
            burst: self.burst_params(),
            stop: self.sim_duration(),
        }
    }

    pub fn tcp_config(&self) -> TcpConfig {
        let mss = self.tcp_mss;
        TcpConfig {
            mss,
            init_cwnd_bytes: (mss as u64).saturating_mul(10),
            init_ssthresh_bytes: (mss as u64).saturating_mul(1_000),
            ..TcpConfig::default()
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            bin_width: SimTime::from_secs_f64(self.bin_width_s),
        }
    }
}
