//! 航点序列
//!
//! 航点之间线性插值；第一个航点之前停在第一个航点，最后一个航点之后停在最后位置。

use serde::{Deserialize, Serialize};

use super::position::Position;
use crate::error::ConfigError;
use crate::sim::SimTime;

/// 航点（配置形式：秒 + 位置）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub time_s: f64,
    pub position: Position,
}

impl Waypoint {
    pub const fn new(time_s: f64, position: Position) -> Self {
        Self { time_s, position }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaypointPath {
    points: Vec<(SimTime, Position)>,
}

impl WaypointPath {
    /// 时间必须严格递增、非负且有限
    pub fn new(waypoints: &[Waypoint]) -> Result<Self, ConfigError> {
        if waypoints.is_empty() {
            return Err(ConfigError::EmptyWaypoints);
        }
        let mut points = Vec::with_capacity(waypoints.len());
        for (i, wp) in waypoints.iter().enumerate() {
            if !(wp.time_s.is_finite() && wp.time_s >= 0.0) || !wp.position.is_finite() {
                return Err(ConfigError::invalid(
                    "waypoint_schedule",
                    format!("waypoint {i} ({wp:?}) is not a finite, non-negative waypoint"),
                ));
            }
            let t = SimTime::from_secs_f64(wp.time_s);
            let increasing = points.last().is_none_or(|&(prev, _)| t > prev);
            if !increasing {
                return Err(ConfigError::WaypointsNotIncreasing {
                    index: i,
                    prev: waypoints[i - 1].time_s,
                    next: wp.time_s,
                });
            }
            points.push((t, wp.position));
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn position_at(&self, t: SimTime) -> Position {
        let idx = self.points.partition_point(|(pt, _)| *pt <= t);
        if idx == 0 {
            return self.points[0].1;
        }
        if idx == self.points.len() {
            return self.points[idx - 1].1;
        }
        let (t0, p0) = self.points[idx - 1];
        let (t1, p1) = self.points[idx];
        let frac = (t.0 - t0.0) as f64 / (t1.0 - t0.0) as f64;
        Position::lerp(&p0, &p1, frac)
    }
}
