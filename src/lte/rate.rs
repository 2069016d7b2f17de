use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 无线承载速率模型：距离 0 处为峰值速率，线性衰减到小区边缘速率，
/// 超出覆盖半径后保持边缘速率。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BearerRateModel {
    pub peak_rate_bps: u64,
    pub edge_rate_bps: u64,
    pub cell_range_m: f64,
}

impl Default for BearerRateModel {
    fn default() -> Self {
        Self {
            peak_rate_bps: 75_000_000,
            edge_rate_bps: 10_000_000,
            cell_range_m: 300.0,
        }
    }
}

impl BearerRateModel {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.edge_rate_bps == 0 {
            return Err(ConfigError::invalid("edge_rate_bps", "must be positive"));
        }
        if self.peak_rate_bps < self.edge_rate_bps {
            return Err(ConfigError::invalid(
                "peak_rate_bps",
                format!(
                    "{} is below the edge rate {}",
                    self.peak_rate_bps, self.edge_rate_bps
                ),
            ));
        }
        if !(self.cell_range_m.is_finite() && self.cell_range_m > 0.0) {
            return Err(ConfigError::invalid(
                "cell_range_m",
                format!("{} is not a positive distance", self.cell_range_m),
            ));
        }
        Ok(())
    }

    pub fn rate_at(&self, distance_m: f64) -> u64 {
        if !distance_m.is_finite() || distance_m >= self.cell_range_m {
            return self.edge_rate_bps.max(1);
        }
        let frac = (distance_m / self.cell_range_m).max(0.0);
        let span = self.peak_rate_bps.saturating_sub(self.edge_rate_bps) as f64;
        let rate = self.peak_rate_bps as f64 - span * frac;
        (rate.round() as u64).max(self.edge_rate_bps).max(1)
    }
}
