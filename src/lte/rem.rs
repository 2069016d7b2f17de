//! 无线环境图（REM）：在矩形网格上采样每个点的最佳基站速率
//!
//! 输出为文本，每行 `x y z rate_bps`。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, ReportError};
use crate::mobility::Position;

use super::radio::RadioAccess;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// 每个坐标轴上的采样点数
    pub x_res: u32,
    pub y_res: u32,
    pub z: f64,
}

impl Default for RemConfig {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 200.0,
            y_min: 0.0,
            y_max: 200.0,
            x_res: 200,
            y_res: 200,
            z: 0.0,
        }
    }
}

impl RemConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [self.x_min, self.x_max, self.y_min, self.y_max, self.z]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.x_min > self.x_max || self.y_min > self.y_max {
            return Err(ConfigError::invalid(
                "rem",
                format!(
                    "invalid area x=[{}, {}] y=[{}, {}]",
                    self.x_min, self.x_max, self.y_min, self.y_max
                ),
            ));
        }
        if self.x_res == 0 || self.y_res == 0 {
            return Err(ConfigError::invalid("rem", "resolution must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemPoint {
    pub position: Position,
    pub rate_bps: u64,
}

fn axis(min: f64, max: f64, res: u32) -> impl Iterator<Item = f64> {
    let step = if res > 1 {
        (max - min) / (res - 1) as f64
    } else {
        0.0
    };
    (0..res).map(move |i| min + step * i as f64)
}

/// 按行（y 外层、x 内层）计算网格上的最佳速率；没有基站时速率为 0。
pub fn compute_rem(radio: &RadioAccess, cfg: &RemConfig) -> Vec<RemPoint> {
    let model = radio.config().bearer;
    let aps = radio.access_points().map(|(_, p)| p).collect::<Vec<_>>();
    let mut out = Vec::with_capacity(cfg.x_res as usize * cfg.y_res as usize);
    for y in axis(cfg.y_min, cfg.y_max, cfg.y_res) {
        for x in axis(cfg.x_min, cfg.x_max, cfg.x_res) {
            let position = Position::new(x, y, cfg.z);
            let rate_bps = aps
                .iter()
                .map(|ap| model.rate_at(ap.distance(&position)))
                .max()
                .unwrap_or(0);
            out.push(RemPoint { position, rate_bps });
        }
    }
    out
}

pub fn write_rem<W: Write>(points: &[RemPoint], mut w: W) -> std::io::Result<()> {
    for p in points {
        writeln!(
            w,
            "{} {} {} {}",
            p.position.x, p.position.y, p.position.z, p.rate_bps
        )?;
    }
    w.flush()
}

pub fn write_rem_to_path(points: &[RemPoint], path: &Path) -> Result<(), ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.display().to_string(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    write_rem(points, BufWriter::new(file)).map_err(io_err)?;
    info!(path = %path.display(), points = points.len(), "🗺️  REM 已写出");
    Ok(())
}
