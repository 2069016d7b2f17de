//! 有界随机游走
//!
//! 节点以恒定速率沿直线运动；每经过固定驻留时间或碰到边界时，重新均匀随机
//! 选择方向（只接受指向边界内侧的方向）。
//!
//! 整条轨迹在构造时由种子一次性生成为分段直线（legs），因此 `position_at`
//! 是时间的纯函数，同一种子可完全复现。

use std::f64::consts::TAU;

use fastrand::Rng;

use super::position::{Bounds, Position};
use crate::error::ConfigError;
use crate::sim::SimTime;

/// 距离边界小于该值视为贴边
const EPS: f64 = 1e-9;
/// 每次转向最多重抽方向的次数，之后朝边界中心走
const MAX_DIRECTION_TRIES: usize = 64;
/// 单条轨迹的腿数上限
pub const MAX_WALK_LEGS: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomWalkParams {
    /// 速率（m/s）
    pub speed: f64,
    pub bounds: Bounds,
    /// 两次转向之间的最长时间
    pub dwell: SimTime,
}

/// 一段匀速直线运动：`[t0, t1]` 秒内从 `from` 以 `(vx, vy)` 运动
#[derive(Debug, Clone, Copy, PartialEq)]
struct Leg {
    t0: f64,
    t1: f64,
    from: Position,
    vx: f64,
    vy: f64,
}

impl Leg {
    fn at(&self, t: f64) -> Position {
        let dt = t.clamp(self.t0, self.t1) - self.t0;
        Position::new(self.from.x + self.vx * dt, self.from.y + self.vy * dt, self.from.z)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomWalk {
    params: RandomWalkParams,
    start: Position,
    legs: Vec<Leg>,
}

impl RandomWalk {
    /// 生成 `[0, horizon]` 内的完整轨迹；`horizon` 之后保持最后位置。
    pub fn generate(
        start: Position,
        params: RandomWalkParams,
        seed: u64,
        horizon: SimTime,
    ) -> Result<Self, ConfigError> {
        params.bounds.validate()?;
        if !(params.speed.is_finite() && params.speed >= 0.0) {
            return Err(ConfigError::invalid(
                "walk_speed_mps",
                format!("{} must be a finite non-negative number", params.speed),
            ));
        }
        if params.dwell == SimTime::ZERO {
            return Err(ConfigError::invalid("walk_dwell_s", "must be positive"));
        }
        if !start.is_finite() {
            return Err(ConfigError::invalid("ue_position", format!("{start:?}")));
        }

        let bounds = params.bounds;
        let start = bounds.clamp(start);
        let horizon = horizon.as_secs_f64();
        let dwell = params.dwell.as_secs_f64();
        let mut rng = Rng::with_seed(seed);
        let mut legs = Vec::new();

        if params.speed > 0.0 {
            let mut t = 0.0;
            let mut pos = start;
            while t < horizon {
                if legs.len() as u64 >= MAX_WALK_LEGS {
                    // 驻留时间过短或边界过小，碰壁次数失控
                    return Err(ConfigError::TooFineResolution {
                        name: "walk_dwell_s",
                        what: "random walk legs",
                        count: legs.len() as u64 + 1,
                        limit: MAX_WALK_LEGS,
                    });
                }
                let Some((vx, vy, to_wall)) = pick_direction(&mut rng, &pos, &bounds, params.speed)
                else {
                    // 边界退化为点或线且无法移动
                    break;
                };
                let dur = dwell.min(to_wall).min(horizon - t);
                let leg = Leg {
                    t0: t,
                    t1: t + dur,
                    from: pos,
                    vx,
                    vy,
                };
                pos = bounds.clamp(leg.at(leg.t1));
                legs.push(leg);
                t += dur;
            }
        }

        Ok(Self {
            params,
            start,
            legs,
        })
    }

    pub fn params(&self) -> &RandomWalkParams {
        &self.params
    }

    /// 转向次数（腿数）
    pub fn legs(&self) -> usize {
        self.legs.len()
    }

    pub fn position_at(&self, t: SimTime) -> Position {
        let Some(last) = self.legs.last() else {
            return self.start;
        };
        let t = t.as_secs_f64();
        let idx = self.legs.partition_point(|l| l.t0 <= t);
        if idx == 0 {
            return self.start;
        }
        let leg = if t >= last.t1 { last } else { &self.legs[idx - 1] };
        // 浮点误差可能让边界上的点略微越界
        self.params.bounds.clamp(leg.at(t))
    }
}

/// 均匀随机选择一个指向内侧的方向，返回速度分量和到边界所需时间。
fn pick_direction(
    rng: &mut Rng,
    pos: &Position,
    bounds: &Bounds,
    speed: f64,
) -> Option<(f64, f64, f64)> {
    for _ in 0..MAX_DIRECTION_TRIES {
        let theta = rng.f64() * TAU;
        let (vx, vy) = (speed * theta.cos(), speed * theta.sin());
        let to_wall = time_to_wall(pos, vx, vy, bounds);
        if to_wall > EPS {
            return Some((vx, vy, to_wall));
        }
    }
    let c = bounds.center();
    let (dx, dy) = (c.x - pos.x, c.y - pos.y);
    let norm = (dx * dx + dy * dy).sqrt();
    if norm <= EPS {
        return None;
    }
    let (vx, vy) = (speed * dx / norm, speed * dy / norm);
    let to_wall = time_to_wall(pos, vx, vy, bounds);
    (to_wall > EPS).then_some((vx, vy, to_wall))
}

fn time_to_wall(pos: &Position, vx: f64, vy: f64, b: &Bounds) -> f64 {
    let axis = |p: f64, v: f64, lo: f64, hi: f64| {
        if v > 0.0 {
            (hi - p) / v
        } else if v < 0.0 {
            (lo - p) / v
        } else {
            f64::INFINITY
        }
    };
    axis(pos.x, vx, b.x_min, b.x_max).min(axis(pos.y, vy, b.y_min, b.y_max))
}
