//! 移动性模块
//!
//! 每个参与空间计算的节点（基站与 UE）有且仅有一条轨迹。轨迹是一个和类型，
//! 由纯函数 `position_at(t)` 求值，不在运行中修改任何状态。

mod position;
mod random_walk;
mod waypoint;

use std::collections::HashMap;

use fastrand::Rng;
use tracing::{debug, info};

pub use position::{Bounds, Position};
pub use random_walk::{MAX_WALK_LEGS, RandomWalk, RandomWalkParams};
pub use waypoint::{Waypoint, WaypointPath};

use crate::error::ConfigError;
use crate::net::NodeId;
use crate::sim::SimTime;
use crate::topo::{LteTopology, UeGroup};

/// 节点轨迹
#[derive(Debug, Clone, PartialEq)]
pub enum Trajectory {
    Static(Position),
    BoundedRandomWalk(RandomWalk),
    WaypointSequence(WaypointPath),
}

impl Trajectory {
    pub fn position_at(&self, t: SimTime) -> Position {
        match self {
            Trajectory::Static(p) => *p,
            Trajectory::BoundedRandomWalk(w) => w.position_at(t),
            Trajectory::WaypointSequence(w) => w.position_at(t),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Trajectory::Static(_) => "static",
            Trajectory::BoundedRandomWalk(_) => "bounded_random_walk",
            Trajectory::WaypointSequence(_) => "waypoint_sequence",
        }
    }
}

/// 节点 -> 轨迹
#[derive(Debug, Default, Clone)]
pub struct MobilityTable {
    trajectories: HashMap<NodeId, Trajectory>,
}

impl MobilityTable {
    pub fn set(&mut self, node: NodeId, trajectory: Trajectory) {
        self.trajectories.insert(node, trajectory);
    }

    pub fn get(&self, node: NodeId) -> Option<&Trajectory> {
        self.trajectories.get(&node)
    }

    pub fn position_of(&self, node: NodeId, t: SimTime) -> Option<Position> {
        self.trajectories.get(&node).map(|tr| tr.position_at(t))
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }
}

/// 移动性分配参数
#[derive(Debug, Clone)]
pub struct MobilityPlan {
    /// 基站位置，与基站一一对应
    pub ap_positions: Vec<Position>,
    pub walk: RandomWalkParams,
    /// 航点组 UE 共用的航点序列
    pub waypoints: Vec<Waypoint>,
    pub seed: u64,
    /// 随机游走轨迹预生成的时长
    pub horizon: SimTime,
}

// 种子派生用的流编号，避免同一节点的不同随机量相关
const STREAM_INITIAL_POSITION: u64 = 1;
const STREAM_WALK: u64 = 2;

/// 为基站与 UE 分配轨迹：基站静止；A 组 UE 随机游走；B 组 UE 走航点。
#[tracing::instrument(skip_all, fields(aps = topo.access_points.len(), ues = topo.ues.len()))]
pub fn assign_mobility(
    table: &mut MobilityTable,
    topo: &LteTopology,
    plan: &MobilityPlan,
) -> Result<(), ConfigError> {
    if plan.ap_positions.len() != topo.access_points.len() {
        return Err(ConfigError::ApPositionCount {
            expected: topo.access_points.len(),
            got: plan.ap_positions.len(),
        });
    }
    if let Some(bad) = plan.ap_positions.iter().find(|p| !p.is_finite()) {
        return Err(ConfigError::invalid("ap_positions", format!("{bad:?}")));
    }

    let walkers = topo.ue_group(UeGroup::A);
    let riders = topo.ue_group(UeGroup::B);
    // 在写入任何轨迹之前完成全部校验与生成
    let path = if riders.is_empty() {
        None
    } else {
        Some(WaypointPath::new(&plan.waypoints)?)
    };
    let mut walks = Vec::with_capacity(walkers.len());
    for (i, &ue) in walkers.iter().enumerate() {
        let start = random_position(
            &plan.walk.bounds,
            derive_seed(plan.seed, i as u64, STREAM_INITIAL_POSITION),
        );
        let walk = RandomWalk::generate(
            start,
            plan.walk,
            derive_seed(plan.seed, i as u64, STREAM_WALK),
            plan.horizon,
        )?;
        debug!(?ue, ?start, legs = walk.legs(), "生成随机游走轨迹");
        walks.push((ue, walk));
    }

    for (&ap, &pos) in topo.access_points.iter().zip(&plan.ap_positions) {
        table.set(ap, Trajectory::Static(pos));
    }
    for (ue, walk) in walks {
        table.set(ue, Trajectory::BoundedRandomWalk(walk));
    }
    if let Some(path) = path {
        for &ue in riders {
            table.set(ue, Trajectory::WaypointSequence(path.clone()));
        }
    }

    info!(
        walkers = walkers.len(),
        riders = riders.len(),
        "🚶 移动性分配完成"
    );
    Ok(())
}

fn random_position(bounds: &Bounds, seed: u64) -> Position {
    let mut rng = Rng::with_seed(seed);
    Position::new(
        bounds.x_min + rng.f64() * (bounds.x_max - bounds.x_min),
        bounds.y_min + rng.f64() * (bounds.y_max - bounds.y_min),
        0.0,
    )
}

/// 由场景种子、节点序号和流编号派生独立种子
pub fn derive_seed(seed: u64, index: u64, stream: u64) -> u64 {
    mix64(seed ^ mix64(index.wrapping_mul(0x9E3779B97F4A7C15) ^ stream))
}

/// 一个简单、确定性的 64-bit mixing（splitmix64）。
fn mix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
