//! UE 与基站的关联
//!
//! 关联策略是一个 trait；默认策略为轮询：UE `i` 接入基站 `i mod M`。

use std::net::Ipv4Addr;

use tracing::{info, instrument};

use crate::error::ConfigError;
use crate::net::{IfaceId, NetWorld, NodeId};
use crate::sim::SimTime;
use crate::topo::LteTopology;

pub trait AssociationPolicy {
    /// 为第 `ue_index` 个 UE 在 `ap_count` 个基站中选择一个（返回基站下标）。
    /// 调用方保证 `ap_count > 0`。
    fn select(&self, ue_index: usize, ap_count: usize) -> usize;

    fn name(&self) -> &'static str;
}

/// 轮询关联
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobin;

impl AssociationPolicy for RoundRobin {
    fn select(&self, ue_index: usize, ap_count: usize) -> usize {
        ue_index % ap_count
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    pub ue: NodeId,
    pub ap: NodeId,
    pub iface: IfaceId,
    pub ue_addr: Ipv4Addr,
    pub established_at: SimTime,
}

/// 登记所有无线设备并按策略把每个 UE 接入一个基站。
///
/// 设备安装位置取自移动性表在 `now` 时刻的位置，因此应在移动性分配之后调用。
#[instrument(skip_all, fields(policy = policy.name()))]
pub fn associate_all(
    policy: &dyn AssociationPolicy,
    topo: &LteTopology,
    world: &mut NetWorld,
    now: SimTime,
) -> Result<Vec<Association>, ConfigError> {
    let ap_count = topo.access_points.len();
    if ap_count == 0 {
        if topo.ues.is_empty() {
            return Ok(Vec::new());
        }
        return Err(ConfigError::NoAccessPoints {
            ues: topo.ues.len(),
        });
    }

    let NetWorld { net, radio } = world;
    let position_of = |node: NodeId| net.mobility.position_of(node, now).unwrap_or_default();
    for &ap in &topo.access_points {
        radio.install_access_point(ap, position_of(ap));
    }
    for &ue in &topo.ues {
        radio.install_ue(ue, position_of(ue));
    }

    let mut out = Vec::with_capacity(topo.ues.len());
    for (i, &ue) in topo.ues.iter().enumerate() {
        let ap = topo.access_points[policy.select(i, ap_count) % ap_count];
        let iface = radio.attach(net, ue, ap)?;
        let ue_addr = net
            .iface(iface)
            .addr
            .map(|a| a.local)
            .unwrap_or(Ipv4Addr::UNSPECIFIED);
        out.push(Association {
            ue,
            ap,
            iface,
            ue_addr,
            established_at: now,
        });
    }
    info!(associations = out.len(), aps = ap_count, "🔗 UE 关联完成");
    Ok(out)
}
