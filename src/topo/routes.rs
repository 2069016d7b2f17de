//! 静态路由配置
//!
//! 在地址确定之后安装：
//! - 每个 UE 一条默认路由，下一跳为网关面向 UE 的地址
//! - 每个远端主机一条到整个 UE 网段的路由，下一跳为其专用链路上网关侧地址
//!
//! 先校验全部前提再安装，失败时不会留下部分路由；重复执行结果不变。

use std::net::Ipv4Addr;

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::net::{IfaceId, Ipv4Net, Network, NodeId, RouteChange};

use super::lte::LteTopology;

/// 一次配置的结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingSummary {
    pub added: usize,
    pub replaced: usize,
    pub unchanged: usize,
}

impl RoutingSummary {
    fn record(&mut self, change: RouteChange) {
        match change {
            RouteChange::Added => self.added += 1,
            RouteChange::Replaced => self.replaced += 1,
            RouteChange::Unchanged => self.unchanged += 1,
        }
    }
}

struct PlannedRoute {
    node: NodeId,
    dest: Ipv4Net,
    next_hop: Ipv4Addr,
    iface: IfaceId,
}

#[tracing::instrument(skip_all, fields(ues = topo.ues.len(), remote_hosts = topo.remote_hosts.len()))]
pub fn configure_routes(
    net: &mut Network,
    topo: &LteTopology,
) -> Result<RoutingSummary, ConfigError> {
    let mut planned = Vec::with_capacity(topo.ues.len() + topo.remote_links.len());

    for &ue in &topo.ues {
        let iface = ue_iface(net, ue, topo.ue_network).ok_or_else(|| ConfigError::NotAttached {
            node: net.node(ue).name().to_string(),
        })?;
        planned.push(PlannedRoute {
            node: ue,
            dest: Ipv4Net::default_route(),
            next_hop: topo.gateway_ue_addr,
            iface,
        });
    }

    for rl in &topo.remote_links {
        let (Some(next_hop), Some(_)) = (rl.gateway_addr, rl.host_addr) else {
            return Err(ConfigError::UndefinedNextHop {
                node: net.node(rl.host).name().to_string(),
            });
        };
        planned.push(PlannedRoute {
            node: rl.host,
            dest: topo.ue_network,
            next_hop,
            iface: rl.host_iface,
        });
    }

    let mut summary = RoutingSummary::default();
    for r in planned {
        let change = net.add_route(r.node, r.dest, Some(r.next_hop), r.iface)?;
        debug!(node = ?r.node, dest = %r.dest, next_hop = %r.next_hop, ?change, "路由");
        summary.record(change);
    }
    info!(?summary, "🧭 静态路由配置完成");
    Ok(summary)
}

/// UE 在 UE 网段中的接口（接入后才存在）
fn ue_iface(net: &Network, ue: NodeId, ue_network: Ipv4Net) -> Option<IfaceId> {
    net.node(ue).ifaces().iter().copied().find(|&i| {
        net.iface(i)
            .addr
            .is_some_and(|a| ue_network.contains(a.local))
    })
}
