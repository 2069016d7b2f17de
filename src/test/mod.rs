mod addressing;
mod mobility;
mod routing_table;
mod sim_time;
mod tcp_rto;
mod traffic;

use crate::config::ScenarioConfig;
use crate::lte::{RadioAccess, RoundRobin, associate_all};
use crate::mobility::assign_mobility;
use crate::net::NetWorld;
use crate::sim::SimTime;
use crate::topo::{LteTopology, LteTopologyOpts, build_lte_topology, configure_routes};

/// 默认配置下的小型世界：拓扑 + 移动性 + 关联（可选路由）
pub(crate) fn lte_world(
    remote_hosts: usize,
    access_points: usize,
    ues: usize,
    with_routes: bool,
) -> (NetWorld, LteTopology) {
    let mut cfg = ScenarioConfig {
        remote_host_count: remote_hosts,
        access_point_count: access_points,
        ue_count: ues,
        ..ScenarioConfig::default()
    };
    cfg.ap_positions.resize(access_points, cfg.ap_positions[0]);

    let mut world = NetWorld {
        radio: RadioAccess::new(cfg.radio),
        ..NetWorld::default()
    };
    let opts = LteTopologyOpts {
        remote_hosts,
        access_points,
        ues,
        ..cfg.topology_opts()
    };
    let topo = build_lte_topology(&mut world, &opts).expect("topology");
    assign_mobility(&mut world.net.mobility, &topo, &cfg.mobility_plan()).expect("mobility");
    associate_all(&RoundRobin, &topo, &mut world, SimTime::ZERO).expect("association");
    if with_routes {
        configure_routes(&mut world.net, &topo).expect("routes");
    }
    (world, topo)
}
