//! 场景装配
//!
//! 搭建顺序：拓扑 → 移动性 → UE 关联 → 静态路由 → 流量调度。
//! 所有配置错误都在事件队列开始运行之前返回。

use tracing::{info, warn};

use crate::app::{ScheduledFlow, TrafficPlan, schedule_traffic};
use crate::config::ScenarioConfig;
use crate::error::ConfigError;
use crate::lte::{Association, RadioAccess, RemConfig, RemPoint, RoundRobin, associate_all, compute_rem};
use crate::mobility::assign_mobility;
use crate::monitor::{FlowMonitor, FlowMonitorReport};
use crate::net::NetWorld;
use crate::sim::{SimTime, Simulator};
use crate::topo::{LteTopology, RoutingSummary, build_lte_topology, configure_routes};

pub struct Scenario {
    config: ScenarioConfig,
    sim: Simulator,
    world: NetWorld,
    topo: LteTopology,
    associations: Vec<Association>,
    routing: RoutingSummary,
    traffic: TrafficPlan,
    flows: Vec<ScheduledFlow>,
}

impl Scenario {
    #[tracing::instrument(skip_all, fields(aps = config.access_point_count, ues = config.ue_count, seed = config.seed))]
    pub fn build(config: ScenarioConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut sim = Simulator::default();
        let mut world = NetWorld {
            radio: RadioAccess::new(config.radio),
            ..NetWorld::default()
        };
        world.net.monitor = FlowMonitor::new(config.monitor_config());

        let topo = build_lte_topology(&mut world, &config.topology_opts())?;
        assign_mobility(&mut world.net.mobility, &topo, &config.mobility_plan())?;
        let associations = associate_all(&RoundRobin, &topo, &mut world, sim.now())?;
        let routing = configure_routes(&mut world.net, &topo)?;

        let traffic = config.traffic_plan();
        let specs = traffic.flows(&topo, &world)?;
        let flows = schedule_traffic(&specs, &config.tcp_config(), &mut world, &mut sim)?;

        info!(
            nodes = world.net.nodes().len(),
            links = world.net.links().len(),
            flows = flows.len(),
            pending = sim.pending(),
            "🧩 场景搭建完成"
        );
        Ok(Self {
            config,
            sim,
            world,
            topo,
            associations,
            routing,
            traffic,
            flows,
        })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn topology(&self) -> &LteTopology {
        &self.topo
    }

    pub fn world(&self) -> &NetWorld {
        &self.world
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn routing(&self) -> RoutingSummary {
        self.routing
    }

    pub fn traffic(&self) -> &TrafficPlan {
        &self.traffic
    }

    pub fn flows(&self) -> &[ScheduledFlow] {
        &self.flows
    }

    /// 按当前基站位置计算无线环境图
    pub fn rem(&self, cfg: &RemConfig) -> Vec<RemPoint> {
        compute_rem(&self.world.radio, cfg)
    }

    /// 运行到仿真结束时刻
    pub fn run(&mut self) -> SimTime {
        let stop = self.config.sim_duration();
        info!(%stop, "▶️  开始运行仿真");
        self.sim.run_until(stop, &mut self.world);
        self.sim.now()
    }

    /// 丢弃剩余事件并生成流统计报告
    pub fn finish(mut self) -> FlowMonitorReport {
        self.log_queue_drops();
        let cancelled = self.sim.cancel_pending();
        let now = self.sim.now();
        let report = self.world.net.monitor.finalize(now, cancelled);
        info!(
            flows = report.flows.len(),
            unmatched = report.unmatched_flows.len(),
            sent_pkts = self.world.net.stats.sent_pkts,
            dropped_pkts = self.world.net.stats.dropped_pkts,
            "✅ 仿真完成"
        );
        report
    }

    /// 汇总各链路出口队列的丢包
    fn log_queue_drops(&self) {
        let net = &self.world.net;
        let mut total = 0;
        let mut worst = None;
        for (i, link) in net.links().iter().enumerate() {
            for dir in 0..2 {
                let st = link.queue_stats(dir);
                total += st.dropped_pkts;
                if st.dropped_pkts > worst.map_or(0, |(_, _, n)| n) {
                    worst = Some((i, dir, st.dropped_pkts));
                }
            }
        }
        if let Some((i, dir, dropped)) = worst {
            let link = &net.links()[i];
            let from = if dir == 0 { link.a } else { link.b };
            warn!(
                total,
                dropped,
                from = net.node(from).name(),
                to = net.node(link.receiver(dir)).name(),
                "📉 出口队列丢包最多的链路"
            );
        }
    }
}
