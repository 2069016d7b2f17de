//! 流量调度
//!
//! 两类流量分别面向两个互不相交的 UE 子集，来自两个不同的远端主机：
//! - 批量（bulk）：A 组 UE，远端主机 0，可靠传输（TCP），从启动一直发送到停止
//! - 突发（web）：B 组 UE，远端主机 1，不可靠传输（UDP），On/Off 恒定速率
//!
//! 每条流的接收器严格早于源启动。所有流先整体校验，再安装与调度。

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::onoff::{OnOffApp, OnOffParams, OnOffTick};
use super::sink::StartSink;
use crate::error::ConfigError;
use crate::monitor::{FlowDirection, FlowLabel};
use crate::net::{Endpoint, FlowKey, NetWorld, NodeId, Protocol};
use crate::proto::tcp::{TcpConfig, TcpConn, TcpStart};
use crate::sim::{SimTime, Simulator};
use crate::topo::{LteTopology, UeGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficClass {
    Bulk,
    Web,
}

impl TrafficClass {
    pub fn as_str(self) -> &'static str {
        match self {
            TrafficClass::Bulk => "bulk",
            TrafficClass::Web => "web",
        }
    }
}

/// 源的种类与参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceKind {
    /// 可靠批量传输；`max_bytes` 为 `None` 表示不限量
    Bulk { max_bytes: Option<u64> },
    /// 不可靠 On/Off 突发流量
    Bursty(OnOffParams),
}

impl SourceKind {
    pub fn protocol(&self) -> Protocol {
        match self {
            SourceKind::Bulk { .. } => Protocol::Tcp,
            SourceKind::Bursty(_) => Protocol::Udp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowSpec {
    pub name: String,
    pub class: TrafficClass,
    pub origin: NodeId,
    pub destination: NodeId,
    pub port: u16,
    pub source: SourceKind,
    pub sink_start: SimTime,
    pub start: SimTime,
    pub stop: SimTime,
}

impl FlowSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sink_start >= self.start {
            return Err(ConfigError::SinkNotBeforeSource {
                flow: self.name.clone(),
                sink_start: self.sink_start.as_secs_f64(),
                start: self.start.as_secs_f64(),
            });
        }
        if let SourceKind::Bursty(p) = &self.source {
            p.validate()?;
        }
        Ok(())
    }
}

/// 一类流量的公共参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassPlan {
    pub port: u16,
    /// 远端主机下标
    pub remote_host: usize,
    pub sink_start: SimTime,
    pub start: SimTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficPlan {
    pub bulk: ClassPlan,
    pub bulk_max_bytes: Option<u64>,
    pub web: ClassPlan,
    pub burst: OnOffParams,
    /// 所有源的停止时刻
    pub stop: SimTime,
}

impl Default for TrafficPlan {
    fn default() -> Self {
        Self {
            bulk: ClassPlan {
                port: 9000,
                remote_host: 0,
                sink_start: SimTime::from_millis(500),
                start: SimTime::from_secs(1),
            },
            bulk_max_bytes: None,
            web: ClassPlan {
                port: 8000,
                remote_host: 1,
                sink_start: SimTime::from_millis(1500),
                start: SimTime::from_secs(2),
            },
            burst: OnOffParams::default(),
            stop: SimTime::from_secs(20),
        }
    }
}

impl TrafficPlan {
    /// 按分组规则展开为具体的流。某类对应的 UE 子集非空而远端主机不存在时报错。
    pub fn flows(&self, topo: &LteTopology, world: &NetWorld) -> Result<Vec<FlowSpec>, ConfigError> {
        let classes = [
            (
                TrafficClass::Bulk,
                UeGroup::A,
                &self.bulk,
                SourceKind::Bulk {
                    max_bytes: self.bulk_max_bytes,
                },
            ),
            (
                TrafficClass::Web,
                UeGroup::B,
                &self.web,
                SourceKind::Bursty(self.burst),
            ),
        ];

        let mut out = Vec::new();
        for (class, group, plan, source) in classes {
            let ues = topo.ue_group(group);
            if ues.is_empty() {
                continue;
            }
            let origin = *topo.remote_hosts.get(plan.remote_host).ok_or(
                ConfigError::MissingRemoteHost {
                    class: class.as_str(),
                    index: plan.remote_host,
                    count: topo.remote_hosts.len(),
                },
            )?;
            for &ue in ues {
                out.push(FlowSpec {
                    name: format!("{}-{}", class.as_str(), world.net.node(ue).name()),
                    class,
                    origin,
                    destination: ue,
                    port: plan.port,
                    source,
                    sink_start: plan.sink_start,
                    start: plan.start,
                    stop: self.stop,
                });
            }
        }
        Ok(out)
    }
}

/// 已调度的流
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledFlow {
    pub spec: FlowSpec,
    pub key: FlowKey,
}

/// 为每条流安装接收器与源，调度启动事件，并在流统计中登记。
#[tracing::instrument(skip_all, fields(flows = flows.len()))]
pub fn schedule_traffic(
    flows: &[FlowSpec],
    tcp: &TcpConfig,
    world: &mut NetWorld,
    sim: &mut Simulator,
) -> Result<Vec<ScheduledFlow>, ConfigError> {
    let mut resolved = Vec::with_capacity(flows.len());
    for f in flows {
        f.validate()?;
        let net = &world.net;
        let src_addr = net.primary_address(f.origin).ok_or_else(|| {
            ConfigError::invalid(
                "flow",
                format!("{}: `{}` has no address", f.name, net.node(f.origin).name()),
            )
        })?;
        let dst_addr = world
            .radio
            .bearer(f.destination)
            .map(|b| b.ue_addr)
            .or_else(|| net.primary_address(f.destination))
            .ok_or_else(|| ConfigError::NotAttached {
                node: net.node(f.destination).name().to_string(),
            })?;
        resolved.push((f, src_addr, dst_addr));
    }

    let mut out = Vec::with_capacity(resolved.len());
    for (f, src_addr, dst_addr) in resolved {
        let protocol = f.source.protocol();
        let src = Endpoint {
            node: f.origin,
            addr: src_addr,
            port: world.net.node_mut(f.origin).alloc_port(),
        };
        let dst = Endpoint {
            node: f.destination,
            addr: dst_addr,
            port: f.port,
        };
        let key = FlowKey {
            src: src.addr,
            dst: dst.addr,
            protocol,
            src_port: src.port,
            dst_port: dst.port,
        };

        world.net.sinks.install(dst.node, dst.port, protocol);
        sim.schedule(
            f.sink_start,
            StartSink {
                node: dst.node,
                port: dst.port,
                protocol,
            },
        );

        let label = |direction, name: String| FlowLabel {
            name,
            class: f.class,
            direction,
            start: f.start,
            stop: f.stop,
        };
        world
            .net
            .monitor
            .register(key, label(FlowDirection::Forward, f.name.clone()));

        match f.source {
            SourceKind::Bulk { max_bytes } => {
                world.net.monitor.register(
                    key.reversed(),
                    label(FlowDirection::Ack, format!("{}/ack", f.name)),
                );
                let id = world.net.tcp.alloc_id();
                let conn = TcpConn::new(id, src, dst, max_bytes, f.stop, tcp.clone());
                sim.schedule(f.start, TcpStart { conn });
            }
            SourceKind::Bursty(params) => {
                let app = OnOffApp {
                    src,
                    dst,
                    params,
                    start: f.start,
                    stop: f.stop,
                };
                let first = app.next_send_at(f.start);
                if first < f.stop {
                    sim.schedule(first, OnOffTick { app });
                }
            }
        }
        debug!(flow = %f.name, %key, start = ?f.start, stop = ?f.stop, "调度流");
        out.push(ScheduledFlow {
            spec: f.clone(),
            key,
        });
    }

    info!(scheduled = out.len(), "🚦 流量调度完成");
    Ok(out)
}
