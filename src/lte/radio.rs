//! 无线接入：基站/UE 设备登记、承载建立与 EPC 路由
//!
//! 接入（attach）时：
//! - 在 UE 与基站之间建立一条无线承载链路
//! - 从 UE 网段分配 UE 地址
//! - 网关安装到 UE 的 `/32` 主机路由（经基站的 S1 链路）
//! - 基站安装到 UE 的主机路由（经承载）与默认路由（经 S1 链路）
//!
//! UE 的默认路由由路由配置阶段安装。

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::mobility::Position;
use crate::net::{HostAllocator, IfaceId, Ipv4Net, LinkId, LinkKind, Network, NodeId};
use crate::sim::SimTime;
use crate::topo::S1Link;

use super::rate::BearerRateModel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub bearer: BearerRateModel,
    /// 空口单向时延（秒）
    pub bearer_delay_s: f64,
    /// 承载每个方向的队列容量（字节）
    pub bearer_queue_bytes: u64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            bearer: BearerRateModel::default(),
            bearer_delay_s: 0.001,
            bearer_queue_bytes: crate::queue::bytes_for_packets(200),
        }
    }
}

impl RadioConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bearer.validate()?;
        if !(self.bearer_delay_s.is_finite() && self.bearer_delay_s >= 0.0) {
            return Err(ConfigError::invalid(
                "bearer_delay_s",
                format!("{} is not a non-negative duration", self.bearer_delay_s),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Core {
    gateway: NodeId,
    ue_network: Ipv4Net,
    gateway_ue_addr: Ipv4Addr,
}

/// 已建立的承载
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bearer {
    pub ap: NodeId,
    pub link: LinkId,
    pub ue_iface: IfaceId,
    pub ap_iface: IfaceId,
    pub ue_addr: Ipv4Addr,
}

#[derive(Debug, Default)]
pub struct RadioAccess {
    config: RadioConfig,
    core: Option<Core>,
    ue_addrs: Option<HostAllocator>,
    backhaul: HashMap<NodeId, S1Link>,
    access_points: BTreeMap<NodeId, Position>,
    ues: BTreeMap<NodeId, Position>,
    bearers: HashMap<NodeId, Bearer>,
}

impl RadioAccess {
    pub fn new(config: RadioConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// 绑定核心网网关与 UE 网段，返回网关面向 UE 的地址（网段内第一个主机地址）
    pub fn attach_core(
        &mut self,
        gateway: NodeId,
        ue_network: Ipv4Net,
    ) -> Result<Ipv4Addr, ConfigError> {
        let mut hosts = HostAllocator::new(ue_network);
        let gateway_ue_addr = hosts
            .next_host()
            .ok_or(ConfigError::AddressSpaceExhausted {
                requested: 1,
                available: 0,
                base: ue_network.network(),
            })?;
        self.core = Some(Core {
            gateway,
            ue_network,
            gateway_ue_addr,
        });
        self.ue_addrs = Some(hosts);
        Ok(gateway_ue_addr)
    }

    pub fn gateway_ue_addr(&self) -> Option<Ipv4Addr> {
        self.core.map(|c| c.gateway_ue_addr)
    }

    pub fn register_backhaul(&mut self, s1: S1Link) {
        self.backhaul.insert(s1.ap, s1);
    }

    pub fn install_access_point(&mut self, node: NodeId, position: Position) {
        self.access_points.insert(node, position);
    }

    pub fn install_ue(&mut self, node: NodeId, position: Position) {
        self.ues.insert(node, position);
    }

    /// 已登记基站及其安装位置
    pub fn access_points(&self) -> impl Iterator<Item = (NodeId, Position)> + '_ {
        self.access_points.iter().map(|(&n, &p)| (n, p))
    }

    pub fn bearer(&self, ue: NodeId) -> Option<&Bearer> {
        self.bearers.get(&ue)
    }

    pub fn associated_access_point(&self, ue: NodeId) -> Option<NodeId> {
        self.bearers.get(&ue).map(|b| b.ap)
    }

    /// 将 UE 接入基站，返回 UE 侧接口。重复接入同一基站直接返回已有接口。
    pub fn attach(
        &mut self,
        net: &mut Network,
        ue: NodeId,
        ap: NodeId,
    ) -> Result<IfaceId, ConfigError> {
        let core = self
            .core
            .ok_or_else(|| ConfigError::invalid("radio", "core network is not attached"))?;
        if !self.ues.contains_key(&ue) {
            return Err(ConfigError::invalid(
                "attach",
                format!("`{}` has no UE device installed", net.node(ue).name()),
            ));
        }
        if !self.access_points.contains_key(&ap) {
            return Err(ConfigError::invalid(
                "attach",
                format!("`{}` has no access point device installed", net.node(ap).name()),
            ));
        }
        let s1 = *self.backhaul.get(&ap).ok_or_else(|| {
            ConfigError::invalid(
                "attach",
                format!("`{}` has no S1 link to the gateway", net.node(ap).name()),
            )
        })?;
        if let Some(b) = self.bearers.get(&ue) {
            if b.ap == ap {
                return Ok(b.ue_iface);
            }
            return Err(ConfigError::invalid(
                "attach",
                format!(
                    "`{}` is already attached to `{}`",
                    net.node(ue).name(),
                    net.node(b.ap).name()
                ),
            ));
        }

        let ue_addr = self
            .ue_addrs
            .as_mut()
            .and_then(HostAllocator::next_host)
            .ok_or(ConfigError::AddressSpaceExhausted {
                requested: self.bearers.len() + 1,
                available: self.bearers.len(),
                base: core.ue_network.network(),
            })?;

        let model = self.config.bearer;
        let c = net.connect(
            ue,
            ap,
            LinkKind::RadioBearer { ue, ap, model },
            model.peak_rate_bps,
            SimTime::from_secs_f64(self.config.bearer_delay_s),
            self.config.bearer_queue_bytes,
        );
        net.assign_address(c.a_iface, ue_addr, core.ue_network)?;

        let host = Ipv4Net::host(ue_addr);
        net.add_route(core.gateway, host, Some(s1.ap_addr), s1.gateway_iface)?;
        net.add_route(ap, host, None, c.b_iface)?;
        net.set_default_route(ap, s1.gateway_addr, s1.ap_iface)?;

        debug!(?ue, ?ap, %ue_addr, link = ?c.link, "📶 建立承载");
        self.bearers.insert(
            ue,
            Bearer {
                ap,
                link: c.link,
                ue_iface: c.a_iface,
                ap_iface: c.b_iface,
                ue_addr,
            },
        );
        if self.bearers.len() == self.ues.len() {
            info!(bearers = self.bearers.len(), "所有 UE 已接入");
        }
        Ok(c.a_iface)
    }
}
