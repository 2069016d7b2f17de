//! LTE/EPC 拓扑构建
//!
//! 拓扑结构：
//! - 远端主机 i <-> 网关（PGW），独占地址段 `1.(i+1).0.0/16`
//! - 基站 j <-> 网关（S1），地址段为 `10.0.0.0/8` 中第 j 个 `/30`
//! - UE 只创建节点；无线承载在接入（attach）时建立，地址取自 `7.0.0.0/8`
//!
//! 远端主机地址段按序号严格递增分配，与 UE 网段、S1 网段互不重叠；
//! 所有地址段登记在 `AddressPlan` 中，任何重叠都会报错。

use std::net::Ipv4Addr;

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::net::{
    AddressPlan, HostAllocator, IfaceId, Ipv4Net, LinkId, LinkKind, NetWorld, NodeId, NodeRole,
    SubnetAllocator,
};
use crate::sim::SimTime;

/// 远端主机地址池
pub const REMOTE_HOST_POOL: &str = "1.0.0.0/8";
/// 远端主机链路前缀长度
pub const REMOTE_HOST_PREFIX: u8 = 16;
/// UE 网段
pub const UE_NETWORK: &str = "7.0.0.0/8";
/// S1 链路地址池
pub const S1_POOL: &str = "10.0.0.0/8";
/// S1 链路前缀长度
pub const S1_PREFIX: u8 = 30;

/// 有线链路参数
#[derive(Debug, Clone, Copy)]
pub struct WiredLinkOpts {
    pub rate_bps: u64,
    pub delay: SimTime,
    pub queue_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct LteTopologyOpts {
    pub remote_hosts: usize,
    pub access_points: usize,
    pub ues: usize,
    /// 远端主机 <-> 网关
    pub backhaul: WiredLinkOpts,
    /// 基站 <-> 网关
    pub s1: WiredLinkOpts,
}

impl Default for LteTopologyOpts {
    fn default() -> Self {
        Self {
            remote_hosts: 2,
            access_points: 4,
            ues: 10,
            backhaul: WiredLinkOpts {
                rate_bps: 1_000_000_000,
                delay: SimTime::from_millis(2),
                queue_bytes: crate::queue::bytes_for_packets(100),
            },
            s1: WiredLinkOpts {
                rate_bps: 10_000_000_000,
                delay: SimTime::ZERO,
                queue_bytes: crate::queue::bytes_for_packets(100),
            },
        }
    }
}

/// 远端主机专用链路
#[derive(Debug, Clone)]
pub struct RemoteHostLink {
    pub host: NodeId,
    pub link: LinkId,
    pub subnet: Ipv4Net,
    pub gateway_iface: IfaceId,
    pub host_iface: IfaceId,
    /// 网关侧地址（路由配置时作为远端主机的下一跳）
    pub gateway_addr: Option<Ipv4Addr>,
    pub host_addr: Option<Ipv4Addr>,
}

/// 基站与网关之间的 S1 链路
#[derive(Debug, Clone, Copy)]
pub struct S1Link {
    pub ap: NodeId,
    pub link: LinkId,
    pub subnet: Ipv4Net,
    pub gateway_iface: IfaceId,
    pub ap_iface: IfaceId,
    pub gateway_addr: Ipv4Addr,
    pub ap_addr: Ipv4Addr,
}

/// UE 分组：A 组为前一半（向上取整），B 组为其余
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UeGroup {
    A,
    B,
}

#[derive(Debug, Clone)]
pub struct LteTopology {
    pub gateway: NodeId,
    pub remote_hosts: Vec<NodeId>,
    pub remote_links: Vec<RemoteHostLink>,
    pub access_points: Vec<NodeId>,
    pub s1_links: Vec<S1Link>,
    pub ues: Vec<NodeId>,
    pub ue_network: Ipv4Net,
    /// 网关面向 UE 的地址，在构建时缓存，路由配置直接使用
    pub gateway_ue_addr: Ipv4Addr,
    pub address_plan: AddressPlan,
}

impl LteTopology {
    /// A/B 分组的分界下标
    pub fn group_split(&self) -> usize {
        self.ues.len().div_ceil(2)
    }

    pub fn ue_group(&self, group: UeGroup) -> &[NodeId] {
        let split = self.group_split();
        match group {
            UeGroup::A => &self.ues[..split],
            UeGroup::B => &self.ues[split..],
        }
    }

    pub fn ue_index(&self, node: NodeId) -> Option<usize> {
        self.ues.iter().position(|&u| u == node)
    }
}

/// 构建 LTE 拓扑。参数不合法时在创建任何节点之前返回错误。
#[tracing::instrument(skip(world), fields(remote_hosts = opts.remote_hosts, aps = opts.access_points, ues = opts.ues))]
pub fn build_lte_topology(
    world: &mut NetWorld,
    opts: &LteTopologyOpts,
) -> Result<LteTopology, ConfigError> {
    // 第 0 个 /16 不使用：远端主机 i 使用第 i+1 个地址块
    let mut host_blocks = SubnetAllocator::new(REMOTE_HOST_POOL.parse()?, REMOTE_HOST_PREFIX, 1)?;
    let mut s1_blocks = SubnetAllocator::new(S1_POOL.parse()?, S1_PREFIX, 0)?;
    let ue_network: Ipv4Net = UE_NETWORK.parse()?;
    check_capacity(opts.remote_hosts, &host_blocks)?;
    check_capacity(opts.access_points, &s1_blocks)?;
    // UE 网段中网关占用一个地址
    let ue_capacity = (ue_network.size() - 3) as usize;
    if opts.ues > ue_capacity {
        return Err(ConfigError::AddressSpaceExhausted {
            requested: opts.ues,
            available: ue_capacity,
            base: ue_network.network(),
        });
    }

    let mut plan = AddressPlan::default();
    plan.reserve(ue_network, "ue-network")?;

    let net = &mut world.net;
    let gateway = net.add_node("pgw", NodeRole::Gateway);
    let gateway_ue_addr = world.radio.attach_core(gateway, ue_network)?;

    let mut remote_hosts = Vec::with_capacity(opts.remote_hosts);
    let mut remote_links = Vec::with_capacity(opts.remote_hosts);
    for i in 0..opts.remote_hosts {
        let host = net.add_node(format!("remote-host-{i}"), NodeRole::RemoteHost);
        let c = net.connect(
            gateway,
            host,
            LinkKind::Wired,
            opts.backhaul.rate_bps,
            opts.backhaul.delay,
            opts.backhaul.queue_bytes,
        );
        let subnet = next_block(&mut host_blocks, opts.remote_hosts)?;
        plan.reserve(subnet, format!("remote-host-{i}"))?;
        net.set_link_subnet(c.link, subnet);

        let mut hosts = HostAllocator::new(subnet);
        let gateway_addr = hosts.next_host();
        let host_addr = hosts.next_host();
        if let Some(a) = gateway_addr {
            net.assign_address(c.a_iface, a, subnet)?;
        }
        if let Some(a) = host_addr {
            net.assign_address(c.b_iface, a, subnet)?;
        }
        debug!(?host, %subnet, ?gateway_addr, ?host_addr, "远端主机链路");

        remote_hosts.push(host);
        remote_links.push(RemoteHostLink {
            host,
            link: c.link,
            subnet,
            gateway_iface: c.a_iface,
            host_iface: c.b_iface,
            gateway_addr,
            host_addr,
        });
    }

    let mut access_points = Vec::with_capacity(opts.access_points);
    let mut s1_links = Vec::with_capacity(opts.access_points);
    for j in 0..opts.access_points {
        let ap = net.add_node(format!("enb-{j}"), NodeRole::AccessPoint);
        let c = net.connect(
            gateway,
            ap,
            LinkKind::Wired,
            opts.s1.rate_bps,
            opts.s1.delay,
            opts.s1.queue_bytes,
        );
        let subnet = next_block(&mut s1_blocks, opts.access_points)?;
        plan.reserve(subnet, format!("s1-{j}"))?;
        net.set_link_subnet(c.link, subnet);

        let mut hosts = HostAllocator::new(subnet);
        let (Some(gateway_addr), Some(ap_addr)) = (hosts.next_host(), hosts.next_host()) else {
            return Err(ConfigError::invalid(
                "s1_prefix",
                format!("{subnet} has fewer than two host addresses"),
            ));
        };
        net.assign_address(c.a_iface, gateway_addr, subnet)?;
        net.assign_address(c.b_iface, ap_addr, subnet)?;

        let s1 = S1Link {
            ap,
            link: c.link,
            subnet,
            gateway_iface: c.a_iface,
            ap_iface: c.b_iface,
            gateway_addr,
            ap_addr,
        };
        world.radio.register_backhaul(s1);
        access_points.push(ap);
        s1_links.push(s1);
    }

    let ues = (0..opts.ues)
        .map(|k| net.add_node(format!("ue-{k}"), NodeRole::Ue))
        .collect::<Vec<_>>();

    info!(
        nodes = net.nodes().len(),
        links = net.links().len(),
        ranges = plan.len(),
        "🏗️  拓扑构建完成"
    );

    Ok(LteTopology {
        gateway,
        remote_hosts,
        remote_links,
        access_points,
        s1_links,
        ues,
        ue_network,
        gateway_ue_addr,
        address_plan: plan,
    })
}

fn check_capacity(requested: usize, blocks: &SubnetAllocator) -> Result<(), ConfigError> {
    let available = blocks.remaining();
    if requested as u64 > available {
        return Err(ConfigError::AddressSpaceExhausted {
            requested,
            available: available as usize,
            base: blocks.pool().network(),
        });
    }
    Ok(())
}

fn next_block(blocks: &mut SubnetAllocator, requested: usize) -> Result<Ipv4Net, ConfigError> {
    blocks
        .next_subnet()
        .ok_or_else(|| ConfigError::AddressSpaceExhausted {
            requested,
            available: 0,
            base: blocks.pool().network(),
        })
}
