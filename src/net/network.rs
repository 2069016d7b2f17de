//! 网络拓扑管理
//!
//! 节点、链路、接口都存放在 `Network` 拥有的表中（arena），交叉引用只用下标。
//! 同时负责逐跳转发、链路串行化/传播时延、出口排队与丢包，并把收发事实
//! 报告给流监视器。

use std::net::Ipv4Addr;

use super::addr::Ipv4Net;
use super::events::{DeliverPacket, LinkReady};
use super::id::{IfaceId, LinkId, NodeId};
use super::link::{Link, LinkKind, tx_time};
use super::node::{IfaceAddr, Interface, Node, NodeRole};
use super::packet::{DEFAULT_TTL, Packet, Protocol};
use super::routing::{Route, RouteChange, RouteOrigin};
use super::stats::{DropReason, Stats};
use super::transport::Transport;
use crate::app::SinkTable;
use crate::error::ConfigError;
use crate::mobility::MobilityTable;
use crate::monitor::FlowMonitor;
use crate::proto::tcp::TcpStack;
use crate::sim::{SimTime, Simulator};
use tracing::{debug, trace, warn};

/// `connect` 的结果：链路及两端接口
#[derive(Debug, Clone, Copy)]
pub struct Connection {
    pub link: LinkId,
    pub a_iface: IfaceId,
    pub b_iface: IfaceId,
}

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Node>,
    links: Vec<Link>,
    ifaces: Vec<Interface>,
    next_pkt_id: u64,
    pub stats: Stats,
    pub monitor: FlowMonitor,
    pub mobility: MobilityTable,
    pub tcp: TcpStack,
    pub sinks: SinkTable,
}

impl Network {
    /// 添加节点
    pub fn add_node(&mut self, name: impl Into<String>, role: NodeRole) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name, role));
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn iface(&self, id: IfaceId) -> &Interface {
        &self.ifaces[id.0]
    }

    pub fn ifaces(&self) -> &[Interface] {
        &self.ifaces
    }

    /// 连接两个节点（双向点到点链路），并在两端各创建一个接口
    pub fn connect(
        &mut self,
        a: NodeId,
        b: NodeId,
        kind: LinkKind,
        bandwidth_bps: u64,
        delay: SimTime,
        queue_bytes: u64,
    ) -> Connection {
        let link = LinkId(self.links.len());
        self.links
            .push(Link::new(a, b, kind, bandwidth_bps, delay, queue_bytes));
        let a_iface = self.add_iface(a, link);
        let b_iface = self.add_iface(b, link);
        debug!(?link, ?a, ?b, bandwidth_bps, ?delay, "🔗 创建链路");
        Connection {
            link,
            a_iface,
            b_iface,
        }
    }

    fn add_iface(&mut self, node: NodeId, link: LinkId) -> IfaceId {
        let id = IfaceId(self.ifaces.len());
        self.ifaces.push(Interface {
            id,
            node,
            link,
            addr: None,
        });
        self.nodes[node.0].ifaces.push(id);
        id
    }

    /// 记录链路拥有的地址段
    pub fn set_link_subnet(&mut self, link: LinkId, subnet: Ipv4Net) {
        self.links[link.0].subnet = Some(subnet);
    }

    /// 给接口配置地址，并安装对应的直连路由
    pub fn assign_address(
        &mut self,
        iface: IfaceId,
        local: Ipv4Addr,
        net: Ipv4Net,
    ) -> Result<(), ConfigError> {
        if !net.contains(local) {
            return Err(ConfigError::invalid(
                "iface_address",
                format!("{local} is outside {net}"),
            ));
        }
        let itf = &mut self.ifaces[iface.0];
        itf.addr = Some(IfaceAddr { local, net });
        let node = itf.node;
        self.nodes[node.0].routes.install(Route {
            dest: net,
            next_hop: None,
            iface,
            origin: RouteOrigin::Connected,
        });
        trace!(?node, ?iface, %local, %net, "配置接口地址");
        Ok(())
    }

    /// 安装静态路由。下一跳必须位于出接口所在子网内。
    pub fn add_route(
        &mut self,
        node: NodeId,
        dest: Ipv4Net,
        next_hop: Option<Ipv4Addr>,
        iface: IfaceId,
    ) -> Result<RouteChange, ConfigError> {
        let itf = &self.ifaces[iface.0];
        if itf.node != node {
            return Err(ConfigError::invalid(
                "route_iface",
                format!(
                    "interface {} does not belong to `{}`",
                    iface.0,
                    self.nodes[node.0].name()
                ),
            ));
        }
        if let Some(nh) = next_hop {
            let on_link = itf.addr.map(|a| a.net.contains(nh)).unwrap_or(false);
            if !on_link {
                return Err(ConfigError::NextHopOffLink {
                    node: self.nodes[node.0].name().to_string(),
                    iface: iface.0,
                    next_hop: nh,
                });
            }
        }
        let change = self.nodes[node.0].routes.install(Route {
            dest,
            next_hop,
            iface,
            origin: RouteOrigin::Static,
        });
        debug!(?node, %dest, ?next_hop, ?iface, ?change, "安装路由");
        Ok(change)
    }

    /// 安装默认路由
    pub fn set_default_route(
        &mut self,
        node: NodeId,
        gateway: Ipv4Addr,
        iface: IfaceId,
    ) -> Result<RouteChange, ConfigError> {
        self.add_route(node, Ipv4Net::default_route(), Some(gateway), iface)
    }

    /// 节点的所有已配置地址
    pub fn addresses_of(&self, node: NodeId) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.nodes[node.0]
            .ifaces
            .iter()
            .filter_map(|i| self.ifaces[i.0].addr.map(|a| a.local))
    }

    /// 节点的第一个地址
    pub fn primary_address(&self, node: NodeId) -> Option<Ipv4Addr> {
        self.addresses_of(node).next()
    }

    pub fn owns_address(&self, node: NodeId, ip: Ipv4Addr) -> bool {
        self.addresses_of(node).any(|a| a == ip)
    }

    /// 创建数据包（`sent_at` 在发送时填写）
    #[allow(clippy::too_many_arguments)]
    pub fn make_packet(
        &mut self,
        src: Ipv4Addr,
        src_port: u16,
        dst: Ipv4Addr,
        dst_port: u16,
        protocol: Protocol,
        size_bytes: u32,
        transport: Transport,
    ) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet {
            id,
            src,
            dst,
            src_port,
            dst_port,
            protocol,
            size_bytes,
            ttl: DEFAULT_TTL,
            sent_at: SimTime::ZERO,
            transport,
        }
    }

    /// 由 `from` 节点发出一个新包（源端）
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, from = ?from))]
    pub fn send(&mut self, from: NodeId, mut pkt: Packet, sim: &mut Simulator) {
        pkt.sent_at = sim.now();
        self.stats.sent_pkts += 1;
        self.stats.sent_bytes += pkt.size_bytes as u64;
        self.monitor.on_tx(&pkt, sim.now());
        self.forward_from(from, pkt, sim);
    }

    /// 包到达节点 `to`
    pub fn deliver(&mut self, to: NodeId, pkt: Packet, sim: &mut Simulator) {
        trace!(pkt_id = pkt.id, ?to, "📬 包到达节点");
        self.forward_from(to, pkt, sim);
    }

    /// 在 `at` 处理一个包：本地地址则交付，否则查表转发
    pub fn forward_from(&mut self, at: NodeId, mut pkt: Packet, sim: &mut Simulator) {
        if self.owns_address(at, pkt.dst) {
            self.on_delivered(at, pkt, sim);
            return;
        }
        if pkt.ttl == 0 {
            self.drop_packet(at, pkt, DropReason::TtlExpired, sim.now());
            return;
        }
        pkt.ttl -= 1;

        let Some(route) = self.nodes[at.0].routes.lookup(pkt.dst).copied() else {
            self.drop_packet(at, pkt, DropReason::NoRoute, sim.now());
            return;
        };
        let link_id = self.ifaces[route.iface.0].link;
        trace!(pkt_id = pkt.id, ?at, dst = %pkt.dst, ?link_id, "查表转发");
        self.transmit(link_id, at, pkt, sim);
    }

    /// 放到链路 `from` 方向：空闲则立即发送，否则排队（满则丢弃）
    fn transmit(&mut self, link_id: LinkId, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        let Some(dir) = link.dir_from(from) else {
            warn!(?link_id, ?from, "节点不在链路上，丢弃");
            self.drop_packet(from, pkt, DropReason::NoRoute, sim.now());
            return;
        };
        if !link.dirs[dir].busy {
            self.start_tx(link_id, dir, pkt, sim);
            return;
        }
        if let Err(pkt) = link.dirs[dir].queue.enqueue(pkt) {
            debug!(?link_id, dir, "队列已满，丢包");
            self.drop_packet(from, pkt, DropReason::QueueFull, sim.now());
        }
    }

    fn start_tx(&mut self, link_id: LinkId, dir: usize, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        let rate = self.link_rate(link_id, now);
        let link = &mut self.links[link_id.0];
        link.dirs[dir].busy = true;
        let depart = now.saturating_add(tx_time(pkt.size_bytes, rate));
        let arrive = depart.saturating_add(link.delay);
        let to = link.receiver(dir);
        trace!(pkt_id = pkt.id, ?link_id, rate, ?depart, ?arrive, "开始发送");
        sim.schedule(depart, LinkReady { link_id, dir });
        sim.schedule(arrive, DeliverPacket { to, pkt });
    }

    /// 链路一个方向完成一次串行化：取出队首继续发送
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, dir: usize, sim: &mut Simulator) {
        let d = &mut self.links[link_id.0].dirs[dir];
        d.busy = false;
        if let Some(pkt) = d.queue.dequeue() {
            self.start_tx(link_id, dir, pkt, sim);
        }
    }

    /// 链路当前速率：有线为固定值，无线承载由当前 UE/基站距离决定
    pub fn link_rate(&self, link_id: LinkId, now: SimTime) -> u64 {
        let link = &self.links[link_id.0];
        match link.kind {
            LinkKind::Wired => link.bandwidth_bps,
            LinkKind::RadioBearer { ue, ap, model } => {
                match (
                    self.mobility.position_of(ue, now),
                    self.mobility.position_of(ap, now),
                ) {
                    (Some(u), Some(a)) => model.rate_at(u.distance(&a)),
                    _ => link.bandwidth_bps,
                }
            }
        }
    }

    /// 数据包送达目的地时的处理
    fn on_delivered(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;
        self.monitor.on_rx(&pkt, now);
        trace!(pkt_id = pkt.id, ?at, "✅ 数据包送达目的地");

        match pkt.transport {
            Transport::Udp => {
                self.sinks
                    .on_receive(at, pkt.dst_port, Protocol::Udp, pkt.size_bytes as u64, now);
            }
            Transport::Tcp { conn, seg } => {
                // 规避同时借用 `self` 与 `self.tcp`
                let mut tcp = std::mem::take(&mut self.tcp);
                tcp.on_tcp_segment(conn, at, seg, sim, self);
                self.tcp = tcp;
            }
        }
    }

    fn drop_packet(&mut self, at: NodeId, pkt: Packet, reason: DropReason, now: SimTime) {
        self.stats.dropped_pkts += 1;
        self.stats.dropped_bytes += pkt.size_bytes as u64;
        debug!(pkt_id = pkt.id, ?at, ?reason, "❌ 丢包");
        self.monitor.on_drop(&pkt, reason, now);
    }
}
