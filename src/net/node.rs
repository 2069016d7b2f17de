//! 节点与接口
//!
//! 节点只保存角色、接口下标和自己的路由表；收发逻辑在 `Network` 中统一处理。

use std::net::Ipv4Addr;

use serde::Serialize;

use super::addr::Ipv4Net;
use super::id::{IfaceId, LinkId, NodeId};
use super::routing::RoutingTable;

/// 节点角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// 核心网网关（PGW）
    Gateway,
    RemoteHost,
    /// 基站（eNB）
    AccessPoint,
    Ue,
}

/// 第一个临时端口
pub const FIRST_EPHEMERAL_PORT: u16 = 49153;

#[derive(Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    role: NodeRole,
    pub(crate) ifaces: Vec<IfaceId>,
    pub(crate) routes: RoutingTable,
    next_port: u16,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            ifaces: Vec::new(),
            routes: RoutingTable::default(),
            next_port: FIRST_EPHEMERAL_PORT,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn ifaces(&self) -> &[IfaceId] {
        &self.ifaces
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// 分配一个本地临时端口（用尽后回绕）
    pub fn alloc_port(&mut self) -> u16 {
        let p = self.next_port;
        self.next_port = match self.next_port.checked_add(1) {
            Some(n) => n,
            None => FIRST_EPHEMERAL_PORT,
        };
        p
    }
}

/// 接口地址：本地地址 + 所在子网
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfaceAddr {
    pub local: Ipv4Addr,
    pub net: Ipv4Net,
}

/// 接口：属于唯一的节点与唯一的链路。
///
/// 基站侧的无线承载接口不编号（`addr == None`）。
#[derive(Debug, Clone)]
pub struct Interface {
    pub id: IfaceId,
    pub node: NodeId,
    pub link: LinkId,
    pub addr: Option<IfaceAddr>,
}
