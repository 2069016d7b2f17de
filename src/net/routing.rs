//! 静态路由表
//!
//! 每个节点一张表，按最长前缀匹配查找出接口与下一跳。
//! 安装是幂等的：同一目的前缀只保留一条，重复安装相同路由不产生任何变化。

use std::net::Ipv4Addr;

use super::addr::Ipv4Net;
use super::id::IfaceId;

/// 路由来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOrigin {
    /// 接口配置地址时自动生成的直连路由
    Connected,
    /// 显式安装的静态路由
    Static,
}

/// 一条路由：(目的网络, 掩码, 下一跳, 出接口)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub dest: Ipv4Net,
    /// `None` 表示直连（目的地址即下一跳）
    pub next_hop: Option<Ipv4Addr>,
    pub iface: IfaceId,
    pub origin: RouteOrigin,
}

/// 安装结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChange {
    Added,
    Replaced,
    Unchanged,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    /// 按前缀长度降序、网络地址升序排列
    routes: Vec<Route>,
}

impl RoutingTable {
    pub fn install(&mut self, route: Route) -> RouteChange {
        match self.routes.iter_mut().find(|r| r.dest == route.dest) {
            Some(existing) if *existing == route => RouteChange::Unchanged,
            Some(existing) => {
                *existing = route;
                RouteChange::Replaced
            }
            None => {
                let pos = self.routes.partition_point(|r| {
                    (std::cmp::Reverse(r.dest.prefix_len()), r.dest.network())
                        < (std::cmp::Reverse(route.dest.prefix_len()), route.dest.network())
                });
                self.routes.insert(pos, route);
                RouteChange::Added
            }
        }
    }

    /// 最长前缀匹配
    pub fn lookup(&self, dst: Ipv4Addr) -> Option<&Route> {
        self.routes.iter().find(|r| r.dest.contains(dst))
    }

    pub fn default_route(&self) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.dest == Ipv4Net::default_route())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
