//! 错误类型
//!
//! 所有配置/搭建阶段的问题都以 `ConfigError` 返回，在事件队列开始运行之前暴露。

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::net::Ipv4Net;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("expected {expected} access point positions, got {got}")]
    ApPositionCount { expected: usize, got: usize },
    #[error("{requested} address blocks requested but only {available} are available under {base}")]
    AddressSpaceExhausted {
        requested: usize,
        available: usize,
        base: Ipv4Addr,
    },
    #[error("address range {new} overlaps already allocated range {existing}")]
    AddressCollision { new: Ipv4Net, existing: Ipv4Net },
    #[error("`{node}` has no address on its gateway link, refusing to install a route to an undefined next hop")]
    UndefinedNextHop { node: String },
    #[error("UE `{node}` has no interface in the UE network; attach it before configuring routes")]
    NotAttached { node: String },
    #[error("next hop {next_hop} is not reachable through interface {iface} of `{node}`")]
    NextHopOffLink {
        node: String,
        iface: usize,
        next_hop: Ipv4Addr,
    },
    #[error("waypoint schedule is empty")]
    EmptyWaypoints,
    #[error(
        "waypoint times must be strictly increasing at nanosecond resolution (waypoint {index}: {prev}s -> {next}s)"
    )]
    WaypointsNotIncreasing { index: usize, prev: f64, next: f64 },
    #[error("flow `{flow}`: sink starts at {sink_start}s, which is not strictly before the source start {start}s")]
    SinkNotBeforeSource {
        flow: String,
        sink_start: f64,
        start: f64,
    },
    #[error("traffic class `{class}` needs remote host {index}, but only {count} remote hosts exist")]
    MissingRemoteHost {
        class: &'static str,
        index: usize,
        count: usize,
    },
    #[error("{ues} UEs configured but there are no access points to associate with")]
    NoAccessPoints { ues: usize },
    #[error("`{name}` would produce {count} {what}, more than the limit of {limit}")]
    TooFineResolution {
        name: &'static str,
        what: &'static str,
        count: u64,
        limit: u64,
    },
    #[error("invalid `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("failed to read config `{path}`")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// 写出统计报告 / REM 文件时的错误
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report")]
    Json(#[from] serde_json::Error),
}
