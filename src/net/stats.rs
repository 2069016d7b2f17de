//! 统计信息
//!
//! 全网粗粒度计数；按流的统计在 `monitor` 模块。

use serde::Serialize;

/// 丢包原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    NoRoute,
    TtlExpired,
    QueueFull,
}

/// 网络统计信息
#[derive(Debug, Default, Clone)]
pub struct Stats {
    pub sent_pkts: u64,
    pub sent_bytes: u64,
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
}
