//! 应用层：接收器、On/Off 源与流量调度

mod onoff;
mod sink;
mod traffic;

pub use onoff::{OnOffApp, OnOffParams, OnOffTick, UDP_HEADER_BYTES};
pub use sink::{Sink, SinkTable, StartSink};
pub use traffic::{
    ClassPlan, FlowSpec, ScheduledFlow, SourceKind, TrafficClass, TrafficPlan, schedule_traffic,
};
