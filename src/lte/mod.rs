//! 无线接入网：承载速率模型、设备登记与接入、UE 关联、无线环境图

mod association;
mod radio;
mod rate;
mod rem;

pub use association::{Association, AssociationPolicy, RoundRobin, associate_all};
pub use radio::{Bearer, RadioAccess, RadioConfig};
pub use rate::BearerRateModel;
pub use rem::{RemConfig, RemPoint, compute_rem, write_rem, write_rem_to_path};
