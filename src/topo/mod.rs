mod lte;
mod routes;

pub use lte::{
    LteTopology, LteTopologyOpts, RemoteHostLink, REMOTE_HOST_POOL, REMOTE_HOST_PREFIX, S1_POOL,
    S1_PREFIX, S1Link, UE_NETWORK, UeGroup, WiredLinkOpts, build_lte_topology,
};
pub use routes::{RoutingSummary, configure_routes};
