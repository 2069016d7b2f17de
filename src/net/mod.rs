//! IPv4 网络层
//!
//! 节点、接口、点到点链路（有线或无线承载）、最长前缀匹配路由表，
//! 以及逐跳转发与出口排队。

mod addr;
mod events;
mod id;
mod link;
mod net_world;
mod network;
mod node;
mod packet;
mod routing;
mod stats;
mod transport;

pub use addr::{AddressPlan, HostAllocator, Ipv4Net, SubnetAllocator};
pub use events::{DeliverPacket, LinkReady};
pub use id::{IfaceId, LinkId, NodeId};
pub use link::{Link, LinkKind};
pub(crate) use link::tx_time;
pub use net_world::NetWorld;
pub use network::{Connection, Network};
pub use node::{FIRST_EPHEMERAL_PORT, IfaceAddr, Interface, Node, NodeRole};
pub use packet::{DEFAULT_TTL, Endpoint, FlowKey, Packet, Protocol};
pub use routing::{Route, RouteChange, RouteOrigin, RoutingTable};
pub use stats::{DropReason, Stats};
pub use transport::{TcpSegment, Transport};
