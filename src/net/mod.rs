//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件，如节点、链路、数据包和网络拓扑。

// 子模块声明
mod ecn;
mod flags;
mod gate;
mod hasher;
mod id;
mod link;
mod loop_cursor;
mod net_world;
mod network;
mod node;
mod packet;
mod processing;
mod routing;
mod stats;
mod transmission;
mod world_bridge;

// 重新导出公共接口
pub use ecn::{Ecn, EcnConfig};
pub use flags::{FlagManager, PacketFlags};
pub use gate::SchedulingGate;
pub use hasher::{
    AdaptiveFlowletHasher, EcmpHasher, FlowletHasher, HasherKind, PacketHasher, RandomHasher,
    SaltEcmpHasher, SymmetricHasher,
};
pub use id::{ConnId, FlowId, LinkId, NodeId};
pub use link::{Link, LinkConfig, LinkTable};
pub use loop_cursor::LoopCursor;
pub use net_world::NetWorld;
pub use network::Network;
pub use node::{Disposition, DropReason, Host, Node, NodeKind, Switch, SwitchConfig};
pub use packet::Packet;
pub use processing::{PROCESSING_UNIT, Process, SendData};
pub use routing::RoutingModule;
pub use stats::Stats;
pub use transmission::{Arrive, Transmit};
pub(crate) use world_bridge::with_network;
