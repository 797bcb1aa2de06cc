//! 连接与多路径负载均衡（MPLB）
//!
//! 连接把若干条同一发送端/接收端之间的流组织在一起，由 MPLB 决定下一份
//! 数据交给哪条流发送。

mod connection;
mod mplb;
mod round_robin;

pub use connection::{AddDataToConnection, Connection, StartConnection};
pub use mplb::{FlowSample, Mplb, MplbKind};
pub use round_robin::RoundRobinMplb;
