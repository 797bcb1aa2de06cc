//! 传输层：TCP 流及其统计工具

mod monitor;
mod reordering;
mod stats;
mod tcp;
pub mod tcp_flags;

pub use monitor::PacketNumMonitor;
pub use reordering::PacketReordering;
pub use stats::RttStatistics;
pub use tcp::{AckMode, FlowSummary, SendAtTime, TcpFlow, TcpFlowConfig, Timeout};
