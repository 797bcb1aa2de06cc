//! 链路端口上的包队列
//!
//! 每条链路两端各有一个有界、按字节计量的 FIFO：源端出口队列与目的端入口队列。

use crate::sim::Size;

mod packet_queue;

pub use packet_queue::PacketQueue;

/// 默认包大小（用于把“包个数”换算为缓冲区字节数）。
pub const DEFAULT_PKT_BYTES: u64 = 1500;

pub fn mem_from_pkt(pkts: u64) -> Size {
    Size(pkts.saturating_mul(DEFAULT_PKT_BYTES))
}
