//! 统计信息
//!
//! 定义网络仿真统计数据结构。

use serde::Serialize;

/// 网络统计信息
#[derive(Debug, Default, Clone, Serialize)]
pub struct Stats {
    /// 到达目的主机的包
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
    pub ttl_drops: u64,
    pub no_route_drops: u64,
    pub egress_overflow_drops: u64,
    pub ingress_overflow_drops: u64,
}
