use crate::net::{FlowId, LinkId, NodeId};
use serde::{Deserialize, Serialize};

/// 指标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// RTT 样本（ns）
    Rtt,
    /// 拥塞窗口（包）
    Cwnd,
    /// 交付速率（Gbit/s）
    DeliveryRate,
    /// 链路出口队列占用（字节）
    QueueSize,
    /// 链路入口队列占用（字节）
    IngressQueueSize,
    /// 接收端乱序程度（0..1，EWMA 平滑）
    PacketReordering,
    /// 同一流相邻两个数据包的到达间隔（ns）
    PacketSpacing,
    /// 重传发生时的 RTO（ns）
    Retransmit,
    /// 丢包时的包大小（字节）
    Drop,
}

/// 指标所属实体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityId {
    Node(NodeId),
    Link(LinkId),
    Flow(FlowId),
}

/// 一条采样（JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub metric: MetricKind,
    pub entity: EntityId,
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub value: f64,
}
