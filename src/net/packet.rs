//! 数据包类型
//!
//! 包是可自由复制的值；不携带真实负载，只携带仿真所需的头部信息。

use super::flags::PacketFlags;
use super::id::{FlowId, NodeId};
use crate::sim::{SimTime, Size};
use std::fmt;

/// 网络数据包
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// 全网唯一的包 id（便于日志追踪）
    pub id: u64,
    /// 流内序号
    pub packet_num: u64,
    pub size: Size,
    /// 所属流（非拥有引用）
    pub flow: Option<FlowId>,
    pub src: NodeId,
    pub dst: NodeId,
    pub generated_time: SimTime,
    /// 发送时间；ACK 回显对应数据包的发送时间
    pub sent_time: SimTime,
    /// 生成该包时发送端已确认的数据量（用于计算交付速率）
    pub delivered_at_origin: Size,
    pub ttl: u8,
    /// 最近一次路由选择使用的哈希值
    pub path_hash: u32,
    pub ecn_capable: bool,
    pub congestion_experienced: bool,
    pub flags: PacketFlags,
}

impl Packet {
    pub const MAX_TTL: u8 = 31;

    pub fn new(id: u64, src: NodeId, dst: NodeId, size: Size) -> Self {
        Self {
            id,
            packet_num: 0,
            size,
            flow: None,
            src,
            dst,
            generated_time: SimTime::ZERO,
            sent_time: SimTime::ZERO,
            delivered_at_origin: Size::ZERO,
            ttl: Self::MAX_TTL,
            path_hash: 0,
            ecn_capable: false,
            congestion_experienced: false,
            flags: PacketFlags::default(),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[pkt {} num={} {}->{} size={} ttl={} ce={}]",
            self.id,
            self.packet_num,
            self.src.0,
            self.dst.0,
            self.size,
            self.ttl,
            self.congestion_experienced
        )
    }
}
