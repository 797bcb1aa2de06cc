//! 链路类型
//!
//! 单向链路：源端出口队列 -> 传播时延 -> 目的端入口队列。
//! 链路只保存两端设备的 id；事件驱动的发送/到达流程见 `transmission.rs`。

use super::id::{LinkId, NodeId};
use super::packet::Packet;
use crate::error::SimError;
use crate::queue::{PacketQueue, mem_from_pkt};
use crate::sim::{SimTime, Size, Speed};
use serde::{Deserialize, Serialize};

/// 链路参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub speed: Speed,
    pub delay: SimTime,
    pub egress_buffer: Size,
    pub ingress_buffer: Size,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            speed: Speed::default(),
            delay: SimTime::ZERO,
            egress_buffer: Size::from_kib(4),
            ingress_buffer: Size::from_kib(4),
        }
    }
}

impl LinkConfig {
    /// 按包个数（MTU 1500B）设置两端缓冲区。
    pub fn with_buffer_pkts(mut self, pkts: u64) -> Self {
        self.egress_buffer = mem_from_pkt(pkts);
        self.ingress_buffer = mem_from_pkt(pkts);
        self
    }
}

/// 网络链路
#[derive(Debug)]
pub struct Link {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    pub speed: Speed,
    pub delay: SimTime,
    pub(crate) egress: PacketQueue,
    pub(crate) ingress: PacketQueue,
}

impl Link {
    pub fn new(id: LinkId, from: NodeId, to: NodeId, cfg: LinkConfig) -> Self {
        Self {
            id,
            from,
            to,
            speed: cfg.speed,
            delay: cfg.delay,
            egress: PacketQueue::new(cfg.egress_buffer),
            ingress: PacketQueue::new(cfg.ingress_buffer),
        }
    }

    /// 序列化时延
    pub fn tx_time(&self, size: Size) -> SimTime {
        self.speed.transmission_time(size)
    }

    /// 放入出口队列；成功时返回放入前队列是否为空（为空则需要启动发送周期）。
    pub(crate) fn push_egress(&mut self, pkt: Packet) -> Result<bool, Packet> {
        let was_empty = self.egress.is_empty();
        self.egress.push(pkt)?;
        Ok(was_empty)
    }

    pub(crate) fn pop_egress(&mut self) -> Result<Packet, SimError> {
        self.egress.pop()
    }

    /// 丢弃两侧队列中的所有包（发送/到达事件已不存在）。
    pub(crate) fn flush(&mut self) -> usize {
        self.egress.clear() + self.ingress.clear()
    }

    /// 出口队首包的序列化时延
    pub(crate) fn head_tx_time(&self) -> Option<SimTime> {
        self.egress.front().ok().map(|p| self.tx_time(p.size))
    }

    pub(crate) fn push_ingress(&mut self, pkt: Packet) -> Result<(), Packet> {
        self.ingress.push(pkt)
    }

    /// 目的设备从入口队列取包；队列为空属于正常情况。
    pub fn get_packet(&mut self) -> Option<Packet> {
        if self.ingress.is_empty() {
            return None;
        }
        self.ingress.pop().ok()
    }

    pub fn egress_occupancy(&self) -> Size {
        self.egress.occupancy()
    }

    pub fn ingress_occupancy(&self) -> Size {
        self.ingress.occupancy()
    }

    pub fn egress_fill(&self) -> f64 {
        self.egress.fill_ratio()
    }

    pub fn ingress_fill(&self) -> f64 {
        self.ingress.fill_ratio()
    }

    pub fn has_ingress(&self) -> bool {
        !self.ingress.is_empty()
    }
}

/// 按 id 索引的链路注册表；删除后的槽位为 `None`。
#[derive(Debug, Default)]
pub struct LinkTable(Vec<Option<Link>>);

impl LinkTable {
    pub(crate) fn insert(&mut self, from: NodeId, to: NodeId, cfg: LinkConfig) -> LinkId {
        let id = LinkId(self.0.len());
        self.0.push(Some(Link::new(id, from, to, cfg)));
        id
    }

    pub fn get(&self, id: LinkId) -> Option<&Link> {
        self.0.get(id.0).and_then(|l| l.as_ref())
    }

    pub fn get_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.0.get_mut(id.0).and_then(|l| l.as_mut())
    }

    pub(crate) fn remove(&mut self, id: LinkId) -> Option<Link> {
        self.0.get_mut(id.0).and_then(|l| l.take())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.0.iter().flatten()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Link> {
        self.0.iter_mut().flatten()
    }

    /// 已分配的 id 数（含已删除的槽位）
    pub fn capacity(&self) -> usize {
        self.0.len()
    }
}
