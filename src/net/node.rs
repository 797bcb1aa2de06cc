//! 节点类型
//!
//! 定义网络节点，包括节点 trait 和具体实现（主机、交换机）。
//!
//! 节点本身不触碰调度器：`on_packet` 只决定一个包的去向（交付、转发、
//! 丢弃），由 `Network` 在放回节点之后再执行相应动作。这样主机把包交给
//! 流、流又立刻往同一台主机的网卡里塞 ACK 时，不会出现重叠的可变借用。

use std::collections::VecDeque;
use std::fmt::Debug;

use super::ecn::{Ecn, EcnConfig};
use super::gate::SchedulingGate;
use super::hasher::HasherKind;
use super::id::{LinkId, NodeId};
use super::link::LinkTable;
use super::packet::Packet;
use super::routing::RoutingModule;
use crate::error::SimError;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Host,
    Switch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    TtlExpired,
    NoRoute,
}

/// 设备对一个包的处理结果
#[derive(Debug)]
pub enum Disposition {
    /// 到达目的主机，交给所属流
    Deliver(Packet),
    /// 从指定出链路转发
    Forward(LinkId, Packet),
    Drop(Packet, DropReason),
}

/// 节点接口
pub trait Node: Send + Debug {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    fn kind(&self) -> NodeKind;

    fn routing(&self) -> &RoutingModule;

    fn routing_mut(&mut self) -> &mut RoutingModule;

    /// 处理周期的重调度闸门
    fn process_gate(&mut self) -> &mut SchedulingGate;

    /// 处理一个从入链路取出的包。`ingress_fill` 为取包前该入口队列的填充率。
    fn on_packet(
        &mut self,
        pkt: Packet,
        ingress_fill: f64,
        now: SimTime,
        links: &LinkTable,
    ) -> Disposition;

    fn as_host(&self) -> Option<&Host> {
        None
    }

    fn as_host_mut(&mut self) -> Option<&mut Host> {
        None
    }

    fn as_switch(&self) -> Option<&Switch> {
        None
    }
}

fn route(routing: &mut RoutingModule, mut pkt: Packet, now: SimTime) -> Disposition {
    match routing.get_link_to_destination(&pkt, now) {
        Some((link, hash)) => {
            pkt.path_hash = hash;
            Disposition::Forward(link, pkt)
        }
        None => Disposition::Drop(pkt, DropReason::NoRoute),
    }
}

/// 主机节点
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
    routing: RoutingModule,
    process_gate: SchedulingGate,
    send_gate: SchedulingGate,
    /// 出口网卡缓冲（无界 FIFO）
    nic: VecDeque<Packet>,
    received: u64,
}

impl Host {
    /// 创建新主机
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            routing: RoutingModule::new(id),
            process_gate: SchedulingGate::default(),
            send_gate: SchedulingGate::default(),
            nic: VecDeque::new(),
            received: 0,
        }
    }

    /// 放入网卡缓冲；需要启动发送周期时返回调度时间。
    pub(crate) fn enqueue_nic(&mut self, pkt: Packet, now: SimTime) -> Option<SimTime> {
        trace!(host = ?self.id, pkt = %pkt, "包进入网卡缓冲");
        self.nic.push_back(pkt);
        self.send_gate.notify_arrival(now)
    }

    pub(crate) fn pop_nic(&mut self) -> Option<Packet> {
        self.nic.pop_front()
    }

    pub(crate) fn send_gate(&mut self) -> &mut SchedulingGate {
        &mut self.send_gate
    }

    /// 丢弃网卡缓冲并复位发送闸门
    pub(crate) fn flush_nic(&mut self) -> usize {
        let n = self.nic.len();
        self.nic.clear();
        self.send_gate.reset();
        n
    }

    pub fn nic_len(&self) -> usize {
        self.nic.len()
    }

    /// 发往本机的包数
    pub fn received(&self) -> u64 {
        self.received
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Host
    }

    fn routing(&self) -> &RoutingModule {
        &self.routing
    }

    fn routing_mut(&mut self) -> &mut RoutingModule {
        &mut self.routing
    }

    fn process_gate(&mut self) -> &mut SchedulingGate {
        &mut self.process_gate
    }

    #[tracing::instrument(level = "debug", skip(self, _links), fields(node_name = %self.name, pkt_id = pkt.id))]
    fn on_packet(
        &mut self,
        pkt: Packet,
        _ingress_fill: f64,
        now: SimTime,
        _links: &LinkTable,
    ) -> Disposition {
        if pkt.dst == self.id {
            debug!("🖥️  已到达目的主机");
            self.received += 1;
            return Disposition::Deliver(pkt);
        }
        warn!(dst = ?pkt.dst, "包到达非目的主机，按路由表继续转发");
        route(&mut self.routing, pkt, now)
    }

    fn as_host(&self) -> Option<&Host> {
        Some(self)
    }

    fn as_host_mut(&mut self) -> Option<&mut Host> {
        Some(self)
    }
}

/// 交换机参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    #[serde(default)]
    pub ecn: Option<EcnConfig>,
    #[serde(default)]
    pub hasher: HasherKind,
}

/// 交换机节点：TTL 检查、选路、ECN 标记，本身不保存包。
#[derive(Debug)]
pub struct Switch {
    id: NodeId,
    name: String,
    routing: RoutingModule,
    process_gate: SchedulingGate,
    ecn: Option<Ecn>,
    forwarded: u64,
    dropped: u64,
    marked: u64,
}

impl Switch {
    /// 创建新交换机
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            routing: RoutingModule::new(id),
            process_gate: SchedulingGate::default(),
            ecn: None,
            forwarded: 0,
            dropped: 0,
            marked: 0,
        }
    }

    pub fn with_config(
        id: NodeId,
        name: impl Into<String>,
        cfg: &SwitchConfig,
        seed: u64,
    ) -> Result<Self, SimError> {
        let mut sw = Self::new(id, name);
        sw.routing.set_hasher(cfg.hasher.build(id, seed));
        if let Some(ecn) = cfg.ecn {
            sw.ecn = Some(Ecn::from_config(ecn, seed ^ (id.0 as u64).rotate_left(29))?);
        }
        Ok(sw)
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// 被打上 CE 标记的包数
    pub fn marked(&self) -> u64 {
        self.marked
    }
}

impl Node for Switch {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Switch
    }

    fn routing(&self) -> &RoutingModule {
        &self.routing
    }

    fn routing_mut(&mut self) -> &mut RoutingModule {
        &mut self.routing
    }

    fn process_gate(&mut self) -> &mut SchedulingGate {
        &mut self.process_gate
    }

    #[tracing::instrument(level = "debug", skip(self, links), fields(node_name = %self.name, pkt_id = pkt.id))]
    fn on_packet(
        &mut self,
        mut pkt: Packet,
        ingress_fill: f64,
        now: SimTime,
        links: &LinkTable,
    ) -> Disposition {
        debug!("🔀 Switch 处理数据包");
        if pkt.ttl == 0 {
            warn!(pkt = %pkt, "TTL 耗尽，丢弃");
            self.dropped += 1;
            return Disposition::Drop(pkt, DropReason::TtlExpired);
        }
        pkt.ttl -= 1;

        let Some((out, hash)) = self.routing.get_link_to_destination(&pkt, now) else {
            warn!(dst = ?pkt.dst, "没有到目的节点的路由，丢弃");
            self.dropped += 1;
            return Disposition::Drop(pkt, DropReason::NoRoute);
        };
        pkt.path_hash = hash;

        if let Some(ecn) = self.ecn.as_mut() {
            if pkt.ecn_capable {
                let egress_fill = links.get(out).map(|l| l.egress_fill()).unwrap_or(0.0);
                // 两侧独立判定，任一命中即标记
                let ingress_mark = ecn.get_congestion_mark(ingress_fill);
                let egress_mark = ecn.get_congestion_mark(egress_fill);
                if ingress_mark || egress_mark {
                    if !pkt.congestion_experienced {
                        self.marked += 1;
                    }
                    pkt.congestion_experienced = true;
                    trace!(ingress_fill, egress_fill, "ECN 标记");
                }
            }
        }

        self.forwarded += 1;
        Disposition::Forward(out, pkt)
    }

    fn as_switch(&self) -> Option<&Switch> {
        Some(self)
    }
}
