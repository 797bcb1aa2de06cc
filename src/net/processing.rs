//! 设备处理周期与主机发送周期
//!
//! `Process`：每次从下一个入链路（round-robin）取一个包处理，处理完后在
//! 一个单位时间后再来，直到重调度闸门报告空闲。
//! `SendData`：主机从网卡缓冲取一个包，按路由表放到出链路上。

use super::id::NodeId;
use super::network::Network;
use super::node::{Disposition, Node};
use super::packet::Packet;
use super::world_bridge::with_network;
use crate::metrics::{EntityId, MetricKind};
use crate::sim::{Event, SimTime, Simulator, World};
use tracing::{debug, trace, warn};

/// 处理一份工作的固定耗时
pub const PROCESSING_UNIT: SimTime = SimTime(1);

/// 事件：设备处理一份入口工作
#[derive(Debug)]
pub struct Process {
    pub node: NodeId,
}

impl Event for Process {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Process { node } = *self;
        with_network(world, |net| {
            let delay = net.process_device(node, sim);
            if delay != SimTime::ZERO {
                sim.schedule_in(delay, Process { node });
            }
        });
    }
}

/// 事件：主机从网卡缓冲发送一个包
#[derive(Debug)]
pub struct SendData {
    pub node: NodeId,
}

impl Event for SendData {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SendData { node } = *self;
        with_network(world, |net| {
            let delay = net.send_from_host(node, sim);
            if delay != SimTime::ZERO {
                sim.schedule_in(delay, SendData { node });
            }
        });
    }
}

impl Network {
    /// 处理一个单位的工作；返回 0 表示设备空闲，否则为下一次处理的延迟。
    #[tracing::instrument(level = "trace", skip(self, sim))]
    pub(crate) fn process_device(&mut self, id: NodeId, sim: &mut Simulator) -> SimTime {
        let now = sim.now();
        let Network { nodes, links, .. } = &mut *self;
        let Some(node) = nodes.get_mut(id.0).and_then(|n| n.as_mut()) else {
            Network::missing("node", id.0);
            return SimTime::ZERO;
        };

        let Some(inlink) = node.routing_mut().next_inlink() else {
            warn!(node = ?id, "设备没有入链路");
            node.process_gate().reset();
            return SimTime::ZERO;
        };
        let Some(link) = links.get_mut(inlink) else {
            node.routing_mut().forget_link(inlink);
            return PROCESSING_UNIT;
        };
        let ingress_fill = link.ingress_fill();
        let Some(pkt) = link.get_packet() else {
            // 轮空：仍然消耗这个 round-robin 位置
            let any_queued = node
                .routing()
                .inlinks()
                .iter()
                .any(|l| links.get(*l).is_some_and(|l| l.has_ingress()));
            if !any_queued {
                // 剩余计数对应的包已随链路一起消失
                node.process_gate().reset();
                return SimTime::ZERO;
            }
            trace!(node = ?id, link = ?inlink, "入链路为空，轮空");
            return PROCESSING_UNIT;
        };

        let ingress_left = link.ingress_occupancy();

        let disposition = node.on_packet(pkt, ingress_fill, now, links);
        let idle = node.process_gate().notify_finish(now + PROCESSING_UNIT);
        self.record(
            MetricKind::IngressQueueSize,
            EntityId::Link(inlink),
            now,
            ingress_left.bytes() as f64,
        );
        self.dispatch(id, disposition, sim);

        if idle {
            SimTime::ZERO
        } else {
            PROCESSING_UNIT
        }
    }

    fn dispatch(&mut self, node: NodeId, disposition: Disposition, sim: &mut Simulator) {
        match disposition {
            Disposition::Deliver(pkt) => {
                self.on_delivered(pkt.size);
                self.deliver_to_flow(pkt, sim);
            }
            Disposition::Forward(link, pkt) => self.schedule_arrival(link, pkt, sim),
            Disposition::Drop(pkt, reason) => {
                debug!(?node, ?reason, pkt = %pkt, "设备丢包");
                self.record_drop(&pkt, Some(reason), EntityId::Node(node), sim.now());
            }
        }
    }

    /// 把到达目的主机的包交给所属流；ACK 确认了新数据时通知连接。
    pub(crate) fn deliver_to_flow(&mut self, pkt: Packet, sim: &mut Simulator) {
        let Some(fid) = pkt.flow else {
            warn!(pkt = %pkt, "包没有所属流");
            return;
        };
        match self.with_flow(fid, |flow, net| flow.update(pkt, sim, net)) {
            None => Network::missing("flow", fid.0),
            Some(Some(conn)) => self.connection_update(conn, fid, sim),
            Some(None) => {}
        }
    }

    /// 主机把包放进网卡缓冲；必要时启动发送周期。
    pub fn enqueue_packet(&mut self, host: NodeId, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        let Some(h) = self.host_mut(host) else {
            Network::missing("host", host.0);
            return;
        };
        if let Some(at) = h.enqueue_nic(pkt, now) {
            sim.schedule(at, SendData { node: host });
        }
    }

    /// 发送一个单位；返回值含义同 `process_device`。
    pub(crate) fn send_from_host(&mut self, id: NodeId, sim: &mut Simulator) -> SimTime {
        let now = sim.now();
        let Some(host) = self.host_mut(id) else {
            Network::missing("host", id.0);
            return SimTime::ZERO;
        };
        let Some(mut pkt) = host.pop_nic() else {
            warn!(host = ?id, "网卡缓冲为空");
            host.send_gate().reset();
            return SimTime::ZERO;
        };
        let route = host.routing_mut().get_link_to_destination(&pkt, now);
        let idle = host.send_gate().notify_finish(now + PROCESSING_UNIT);

        match route {
            Some((link, hash)) => {
                pkt.path_hash = hash;
                trace!(host = ?id, pkt = %pkt, ?link, "主机发出包");
                self.schedule_arrival(link, pkt, sim);
            }
            None => {
                warn!(host = ?id, dst = ?pkt.dst, "没有出链路可发送");
                self.record_drop(&pkt, Some(super::node::DropReason::NoRoute), EntityId::Node(id), now);
            }
        }

        if idle {
            SimTime::ZERO
        } else {
            PROCESSING_UNIT
        }
    }
}
