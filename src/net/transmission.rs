//! 链路发送与到达
//!
//! 每条链路两段流水：
//! 1. `schedule_arrival`：包进入出口队列；若入队前队列为空，启动发送周期，
//!    在 `now + 序列化时延` 调度 `Transmit`；
//! 2. `Transmit`：弹出队首，在 `now + 传播时延` 调度 `Arrive`；队列非空则
//!    立即开始下一个包的序列化（背靠背，没有空隙）；
//! 3. `Arrive`：包进入目的端入口队列，通知目的设备有新工作。
//!
//! 出口与入口队列在每次入队、出队后都上报一次占用。

use super::id::{LinkId, NodeId};
use super::network::Network;
use super::packet::Packet;
use super::processing::Process;
use super::world_bridge::with_network;
use crate::metrics::{EntityId, MetricKind};
use crate::sim::{Event, Simulator, World};
use tracing::{debug, error, trace, warn};

/// 事件：链路完成队首包的序列化
#[derive(Debug)]
pub struct Transmit {
    pub link: LinkId,
}

impl Event for Transmit {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Transmit { link } = *self;
        with_network(world, |net| net.on_transmit(link, sim));
    }
}

/// 事件：包经过传播时延到达链路的目的端
#[derive(Debug)]
pub struct Arrive {
    pub link: LinkId,
    pub pkt: Packet,
}

impl Event for Arrive {
    #[tracing::instrument(level = "trace", skip(self, sim, world), fields(pkt_id = self.pkt.id, link = ?self.link))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Arrive { link, pkt } = *self;
        with_network(world, |net| net.on_arrive(link, pkt, sim));
    }
}

impl Network {
    /// 把包放到链路的出口队列。溢出即丢包（由重传机制恢复）。
    #[tracing::instrument(level = "debug", skip(self, pkt, sim), fields(pkt_id = pkt.id))]
    pub fn schedule_arrival(&mut self, link_id: LinkId, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        let Some(link) = self.links.get_mut(link_id) else {
            Network::missing("link", link_id.0);
            return;
        };
        match link.push_egress(pkt) {
            Ok(was_empty) => {
                let occupancy = link.egress_occupancy();
                if was_empty {
                    if let Some(tx) = link.head_tx_time() {
                        trace!(tx_time = ?tx, "启动发送周期");
                        sim.schedule(now + tx, Transmit { link: link_id });
                    }
                }
                self.record(
                    MetricKind::QueueSize,
                    EntityId::Link(link_id),
                    now,
                    occupancy.bytes() as f64,
                );
            }
            Err(pkt) => {
                warn!(pkt = %pkt, occupancy = %link.egress_occupancy(), "出口缓冲区溢出，丢包");
                self.stats.egress_overflow_drops += 1;
                self.record_drop(&pkt, None, EntityId::Link(link_id), now);
            }
        }
    }

    pub(crate) fn on_transmit(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let now = sim.now();
        let Some(link) = self.links.get_mut(link_id) else {
            Network::missing("link", link_id.0);
            return;
        };
        let pkt = match link.pop_egress() {
            Ok(pkt) => pkt,
            Err(err) => {
                error!(link = ?link_id, %err, "Transmit 时出口队列为空");
                return;
            }
        };
        let arrive = now + link.delay;
        let next_tx = link.head_tx_time();
        let occupancy = link.egress_occupancy();
        trace!(pkt_id = pkt.id, arrive = ?arrive, "包离开出口队列");
        sim.schedule(arrive, Arrive { link: link_id, pkt });
        if let Some(tx) = next_tx {
            sim.schedule(now + tx, Transmit { link: link_id });
        }
        self.record(
            MetricKind::QueueSize,
            EntityId::Link(link_id),
            now,
            occupancy.bytes() as f64,
        );
    }

    pub(crate) fn on_arrive(&mut self, link_id: LinkId, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        let Some(link) = self.links.get_mut(link_id) else {
            Network::missing("link", link_id.0);
            return;
        };
        let to = link.to;
        if let Err(pkt) = link.push_ingress(pkt) {
            warn!(pkt = %pkt, link = ?link_id, "入口缓冲区溢出，丢包");
            self.stats.ingress_overflow_drops += 1;
            self.record_drop(&pkt, None, EntityId::Link(link_id), now);
            return;
        }
        let occupancy = link.ingress_occupancy();
        self.record(
            MetricKind::IngressQueueSize,
            EntityId::Link(link_id),
            now,
            occupancy.bytes() as f64,
        );
        self.notify_about_arrival(to, sim);
    }

    /// 设备有一份新的入口工作；必要时启动处理周期。
    pub(crate) fn notify_about_arrival(&mut self, node: NodeId, sim: &mut Simulator) {
        let now = sim.now();
        let Some(device) = self.node_mut(node) else {
            Network::missing("node", node.0);
            return;
        };
        if let Some(at) = device.process_gate().notify_arrival(now) {
            debug!(?node, at = ?at, "调度设备处理周期");
            sim.schedule(at, Process { node });
        }
    }
}
