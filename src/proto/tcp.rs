//! TCP 流
//!
//! 一条流同时包含发送端与接收端两半：
//! - 发送端：按拥塞窗口给出发送配额，为每个发出的包挂一个超时定时器，
//!   收到 ACK 后更新 RTT 估计、RTO 与拥塞控制；
//! - 接收端：记录乱序程度，为每个 DATA 包生成 ACK（逐包或累计）。
//!
//! 这是仿真用途的“极简 TCP”：没有握手、窗口通告与选择确认。

use serde::{Deserialize, Serialize};

use super::monitor::PacketNumMonitor;
use super::reordering::PacketReordering;
use super::stats::RttStatistics;
use super::tcp_flags::{self, PacketType};
use crate::cc::{CongestionControl, TcpCc};
use crate::conn::FlowSample;
use crate::error::SimError;
use crate::metrics::{EntityId, MetricKind};
use crate::net::{ConnId, FlowId, Network, NodeId, Packet, with_network};
use crate::sim::{Event, SimTime, Simulator, Size, World, rate_gbps};
use tracing::{debug, error, trace, warn};

/// ACK 方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// 每个 DATA 包确认自己的序号
    #[default]
    Single,
    /// 确认连续收到的前缀（ACK 携带第一个未收到的序号）
    Cumulative,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpFlowConfig {
    pub packet_size: Size,
    pub ack_size: Size,
    pub ecn_capable: bool,
    pub ack_mode: AckMode,
    /// 还没有 RTT 样本时使用的 RTO
    pub initial_rto: SimTime,
    pub max_rto: SimTime,
    /// RTT 估计的 EWMA 系数
    pub rtt_smoothing: f64,
    /// 乱序统计保留的序号个数
    pub reordering_window: usize,
}

impl Default for TcpFlowConfig {
    fn default() -> Self {
        Self {
            packet_size: Size::from_bytes(1500),
            ack_size: Size::from_bytes(1),
            ecn_capable: false,
            ack_mode: AckMode::Single,
            initial_rto: SimTime::from_nanos(2000),
            max_rto: SimTime::from_secs(1),
            rtt_smoothing: RttStatistics::DEFAULT_FACTOR,
            reordering_window: PacketReordering::DEFAULT_WINDOW,
        }
    }
}

/// 流的运行结果（CLI 输出 / 测试断言用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub flow: FlowId,
    pub connection: ConnId,
    pub cc: String,
    pub delivered_bytes: u64,
    pub sent_bytes: u64,
    pub packets_in_flight: u32,
    pub retransmits: u64,
    pub fct_ns: Option<u64>,
    pub cwnd: f64,
    pub mean_rtt_ns: Option<f64>,
    pub rto_ns: u64,
    pub reordering: f64,
}

#[derive(Debug)]
pub struct TcpFlow {
    id: FlowId,
    conn: ConnId,
    sender: NodeId,
    receiver: NodeId,
    cc: TcpCc,
    cfg: TcpFlowConfig,

    // sender
    started_at: Option<SimTime>,
    last_ack_at: SimTime,
    packets_in_flight: u32,
    delivered: Size,
    sent: Size,
    next_packet_num: u64,
    acked: PacketNumMonitor,
    rtt: RttStatistics,
    last_rtt: Option<SimTime>,
    rto: SimTime,
    /// 拿到有效 RTT 样本后 RTO 由估计值决定，超时不再翻倍
    rto_steady: bool,
    retransmits: u64,
    delivery_rate: Option<f64>,

    // receiver
    received: PacketNumMonitor,
    reordering: PacketReordering,
    last_data_at: Option<SimTime>,
}

impl TcpFlow {
    pub fn new(
        id: FlowId,
        conn: ConnId,
        sender: NodeId,
        receiver: NodeId,
        cc: TcpCc,
        cfg: TcpFlowConfig,
    ) -> Result<Self, SimError> {
        if sender == receiver {
            return Err(SimError::invalid("receiver", "flow sender and receiver must differ"));
        }
        if cfg.packet_size.is_zero() {
            return Err(SimError::invalid("packet_size", "must be positive"));
        }
        if cfg.initial_rto == SimTime::ZERO {
            return Err(SimError::invalid("initial_rto", "must be positive"));
        }
        if cfg.max_rto < cfg.initial_rto {
            return Err(SimError::invalid(
                "max_rto",
                format!("{} is below initial_rto {}", cfg.max_rto, cfg.initial_rto),
            ));
        }
        Ok(Self {
            id,
            conn,
            sender,
            receiver,
            cc,
            cfg,
            started_at: None,
            last_ack_at: SimTime::ZERO,
            packets_in_flight: 0,
            delivered: Size::ZERO,
            sent: Size::ZERO,
            next_packet_num: 0,
            acked: PacketNumMonitor::new(),
            rtt: RttStatistics::new(cfg.rtt_smoothing)?,
            last_rtt: None,
            rto: cfg.initial_rto,
            rto_steady: false,
            retransmits: 0,
            delivery_rate: None,
            received: PacketNumMonitor::new(),
            reordering: PacketReordering::new(cfg.rtt_smoothing, cfg.reordering_window)?,
            last_data_at: None,
        })
    }

    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn connection(&self) -> ConnId {
        self.conn
    }

    pub fn sender(&self) -> NodeId {
        self.sender
    }

    pub fn receiver(&self) -> NodeId {
        self.receiver
    }

    pub fn cc(&self) -> &TcpCc {
        &self.cc
    }

    pub fn config(&self) -> &TcpFlowConfig {
        &self.cfg
    }

    pub fn packet_size(&self) -> Size {
        self.cfg.packet_size
    }

    pub fn cwnd(&self) -> f64 {
        self.cc.cwnd()
    }

    pub fn packets_in_flight(&self) -> u32 {
        self.packets_in_flight
    }

    pub fn delivered_data_size(&self) -> Size {
        self.delivered
    }

    pub fn sent_data_size(&self) -> Size {
        self.sent
    }

    pub fn retransmit_count(&self) -> u64 {
        self.retransmits
    }

    pub fn rto(&self) -> SimTime {
        self.rto
    }

    pub fn mean_rtt(&self) -> Option<SimTime> {
        self.rtt.mean().map(SimTime::from_nanos_f64)
    }

    pub fn last_rtt(&self) -> Option<SimTime> {
        self.last_rtt
    }

    pub fn reordering(&self) -> f64 {
        self.reordering.value()
    }

    pub fn is_confirmed(&self, packet_num: u64) -> bool {
        self.acked.is_confirmed(packet_num)
    }

    /// 流完成时间：第一个包发出到最后一个 ACK 到达
    pub fn fct(&self) -> Option<SimTime> {
        self.started_at
            .map(|start| self.last_ack_at.saturating_sub(start))
    }

    /// 当前还能发出的包数：`floor(cwnd) - in_flight`；
    /// 窗口小于 1 且没有在途包时仍允许发一个（由 pacing 控制速率）。
    pub fn sending_quota(&self) -> u32 {
        let cwnd = self.cc.cwnd();
        // f64 -> u32 的 as 转换是饱和的
        let slots = (cwnd + 1e-9).floor() as u32;
        if slots == 0 && self.packets_in_flight == 0 {
            return 1;
        }
        slots.saturating_sub(self.packets_in_flight)
    }

    /// 在途包的定时器与 ACK 都已无法到来，视为放弃，不再重传。
    pub(crate) fn abandon_in_flight(&mut self) {
        if self.packets_in_flight > 0 {
            debug!(flow = ?self.id, abandoned = self.packets_in_flight, "放弃在途包");
        }
        self.packets_in_flight = 0;
    }

    pub fn sample(&self, now: SimTime) -> FlowSample {
        FlowSample {
            ack_recv_time: now,
            last_rtt: self.last_rtt,
            packets_in_flight: self.packets_in_flight,
            delivery_rate_gbps: self.delivery_rate,
            send_quota: self.sending_quota(),
        }
    }

    pub fn summary(&self) -> FlowSummary {
        FlowSummary {
            flow: self.id,
            connection: self.conn,
            cc: self.cc.name().to_string(),
            delivered_bytes: self.delivered.bytes(),
            sent_bytes: self.sent.bytes(),
            packets_in_flight: self.packets_in_flight,
            retransmits: self.retransmits,
            fct_ns: self.fct().map(SimTime::as_nanos),
            cwnd: self.cc.cwnd(),
            mean_rtt_ns: self.rtt.mean(),
            rto_ns: self.rto.as_nanos(),
            reordering: self.reordering.value(),
        }
    }

    /// 发送 `size` 字节（按包大小向上取整成若干个包）。超出配额是调用方错误。
    pub fn send_data(
        &mut self,
        size: Size,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SimError> {
        let pkt_bytes = self.cfg.packet_size.bytes();
        let packets = size.bytes().div_ceil(pkt_bytes);
        let quota = self.sending_quota();
        if packets > quota as u64 {
            return Err(SimError::QuotaExceeded {
                flow: self.id,
                requested: size,
                quota: self.cfg.packet_size.saturating_mul(quota as u64),
            });
        }

        let now = sim.now();
        let pacing = self.cc.pacing_delay();
        for k in 0..packets {
            let num = self.next_packet_num;
            self.next_packet_num += 1;
            let pkt = self.generate_data_packet(num, now, net)?;
            self.packets_in_flight += 1;
            if pacing == SimTime::ZERO {
                self.send_packet_now(pkt, sim, net);
            } else {
                let at = now + pacing.saturating_mul(k + 1);
                trace!(flow = ?self.id, num, at = ?at, "pacing 发送");
                sim.schedule(at, SendAtTime { flow: self.id, pkt });
            }
        }
        Ok(())
    }

    fn generate_data_packet(
        &self,
        num: u64,
        now: SimTime,
        net: &mut Network,
    ) -> Result<Packet, SimError> {
        let mut pkt = Packet::new(net.next_packet_id(), self.sender, self.receiver, self.cfg.packet_size);
        pkt.packet_num = num;
        pkt.flow = Some(self.id);
        pkt.generated_time = now;
        pkt.delivered_at_origin = self.delivered;
        pkt.ecn_capable = self.cfg.ecn_capable;
        tcp_flags::set_type(&mut pkt.flags, PacketType::Data)?;
        if let Some(avg) = self.mean_rtt() {
            tcp_flags::set_avg_rtt(&mut pkt.flags, avg)?;
        }
        Ok(pkt)
    }

    /// 立即把包交给发送主机，并挂上超时定时器。
    pub(crate) fn send_packet_now(&mut self, mut pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        let now = sim.now();
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        pkt.sent_time = now;
        self.sent += pkt.size;
        sim.schedule(
            now + self.rto,
            Timeout {
                flow: self.id,
                packet_num: pkt.packet_num,
            },
        );
        trace!(flow = ?self.id, num = pkt.packet_num, rto = ?self.rto, "发送数据包");
        net.enqueue_packet(self.sender, pkt, sim);
    }

    /// 处理到达本流端点的包。ACK 确认了新数据时返回所属连接，
    /// 由调用方在放回本流之后通知连接。
    #[tracing::instrument(level = "debug", skip(self, sim, net), fields(flow = ?self.id, pkt_id = pkt.id, num = pkt.packet_num))]
    pub fn update(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) -> Option<ConnId> {
        match tcp_flags::packet_type(&pkt.flags) {
            Some(ty) if ty.is_ack() && pkt.dst == self.sender => self.on_ack(ty, pkt, sim, net),
            Some(PacketType::Data) if pkt.dst == self.receiver => {
                if let Err(err) = self.on_data(pkt, sim, net) {
                    error!(%err, "生成 ACK 失败");
                }
                None
            }
            other => {
                warn!(ty = ?other, dst = ?pkt.dst, "包类型与目的端不匹配，忽略");
                None
            }
        }
    }

    fn on_ack(
        &mut self,
        ty: PacketType,
        pkt: Packet,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Option<ConnId> {
        let now = sim.now();
        if now < pkt.sent_time {
            error!(pkt = %pkt, "ACK 早于对应数据包的发送时间，忽略");
            return None;
        }
        self.last_ack_at = now;

        let newly = match ty {
            PacketType::CollectiveAck => self.acked.confirm_to(pkt.packet_num),
            _ => u64::from(self.acked.confirm_one(pkt.packet_num)),
        };
        if newly == 0 {
            debug!(num = pkt.packet_num, "重复 ACK，忽略");
            return None;
        }

        let rtt = now - pkt.sent_time;
        self.rtt.add_record(rtt.as_nanos_f64());
        self.last_rtt = Some(rtt);
        if let (Some(mean), Some(std)) = (self.rtt.mean(), self.rtt.std()) {
            let rto = SimTime::from_nanos_f64(mean * 2.0 + std * 4.0)
                .max(SimTime::from_nanos(1))
                .min(self.cfg.max_rto);
            self.rto = rto;
            self.rto_steady = true;
        }

        self.packets_in_flight = self
            .packets_in_flight
            .saturating_sub(u32::try_from(newly).unwrap_or(u32::MAX));
        let avg_rtt = self.mean_rtt().unwrap_or(rtt);
        let congested = self.cc.on_ack(rtt, avg_rtt, pkt.congestion_experienced, now);
        if congested {
            debug!(ce = pkt.congestion_experienced, "拥塞控制检测到拥塞");
        }

        self.delivered += self.cfg.packet_size.saturating_mul(newly);
        let rate = rate_gbps(
            self.delivered.saturating_sub(pkt.delivered_at_origin),
            now.saturating_sub(pkt.generated_time),
        );
        self.delivery_rate = rate;

        let me = EntityId::Flow(self.id);
        net.record(MetricKind::Rtt, me, now, rtt.as_nanos_f64());
        net.record(MetricKind::Cwnd, me, now, self.cc.cwnd());
        if let Some(rate) = rate {
            net.record(MetricKind::DeliveryRate, me, now, rate);
        }
        trace!(rtt = ?rtt, newly, in_flight = self.packets_in_flight, cwnd = self.cc.cwnd(), "收到 ACK");
        Some(self.conn)
    }

    fn on_data(&mut self, data: Packet, sim: &mut Simulator, net: &mut Network) -> Result<(), SimError> {
        let now = sim.now();
        let me = EntityId::Flow(self.id);
        if let Some(value) = self.reordering.add_record(data.packet_num) {
            net.record(MetricKind::PacketReordering, me, now, value);
        }
        if let Some(last) = self.last_data_at {
            net.record(MetricKind::PacketSpacing, me, now, (now - last).as_nanos_f64());
        }
        self.last_data_at = Some(now);
        self.received.confirm_one(data.packet_num);

        let (ty, ack_num) = match self.cfg.ack_mode {
            AckMode::Single => (PacketType::Ack, data.packet_num),
            AckMode::Cumulative => {
                let next = self.received.first_unconfirmed();
                if next == 0 {
                    debug!(num = data.packet_num, "还没有连续前缀，暂不发送累计 ACK");
                    return Ok(());
                }
                (PacketType::CollectiveAck, next)
            }
        };

        let mut ack = Packet::new(net.next_packet_id(), self.receiver, self.sender, self.cfg.ack_size);
        ack.packet_num = ack_num;
        ack.flow = Some(self.id);
        ack.generated_time = data.generated_time;
        ack.sent_time = data.sent_time;
        ack.delivered_at_origin = data.delivered_at_origin;
        ack.congestion_experienced = data.congestion_experienced;
        tcp_flags::set_type(&mut ack.flags, ty)?;
        tcp_flags::set_ack_ttl(&mut ack.flags, data.ttl)?;
        if let Some(avg) = tcp_flags::avg_rtt(&data.flags) {
            tcp_flags::set_avg_rtt(&mut ack.flags, avg)?;
        }
        trace!(ack = %ack, "生成 ACK");
        net.enqueue_packet(self.receiver, ack, sim);
        Ok(())
    }

    /// 定时器到期：对应序号仍未确认则视为丢包并重传。
    pub(crate) fn on_timeout(&mut self, packet_num: u64, sim: &mut Simulator, net: &mut Network) {
        if self.acked.is_confirmed(packet_num) {
            return;
        }
        let now = sim.now();
        if !self.rto_steady {
            self.rto = self.rto.saturating_mul(2).min(self.cfg.max_rto);
        }
        warn!(flow = ?self.id, packet_num, rto = ?self.rto, "超时，疑似丢包，重传");
        self.cc.on_timeout(now);

        let pkt = match self.generate_data_packet(packet_num, now, net) {
            Ok(pkt) => pkt,
            Err(err) => {
                error!(%err, "重传包生成失败");
                return;
            }
        };
        self.send_packet_now(pkt, sim, net);
        self.retransmits += 1;
        net.record(
            MetricKind::Retransmit,
            EntityId::Flow(self.id),
            now,
            self.rto.as_nanos_f64(),
        );
    }
}

/// 事件：pacing 到点后发送一个已生成的包
#[derive(Debug)]
pub struct SendAtTime {
    pub flow: FlowId,
    pub pkt: Packet,
}

impl Event for SendAtTime {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SendAtTime { flow, pkt } = *self;
        with_network(world, |net| {
            if net
                .with_flow(flow, |f, net| f.send_packet_now(pkt, sim, net))
                .is_none()
            {
                Network::missing("flow", flow.0);
            }
        });
    }
}

/// 事件：某个序号的重传定时器到期
#[derive(Debug)]
pub struct Timeout {
    pub flow: FlowId,
    pub packet_num: u64,
}

impl Event for Timeout {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Timeout { flow, packet_num } = *self;
        with_network(world, |net| {
            if net
                .with_flow(flow, |f, net| f.on_timeout(packet_num, sim, net))
                .is_none()
            {
                Network::missing("flow", flow.0);
            }
        });
    }
}
