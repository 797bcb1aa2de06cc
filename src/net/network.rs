//! 网络拓扑管理
//!
//! `Network` 是实体图的中心注册表：按 id 持有节点、链路、流和连接。
//! 事件与实体之间的反向引用都只是 id，解析失败（实体已删除）即视为
//! 静默 no-op。

use std::any::Any;

use super::id::{ConnId, FlowId, LinkId, NodeId};
use super::link::{Link, LinkConfig, LinkTable};
use super::node::{DropReason, Host, Node, NodeKind, Switch, SwitchConfig};
use super::packet::Packet;
use super::stats::Stats;
use crate::cc::TcpCc;
use crate::conn::{Connection, Mplb};
use crate::error::SimError;
use crate::metrics::{EntityId, MetricKind, MetricsSink, NoopSink};
use crate::proto::{TcpFlow, TcpFlowConfig};
use crate::sim::{SimTime, Size};
use crate::topo::shortest_path_routes;
use tracing::{debug, info};

/// 网络拓扑
pub struct Network {
    pub(crate) nodes: Vec<Option<Box<dyn Node>>>,
    pub(crate) links: LinkTable,
    flows: Vec<Option<TcpFlow>>,
    connections: Vec<Option<Connection>>,
    next_pkt_id: u64,
    seed: u64,
    pub stats: Stats,
    metrics: Box<dyn MetricsSink>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Network {
    /// `seed` 决定所有随机组件（ECN、随机哈希器）的初始状态。
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            links: LinkTable::default(),
            flows: Vec::new(),
            connections: Vec::new(),
            next_pkt_id: 0,
            seed,
            stats: Stats::default(),
            metrics: Box::new(NoopSink),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Box::new(Host::new(id, name))));
        id
    }

    /// 添加交换机节点（不做 ECN，ECMP 哈希）
    pub fn add_switch(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Box::new(Switch::new(id, name))));
        id
    }

    pub fn add_switch_with(
        &mut self,
        name: impl Into<String>,
        cfg: &SwitchConfig,
    ) -> Result<NodeId, SimError> {
        let id = NodeId(self.nodes.len());
        let sw = Switch::with_config(id, name, cfg, self.seed)?;
        self.nodes.push(Some(Box::new(sw)));
        Ok(id)
    }

    /// 连接两个节点（创建单向链路），并登记到两端的路由模块。
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        cfg: LinkConfig,
    ) -> Result<LinkId, SimError> {
        for n in [from, to] {
            if self.node(n).is_none() {
                return Err(SimError::UnknownEntity {
                    kind: "node",
                    id: n.0,
                });
            }
        }
        let id = self.links.insert(from, to, cfg);
        let Network { nodes, links, .. } = &mut *self;
        let link = links.get(id).ok_or(SimError::UnknownEntity {
            kind: "link",
            id: id.0,
        })?;
        if let Some(node) = nodes[from.0].as_mut() {
            node.routing_mut().add_outlink(link)?;
        }
        if let Some(node) = nodes[to.0].as_mut() {
            node.routing_mut().add_inlink(link)?;
        }
        debug!(link = ?id, ?from, ?to, speed = ?cfg.speed, delay = ?cfg.delay, "创建链路");
        Ok(id)
    }

    /// 手动为 `node` 添加一条到 `dest` 的路由。
    pub fn set_route(
        &mut self,
        node: NodeId,
        dest: NodeId,
        link: LinkId,
        paths_count: u32,
    ) -> Result<(), SimError> {
        let Network { nodes, links, .. } = &mut *self;
        let link = links.get(link).ok_or(SimError::UnknownEntity {
            kind: "link",
            id: link.0,
        })?;
        let node = nodes
            .get_mut(node.0)
            .and_then(|n| n.as_mut())
            .ok_or(SimError::UnknownEntity {
                kind: "node",
                id: node.0,
            })?;
        node.routing_mut().update_routing_table(dest, link, paths_count)
    }

    /// 按当前拓扑重建所有设备的路由表（最短跳数 + 路径条数加权）。
    pub fn recalculate_paths(&mut self) -> Result<(), SimError> {
        let n = self.nodes.len();
        let mut adj: Vec<Vec<(LinkId, NodeId)>> = vec![Vec::new(); n];
        for link in self.links.iter() {
            if self.node(link.from).is_some() && self.node(link.to).is_some() {
                adj[link.from.0].push((link.id, link.to));
            }
        }
        for node in self.nodes.iter_mut().flatten() {
            node.routing_mut().clear_table();
        }
        let routes = shortest_path_routes(n, &adj);
        let entries = routes.len();
        for r in routes {
            self.set_route(r.node, r.dest, r.link, r.paths)?;
        }
        let hosts = self.nodes_of(NodeKind::Host).count();
        let switches = self.nodes_of(NodeKind::Switch).count();
        info!(hosts, switches, entries, "🧭 路由表已重建");
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.nodes.get(id.0).and_then(|n| n.as_deref())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut (dyn Node + 'static)> {
        self.nodes.get_mut(id.0).and_then(|n| n.as_deref_mut())
    }

    /// 指定类型的全部节点
    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .flatten()
            .filter(move |n| n.kind() == kind)
            .map(|n| n.id())
    }

    pub fn host(&self, id: NodeId) -> Option<&Host> {
        self.node(id).and_then(|n| n.as_host())
    }

    pub(crate) fn host_mut(&mut self, id: NodeId) -> Option<&mut Host> {
        self.node_mut(id).and_then(|n| n.as_host_mut())
    }

    pub fn switch(&self, id: NodeId) -> Option<&Switch> {
        self.node(id).and_then(|n| n.as_switch())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &dyn Node> {
        self.nodes.iter().filter_map(|n| n.as_deref())
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    pub fn flow(&self, id: FlowId) -> Option<&TcpFlow> {
        self.flows.get(id.0).and_then(|f| f.as_ref())
    }

    pub fn flows(&self) -> impl Iterator<Item = &TcpFlow> {
        self.flows.iter().flatten()
    }

    pub fn connection(&self, id: ConnId) -> Option<&Connection> {
        self.connections.get(id.0).and_then(|c| c.as_ref())
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().flatten()
    }

    /// 建立连接；两端都必须是主机且不能相同。
    pub fn add_connection(
        &mut self,
        sender: NodeId,
        receiver: NodeId,
        mplb: Box<dyn Mplb>,
    ) -> Result<ConnId, SimError> {
        for n in [sender, receiver] {
            if self.host(n).is_none() {
                return Err(SimError::UnknownEntity {
                    kind: "host",
                    id: n.0,
                });
            }
        }
        let id = ConnId(self.connections.len());
        let conn = Connection::new(id, sender, receiver, mplb)?;
        self.connections.push(Some(conn));
        Ok(id)
    }

    /// 在连接上新建一条 TCP 流，同时登记到连接的 MPLB。
    pub fn add_tcp_flow(
        &mut self,
        conn: ConnId,
        cc: TcpCc,
        cfg: TcpFlowConfig,
    ) -> Result<FlowId, SimError> {
        let id = FlowId(self.flows.len());
        let c = self
            .connections
            .get_mut(conn.0)
            .and_then(|c| c.as_mut())
            .ok_or(SimError::UnknownEntity {
                kind: "connection",
                id: conn.0,
            })?;
        let flow = TcpFlow::new(id, conn, c.sender(), c.receiver(), cc, cfg)?;
        c.add_flow(id, flow.sample(SimTime::ZERO));
        info!(flow = ?id, conn = ?conn, cc = flow.cc().name(), "创建 TCP 流");
        self.flows.push(Some(flow));
        Ok(id)
    }

    /// 删除节点及其所有链路；指向它的事件随之失效。
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.nodes.get_mut(id.0) else {
            return false;
        };
        if slot.take().is_none() {
            return false;
        }
        let attached: Vec<LinkId> = self
            .links
            .iter()
            .filter(|l| l.from == id || l.to == id)
            .map(|l| l.id)
            .collect();
        for link in attached {
            self.remove_link(link);
        }
        for node in self.nodes.iter_mut().flatten() {
            node.routing_mut().forget_destination(id);
        }
        info!(node = ?id, "删除节点");
        true
    }

    /// 删除链路；队列中的包随之丢失。
    pub fn remove_link(&mut self, id: LinkId) -> bool {
        let Some(link) = self.links.remove(id) else {
            return false;
        };
        for end in [link.from, link.to] {
            if let Some(node) = self.node_mut(end) {
                node.routing_mut().forget_link(id);
            }
        }
        info!(link = ?id, "删除链路");
        true
    }

    pub fn remove_flow(&mut self, id: FlowId) -> bool {
        let Some(flow) = self.flows.get_mut(id.0).and_then(|f| f.take()) else {
            return false;
        };
        if let Some(conn) = self
            .connections
            .get_mut(flow.connection().0)
            .and_then(|c| c.as_mut())
        {
            conn.remove_flow(id);
        }
        info!(flow = ?id, "删除流");
        true
    }

    /// 删除连接及其拥有的所有流。
    pub fn remove_connection(&mut self, id: ConnId) -> bool {
        let Some(conn) = self.connections.get_mut(id.0).and_then(|c| c.take()) else {
            return false;
        };
        for fid in conn.flows() {
            if let Some(slot) = self.flows.get_mut(fid.0) {
                *slot = None;
            }
        }
        info!(conn = ?id, "删除连接");
        true
    }

    /// 调度队列被清空后调用：所有 Process/SendData/Transmit/Arrive/Timeout
    /// 事件都已不存在，闸门计数与排队的包再也不会被消耗。丢弃排队的包、
    /// 复位闸门，流的在途计数归零，之后的新数据可以正常发送。
    pub fn abandon_in_flight_work(&mut self) {
        let mut flushed = 0usize;
        for node in self.nodes.iter_mut().flatten() {
            node.process_gate().reset();
            if let Some(host) = node.as_host_mut() {
                flushed += host.flush_nic();
            }
        }
        for link in self.links.iter_mut() {
            flushed += link.flush();
        }
        for flow in self.flows.iter_mut().flatten() {
            flow.abandon_in_flight();
        }
        info!(flushed, "调度队列已清空，丢弃排队中的包并复位设备");
    }

    /// 分配全网唯一的包 id
    pub fn next_packet_id(&mut self) -> u64 {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        id
    }

    /// 暂时把流取出来，避免 &mut self 与 &mut flow 的重叠借用。
    pub(crate) fn with_flow<R>(
        &mut self,
        id: FlowId,
        f: impl FnOnce(&mut TcpFlow, &mut Network) -> R,
    ) -> Option<R> {
        let mut flow = self.flows.get_mut(id.0)?.take()?;
        let result = f(&mut flow, self);
        if let Some(slot) = self.flows.get_mut(id.0) {
            *slot = Some(flow);
        }
        Some(result)
    }

    pub(crate) fn with_connection<R>(
        &mut self,
        id: ConnId,
        f: impl FnOnce(&mut Connection, &mut Network) -> R,
    ) -> Option<R> {
        let mut conn = self.connections.get_mut(id.0)?.take()?;
        let result = f(&mut conn, self);
        if let Some(slot) = self.connections.get_mut(id.0) {
            *slot = Some(conn);
        }
        Some(result)
    }

    pub fn set_metrics_sink(&mut self, sink: Box<dyn MetricsSink>) {
        self.metrics = sink;
    }

    /// 以具体类型访问当前的指标收集器
    pub fn metrics_as<T: Any>(&self) -> Option<&T> {
        self.metrics.as_any().downcast_ref::<T>()
    }

    pub(crate) fn record(&mut self, metric: MetricKind, entity: EntityId, now: SimTime, value: f64) {
        self.metrics.record(metric, entity, now, value);
    }

    pub(crate) fn record_drop(&mut self, pkt: &Packet, reason: Option<DropReason>, at: EntityId, now: SimTime) {
        self.stats.dropped_pkts += 1;
        self.stats.dropped_bytes += pkt.size.bytes();
        match reason {
            Some(DropReason::TtlExpired) => self.stats.ttl_drops += 1,
            Some(DropReason::NoRoute) => self.stats.no_route_drops += 1,
            None => {}
        }
        self.record(MetricKind::Drop, at, now, pkt.size.bytes() as f64);
    }

    pub(crate) fn on_delivered(&mut self, size: Size) {
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += size.bytes();
    }

    /// 事件目标已被删除：静默失效。
    pub(crate) fn missing(kind: &'static str, id: usize) {
        debug!(kind, id, "目标实体不存在（已删除），忽略");
    }
}
