//! 连接：持有待发送数据量，并在启动、追加数据或收到 ACK 时驱动发送循环

use std::collections::BTreeSet;

use super::mplb::{FlowSample, Mplb};
use crate::error::SimError;
use crate::net::{ConnId, FlowId, Network, NodeId, with_network};
use crate::sim::{Event, Simulator, Size, World};
use tracing::{debug, error, info};

#[derive(Debug)]
pub struct Connection {
    id: ConnId,
    sender: NodeId,
    receiver: NodeId,
    flows: BTreeSet<FlowId>,
    mplb: Box<dyn Mplb>,
    data_to_send: Size,
    total_data_added: Size,
}

impl Connection {
    pub fn new(
        id: ConnId,
        sender: NodeId,
        receiver: NodeId,
        mplb: Box<dyn Mplb>,
    ) -> Result<Self, SimError> {
        if sender == receiver {
            return Err(SimError::invalid(
                "receiver",
                format!("connection {id} has the same sender and receiver {sender}"),
            ));
        }
        Ok(Self {
            id,
            sender,
            receiver,
            flows: BTreeSet::new(),
            mplb,
            data_to_send: Size::ZERO,
            total_data_added: Size::ZERO,
        })
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn sender(&self) -> NodeId {
        self.sender
    }

    pub fn receiver(&self) -> NodeId {
        self.receiver
    }

    pub fn flows(&self) -> impl Iterator<Item = FlowId> + '_ {
        self.flows.iter().copied()
    }

    pub fn mplb(&self) -> &dyn Mplb {
        self.mplb.as_ref()
    }

    /// 尚未交给任何流的数据量
    pub fn data_to_send(&self) -> Size {
        self.data_to_send
    }

    pub fn total_data_added(&self) -> Size {
        self.total_data_added
    }

    pub(crate) fn add_flow(&mut self, flow: FlowId, sample: FlowSample) {
        if self.flows.insert(flow) {
            self.mplb.add_flow(flow, sample);
        }
    }

    pub(crate) fn remove_flow(&mut self, flow: FlowId) -> bool {
        self.mplb.remove_flow(flow);
        self.flows.remove(&flow)
    }

    fn add_data(&mut self, size: Size) {
        self.data_to_send += size;
        self.total_data_added += size;
    }

    /// 发送循环：反复请 MPLB 选流，每次交出一个包的数据，
    /// 直到没有数据或没有可发送的流。
    fn send_data(&mut self, sim: &mut Simulator, net: &mut Network) -> Result<(), SimError> {
        let now = sim.now();
        for fid in &self.flows {
            if let Some(flow) = net.flow(*fid) {
                self.mplb.update_sample(*fid, flow.sample(now));
            }
        }

        while !self.data_to_send.is_zero() {
            let Some(fid) = self.mplb.select_flow() else {
                debug!(conn = ?self.id, left = %self.data_to_send, "暂时没有流可以发送");
                break;
            };
            let Some((quota, pkt_size)) = net
                .flow(fid)
                .map(|f| (f.sending_quota(), f.packet_size()))
            else {
                // 流已被删除但 MPLB 里还有记录
                self.mplb.remove_flow(fid);
                self.flows.remove(&fid);
                continue;
            };
            if quota == 0 {
                return Err(SimError::ZeroQuota {
                    conn: self.id,
                    flow: fid,
                });
            }
            let data = pkt_size.min(self.data_to_send);
            match net.with_flow(fid, |flow, net| flow.send_data(data, sim, net)) {
                Some(result) => result?,
                None => Network::missing("flow", fid.0),
            }
            self.data_to_send -= data;
        }
        Ok(())
    }
}

impl Network {
    /// 启动连接：把已有的待发送数据交给流。
    pub fn start_connection(&mut self, id: ConnId, sim: &mut Simulator) -> Result<(), SimError> {
        match self.with_connection(id, |conn, net| {
            info!(conn = ?id, data = %conn.data_to_send, flows = conn.flows.len(), "🚀 启动连接");
            conn.send_data(sim, net)
        }) {
            Some(result) => result,
            None => {
                Network::missing("connection", id.0);
                Ok(())
            }
        }
    }

    /// 追加待发送数据并立即尝试发送。
    pub fn add_data_to_connection(
        &mut self,
        id: ConnId,
        size: Size,
        sim: &mut Simulator,
    ) -> Result<(), SimError> {
        match self.with_connection(id, |conn, net| {
            conn.add_data(size);
            debug!(conn = ?id, added = %size, pending = %conn.data_to_send, "追加待发送数据");
            conn.send_data(sim, net)
        }) {
            Some(result) => result,
            None => {
                Network::missing("connection", id.0);
                Ok(())
            }
        }
    }

    /// 流确认了新数据：刷新 MPLB 样本并继续发送。
    pub(crate) fn connection_update(&mut self, id: ConnId, flow: FlowId, sim: &mut Simulator) {
        let Some(sample) = self.flow(flow).map(|f| f.sample(sim.now())) else {
            Network::missing("flow", flow.0);
            return;
        };
        let result = self.with_connection(id, |conn, net| {
            conn.mplb.notify_packet_confirmed(flow, sample);
            conn.send_data(sim, net)
        });
        match result {
            Some(Err(err)) => error!(conn = ?id, %err, "连接发送失败"),
            Some(Ok(())) => {}
            None => Network::missing("connection", id.0),
        }
    }
}

/// 事件：启动连接
#[derive(Debug)]
pub struct StartConnection {
    pub conn: ConnId,
}

impl Event for StartConnection {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let conn = self.conn;
        with_network(world, |net| {
            if let Err(err) = net.start_connection(conn, sim) {
                error!(?conn, %err, "启动连接失败");
            }
        });
    }
}

/// 事件：向连接追加待发送数据
#[derive(Debug)]
pub struct AddDataToConnection {
    pub conn: ConnId,
    pub size: Size,
}

impl Event for AddDataToConnection {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AddDataToConnection { conn, size } = *self;
        with_network(world, |net| {
            if let Err(err) = net.add_data_to_connection(conn, size, sim) {
                error!(?conn, %err, "追加数据失败");
            }
        });
    }
}
