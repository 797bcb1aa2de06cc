use crate::cc::{BasicCc, TcpCc};
use crate::conn::RoundRobinMplb;
use crate::net::{ConnId, FlowId, LinkConfig, LinkId, Network, NodeId, SwitchConfig};
use crate::proto::TcpFlowConfig;
use crate::sim::{SimTime, Size, Speed};

/// h0 <-> s <-> h1
pub(super) struct Line {
    pub h0: NodeId,
    pub s: NodeId,
    pub h1: NodeId,
    /// s -> h1
    pub s_h1: LinkId,
}

pub(super) fn fast_link() -> LinkConfig {
    LinkConfig {
        speed: Speed::from_gbps(1000),
        delay: SimTime(300),
        egress_buffer: Size::from_kib(64),
        ingress_buffer: Size::from_kib(64),
    }
}

pub(super) fn build_line(net: &mut Network, switch: &SwitchConfig) -> Line {
    let h0 = net.add_host("h0");
    let s = net.add_switch_with("s", switch).expect("switch");
    let h1 = net.add_host("h1");
    net.connect(h0, s, fast_link()).expect("h0->s");
    net.connect(s, h0, fast_link()).expect("s->h0");
    let s_h1 = net.connect(s, h1, fast_link()).expect("s->h1");
    net.connect(h1, s, fast_link()).expect("h1->s");
    net.recalculate_paths().expect("routes");
    Line { h0, s, h1, s_h1 }
}

pub(super) fn basic_flow(net: &mut Network, line: &Line, cfg: TcpFlowConfig) -> (ConnId, FlowId) {
    let conn = net
        .add_connection(line.h0, line.h1, Box::new(RoundRobinMplb::new()))
        .expect("connection");
    let flow = net
        .add_tcp_flow(conn, TcpCc::Basic(BasicCc), cfg)
        .expect("flow");
    (conn, flow)
}
