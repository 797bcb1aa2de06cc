//! Dumbbell 拓扑构建

use crate::error::SimError;
use crate::net::{LinkConfig, Network, NodeId, SwitchConfig};
use crate::sim::{SimTime, Speed};

/// Dumbbell 拓扑配置选项
#[derive(Debug, Clone)]
pub struct DumbbellOpts {
    pub host_speed: Speed,
    pub bottleneck_speed: Speed,
    pub link_latency: SimTime,
    /// 每端缓冲区（包个数）
    pub buffer_pkts: u64,
    pub switch: SwitchConfig,
}

impl Default for DumbbellOpts {
    fn default() -> Self {
        Self {
            host_speed: Speed::from_gbps(100),
            bottleneck_speed: Speed::from_gbps(10),
            link_latency: SimTime::from_micros(2),
            buffer_pkts: 64,
            switch: SwitchConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dumbbell {
    pub h0: NodeId,
    pub h1: NodeId,
    pub s0: NodeId,
    pub s1: NodeId,
}

/// 双向连接：两条方向相反、参数相同的单向链路
pub(crate) fn connect_pair(
    net: &mut Network,
    a: NodeId,
    b: NodeId,
    cfg: LinkConfig,
) -> Result<(), SimError> {
    net.connect(a, b, cfg)?;
    net.connect(b, a, cfg)?;
    Ok(())
}

/// 构建 dumbbell 拓扑并计算路由
///
/// 拓扑结构：h0 <-> s0 <-> s1 <-> h1
pub fn build_dumbbell(net: &mut Network, opts: &DumbbellOpts) -> Result<Dumbbell, SimError> {
    let h0 = net.add_host("h0");
    let h1 = net.add_host("h1");
    let s0 = net.add_switch_with("s0", &opts.switch)?;
    let s1 = net.add_switch_with("s1", &opts.switch)?;

    let edge = LinkConfig {
        speed: opts.host_speed,
        delay: opts.link_latency,
        ..LinkConfig::default()
    }
    .with_buffer_pkts(opts.buffer_pkts);
    let bottleneck = LinkConfig {
        speed: opts.bottleneck_speed,
        ..edge
    };

    connect_pair(net, h0, s0, edge)?;
    connect_pair(net, s0, s1, bottleneck)?;
    connect_pair(net, s1, h1, edge)?;

    net.recalculate_paths()?;
    Ok(Dumbbell { h0, h1, s0, s1 })
}
