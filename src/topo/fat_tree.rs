//! Fat-tree 拓扑构建
//!
//! k 叉 fat-tree：k 个 pod，每个 pod 有 k/2 台 edge 与 k/2 台 agg 交换机，
//! 每台 edge 下挂 k/2 台主机；(k/2)^2 台 core 交换机。跨 pod 的主机对之间
//! 有 (k/2)^2 条等价最短路径，用来检验加权多路径选路。

use super::dumbbell::connect_pair;
use crate::error::SimError;
use crate::net::{LinkConfig, Network, NodeId, SwitchConfig};

#[derive(Debug, Clone)]
pub struct FatTreeOpts {
    pub k: usize,
    pub link: LinkConfig,
    pub switch: SwitchConfig,
}

impl Default for FatTreeOpts {
    fn default() -> Self {
        Self {
            k: 4,
            link: LinkConfig::default(),
            switch: SwitchConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FatTreeTopology {
    pub k: usize,
    pub hosts: Vec<NodeId>,
    pub edge_switches: Vec<NodeId>,
    pub agg_switches: Vec<NodeId>,
    pub core_switches: Vec<NodeId>,
}

impl FatTreeTopology {
    fn half(&self) -> usize {
        self.k / 2
    }

    pub fn host(&self, pod: usize, edge: usize, host: usize) -> NodeId {
        let half = self.half();
        self.hosts[(pod * half + edge) * half + host]
    }

    pub fn edge(&self, pod: usize, edge: usize) -> NodeId {
        self.edge_switches[pod * self.half() + edge]
    }
}

pub fn build_fat_tree(net: &mut Network, opts: &FatTreeOpts) -> Result<FatTreeTopology, SimError> {
    let k = opts.k;
    if k < 2 || k % 2 != 0 {
        return Err(SimError::invalid("k", format!("fat-tree k must be even and >= 2, got {k}")));
    }
    let half = k / 2;

    let mut core_switches = Vec::with_capacity(half * half);
    for group in 0..half {
        for index in 0..half {
            core_switches.push(net.add_switch_with(format!("c{group}_{index}"), &opts.switch)?);
        }
    }

    let mut hosts = Vec::with_capacity(k * half * half);
    let mut edge_switches = Vec::with_capacity(k * half);
    let mut agg_switches = Vec::with_capacity(k * half);

    for pod in 0..k {
        let edges = (0..half)
            .map(|e| net.add_switch_with(format!("p{pod}_e{e}"), &opts.switch))
            .collect::<Result<Vec<_>, _>>()?;
        let aggs = (0..half)
            .map(|a| net.add_switch_with(format!("p{pod}_a{a}"), &opts.switch))
            .collect::<Result<Vec<_>, _>>()?;

        for (e, &edge) in edges.iter().enumerate() {
            for h in 0..half {
                let host = net.add_host(format!("h{pod}_{e}_{h}"));
                connect_pair(net, host, edge, opts.link)?;
                hosts.push(host);
            }
            for &agg in &aggs {
                connect_pair(net, edge, agg, opts.link)?;
            }
        }
        for (a, &agg) in aggs.iter().enumerate() {
            for index in 0..half {
                connect_pair(net, agg, core_switches[a * half + index], opts.link)?;
            }
        }

        edge_switches.extend(edges);
        agg_switches.extend(aggs);
    }

    net.recalculate_paths()?;
    Ok(FatTreeTopology {
        k,
        hosts,
        edge_switches,
        agg_switches,
        core_switches,
    })
}
