//! 把场景描述变成网络实体并调度动作

use std::collections::BTreeMap;

use super::spec::{ActionSpec, ScenarioSpec};
use crate::conn::{AddDataToConnection, StartConnection};
use crate::error::SimError;
use crate::net::{ConnId, FlowId, LinkConfig, LinkId, Network, NodeId};
use crate::sim::{SimTime, Simulator, Size, Speed, Stop};
use tracing::{debug, info};

/// 构建结果：名字到 id 的映射
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub nodes: BTreeMap<String, NodeId>,
    pub links: Vec<LinkId>,
    pub connections: BTreeMap<String, ConnId>,
    pub flows: Vec<FlowId>,
}

impl Scenario {
    fn node(&self, name: &str) -> Result<NodeId, SimError> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| SimError::Scenario(format!("unknown node `{name}`")))
    }

    fn connection(&self, name: &str) -> Result<ConnId, SimError> {
        self.connections
            .get(name)
            .copied()
            .ok_or_else(|| SimError::Scenario(format!("unknown connection `{name}`")))
    }

    /// 在 `net` 中创建场景里的全部实体，并把动作调度到 `sim`。
    pub fn build(
        spec: &ScenarioSpec,
        net: &mut Network,
        sim: &mut Simulator,
    ) -> Result<Self, SimError> {
        let mut sc = Scenario::default();

        for h in &spec.hosts {
            let id = net.add_host(h.name.clone());
            sc.insert_node(&h.name, id)?;
        }
        for s in &spec.switches {
            let id = net.add_switch_with(s.name.clone(), &s.config)?;
            sc.insert_node(&s.name, id)?;
        }

        for l in &spec.links {
            let from = sc.node(&l.from)?;
            let to = sc.node(&l.to)?;
            let defaults = LinkConfig::default();
            let cfg = LinkConfig {
                speed: l.speed_gbps.map(Speed::from_gbps).unwrap_or(defaults.speed),
                delay: SimTime::from_nanos(l.latency_ns),
                egress_buffer: l
                    .egress_buffer_bytes
                    .map(Size::from_bytes)
                    .unwrap_or(defaults.egress_buffer),
                ingress_buffer: l
                    .ingress_buffer_bytes
                    .map(Size::from_bytes)
                    .unwrap_or(defaults.ingress_buffer),
            };
            sc.links.push(net.connect(from, to, cfg)?);
            if l.bidirectional {
                sc.links.push(net.connect(to, from, cfg)?);
            }
        }
        net.recalculate_paths()?;

        for c in &spec.connections {
            let sender = sc.node(&c.sender)?;
            let receiver = sc.node(&c.receiver)?;
            if sc.connections.contains_key(&c.name) {
                return Err(SimError::Scenario(format!(
                    "duplicate connection `{}`",
                    c.name
                )));
            }
            let conn = net.add_connection(sender, receiver, c.mplb.build())?;
            for f in &c.flows {
                let cc = f.cc.build(sim.now())?;
                sc.flows.push(net.add_tcp_flow(conn, cc, f.tcp)?);
            }
            sc.connections.insert(c.name.clone(), conn);
            sim.schedule(sim.now(), StartConnection { conn });
        }

        for action in &spec.actions {
            sc.schedule_action(action, sim)?;
        }

        info!(
            nodes = sc.nodes.len(),
            links = sc.links.len(),
            connections = sc.connections.len(),
            flows = sc.flows.len(),
            actions = spec.actions.len(),
            "📦 场景构建完成"
        );
        Ok(sc)
    }

    fn insert_node(&mut self, name: &str, id: NodeId) -> Result<(), SimError> {
        if self.nodes.insert(name.to_string(), id).is_some() {
            return Err(SimError::Scenario(format!("duplicate node name `{name}`")));
        }
        Ok(())
    }

    fn schedule_action(&self, action: &ActionSpec, sim: &mut Simulator) -> Result<(), SimError> {
        match action {
            ActionSpec::SendData {
                at_ns,
                connection,
                connections,
                bytes,
                repeat_count,
                repeat_interval_ns,
            } => {
                let mut targets = Vec::with_capacity(connections.len() + 1);
                for name in connection.iter().chain(connections) {
                    targets.push(self.connection(name)?);
                }
                if targets.is_empty() {
                    return Err(SimError::Scenario(
                        "send_data action names no connection".to_string(),
                    ));
                }
                let start = SimTime::from_nanos(*at_ns);
                let interval = SimTime::from_nanos(*repeat_interval_ns);
                for k in 0..u64::from(*repeat_count) {
                    let at = start + interval.saturating_mul(k);
                    for &conn in &targets {
                        sim.try_schedule(
                            at,
                            AddDataToConnection {
                                conn,
                                size: Size::from_bytes(*bytes),
                            },
                        )?;
                    }
                }
                debug!(at = ?start, bytes, repeat_count, targets = targets.len(), "调度 send_data");
            }
            ActionSpec::Stop { at_ns } => {
                sim.try_schedule(SimTime::from_nanos(*at_ns), Stop)?;
                debug!(at_ns, "调度 stop");
            }
        }
        Ok(())
    }
}
