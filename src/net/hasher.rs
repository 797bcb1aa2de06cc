//! 包哈希器
//!
//! 路由模块用哈希值在多条等价（加权）出链路之间做选择。哈希器是开放的
//! trait 对象，每台设备各持有一个。所有实现都是确定性的（随机哈希器使用
//! 固定种子），保证同一场景重复运行结果一致。

use super::id::NodeId;
use super::packet::Packet;
use crate::proto::tcp_flags;
use crate::sim::SimTime;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

pub trait PacketHasher: Send + Debug {
    fn hash(&mut self, pkt: &Packet, now: SimTime) -> u32;
}

/// 一个简单、确定性的 64-bit mixing（替代 RandomState，避免每次运行 hash 不稳定）。
pub(crate) fn mix64(mut x: u64) -> u64 {
    // splitmix64
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

fn flow_key(pkt: &Packet) -> u64 {
    // 无所属流的包按 0 号处理
    pkt.flow.map(|f| f.0 as u64 + 1).unwrap_or(0)
}

fn fold(h: u64) -> u32 {
    (h ^ (h >> 32)) as u32
}

fn ecmp_hash(pkt: &Packet) -> u32 {
    let key = flow_key(pkt)
        ^ (pkt.src.0 as u64).wrapping_mul(0x9E3779B97F4A7C15)
        ^ (pkt.dst.0 as u64).rotate_left(32);
    fold(mix64(key))
}

/// (flow, src, dst) 五元组风格的 ECMP
#[derive(Debug, Default, Clone)]
pub struct EcmpHasher;

impl PacketHasher for EcmpHasher {
    fn hash(&mut self, pkt: &Packet, _now: SimTime) -> u32 {
        ecmp_hash(pkt)
    }
}

/// 加盐 ECMP：盐取设备 id，避免多级交换机做出相关的选择。
#[derive(Debug, Clone)]
pub struct SaltEcmpHasher {
    salt: u64,
}

impl SaltEcmpHasher {
    pub fn new(salt: u64) -> Self {
        Self { salt }
    }
}

impl PacketHasher for SaltEcmpHasher {
    fn hash(&mut self, pkt: &Packet, _now: SimTime) -> u32 {
        fold(mix64(ecmp_hash(pkt) as u64 ^ mix64(self.salt)))
    }
}

/// 对称哈希：交换 src/dst 得到同一个值，正反两个方向走同一路径。
#[derive(Debug, Default, Clone)]
pub struct SymmetricHasher;

impl PacketHasher for SymmetricHasher {
    fn hash(&mut self, pkt: &Packet, _now: SimTime) -> u32 {
        let ends = mix64(pkt.src.0 as u64) ^ mix64(pkt.dst.0 as u64);
        fold(mix64(flow_key(pkt) ^ ends.rotate_left(17)))
    }
}

#[derive(Debug)]
pub struct RandomHasher {
    rng: StdRng,
}

impl RandomHasher {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl PacketHasher for RandomHasher {
    fn hash(&mut self, _pkt: &Packet, _now: SimTime) -> u32 {
        self.rng.next_u32()
    }
}

/// 每条流的 (上次见到的时间, 偏移量)
#[derive(Debug, Default)]
struct FlowletTable(HashMap<u64, (SimTime, u32)>);

impl FlowletTable {
    /// 间隔超过 `threshold` 时偏移量加一；`None` 表示阈值未知，保持原偏移。
    fn shift(&mut self, key: u64, now: SimTime, threshold: Option<SimTime>) -> u32 {
        let Some((last_seen, shift)) = self.0.get_mut(&key) else {
            self.0.insert(key, (now, 0));
            return 0;
        };
        if let Some(threshold) = threshold {
            if now.saturating_sub(*last_seen) > threshold {
                *shift = shift.wrapping_add(1);
            }
        }
        *last_seen = now;
        *shift
    }
}

/// Flowlet 切换：同一流相邻两包间隔超过固定阈值时换一条路径。
#[derive(Debug)]
pub struct FlowletHasher {
    threshold: SimTime,
    table: FlowletTable,
}

impl FlowletHasher {
    pub fn new(threshold: SimTime) -> Self {
        Self {
            threshold,
            table: FlowletTable::default(),
        }
    }
}

impl PacketHasher for FlowletHasher {
    fn hash(&mut self, pkt: &Packet, now: SimTime) -> u32 {
        let shift = self.table.shift(flow_key(pkt), now, Some(self.threshold));
        ecmp_hash(pkt).wrapping_add(shift)
    }
}

/// 自适应 flowlet：阈值 = factor × 包内携带的平均 RTT。
#[derive(Debug)]
pub struct AdaptiveFlowletHasher {
    factor: f64,
    table: FlowletTable,
}

impl AdaptiveFlowletHasher {
    pub fn new(factor: f64) -> Self {
        Self {
            factor,
            table: FlowletTable::default(),
        }
    }
}

impl PacketHasher for AdaptiveFlowletHasher {
    fn hash(&mut self, pkt: &Packet, now: SimTime) -> u32 {
        let threshold = tcp_flags::avg_rtt(&pkt.flags).map(|rtt| rtt.mul_f64(self.factor));
        let shift = self.table.shift(flow_key(pkt), now, threshold);
        ecmp_hash(pkt).wrapping_add(shift)
    }
}

/// 哈希器种类（用于配置）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HasherKind {
    #[default]
    Ecmp,
    SaltEcmp,
    Symmetric,
    Random,
    Flowlet {
        threshold_ns: u64,
    },
    AdaptiveFlowlet {
        #[serde(default = "default_flowlet_factor")]
        factor: f64,
    },
}

fn default_flowlet_factor() -> f64 {
    0.5
}

impl HasherKind {
    pub fn build(self, node: NodeId, seed: u64) -> Box<dyn PacketHasher> {
        match self {
            HasherKind::Ecmp => Box::new(EcmpHasher),
            HasherKind::SaltEcmp => Box::new(SaltEcmpHasher::new(node.0 as u64)),
            HasherKind::Symmetric => Box::new(SymmetricHasher),
            HasherKind::Random => Box::new(RandomHasher::new(seed ^ mix64(node.0 as u64))),
            HasherKind::Flowlet { threshold_ns } => {
                Box::new(FlowletHasher::new(SimTime::from_nanos(threshold_ns)))
            }
            HasherKind::AdaptiveFlowlet { factor } => Box::new(AdaptiveFlowletHasher::new(factor)),
        }
    }
}
