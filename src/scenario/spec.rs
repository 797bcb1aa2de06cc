use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cc::CcConfig;
use crate::conn::MplbKind;
use crate::error::SimError;
use crate::net::SwitchConfig;
use crate::proto::TcpFlowConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// 随机种子（ECN 标记与随机哈希）；命令行参数优先
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub hosts: Vec<HostSpec>,
    #[serde(default)]
    pub switches: Vec<SwitchSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSpec {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchSpec {
    pub name: String,
    #[serde(flatten)]
    pub config: SwitchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub latency_ns: u64,
    #[serde(default)]
    pub speed_gbps: Option<u64>,
    #[serde(default)]
    pub egress_buffer_bytes: Option<u64>,
    #[serde(default)]
    pub ingress_buffer_bytes: Option<u64>,
    /// 同时创建反向链路
    #[serde(default = "default_true")]
    pub bidirectional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub name: String,
    pub sender: String,
    pub receiver: String,
    #[serde(default)]
    pub mplb: MplbKind,
    #[serde(default)]
    pub flows: Vec<FlowSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowSpec {
    #[serde(default)]
    pub cc: CcConfig,
    #[serde(flatten)]
    pub tcp: TcpFlowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionSpec {
    SendData {
        at_ns: u64,
        #[serde(default)]
        connection: Option<String>,
        #[serde(default)]
        connections: Vec<String>,
        bytes: u64,
        #[serde(default = "default_repeat_count")]
        repeat_count: u32,
        #[serde(default)]
        repeat_interval_ns: u64,
    },
    Stop {
        at_ns: u64,
    },
}

fn default_true() -> bool {
    true
}

fn default_repeat_count() -> u32 {
    1
}

impl ScenarioSpec {
    pub fn from_json(raw: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}
