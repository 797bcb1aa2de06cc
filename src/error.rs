//! 错误类型
//!
//! 只覆盖“实体图本身不一致”的情况（构造参数非法、调用方违反契约）。
//! 运行期的常规状况（目标已删除、无路由、重复 ACK、TTL 耗尽、队列溢出）
//! 不会走到这里，而是在本地吸收并记录日志。

use crate::net::{ConnId, FlowId, LinkId, NodeId};
use crate::sim::{SimTime, Size};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("ECN min threshold {min} is greater than max threshold {max}")]
    InvalidEcnThresholds { min: f64, max: f64 },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("cannot take a packet from an empty queue")]
    EmptyQueue,

    #[error("event scheduled at {at:?}, which is before current time {now:?}")]
    ScheduleInPast { at: SimTime, now: SimTime },

    #[error("MPLB returned flow {flow:?} with zero quota in connection {conn:?}")]
    ZeroQuota { conn: ConnId, flow: FlowId },

    #[error("trying to send {requested} on flow {flow:?} with quota {quota}")]
    QuotaExceeded {
        flow: FlowId,
        requested: Size,
        quota: Size,
    },

    #[error("packet flag `{0}` is not registered")]
    FlagNotRegistered(String),

    #[error("packet flag `{0}` is already registered")]
    DuplicateFlag(String),

    #[error("packet flag `{name}` does not fit: needs {needed} bits, {available} left")]
    FlagOverflow {
        name: String,
        needed: u32,
        available: u32,
    },

    #[error("value {value} does not fit into flag `{name}`")]
    FlagValueTooLarge { name: String, value: u64 },

    #[error("unknown {kind} {id}")]
    UnknownEntity { kind: &'static str, id: usize },

    #[error("link {link:?} is not attached to device {node:?}")]
    InvalidLinkEndpoint { link: LinkId, node: NodeId },

    #[error("scenario error: {0}")]
    Scenario(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
