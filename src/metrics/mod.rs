//! 指标采集
//!
//! 仿真核心在固定的位置调用 `MetricsSink::record`，传出
//! (实体, 仿真时间, 数值) 三元组。采集只是旁路：换成 `NoopSink`
//! 时仿真结果必须完全一致。

mod sink;
mod types;

pub use sink::{MetricsSink, NoopSink, RecordingSink};
pub use types::{EntityId, MetricKind, MetricSample};
