use super::types::{EntityId, MetricKind, MetricSample};
use crate::error::SimError;
use crate::sim::SimTime;
use std::any::Any;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub trait MetricsSink: Send {
    fn record(&mut self, metric: MetricKind, entity: EntityId, now: SimTime, value: f64);

    fn as_any(&self) -> &dyn Any;
}

/// 丢弃一切采样
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&mut self, _metric: MetricKind, _entity: EntityId, _now: SimTime, _value: f64) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 一个简单的采样收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub samples: Vec<MetricSample>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// 某个实体的某类指标，按时间顺序
    pub fn series(&self, metric: MetricKind, entity: EntityId) -> Vec<(u64, f64)> {
        self.samples
            .iter()
            .filter(|s| s.metric == metric && s.entity == entity)
            .map(|s| (s.t_ns, s.value))
            .collect()
    }

    pub fn count(&self, metric: MetricKind) -> usize {
        self.samples.iter().filter(|s| s.metric == metric).count()
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string(&self.samples)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let f = File::create(path)?;
        serde_json::to_writer(BufWriter::new(f), &self.samples)?;
        Ok(())
    }
}

impl MetricsSink for RecordingSink {
    fn record(&mut self, metric: MetricKind, entity: EntityId, now: SimTime, value: f64) {
        self.samples.push(MetricSample {
            metric,
            entity,
            t_ns: now.as_nanos(),
            value,
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
