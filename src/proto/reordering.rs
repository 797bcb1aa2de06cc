//! 乱序程度
//!
//! 每到达一个 DATA 包，统计已经收到的序号中比它大的比例，用 EWMA 平滑。
//! 完全有序时为 0。只保留最近 `max_packets` 个序号。

use std::collections::BTreeSet;
use std::ops::Bound;

use super::stats::RttStatistics;
use crate::error::SimError;

#[derive(Debug, Clone)]
pub struct PacketReordering {
    seen: BTreeSet<u64>,
    max_packets: usize,
    stats: RttStatistics,
}

impl PacketReordering {
    pub const DEFAULT_WINDOW: usize = 1000;

    pub fn new(smoothing: f64, max_packets: usize) -> Result<Self, SimError> {
        if max_packets == 0 {
            return Err(SimError::invalid("max_packets", "must be positive"));
        }
        Ok(Self {
            seen: BTreeSet::new(),
            max_packets,
            stats: RttStatistics::new(smoothing)?,
        })
    }

    /// 记录一个到达的序号；重复序号被忽略并返回 None。
    pub fn add_record(&mut self, num: u64) -> Option<f64> {
        if !self.seen.insert(num) {
            return None;
        }
        let upper = self
            .seen
            .range((Bound::Excluded(num), Bound::Unbounded))
            .count();
        let current = upper as f64 / self.seen.len() as f64;
        self.stats.add_record(current);

        if self.seen.len() > self.max_packets {
            self.seen.pop_first();
        }
        self.stats.mean()
    }

    pub fn value(&self) -> f64 {
        self.stats.mean().unwrap_or(0.0)
    }
}
