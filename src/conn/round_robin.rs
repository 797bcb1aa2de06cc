//! 轮转 MPLB
//!
//! 每次选择最多转一整圈，取第一条配额大于 0 的流并扣减其配额。
//! 游标由 `LoopCursor` 从当前键集合推导，增删流不会使其失效。

use std::collections::BTreeMap;

use super::mplb::{FlowSample, Mplb};
use crate::net::{FlowId, LoopCursor};
use tracing::{debug, trace};

#[derive(Debug, Default)]
pub struct RoundRobinMplb {
    flows: BTreeMap<FlowId, FlowSample>,
    cursor: LoopCursor<FlowId>,
}

impl RoundRobinMplb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn flows(&self) -> impl Iterator<Item = FlowId> + '_ {
        self.flows.keys().copied()
    }
}

impl Mplb for RoundRobinMplb {
    fn add_flow(&mut self, flow: FlowId, sample: FlowSample) -> bool {
        if self.flows.contains_key(&flow) {
            debug!(?flow, "流已在 MPLB 中");
            return false;
        }
        self.flows.insert(flow, sample);
        true
    }

    fn remove_flow(&mut self, flow: FlowId) -> bool {
        self.flows.remove(&flow).is_some()
    }

    fn notify_packet_confirmed(&mut self, flow: FlowId, sample: FlowSample) {
        self.update_sample(flow, sample);
    }

    fn update_sample(&mut self, flow: FlowId, sample: FlowSample) {
        if let Some(s) = self.flows.get_mut(&flow) {
            *s = sample;
        }
    }

    fn select_flow(&mut self) -> Option<FlowId> {
        let order = self.cursor.rotation(self.flows.keys());
        for flow in order {
            let Some(sample) = self.flows.get_mut(&flow) else {
                continue;
            };
            if sample.send_quota > 0 {
                sample.send_quota -= 1;
                self.cursor.commit(flow);
                trace!(?flow, quota_left = sample.send_quota, "MPLB 选中流");
                return Some(flow);
            }
        }
        None
    }

    fn clear_flows(&mut self) {
        self.flows.clear();
        self.cursor.reset();
    }

    fn sample(&self, flow: FlowId) -> Option<&FlowSample> {
        self.flows.get(&flow)
    }
}
