use crate::net::FlowId;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::round_robin::RoundRobinMplb;

/// 流的反馈样本：MPLB 做选择时依据的指标
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowSample {
    pub ack_recv_time: SimTime,
    pub last_rtt: Option<SimTime>,
    pub packets_in_flight: u32,
    pub delivery_rate_gbps: Option<f64>,
    /// 当前还能发出的包数
    pub send_quota: u32,
}

/// 多路径负载均衡策略
pub trait Mplb: Debug + Send {
    /// 登记一条流；已登记时返回 false 且不改变状态。
    fn add_flow(&mut self, flow: FlowId, sample: FlowSample) -> bool;

    fn remove_flow(&mut self, flow: FlowId) -> bool;

    /// 流的某个包被确认，刷新其样本。
    fn notify_packet_confirmed(&mut self, flow: FlowId, sample: FlowSample);

    /// 发送前用流的实时状态刷新样本（未登记的流忽略）。
    fn update_sample(&mut self, flow: FlowId, sample: FlowSample);

    /// 选出下一条可以发送的流；没有可发送的流时返回 None。
    fn select_flow(&mut self) -> Option<FlowId>;

    fn clear_flows(&mut self);

    fn sample(&self, flow: FlowId) -> Option<&FlowSample>;
}

/// 场景文件中可选的 MPLB 种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MplbKind {
    #[default]
    RoundRobin,
}

impl MplbKind {
    pub fn build(self) -> Box<dyn Mplb> {
        match self {
            MplbKind::RoundRobin => Box::new(RoundRobinMplb::new()),
        }
    }
}
