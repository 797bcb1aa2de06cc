use super::CongestionControl;
use crate::sim::SimTime;

/// 不做拥塞控制：窗口无限大，不 pacing。
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicCc;

impl CongestionControl for BasicCc {
    fn on_ack(&mut self, _rtt: SimTime, _avg_rtt: SimTime, _ecn: bool, _now: SimTime) -> bool {
        false
    }

    fn on_timeout(&mut self, _now: SimTime) {}

    fn pacing_delay(&self) -> SimTime {
        SimTime::ZERO
    }

    fn cwnd(&self) -> f64 {
        f64::MAX
    }
}
