//! Tahoe 风格拥塞控制
//!
//! 慢启动（`cwnd < ssthresh` 时每个 ACK 加一）后进入拥塞避免（每个 ACK
//! 加 `1/cwnd`）。ECN 标记、平均 RTT 超过延迟阈值或超时都视为拥塞：
//! `ssthresh = cwnd / 2`，`cwnd = 1`，且每个平均 RTT 内最多反应一次。

use super::CongestionControl;
use crate::error::SimError;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TahoeConfig {
    pub start_cwnd: f64,
    pub ssthresh: f64,
    /// 平均 RTT 超过此值即视为拥塞
    pub delay_threshold: SimTime,
}

impl Default for TahoeConfig {
    fn default() -> Self {
        Self {
            start_cwnd: 1.0,
            ssthresh: 8.0,
            delay_threshold: SimTime::from_nanos(4000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TahoeCc {
    cfg: TahoeConfig,
    cwnd: f64,
    ssthresh: f64,
    last_congestion: SimTime,
    last_avg_rtt: SimTime,
}

impl TahoeCc {
    pub fn new(cfg: TahoeConfig) -> Result<Self, SimError> {
        if !(cfg.start_cwnd.is_finite() && cfg.start_cwnd > 0.0) {
            return Err(SimError::invalid("start_cwnd", format!("must be positive, got {}", cfg.start_cwnd)));
        }
        if !(cfg.ssthresh.is_finite() && cfg.ssthresh > 0.0) {
            return Err(SimError::invalid("ssthresh", format!("must be positive, got {}", cfg.ssthresh)));
        }
        Ok(Self {
            cfg,
            cwnd: cfg.start_cwnd,
            ssthresh: cfg.ssthresh,
            last_congestion: SimTime::ZERO,
            last_avg_rtt: SimTime::ZERO,
        })
    }

    pub fn ssthresh(&self) -> f64 {
        self.ssthresh
    }

    pub fn config(&self) -> &TahoeConfig {
        &self.cfg
    }

    fn on_congestion(&mut self, now: SimTime, avg_rtt: SimTime) {
        if now > self.last_congestion + avg_rtt {
            self.last_congestion = now;
            self.ssthresh = self.cwnd / 2.0;
            self.cwnd = 1.0;
            debug!(ssthresh = self.ssthresh, "Tahoe 检测到拥塞，窗口回到 1");
        }
    }
}

impl CongestionControl for TahoeCc {
    fn on_ack(&mut self, _rtt: SimTime, avg_rtt: SimTime, ecn: bool, now: SimTime) -> bool {
        self.last_avg_rtt = avg_rtt;
        if ecn || avg_rtt > self.cfg.delay_threshold {
            self.on_congestion(now, avg_rtt);
            return true;
        }
        if self.cwnd < self.ssthresh {
            self.cwnd += 1.0;
        } else {
            self.cwnd += 1.0 / self.cwnd;
        }
        false
    }

    fn on_timeout(&mut self, now: SimTime) {
        self.on_congestion(now, self.last_avg_rtt);
    }

    fn pacing_delay(&self) -> SimTime {
        SimTime::ZERO
    }

    fn cwnd(&self) -> f64 {
        self.cwnd
    }
}
