//! Swift 风格（基于时延的 AIMD）拥塞控制
//!
//! 目标时延 = `base_target` + flow-scaling 项。flow-scaling 项随 cwnd 从
//! `fs_min_cwnd` 增长到 `fs_max_cwnd` 而从 `fs_range` 降到 0：
//! `alpha / sqrt(cwnd) - beta`，其中 alpha、beta 在构造时算好，使曲线
//! 恰好经过这两个端点。
//!
//! - RTT 低于目标：加性增（cwnd > 1 时每个 ACK 加 `ai / cwnd`，否则加 `ai`）；
//! - 否则按超出比例乘性减，单次降幅不超过 `max_mdf`，每个 RTT 最多一次；
//! - 连续超时达到阈值时窗口直接降到最小值。

use super::CongestionControl;
use crate::error::SimError;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// 连续超时多少次后把窗口重置为最小值
const RETX_RESET_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwiftConfig {
    pub base_target: SimTime,
    pub start_cwnd: f64,
    /// 加性增系数
    pub ai: f64,
    /// 乘性减系数
    pub md: f64,
    /// 单次最大降幅
    pub max_mdf: f64,
    /// flow-scaling 的最大余量（base_target 的倍数）
    pub fs_range: f64,
    pub fs_min_cwnd: f64,
    pub fs_max_cwnd: f64,
    pub min_cwnd: f64,
    pub max_cwnd: f64,
}

impl Default for SwiftConfig {
    fn default() -> Self {
        Self {
            base_target: SimTime::from_micros(10),
            start_cwnd: 1.0,
            ai: 0.5,
            md: 0.5,
            max_mdf: 0.3,
            fs_range: 1.5,
            fs_min_cwnd: 0.1,
            fs_max_cwnd: 100.0,
            min_cwnd: 0.001,
            max_cwnd: 1e6,
        }
    }
}

impl SwiftConfig {
    fn validate(&self) -> Result<(), SimError> {
        let positive = |name: &'static str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(SimError::invalid(name, format!("must be a positive number, got {v}")))
            }
        };
        if self.base_target == SimTime::ZERO {
            return Err(SimError::invalid("base_target", "must be positive"));
        }
        positive("ai", self.ai)?;
        positive("md", self.md)?;
        positive("fs_min_cwnd", self.fs_min_cwnd)?;
        positive("fs_max_cwnd", self.fs_max_cwnd)?;
        positive("min_cwnd", self.min_cwnd)?;
        positive("max_cwnd", self.max_cwnd)?;
        positive("start_cwnd", self.start_cwnd)?;
        if !(0.0..1.0).contains(&self.max_mdf) {
            return Err(SimError::invalid("max_mdf", format!("must be in [0, 1), got {}", self.max_mdf)));
        }
        if !(self.fs_range.is_finite() && self.fs_range >= 0.0) {
            return Err(SimError::invalid("fs_range", format!("must be non-negative, got {}", self.fs_range)));
        }
        if self.fs_min_cwnd >= self.fs_max_cwnd {
            return Err(SimError::invalid(
                "fs_min_cwnd",
                format!("must be below fs_max_cwnd ({} >= {})", self.fs_min_cwnd, self.fs_max_cwnd),
            ));
        }
        if self.min_cwnd > self.max_cwnd {
            return Err(SimError::invalid(
                "min_cwnd",
                format!("must not exceed max_cwnd ({} > {})", self.min_cwnd, self.max_cwnd),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SwiftCc {
    cfg: SwiftConfig,
    /// 以下时间量都是小数纳秒
    fs_range_ns: f64,
    alpha: f64,
    beta: f64,
    cwnd: f64,
    last_decrease: SimTime,
    last_rtt: f64,
    retransmit_cnt: u32,
}

impl SwiftCc {
    pub fn new(cfg: SwiftConfig, now: SimTime) -> Result<Self, SimError> {
        cfg.validate()?;
        let base = cfg.base_target.as_nanos_f64();
        let fs_range_ns = base * cfg.fs_range;
        let inv_sqrt_min = 1.0 / cfg.fs_min_cwnd.sqrt();
        let inv_sqrt_max = 1.0 / cfg.fs_max_cwnd.sqrt();
        // alpha 使 cwnd == fs_min_cwnd 时 flow 项恰为 fs_range
        let alpha = fs_range_ns / (inv_sqrt_min - inv_sqrt_max);
        let beta = alpha / cfg.fs_max_cwnd.sqrt();
        Ok(Self {
            cfg,
            fs_range_ns,
            alpha,
            beta,
            cwnd: cfg.start_cwnd.clamp(cfg.min_cwnd, cfg.max_cwnd),
            last_decrease: now,
            last_rtt: base,
            retransmit_cnt: 0,
        })
    }

    pub fn config(&self) -> &SwiftConfig {
        &self.cfg
    }

    /// 当前窗口下的目标时延
    pub fn target_delay(&self) -> SimTime {
        SimTime::from_nanos_f64(self.target_delay_ns())
    }

    fn target_delay_ns(&self) -> f64 {
        let cwnd = self.cwnd.max(self.cfg.fs_min_cwnd);
        let flow_term = (self.alpha / cwnd.sqrt() - self.beta).clamp(0.0, self.fs_range_ns);
        self.cfg.base_target.as_nanos_f64() + flow_term
    }

    fn can_decrease(&self, now: SimTime) -> bool {
        now.saturating_sub(self.last_decrease).as_nanos_f64() > self.last_rtt
    }

    fn update_cwnd(&mut self, new_cwnd: f64, now: SimTime) {
        let new_cwnd = new_cwnd.clamp(self.cfg.min_cwnd, self.cfg.max_cwnd);
        if new_cwnd < self.cwnd {
            self.last_decrease = now;
        }
        trace!(old = self.cwnd, new = new_cwnd, "Swift cwnd 更新");
        self.cwnd = new_cwnd;
    }
}

impl CongestionControl for SwiftCc {
    fn on_ack(&mut self, rtt: SimTime, _avg_rtt: SimTime, _ecn: bool, now: SimTime) -> bool {
        let mut rtt = rtt.as_nanos_f64();
        if rtt < 1.0 {
            warn!(rtt, "RTT 小于 1ns，按 1ns 处理");
            rtt = 1.0;
        }
        self.retransmit_cnt = 0;
        self.last_rtt = rtt;

        let target = self.target_delay_ns();
        let can_decrease = self.can_decrease(now);
        let mut new_cwnd = self.cwnd;
        let congested = rtt >= target;
        if !congested {
            if new_cwnd > 1.0 {
                new_cwnd += self.cfg.ai / new_cwnd;
            } else {
                new_cwnd += self.cfg.ai;
            }
        } else if can_decrease {
            let overshoot = (rtt - target) / rtt;
            let factor = (1.0 - self.cfg.md * overshoot).max(1.0 - self.cfg.max_mdf);
            new_cwnd *= factor;
        }
        self.update_cwnd(new_cwnd, now);
        congested
    }

    fn on_timeout(&mut self, now: SimTime) {
        let can_decrease = self.can_decrease(now);
        self.retransmit_cnt += 1;
        let new_cwnd = if self.retransmit_cnt >= RETX_RESET_THRESHOLD {
            self.cfg.min_cwnd
        } else if can_decrease {
            self.cwnd * (1.0 - self.cfg.max_mdf)
        } else {
            self.cwnd
        };
        self.update_cwnd(new_cwnd, now);
    }

    fn pacing_delay(&self) -> SimTime {
        if self.cwnd >= 1.0 {
            return SimTime::ZERO;
        }
        SimTime::from_nanos_f64(self.last_rtt * (1.0 / self.cwnd - 1.0))
    }

    fn cwnd(&self) -> f64 {
        self.cwnd
    }
}
