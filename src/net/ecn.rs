//! ECN 标记
//!
//! 按队列填充率做概率性的早期标记：低于 `min` 从不标记，高于 `max`
//! 总是标记，中间线性爬升到 `probability`。

use crate::error::SimError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcnConfig {
    pub min: f64,
    pub max: f64,
    pub probability: f64,
}

#[derive(Debug)]
pub struct Ecn {
    cfg: EcnConfig,
    rng: StdRng,
}

impl Ecn {
    pub fn new(min: f64, max: f64, probability: f64, seed: u64) -> Result<Self, SimError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(SimError::InvalidEcnThresholds { min, max });
        }
        if probability.is_nan() {
            return Err(SimError::invalid("probability", "must be a number"));
        }
        for (name, v) in [("min", min), ("max", max), ("probability", probability)] {
            if !(0.0..=1.0).contains(&v) {
                warn!(name, value = v, "ECN 参数不在 [0, 1] 内");
            }
        }
        Ok(Self {
            cfg: EcnConfig {
                min,
                max,
                probability,
            },
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn from_config(cfg: EcnConfig, seed: u64) -> Result<Self, SimError> {
        Self::new(cfg.min, cfg.max, cfg.probability, seed)
    }

    pub fn config(&self) -> EcnConfig {
        self.cfg
    }

    /// 给定填充率下的标记概率。
    ///
    /// 区间两端都是闭的：`fill == min` 时从 0 开始爬升。`min == max` 时
    /// 区间退化成一个点，`fill` 恰好落在该点上直接取满额 `probability`，
    /// 不做插值。
    pub fn mark_probability(&self, fill: f64) -> f64 {
        let EcnConfig {
            min,
            max,
            probability,
        } = self.cfg;
        if fill < min {
            return 0.0;
        }
        if fill > max {
            return 1.0;
        }
        if max == min {
            return probability;
        }
        probability * (fill - min) / (max - min)
    }

    pub fn get_congestion_mark(&mut self, fill: f64) -> bool {
        let p = self.mark_probability(fill);
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.rng.gen_bool(p)
    }
}
