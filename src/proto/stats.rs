//! 指数加权滑动平均/方差
//!
//! `mean' = mean * a + x * (1 - a)`，`var' = var * a + (x - mean)^2 * (1 - a)`，
//! 第一个样本直接作为均值。

use crate::error::SimError;

#[derive(Debug, Clone)]
pub struct RttStatistics {
    factor: f64,
    mean: Option<f64>,
    var: f64,
    last: Option<f64>,
    count: u64,
}

impl RttStatistics {
    pub const DEFAULT_FACTOR: f64 = 0.8;

    /// `factor` 是旧值的权重，取值 `[0, 1)`。
    pub fn new(factor: f64) -> Result<Self, SimError> {
        if !(0.0..1.0).contains(&factor) {
            return Err(SimError::invalid(
                "smoothing_factor",
                format!("must be in [0, 1), got {factor}"),
            ));
        }
        Ok(Self {
            factor,
            mean: None,
            var: 0.0,
            last: None,
            count: 0,
        })
    }

    pub fn add_record(&mut self, value: f64) {
        self.last = Some(value);
        self.count += 1;
        let Some(mean) = self.mean else {
            self.mean = Some(value);
            return;
        };
        let a = self.factor;
        let delta = value - mean;
        self.var = self.var * a + delta * delta * (1.0 - a);
        self.mean = Some(mean * a + value * (1.0 - a));
    }

    pub fn mean(&self) -> Option<f64> {
        self.mean
    }

    pub fn std(&self) -> Option<f64> {
        self.mean.map(|_| self.var.sqrt())
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Default for RttStatistics {
    fn default() -> Self {
        Self {
            factor: Self::DEFAULT_FACTOR,
            mean: None,
            var: 0.0,
            last: None,
            count: 0,
        }
    }
}
