//! 字节大小与链路速率
//!
//! 与 `SimTime` 一样使用 newtype 包装原始数值，避免单位混用。

use super::time::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// 数据量（字节）。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Size(pub u64);

impl Size {
    pub const ZERO: Size = Size(0);

    pub fn from_bytes(bytes: u64) -> Size {
        Size(bytes)
    }

    pub fn from_kib(kib: u64) -> Size {
        Size(kib.saturating_mul(1024))
    }

    pub fn bytes(self) -> u64 {
        self.0
    }

    pub fn bits(self) -> u128 {
        (self.0 as u128).saturating_mul(8)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_sub(self, other: Size) -> Size {
        Size(self.0.saturating_sub(other.0))
    }

    pub fn saturating_mul(self, k: u64) -> Size {
        Size(self.0.saturating_mul(k))
    }
}

impl Add for Size {
    type Output = Size;

    fn add(self, rhs: Size) -> Size {
        Size(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Size {
    fn add_assign(&mut self, rhs: Size) {
        *self = *self + rhs;
    }
}

impl Sub for Size {
    type Output = Size;

    fn sub(self, rhs: Size) -> Size {
        self.saturating_sub(rhs)
    }
}

impl SubAssign for Size {
    fn sub_assign(&mut self, rhs: Size) {
        *self = self.saturating_sub(rhs);
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

/// 链路速率（bit/s）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Speed(pub u64);

impl Speed {
    pub fn from_bps(bps: u64) -> Speed {
        Speed(bps)
    }

    pub fn from_mbps(mbps: u64) -> Speed {
        Speed(mbps.saturating_mul(1_000_000))
    }

    pub fn from_gbps(gbps: u64) -> Speed {
        Speed(gbps.saturating_mul(1_000_000_000))
    }

    pub fn bps(self) -> u64 {
        self.0
    }

    /// 序列化 `size` 所需的时间：ceil(bits / bps) 秒 -> 纳秒。
    ///
    /// 速率为 0 时返回一个很大的值（链路实际上不可用）。
    pub fn transmission_time(self, size: Size) -> SimTime {
        if self.0 == 0 {
            return SimTime(u64::MAX / 4);
        }
        let nanos = (size.bits().saturating_mul(1_000_000_000u128) + (self.0 as u128 - 1))
            / self.0 as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}

impl Default for Speed {
    fn default() -> Self {
        Speed::from_gbps(1)
    }
}

/// 在 `elapsed` 时间内交付 `size` 对应的速率（Gbit/s，即 bit/ns）。
pub fn rate_gbps(size: Size, elapsed: SimTime) -> Option<f64> {
    if elapsed == SimTime::ZERO {
        return None;
    }
    Some(size.bits() as f64 / elapsed.as_nanos_f64())
}
