//! 拥塞控制
//!
//! 流通过 `CongestionControl` 接口驱动拥塞控制：`on_ack`、`on_timeout`、
//! 查询 pacing 间隔与拥塞窗口。已知的实现集合是固定的，所以流里持有的是
//! 闭合枚举 `TcpCc`，匹配分支由编译器检查完整性。

mod basic;
mod swift;
mod tahoe;

pub use basic::BasicCc;
pub use swift::{SwiftCc, SwiftConfig};
pub use tahoe::{TahoeCc, TahoeConfig};

use crate::error::SimError;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub trait CongestionControl: Debug + Send {
    /// 收到一个确认了新数据的 ACK；返回是否检测到拥塞。
    fn on_ack(&mut self, rtt: SimTime, avg_rtt: SimTime, ecn: bool, now: SimTime) -> bool;

    fn on_timeout(&mut self, now: SimTime);

    /// 相邻两个包之间的发送间隔；0 表示不 pacing。
    fn pacing_delay(&self) -> SimTime;

    /// 拥塞窗口（包，可为小数）
    fn cwnd(&self) -> f64;
}

#[derive(Debug)]
pub enum TcpCc {
    Basic(BasicCc),
    Tahoe(TahoeCc),
    Swift(SwiftCc),
}

impl TcpCc {
    pub fn name(&self) -> &'static str {
        match self {
            TcpCc::Basic(_) => "basic",
            TcpCc::Tahoe(_) => "tahoe",
            TcpCc::Swift(_) => "swift",
        }
    }
}

impl CongestionControl for TcpCc {
    fn on_ack(&mut self, rtt: SimTime, avg_rtt: SimTime, ecn: bool, now: SimTime) -> bool {
        match self {
            TcpCc::Basic(cc) => cc.on_ack(rtt, avg_rtt, ecn, now),
            TcpCc::Tahoe(cc) => cc.on_ack(rtt, avg_rtt, ecn, now),
            TcpCc::Swift(cc) => cc.on_ack(rtt, avg_rtt, ecn, now),
        }
    }

    fn on_timeout(&mut self, now: SimTime) {
        match self {
            TcpCc::Basic(cc) => cc.on_timeout(now),
            TcpCc::Tahoe(cc) => cc.on_timeout(now),
            TcpCc::Swift(cc) => cc.on_timeout(now),
        }
    }

    fn pacing_delay(&self) -> SimTime {
        match self {
            TcpCc::Basic(cc) => cc.pacing_delay(),
            TcpCc::Tahoe(cc) => cc.pacing_delay(),
            TcpCc::Swift(cc) => cc.pacing_delay(),
        }
    }

    fn cwnd(&self) -> f64 {
        match self {
            TcpCc::Basic(cc) => cc.cwnd(),
            TcpCc::Tahoe(cc) => cc.cwnd(),
            TcpCc::Swift(cc) => cc.cwnd(),
        }
    }
}

/// 拥塞控制配置（场景文件中的 `cc` 字段）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CcConfig {
    #[default]
    Basic,
    Tahoe(TahoeConfig),
    Swift(SwiftConfig),
}

impl CcConfig {
    /// 构造拥塞控制实例；`now` 为流创建时刻（Swift 的降窗限速从此算起）。
    pub fn build(&self, now: SimTime) -> Result<TcpCc, SimError> {
        Ok(match self {
            CcConfig::Basic => TcpCc::Basic(BasicCc),
            CcConfig::Tahoe(cfg) => TcpCc::Tahoe(TahoeCc::new(*cfg)?),
            CcConfig::Swift(cfg) => TcpCc::Swift(SwiftCc::new(*cfg, now)?),
        })
    }
}
