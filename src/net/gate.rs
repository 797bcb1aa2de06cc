//! 引用计数的重调度闸门
//!
//! 每台设备有两个闸门（处理周期、发送周期）。新的一份工作让计数加一，
//! 只有 0 -> 1 时才调度新的周期事件，突发到达因此被合并；一个周期完成
//! 一份工作时计数减一，回到 0 即表示设备可以空闲，不再自我重调度。

use crate::sim::SimTime;
use tracing::error;

#[derive(Debug, Clone, Default)]
pub struct SchedulingGate {
    pending: u32,
    earliest: SimTime,
}

impl SchedulingGate {
    /// 登记一份新工作；若需要启动周期，返回周期事件的调度时间。
    pub fn notify_arrival(&mut self, at: SimTime) -> Option<SimTime> {
        self.pending = self.pending.saturating_add(1);
        if self.pending != 1 {
            return None;
        }
        self.earliest = self.earliest.max(at);
        Some(self.earliest)
    }

    /// 完成一份工作；返回设备是否已空闲。
    pub fn notify_finish(&mut self, finish: SimTime) -> bool {
        if self.pending == 0 {
            error!("notify_finish 时计数已为 0");
            return true;
        }
        self.pending -= 1;
        self.earliest = finish;
        self.pending == 0
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// 丢弃计数（工作已无法完成，例如队列随链路一起被删除）。
    pub fn reset(&mut self) {
        self.pending = 0;
    }
}
