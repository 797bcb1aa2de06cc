//! 仿真器（全局调度器）
//!
//! 维护当前时间与按时间排序的事件堆。同一时间戳的事件按插入顺序执行，
//! 因此在事件内部以 `now` 调度的新事件总是排在当前事件之后。

use super::event::Event;
use super::time::SimTime;
use super::world::World;
use crate::error::SimError;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace, warn};

/// 堆中的一项：执行时间、插入序号与事件本体。
struct Pending {
    at: SimTime,
    seq: u64,
    ev: Box<dyn Event>,
}

// BinaryHeap 是 max-heap；我们需要最小时间优先，因此反向比较。
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then(self.seq.cmp(&other.seq))
            .reverse()
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Pending {}

/// 事件驱动仿真器：维护当前时间与事件队列。
///
/// 不是单例：每次仿真运行各自持有一个 `Simulator`，并显式传入每个事件。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<Pending>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 待处理事件数
    pub fn pending(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// 调度事件在指定时间执行；早于当前时间的请求被拒绝。
    #[tracing::instrument(level = "trace", skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn try_schedule<E: Event>(&mut self, at: SimTime, ev: E) -> Result<(), SimError> {
        if at < self.now {
            return Err(SimError::ScheduleInPast { at, now: self.now });
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(Pending {
            at,
            seq,
            ev: Box::new(ev),
        });
        trace!(now = ?self.now, seq, queue_size = self.q.len(), "事件已加入队列");
        Ok(())
    }

    /// 同 `try_schedule`，但被拒绝的事件只记录告警后丢弃。
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        if let Err(err) = self.try_schedule(at, ev) {
            warn!(%err, "丢弃非法调度的事件");
        }
    }

    /// 在 `now + delay` 调度事件。
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev);
    }

    /// 弹出并执行最早的事件；队列为空时返回 false 且不推进时间。
    pub fn tick(&mut self, world: &mut dyn World) -> bool {
        let Some(item) = self.q.pop() else {
            return false;
        };
        debug_assert!(item.at >= self.now, "simulated time must not go backwards");
        self.now = item.at;
        trace!(now = ?self.now, seq = item.seq, remaining_queue = self.q.len(), "执行事件");
        item.ev.execute(self, world);
        world.on_tick(self);
        true
    }

    /// 丢弃所有待处理事件（Stop 动作与测试隔离使用），并通知 `world` 复位。
    pub fn clear(&mut self, world: &mut dyn World) {
        debug!(dropped = self.q.len(), "清空事件队列");
        self.q.clear();
        world.on_clear();
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(top) = self.q.peek() {
            if top.at > until {
                break;
            }
            self.tick(world);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count: u64 = 0;
        while self.tick(world) {
            event_count += 1;
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
