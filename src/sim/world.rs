//! 世界 trait
//!
//! 调度器只认识 `World`；具体的实体图（网络拓扑、流、连接）由上层实现。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由业务层实现（例如 `NetWorld`）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每个事件执行完毕后回调一次。
    fn on_tick(&mut self, _sim: &mut Simulator) {}

    /// 调度队列被清空后回调：依赖已丢弃事件才能推进的状态需要在这里复位。
    fn on_clear(&mut self) {}
}
