//! 事件 trait
//!
//! 事件是一次性的调度动作：由调度器弹出后恰好执行一次，随后丢弃。
//! 事件只保存目标的 id（非拥有引用），执行时再经注册表解析；
//! 目标已被删除时事件静默失效。

use super::simulator::Simulator;
use super::world::World;
use tracing::info;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 停止仿真：清空所有待处理事件。
#[derive(Debug, Clone, Copy, Default)]
pub struct Stop;

impl Event for Stop {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        info!(now = ?sim.now(), dropped = sim.pending(), "⏹️  Stop 事件：清空调度队列");
        sim.clear(world);
    }
}
