//! 仿真核心模块
//!
//! 此模块包含事件驱动仿真的核心组件：时间与单位、事件、世界和调度器。

// 子模块声明
mod event;
mod simulator;
mod time;
mod units;
mod world;

// 重新导出公共接口
pub use event::{Event, Stop};
pub use simulator::Simulator;
pub use time::SimTime;
pub use units::{Size, Speed, rate_gbps};
pub use world::World;
