//! 场景：JSON 描述的拓扑、连接、流与定时动作

mod build;
mod spec;

pub use build::Scenario;
pub use spec::{
    ActionSpec, ConnectionSpec, FlowSpec, HostSpec, LinkSpec, ScenarioSpec, SwitchSpec,
};
