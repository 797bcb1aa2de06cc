//! 拓扑构建
//!
//! 路由表计算与常用测试拓扑。

mod dumbbell;
mod fat_tree;
mod paths;

pub use dumbbell::{Dumbbell, DumbbellOpts, build_dumbbell};
pub use fat_tree::{FatTreeOpts, FatTreeTopology, build_fat_tree};
pub use paths::{RouteEntry, shortest_path_routes};
