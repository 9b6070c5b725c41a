//! 应用层 - 命令（写操作）
//!
//! 每个命令对应 Studio 上的一个操作

mod export_commands;
mod panel_commands;
mod project_commands;

pub use export_commands::*;
pub use panel_commands::*;
pub use project_commands::*;
