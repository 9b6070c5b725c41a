//! Domain Layer - 领域层
//!
//! 包含:
//! - Comic Context: 项目、角色、页面、分镜
//! - Workspace: 项目集合与当前指针
//! - Layout: 页面网格布局（渲染与导出共享）

pub mod comic;
pub mod layout;
mod theme;
mod workspace;

pub use theme::Theme;
pub use workspace::{RestoreReport, TextItemDraft, Workspace};
