//! Comic Context - 漫画限界上下文
//!
//! 职责:
//! - 项目聚合管理
//! - 角色、页面、分镜、文字元素实体
//! - 标识生成

mod aggregate;
mod entities;
mod errors;
mod value_objects;

pub use aggregate::Project;
pub use entities::{Character, Page, Panel, TextItem, TextKind};
pub use errors::ComicError;
pub use value_objects::{IdGenerator, ImageData, PageId, PanelId, ProjectId, ProjectName, TextItemId};
