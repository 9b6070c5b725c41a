//! Comic Context - Errors

use thiserror::Error;

use super::ProjectId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComicError {
    #[error("项目不存在: {0}")]
    ProjectNotFound(ProjectId),

    #[error("项目不是当前项目: {0}")]
    ProjectNotCurrent(ProjectId),

    #[error("无效的项目名称: {0}")]
    InvalidName(String),

    #[error("项目尚未创建角色")]
    MissingCharacter,

    #[error("页面索引越界: {index} (共 {count} 页)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("不能删除唯一的页面")]
    LastPage,

    #[error("无效的分镜内容: {0}")]
    InvalidPanel(String),
}
