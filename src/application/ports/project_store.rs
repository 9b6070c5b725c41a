//! Project Store Port - 项目持久化抽象
//!
//! 两个主要的键值槽位：项目集合与当前项目 id，外加主题偏好。
//! 写穿（write-through）且非事务：每次变更后整体覆盖写入。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::comic::{Project, ProjectId};
use crate::domain::Theme;

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected: {0}")]
    WriteRejected(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// 从存储读出的工作区快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredWorkspace {
    pub projects: Vec<Project>,
    pub current_project_id: Option<ProjectId>,
}

/// Project Store Port
#[async_trait]
pub trait ProjectStorePort: Send + Sync {
    /// 读取项目集合与当前项目指针；槽位为空时返回空集合
    async fn load(&self) -> Result<StoredWorkspace, StoreError>;

    /// 覆盖写入项目集合与当前项目指针（None 时删除指针槽位）
    async fn save(
        &self,
        projects: &[Project],
        current_project_id: Option<ProjectId>,
    ) -> Result<(), StoreError>;

    async fn load_theme(&self) -> Result<Option<Theme>, StoreError>;

    async fn save_theme(&self, theme: Theme) -> Result<(), StoreError>;
}
