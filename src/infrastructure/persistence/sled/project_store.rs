//! Sled-based Project Store Implementation
//!
//! 三个键值槽位，值均为 JSON：
//! - `comicraft:projects`: 项目数组
//! - `comicraft:current_project_id`: 当前项目 id（无当前项目时删除）
//! - `comicraft:theme`: 主题

use async_trait::async_trait;
use sled::{Batch, Db};
use std::path::Path;
use std::sync::Arc;

use crate::application::ports::{ProjectStorePort, StoreError, StoredWorkspace};
use crate::domain::comic::{Project, ProjectId};
use crate::domain::Theme;

pub const PROJECTS_KEY: &str = "comicraft:projects";
pub const CURRENT_PROJECT_KEY: &str = "comicraft:current_project_id";
pub const THEME_KEY: &str = "comicraft:theme";

/// Sled 项目存储
pub struct SledProjectStore {
    db: Db,
}

impl SledProjectStore {
    /// 打开（或创建）数据库
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref()).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::info!(
            db_path = %path.as_ref().display(),
            recovered = db.was_recovered(),
            "SledProjectStore initialized"
        );

        Ok(Self { db })
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.db.get(key) {
            Ok(Some(data)) => serde_json::from_slice(&data)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("{key}: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    /// 刷新数据库
    async fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush_async()
            .await
            .map_err(|e| StoreError::WriteRejected(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ProjectStorePort for SledProjectStore {
    async fn load(&self) -> Result<StoredWorkspace, StoreError> {
        let projects: Vec<Project> = self.read_json(PROJECTS_KEY)?.unwrap_or_default();
        let current_project_id: Option<ProjectId> = self.read_json(CURRENT_PROJECT_KEY)?;

        tracing::debug!(
            projects = projects.len(),
            current = ?current_project_id,
            "Workspace read from sled"
        );

        Ok(StoredWorkspace {
            projects,
            current_project_id,
        })
    }

    async fn save(
        &self,
        projects: &[Project],
        current_project_id: Option<ProjectId>,
    ) -> Result<(), StoreError> {
        let projects_json =
            serde_json::to_vec(projects).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut batch = Batch::default();
        batch.insert(PROJECTS_KEY, projects_json.as_slice());
        match current_project_id {
            Some(id) => {
                let id_json = serde_json::to_vec(&id)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                batch.insert(CURRENT_PROJECT_KEY, id_json);
            }
            None => batch.remove(CURRENT_PROJECT_KEY),
        }

        self.db
            .apply_batch(batch)
            .map_err(|e| StoreError::WriteRejected(e.to_string()))?;
        self.flush().await?;

        tracing::debug!(
            projects = projects.len(),
            size_bytes = projects_json.len(),
            "Workspace written to sled"
        );
        Ok(())
    }

    async fn load_theme(&self) -> Result<Option<Theme>, StoreError> {
        self.read_json(THEME_KEY)
    }

    async fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        let json = serde_json::to_vec(&theme).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.db
            .insert(THEME_KEY, json)
            .map_err(|e| StoreError::WriteRejected(e.to_string()))?;
        self.flush().await
    }
}
