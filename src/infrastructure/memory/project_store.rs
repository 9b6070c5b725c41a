//! In-Memory Project Store Implementation
//!
//! 与 sled 实现相同的槽位与 JSON 编码，数据只保存在进程内

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::application::ports::{ProjectStorePort, StoreError, StoredWorkspace};
use crate::domain::comic::{Project, ProjectId};
use crate::domain::Theme;
use crate::infrastructure::persistence::sled::{CURRENT_PROJECT_KEY, PROJECTS_KEY, THEME_KEY};

/// 内存项目存储
///
/// 可以被设置为拒绝读或写，用来模拟存储不可用
#[derive(Default)]
pub struct InMemoryProjectStore {
    /// slot key -> JSON
    slots: DashMap<&'static str, Vec<u8>>,
    reject_reads: AtomicBool,
    reject_writes: AtomicBool,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn reject_reads(&self, reject: bool) {
        self.reject_reads.store(reject, Ordering::SeqCst);
    }

    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// 原始槽位内容
    pub fn raw_slot(&self, key: &str) -> Option<Vec<u8>> {
        self.slots.get(key).map(|v| v.value().clone())
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.reject_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is not readable".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected("quota exceeded".to_string()));
        }
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>, StoreError> {
        match self.slots.get(key) {
            Some(data) => serde_json::from_slice(data.value())
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("{key}: {e}"))),
            None => Ok(None),
        }
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, key: &'static str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.slots.insert(key, json);
        Ok(())
    }
}

#[async_trait]
impl ProjectStorePort for InMemoryProjectStore {
    async fn load(&self) -> Result<StoredWorkspace, StoreError> {
        self.check_read()?;
        Ok(StoredWorkspace {
            projects: self.read_json(PROJECTS_KEY)?.unwrap_or_default(),
            current_project_id: self.read_json(CURRENT_PROJECT_KEY)?,
        })
    }

    async fn save(
        &self,
        projects: &[Project],
        current_project_id: Option<ProjectId>,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        self.write_json(PROJECTS_KEY, projects)?;
        match current_project_id {
            Some(id) => self.write_json(CURRENT_PROJECT_KEY, &id)?,
            None => {
                self.slots.remove(CURRENT_PROJECT_KEY);
            }
        }
        tracing::debug!(projects = projects.len(), "Workspace written to memory");
        Ok(())
    }

    async fn load_theme(&self) -> Result<Option<Theme>, StoreError> {
        self.check_read()?;
        self.read_json(THEME_KEY)
    }

    async fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        self.check_write()?;
        self.write_json(THEME_KEY, &theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::comic::{PageId, ProjectName};

    fn project(raw: i64) -> Project {
        Project::new(
            ProjectId::from_raw(raw),
            ProjectName::new("Demo").unwrap(),
            PageId::from_raw(raw + 1),
        )
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = InMemoryProjectStore::new();
        let projects = vec![project(10), project(20)];
        store.save(&projects, Some(ProjectId::from_raw(20))).await.unwrap();

        let stored = store.load().await.unwrap();
        assert_eq!(stored.projects, projects);
        assert_eq!(stored.current_project_id, Some(ProjectId::from_raw(20)));
        assert_eq!(store.raw_slot(CURRENT_PROJECT_KEY), Some(b"20".to_vec()));

        store.save(&projects, None).await.unwrap();
        assert!(store.raw_slot(CURRENT_PROJECT_KEY).is_none());
    }

    #[tokio::test]
    async fn test_rejected_write_keeps_previous_snapshot() {
        let store = InMemoryProjectStore::new();
        store.save(&[project(10)], None).await.unwrap();

        store.reject_writes(true);
        let result = store.save(&[project(10), project(20)], None).await;
        assert!(matches!(result, Err(StoreError::WriteRejected(_))));
        assert_eq!(store.load().await.unwrap().projects.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_read() {
        let store = InMemoryProjectStore::new();
        store.reject_reads(true);
        assert!(matches!(store.load().await, Err(StoreError::Unavailable(_))));
    }
}
