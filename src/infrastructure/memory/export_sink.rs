//! In-Memory Export Sink
//!
//! 收集导出产物而不写文件

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::application::ports::{ExportArtifact, ExportSinkPort, SinkError};

#[derive(Default)]
pub struct InMemoryExportSink {
    artifacts: Mutex<Vec<ExportArtifact>>,
}

impl InMemoryExportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按交付顺序返回所有产物
    pub fn artifacts(&self) -> Vec<ExportArtifact> {
        self.artifacts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ExportSinkPort for InMemoryExportSink {
    async fn deliver(&self, artifact: &ExportArtifact) -> Result<PathBuf, SinkError> {
        let mut artifacts = self
            .artifacts
            .lock()
            .map_err(|e| SinkError::IoError(e.to_string()))?;
        artifacts.push(artifact.clone());
        tracing::debug!(file = %artifact.file_name, size_bytes = artifact.bytes.len(), "Artifact collected");
        Ok(PathBuf::from(&artifact.file_name))
    }
}
