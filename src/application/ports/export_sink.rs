//! Export Sink Port - 导出文件交付（"下载"）

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use super::ExportFormat;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    IoError(String),
}

/// 导出产物
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Export Sink Port
#[async_trait]
pub trait ExportSinkPort: Send + Sync {
    /// 交付导出文件，返回落地位置
    async fn deliver(&self, artifact: &ExportArtifact) -> Result<PathBuf, SinkError>;
}
