//! File Export Sink - 导出文件落地
//!
//! 实现 ExportSinkPort trait，把导出产物写入导出目录

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{ExportArtifact, ExportSinkPort, SinkError};

/// 文件系统导出目标
pub struct FileExportSink {
    /// 导出目录
    base_dir: PathBuf,
}

impl FileExportSink {
    /// 创建导出目标（目录不存在时创建）
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, SinkError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| SinkError::IoError(e.to_string()))?;

        Ok(Self { base_dir })
    }

    /// 获取导出目录
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn target_path(&self, file_name: &str) -> Result<PathBuf, SinkError> {
        let name = Path::new(file_name)
            .file_name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| SinkError::IoError(format!("Invalid export file name: {file_name}")))?;
        Ok(self.base_dir.join(name))
    }
}

#[async_trait]
impl ExportSinkPort for FileExportSink {
    async fn deliver(&self, artifact: &ExportArtifact) -> Result<PathBuf, SinkError> {
        let path = self.target_path(&artifact.file_name)?;

        // 先写临时文件再改名，读者看不到写了一半的文件
        let tmp_path = path.with_extension(format!("{}.part", artifact.format.extension()));
        fs::write(&tmp_path, &artifact.bytes)
            .await
            .map_err(|e| SinkError::IoError(e.to_string()))?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(SinkError::IoError(e.to_string()));
        }

        tracing::debug!(
            "Saved export: file={}, type={}, size={} bytes",
            path.display(),
            artifact.content_type(),
            artifact.bytes.len()
        );

        Ok(path)
    }
}
