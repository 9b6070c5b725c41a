//! Export Commands

use crate::application::ports::ExportFormat;
use crate::domain::comic::ProjectId;

/// 导出当前页为 PNG
#[derive(Debug, Clone)]
pub struct ExportPage {
    pub project_id: ProjectId,
}

/// 导出整个项目（PDF 或 CBZ）
#[derive(Debug, Clone)]
pub struct ExportProject {
    pub project_id: ProjectId,
    pub format: ExportFormat,
}
