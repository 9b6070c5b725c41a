//! Document Encoder Port - 多页文档封装抽象（PDF / CBZ）

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::RasterImage;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Invalid page image: {0}")]
    InvalidImage(String),

    #[error("Document assembly failed: {0}")]
    Assembly(String),
}

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// 单页 PNG
    Png,
    /// 多页 PDF
    Pdf,
    /// 漫画归档（zip）
    Cbz,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Cbz => "cbz",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Cbz => "application/vnd.comicbook+zip",
        }
    }

    /// 进度文案中使用的名称
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Png => "PNG",
            ExportFormat::Pdf => "PDF",
            ExportFormat::Cbz => "CBZ",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// 已渲染的页面
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 源页面的 0 基索引（空页被跳过，因此可能不连续）
    pub source_index: usize,
    pub image: RasterImage,
}

/// Document Encoder Port
///
/// 全部页面在内存中组装完毕后一次性输出；失败时不产生任何部分结果
pub trait DocumentEncoderPort: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn encode(&self, pages: &[RenderedPage]) -> Result<Vec<u8>, EncodeError>;
}
