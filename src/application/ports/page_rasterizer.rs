//! Page Rasterizer Port - 页面栅格化抽象
//!
//! 契约: render(Page, Theme) -> PNG。渲染技术可替换。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::comic::Page;
use crate::domain::Theme;

/// 渲染错误
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Image decode failed: {0}")]
    ImageDecode(String),

    #[error("Scene build failed: {0}")]
    Scene(String),

    #[error("Rasterization failed: {0}")]
    Raster(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// 栅格化结果
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// 像素宽度
    pub width: u32,
    /// 像素高度
    pub height: u32,
    /// PNG 编码数据
    pub png: Vec<u8>,
}

/// Page Rasterizer Port
///
/// 可重复调用；导出流水线按顺序调用，不要求并发安全以外的保证
#[async_trait]
pub trait PageRasterizerPort: Send + Sync {
    async fn rasterize(&self, page: &Page, theme: Theme) -> Result<RasterImage, RenderError>;
}
