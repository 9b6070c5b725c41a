//! Export Pipeline - 导出流水线
//!
//! 三种导出模式共享同一个 PageRasterizer:
//! - 单页 PNG：只渲染当前页
//! - PDF / CBZ：按顺序遍历全部页面，跳过空页，逐页渲染后一次性封装
//!
//! 封装在内存中完成，失败时不会产生部分文件

use std::sync::Arc;
use thiserror::Error;

use crate::application::ports::{
    DocumentEncoderPort, EncodeError, ExportArtifact, ExportFormat, PageRasterizerPort,
    RenderError, RenderedPage,
};
use crate::domain::comic::Project;
use crate::domain::Theme;

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Could not find page {0} to export")]
    PageNotFound(usize),

    #[error("Failed to render page {page}: {source}")]
    Render {
        page: usize,
        #[source]
        source: RenderError,
    },

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("No encoder registered for {0}")]
    UnsupportedFormat(ExportFormat),
}

/// 进度回调
pub type ProgressFn<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// 导出服务
pub struct ExportService {
    rasterizer: Arc<dyn PageRasterizerPort>,
    encoders: Vec<Arc<dyn DocumentEncoderPort>>,
}

impl ExportService {
    pub fn new(
        rasterizer: Arc<dyn PageRasterizerPort>,
        encoders: Vec<Arc<dyn DocumentEncoderPort>>,
    ) -> Self {
        Self { rasterizer, encoders }
    }

    fn encoder(&self, format: ExportFormat) -> Option<&Arc<dyn DocumentEncoderPort>> {
        self.encoders.iter().find(|e| e.format() == format)
    }

    /// 单页 PNG 导出
    ///
    /// 空页同样可以导出
    pub async fn export_page(
        &self,
        project: &Project,
        page_index: usize,
        theme: Theme,
    ) -> Result<ExportArtifact, ExportError> {
        let page = project
            .page(page_index)
            .ok_or(ExportError::PageNotFound(page_index + 1))?;

        let image = self
            .rasterizer
            .rasterize(page, theme)
            .await
            .map_err(|source| ExportError::Render {
                page: page_index + 1,
                source,
            })?;

        tracing::info!(
            project_id = %project.id(),
            page = page_index + 1,
            width = image.width,
            height = image.height,
            "Page rasterized for PNG export"
        );

        Ok(ExportArtifact {
            file_name: page_file_name(project, page_index),
            format: ExportFormat::Png,
            bytes: image.png,
        })
    }

    /// 多页导出（PDF / CBZ）
    ///
    /// 全部页面为空时输出合法但不含页面的文档
    pub async fn export_project(
        &self,
        project: &Project,
        format: ExportFormat,
        theme: Theme,
        progress: ProgressFn<'_>,
    ) -> Result<ExportArtifact, ExportError> {
        let encoder = self
            .encoder(format)
            .ok_or(ExportError::UnsupportedFormat(format))?;
        let label = format.label();
        let total = project.page_count();

        progress(&format!("Starting {label} export..."));

        let mut rendered = Vec::new();
        for (index, page) in project.pages().iter().enumerate() {
            if page.is_empty() {
                tracing::debug!(page = index + 1, "Skipping empty page");
                continue;
            }

            progress(&format!("Processing page {} of {}...", index + 1, total));
            let image = self
                .rasterizer
                .rasterize(page, theme)
                .await
                .map_err(|source| ExportError::Render {
                    page: index + 1,
                    source,
                })?;
            rendered.push(RenderedPage {
                source_index: index,
                image,
            });
        }

        progress(&format!("Saving {label}..."));
        let bytes = encoder.encode(&rendered)?;
        progress("");

        tracing::info!(
            project_id = %project.id(),
            format = %format,
            pages = rendered.len(),
            size_bytes = bytes.len(),
            "Project exported"
        );

        Ok(ExportArtifact {
            file_name: project_file_name(project, format),
            format,
            bytes,
        })
    }
}

/// `{name}_page_{n}.png`，n 从 1 开始
pub fn page_file_name(project: &Project, page_index: usize) -> String {
    format!("{}_page_{}.png", project.name().file_stem(), page_index + 1)
}

/// `{name}.{ext}`
pub fn project_file_name(project: &Project, format: ExportFormat) -> String {
    format!("{}.{}", project.name().file_stem(), format.extension())
}
