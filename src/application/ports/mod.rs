//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod document_encoder;
mod export_sink;
mod image_generator;
mod page_rasterizer;
mod project_store;
mod studio_events;

pub use document_encoder::{DocumentEncoderPort, EncodeError, ExportFormat, RenderedPage};
pub use export_sink::{ExportArtifact, ExportSinkPort, SinkError};
pub use image_generator::{GenerationError, GenerationRequest, ImageGeneratorPort};
pub use page_rasterizer::{PageRasterizerPort, RasterImage, RenderError};
pub use project_store::{ProjectStorePort, StoreError, StoredWorkspace};
pub use studio_events::{StudioEvent, StudioEventsPort};
