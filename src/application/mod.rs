//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（ImageGenerator、ProjectStore、PageRasterizer 等）
//! - commands: Studio 操作对应的命令
//! - studio: 工作区状态引擎（唯一写入者）
//! - export: 导出流水线
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod export;
pub mod ports;
pub mod prompts;
pub mod studio;

// Re-exports
pub use commands::{
    AddPage, AddPanel, ChangePage, CreateCharacter, CreateProject, DeleteProject, ExportPage,
    ExportProject, RemoveCurrentPage, RemovePanel, SwitchProject,
};

pub use error::ApplicationError;

pub use export::{ExportError, ExportService, ProgressFn};

pub use ports::{
    // Document encoder
    DocumentEncoderPort,
    EncodeError,
    ExportFormat,
    RenderedPage,
    // Export sink
    ExportArtifact,
    ExportSinkPort,
    SinkError,
    // Image generator
    GenerationError,
    GenerationRequest,
    ImageGeneratorPort,
    // Page rasterizer
    PageRasterizerPort,
    RasterImage,
    RenderError,
    // Project store
    ProjectStorePort,
    StoreError,
    StoredWorkspace,
    // Studio events
    StudioEvent,
    StudioEventsPort,
};

pub use studio::{PanelOutcome, PanelTicket, Studio, StudioPorts, StudioSnapshot};
