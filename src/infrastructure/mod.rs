//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod events;
pub mod export;
pub mod memory;
pub mod persistence;
pub mod render;

pub use adapters::{FakeImageClient, FileExportSink, HttpImageClient, HttpImageClientConfig};
pub use events::EventPublisher;
pub use export::{CbzEncoder, PdfEncoder};
pub use memory::{InMemoryExportSink, InMemoryProjectStore};
pub use persistence::SledProjectStore;
pub use render::{SvgPageRasterizer, SvgRasterizerConfig};
