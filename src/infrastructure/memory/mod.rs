//! Memory Layer - In-Memory Adapters
//!
//! 进程内的存储与导出实现，用于测试和无持久化运行

mod export_sink;
mod project_store;

pub use export_sink::InMemoryExportSink;
pub use project_store::InMemoryProjectStore;
