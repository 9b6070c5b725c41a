//! Storage Adapter - 导出文件存储

mod file_export_sink;

pub use file_export_sink::FileExportSink;
