//! Comicraft - AI 漫画工作室
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Comic Context: 项目、角色、页面、分镜、文字元素
//! - Workspace: 项目集合与当前项目指针
//! - Layout: 页面网格布局
//!
//! 应用层 (application/):
//! - Ports: 端口定义（ImageGenerator, ProjectStore, PageRasterizer, DocumentEncoder, ExportSink, StudioEvents）
//! - Commands: Studio 操作命令
//! - Studio: 状态协调与乐观插入
//! - Export: 页面栅格化与文档导出
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: 图像生成客户端、导出文件存储
//! - Persistence: Sled 项目存储
//! - Memory: 内存存储（测试用）
//! - Render: SVG 合成与栅格化
//! - Export: PDF / CBZ 编码
//! - Events: 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
