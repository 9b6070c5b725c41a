//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 图像生成配置
    #[serde(default)]
    pub generation: GenerationConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 导出配置
    #[serde(default)]
    pub export: ExportConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 图像生成后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    /// 远程 REST 服务
    #[default]
    Http,
    /// 离线假实现
    Fake,
}

/// 图像生成配置
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub backend: GenerationBackend,

    /// 服务基础 URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API 密钥（仅从配置文件或环境变量读取，不打印）
    #[serde(default)]
    pub api_key: String,

    /// 角色参考图模型
    #[serde(default = "default_character_model")]
    pub character_model: String,

    /// 分镜模型
    #[serde(default = "default_panel_model")]
    pub panel_model: String,

    /// 传输层超时（秒），默认不设置
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_character_model() -> String {
    "imagen-4.0-generate-001".to_string()
}

fn default_panel_model() -> String {
    "gemini-2.5-flash-image-preview".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: GenerationBackend::default(),
            base_url: default_base_url(),
            api_key: String::new(),
            character_model: default_character_model(),
            panel_model: default_panel_model(),
            timeout_secs: None,
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// sled 数据库目录
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// 导出文件目录
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/comicraft.sled")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("data/exports")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            export_dir: default_export_dir(),
        }
    }
}

/// 导出配置
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// 页面逻辑宽度（px）
    #[serde(default = "default_page_width")]
    pub page_width: u32,

    /// 栅格化倍率
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f32,

    /// PDF 页面宽度（px，按 96 dpi 换算）
    #[serde(default = "default_pdf_page_width")]
    pub pdf_page_width: u32,

    /// PDF 页面高度（px）
    #[serde(default = "default_pdf_page_height")]
    pub pdf_page_height: u32,
}

fn default_page_width() -> u32 {
    1280
}

fn default_pixel_ratio() -> f32 {
    1.5
}

fn default_pdf_page_width() -> u32 {
    1280
}

fn default_pdf_page_height() -> u32 {
    1775
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_width: default_page_width(),
            pixel_ratio: default_pixel_ratio(),
            pdf_page_width: default_pdf_page_width(),
            pdf_page_height: default_pdf_page_height(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.generation.backend, GenerationBackend::Http);
        assert_eq!(config.generation.character_model, "imagen-4.0-generate-001");
        assert!(config.generation.timeout_secs.is_none());
        assert_eq!(config.storage.db_path, PathBuf::from("data/comicraft.sled"));
        assert_eq!(config.export.page_width, 1280);
        assert_eq!(config.export.pdf_page_height, 1775);
    }

    #[test]
    fn test_backend_parses_lowercase() {
        let backend: GenerationBackend = serde_json::from_str("\"fake\"").unwrap();
        assert_eq!(backend, GenerationBackend::Fake);
    }
}
