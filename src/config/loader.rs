//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, GenerationBackend};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `COMICRAFT_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `COMICRAFT_GENERATION__API_KEY=...`
/// - `COMICRAFT_GENERATION__BACKEND=fake`
/// - `COMICRAFT_STORAGE__EXPORT_DIR=/tmp/comics`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("generation.backend", "http")?
        .set_default("generation.base_url", "https://generativelanguage.googleapis.com")?
        .set_default("generation.character_model", "imagen-4.0-generate-001")?
        .set_default("generation.panel_model", "gemini-2.5-flash-image-preview")?
        .set_default("storage.db_path", "data/comicraft.sled")?
        .set_default("storage.export_dir", "data/exports")?
        .set_default("export.page_width", 1280)?
        .set_default("export.pixel_ratio", 1.5)?
        .set_default("export.pdf_page_width", 1280)?
        .set_default("export.pdf_page_height", 1775)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: COMICRAFT_GENERATION__BASE_URL=http://localhost:9000
    builder = builder.add_source(
        Environment::with_prefix("COMICRAFT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.generation.backend == GenerationBackend::Http {
        if config.generation.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "Generation base URL cannot be empty".to_string(),
            ));
        }
        if config.generation.api_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "Generation API key is required for the http backend".to_string(),
            ));
        }
    }

    if config.generation.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "Generation timeout cannot be 0".to_string(),
        ));
    }

    if config.storage.db_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    if config.export.page_width == 0
        || config.export.pdf_page_width == 0
        || config.export.pdf_page_height == 0
    {
        return Err(ConfigError::ValidationError(
            "Export page dimensions must be positive".to_string(),
        ));
    }

    if !(config.export.pixel_ratio > 0.0 && config.export.pixel_ratio <= 4.0) {
        return Err(ConfigError::ValidationError(
            "Pixel ratio must be in (0, 4]".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Generation Backend: {:?}", config.generation.backend);
    if config.generation.backend == GenerationBackend::Http {
        tracing::info!("Generation URL: {}", config.generation.base_url);
        tracing::info!("Character Model: {}", config.generation.character_model);
        tracing::info!("Panel Model: {}", config.generation.panel_model);
        match config.generation.timeout_secs {
            Some(secs) => tracing::info!("Generation Timeout: {}s", secs),
            None => tracing::info!("Generation Timeout: none"),
        }
    }
    tracing::info!("Database: {:?}", config.storage.db_path);
    tracing::info!("Export Directory: {:?}", config.storage.export_dir);
    tracing::info!(
        "Export Page: {}px @ {}x, PDF {}x{}px",
        config.export.page_width,
        config.export.pixel_ratio,
        config.export.pdf_page_width,
        config.export.pdf_page_height
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
