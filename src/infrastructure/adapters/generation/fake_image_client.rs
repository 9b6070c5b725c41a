//! Fake Image Client - 用于测试与离线运行的图像客户端
//!
//! 不调用远程服务，按提示词生成纯色 PNG

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::time::Duration;

use crate::application::ports::{GenerationError, GenerationRequest, ImageGeneratorPort};
use crate::domain::comic::ImageData;

/// Fake 图像客户端配置
#[derive(Debug, Clone)]
pub struct FakeImageClientConfig {
    /// 角色参考图边长（px）
    pub character_size: u32,
    /// 分镜图宽高（px）
    pub panel_size: (u32, u32),
    /// 模拟延迟
    pub delay_ms: u64,
    /// 设置后所有调用都以该原因失败
    pub failure: Option<String>,
}

impl Default for FakeImageClientConfig {
    fn default() -> Self {
        Self {
            character_size: 64,
            panel_size: (96, 72),
            delay_ms: 0,
            failure: None,
        }
    }
}

/// Fake 图像客户端
pub struct FakeImageClient {
    config: FakeImageClientConfig,
}

impl FakeImageClient {
    pub fn new(config: FakeImageClientConfig) -> Self {
        tracing::info!(
            delay_ms = config.delay_ms,
            failing = config.failure.is_some(),
            "FakeImageClient initialized"
        );
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeImageClientConfig::default())
    }

    /// 总是以给定原因失败
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::new(FakeImageClientConfig {
            failure: Some(reason.into()),
            ..Default::default()
        })
    }

    async fn produce(&self, prompt: &str, width: u32, height: u32) -> Result<ImageData, GenerationError> {
        if self.config.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
        }
        if let Some(reason) = &self.config.failure {
            return Err(GenerationError::Service(reason.clone()));
        }
        let bytes = solid_png(prompt_color(prompt), width, height)?;
        Ok(ImageData::new(bytes, "image/png"))
    }
}

/// 由提示词确定的颜色，同样的输入得到同样的图像
fn prompt_color(prompt: &str) -> Rgba<u8> {
    let hash = prompt
        .bytes()
        .fold(0x811c_9dc5_u32, |acc, b| (acc ^ b as u32).wrapping_mul(0x0100_0193));
    let [r, g, b, _] = hash.to_le_bytes();
    Rgba([r, g, b, 255])
}

fn solid_png(color: Rgba<u8>, width: u32, height: u32) -> Result<Vec<u8>, GenerationError> {
    let image = RgbaImage::from_pixel(width.max(1), height.max(1), color);
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
    Ok(buffer.into_inner())
}

#[async_trait]
impl ImageGeneratorPort for FakeImageClient {
    async fn generate_character(&self, request: GenerationRequest) -> Result<ImageData, GenerationError> {
        tracing::debug!(prompt_len = request.prompt.len(), "FakeImageClient: character sheet");
        let size = self.config.character_size;
        self.produce(&request.prompt, size, size).await
    }

    async fn generate_panel(&self, request: GenerationRequest) -> Result<ImageData, GenerationError> {
        tracing::debug!(
            prompt_len = request.prompt.len(),
            has_reference = request.reference_image.is_some(),
            "FakeImageClient: panel"
        );
        let (width, height) = self.config.panel_size;
        self.produce(&request.prompt, width, height).await
    }
}
