//! Image Generator Port - 图像生成服务抽象
//!
//! 定义角色参考图与分镜图生成的抽象接口，具体实现在 infrastructure/adapters 层。
//! 每次调用都是一次远程请求：不重试、不缓存。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::comic::ImageData;

/// 图像生成错误
///
/// 不携带结构化错误码，只传递远端给出的原因
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Service(String),

    #[error("{0}")]
    InvalidResponse(String),

    /// 响应中没有图像
    #[error("{0}")]
    NoImage(String),
}

impl GenerationError {
    /// 远端失败原因
    pub fn reason(&self) -> &str {
        match self {
            Self::Network(m) | Self::Service(m) | Self::InvalidResponse(m) | Self::NoImage(m) => m,
        }
    }
}

/// 图像生成请求
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// 完整提示词
    pub prompt: String,
    /// 画风标签
    pub style: Option<String>,
    /// 角色参考图（仅分镜生成）
    pub reference_image: Option<ImageData>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            style: None,
            reference_image: None,
        }
    }

    pub fn with_reference(mut self, image: ImageData, style: impl Into<String>) -> Self {
        self.reference_image = Some(image);
        self.style = Some(style.into());
        self
    }
}

/// Image Generator Port
#[async_trait]
pub trait ImageGeneratorPort: Send + Sync {
    /// 由提示词生成角色参考图
    async fn generate_character(&self, request: GenerationRequest) -> Result<ImageData, GenerationError>;

    /// 由参考图 + 场景提示词生成分镜图
    async fn generate_panel(&self, request: GenerationRequest) -> Result<ImageData, GenerationError>;
}
