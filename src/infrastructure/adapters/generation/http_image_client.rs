//! HTTP Image Client - 调用远程图像生成 REST 服务
//!
//! 实现 ImageGeneratorPort trait
//!
//! 外部 API:
//! - 角色参考图: POST {base_url}/v1beta/models/{model}:predict
//!   Request: {"instances": [{"prompt": "..."}], "parameters": {...}}
//!   Response: {"predictions": [{"bytesBase64Encoded": "...", "mimeType": "image/png"}]}
//! - 分镜: POST {base_url}/v1beta/models/{model}:generateContent
//!   Request: {"contents": [{"parts": [{"inlineData": {...}}, {"text": "..."}]}], "generationConfig": {...}}
//!   Response: {"candidates": [{"content": {"parts": [{"inlineData": {...}}]}}]}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{GenerationError, GenerationRequest, ImageGeneratorPort};
use crate::domain::comic::ImageData;

const API_KEY_HEADER: &str = "x-goog-api-key";
const NO_CHARACTER_IMAGE: &str = "No image was generated for the character sheet.";
const NO_PANEL_IMAGE: &str = "No image part found in the panel generation response.";

// ----------------------------------------------------------------------
// 请求 / 响应体
// ----------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [PredictInstance<'a>; 1],
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    output_mime_type: &'static str,
    aspect_ratio: &'static str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    #[serde(rename_all = "camelCase")]
    Inline { inline_data: InlineData },
    Text { text: &'a str },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

// ----------------------------------------------------------------------
// 客户端
// ----------------------------------------------------------------------

/// HTTP 图像客户端配置
#[derive(Debug, Clone)]
pub struct HttpImageClientConfig {
    /// 服务基础 URL
    pub base_url: String,
    /// API 密钥
    pub api_key: String,
    /// 角色参考图模型
    pub character_model: String,
    /// 分镜模型
    pub panel_model: String,
    /// 传输层超时（秒），None 表示不设置
    pub timeout_secs: Option<u64>,
}

impl Default for HttpImageClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: String::new(),
            character_model: "imagen-4.0-generate-001".to_string(),
            panel_model: "gemini-2.5-flash-image-preview".to_string(),
            timeout_secs: None,
        }
    }
}

impl HttpImageClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// HTTP 图像客户端
///
/// 每次调用都是一次远程请求，不重试、不缓存
pub struct HttpImageClient {
    client: Client,
    config: HttpImageClientConfig,
}

impl HttpImageClient {
    pub fn new(config: HttpImageClientConfig) -> Result<Self, GenerationError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    /// 发送 JSON 请求并解析 JSON 响应
    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, GenerationError>
    where
        B: Serialize + ?Sized + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    GenerationError::Network(format!("Cannot connect to image service: {}", e))
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Service(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

fn decode_image(data: &str, mime_type: &str) -> Result<ImageData, GenerationError> {
    let image = ImageData::from_base64(data, mime_type)
        .map_err(|e| GenerationError::InvalidResponse(format!("Invalid image payload: {}", e)))?;
    if image.is_empty() {
        return Err(GenerationError::InvalidResponse("Empty image payload".to_string()));
    }
    Ok(image)
}

fn character_image(response: PredictResponse) -> Result<ImageData, GenerationError> {
    let prediction = response
        .predictions
        .into_iter()
        .find(|p| p.bytes_base64_encoded.is_some())
        .ok_or_else(|| GenerationError::NoImage(NO_CHARACTER_IMAGE.to_string()))?;
    let data = prediction.bytes_base64_encoded.unwrap_or_default();
    let mime_type = prediction.mime_type.unwrap_or_else(|| "image/png".to_string());
    decode_image(&data, &mime_type)
}

fn panel_image(response: GenerateContentResponse) -> Result<ImageData, GenerationError> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
        .ok_or_else(|| GenerationError::NoImage(NO_PANEL_IMAGE.to_string()))?;
    decode_image(&inline.data, &inline.mime_type)
}

#[async_trait]
impl ImageGeneratorPort for HttpImageClient {
    async fn generate_character(&self, request: GenerationRequest) -> Result<ImageData, GenerationError> {
        let url = self.model_url(&self.config.character_model, "predict");
        let body = PredictRequest {
            instances: [PredictInstance {
                prompt: &request.prompt,
            }],
            parameters: PredictParameters {
                sample_count: 1,
                output_mime_type: "image/png",
                aspect_ratio: "1:1",
            },
        };

        tracing::debug!(
            url = %url,
            prompt_len = request.prompt.len(),
            "Sending character sheet request"
        );

        let response: PredictResponse = self.post_json(&url, &body).await?;
        let image = character_image(response)?;

        tracing::info!(
            model = %self.config.character_model,
            mime_type = %image.content_type(),
            size_bytes = image.bytes().len(),
            "Character sheet generated"
        );
        Ok(image)
    }

    async fn generate_panel(&self, request: GenerationRequest) -> Result<ImageData, GenerationError> {
        let url = self.model_url(&self.config.panel_model, "generateContent");

        let mut parts = Vec::with_capacity(2);
        if let Some(reference) = &request.reference_image {
            parts.push(Part::Inline {
                inline_data: InlineData {
                    mime_type: reference.content_type().to_string(),
                    data: reference.to_base64(),
                },
            });
        }
        parts.push(Part::Text {
            text: &request.prompt,
        });

        let body = GenerateContentRequest {
            contents: [Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: ["IMAGE", "TEXT"],
            },
        };

        tracing::debug!(
            url = %url,
            prompt_len = request.prompt.len(),
            has_reference = request.reference_image.is_some(),
            style = ?request.style,
            "Sending panel request"
        );

        let response: GenerateContentResponse = self.post_json(&url, &body).await?;
        let image = panel_image(response)?;

        tracing::info!(
            model = %self.config.panel_model,
            mime_type = %image.content_type(),
            size_bytes = image.bytes().len(),
            "Panel image generated"
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = HttpImageClientConfig::default();
        assert_eq!(config.character_model, "imagen-4.0-generate-001");
        assert_eq!(config.panel_model, "gemini-2.5-flash-image-preview");
        assert!(config.timeout_secs.is_none());
    }

    #[test]
    fn test_config_builder_and_urls() {
        let config = HttpImageClientConfig::new("http://example.com:9000/", "key").with_timeout(60);
        assert_eq!(config.timeout_secs, Some(60));
        let client = HttpImageClient::new(config).unwrap();
        assert_eq!(
            client.model_url("imagen-4.0-generate-001", "predict"),
            "http://example.com:9000/v1beta/models/imagen-4.0-generate-001:predict"
        );
    }

    #[test]
    fn test_predict_request_shape() {
        let body = PredictRequest {
            instances: [PredictInstance { prompt: "hero" }],
            parameters: PredictParameters {
                sample_count: 1,
                output_mime_type: "image/png",
                aspect_ratio: "1:1",
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["instances"][0]["prompt"], "hero");
        assert_eq!(json["parameters"]["sampleCount"], 1);
        assert_eq!(json["parameters"]["outputMimeType"], "image/png");
        assert_eq!(json["parameters"]["aspectRatio"], "1:1");
    }

    #[test]
    fn test_generate_content_request_shape() {
        let body = GenerateContentRequest {
            contents: [Content {
                parts: vec![
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: "AQID".to_string(),
                        },
                    },
                    Part::Text { text: "Scene: x" },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["IMAGE", "TEXT"],
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "AQID");
        assert_eq!(parts[1]["text"], "Scene: x");
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["IMAGE", "TEXT"])
        );
    }

    #[test]
    fn test_character_image_extraction() {
        let response: PredictResponse = serde_json::from_str(
            r#"{"predictions":[{"bytesBase64Encoded":"AQID","mimeType":"image/png"}]}"#,
        )
        .unwrap();
        let image = character_image(response).unwrap();
        assert_eq!(image.bytes(), &[1, 2, 3]);

        let empty: PredictResponse = serde_json::from_str("{}").unwrap();
        let err = character_image(empty).unwrap_err();
        assert_eq!(err.reason(), NO_CHARACTER_IMAGE);
    }

    #[test]
    fn test_panel_image_skips_text_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"here you go"},{"inlineData":{"mimeType":"image/jpeg","data":"AQID"}}]}}]}"#,
        )
        .unwrap();
        let image = panel_image(response).unwrap();
        assert_eq!(image.content_type(), "image/jpeg");

        let text_only: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"sorry"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(panel_image(text_only).unwrap_err().reason(), NO_PANEL_IMAGE);
    }
}
