//! Comic Context - Value Objects

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// 项目唯一标识
    ProjectId
);
entity_id!(
    /// 页面唯一标识
    PageId
);
entity_id!(
    /// 分镜唯一标识
    PanelId
);
entity_id!(
    /// 文字元素唯一标识
    TextItemId
);

/// 标识生成器
///
/// 以毫秒级时间戳为基础，时钟未前进时在上一个值上递增，
/// 保证同一进程内生成的标识单调递增、永不重复。
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { last: 0 }
    }

    /// 以已存在的最大标识为起点（从存储加载后使用）
    pub fn seeded(max_existing: i64) -> Self {
        Self { last: max_existing }
    }

    fn next_raw(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        self.last
    }

    pub fn project_id(&mut self) -> ProjectId {
        ProjectId(self.next_raw())
    }

    pub fn page_id(&mut self) -> PageId {
        PageId(self.next_raw())
    }

    pub fn panel_id(&mut self) -> PanelId {
        PanelId(self.next_raw())
    }

    pub fn text_item_id(&mut self) -> TextItemId {
        TextItemId(self.next_raw())
    }
}

/// 项目名称
///
/// 首尾空白会被去除，去除后不能为空
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn new(name: impl AsRef<str>) -> Result<Self, &'static str> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err("项目名称不能为空");
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 导出文件名使用的基础名称（空格替换为下划线）
    pub fn file_stem(&self) -> String {
        self.0.replace(' ', "_")
    }
}

impl std::fmt::Display for ProjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 图像数据（二进制内容 + MIME 类型）
///
/// 持久化时内容以 base64 字符串编码
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    #[serde(rename = "data", with = "base64_bytes")]
    bytes: Vec<u8>,
    #[serde(rename = "mimeType")]
    content_type: String,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// 从 base64 文本解码
    pub fn from_base64(data: &str, content_type: impl Into<String>) -> Result<Self, String> {
        let bytes = BASE64.decode(data.trim()).map_err(|e| e.to_string())?;
        Ok(Self::new(bytes, content_type))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// `data:` URI 形式，供渲染层嵌入
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, self.to_base64())
    }
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
