//! Generation Adapter - 图像生成客户端实现

mod fake_image_client;
mod http_image_client;

pub use fake_image_client::{FakeImageClient, FakeImageClientConfig};
pub use http_image_client::*;
