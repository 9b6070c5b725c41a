//! Render Adapter - 页面栅格化实现

mod svg_page_rasterizer;

pub use svg_page_rasterizer::{SvgPageRasterizer, SvgRasterizerConfig};
