//! PDF Encoder - 多页 PDF 封装
//!
//! 每个渲染页占一页，图像拉伸铺满固定页面尺寸，无封面

use printpdf::{Image, ImageTransform, Mm, PdfDocument};

use crate::application::ports::{DocumentEncoderPort, EncodeError, ExportFormat, RenderedPage};

/// 像素到毫米的换算分辨率
const PDF_DPI: f32 = 96.0;

#[allow(clippy::cast_precision_loss)]
fn px_to_mm(px: u32) -> f32 {
    px as f32 * 25.4 / PDF_DPI
}

/// PDF 编码器
pub struct PdfEncoder {
    page_width_px: u32,
    page_height_px: u32,
    title: String,
}

impl PdfEncoder {
    pub fn new(page_width_px: u32, page_height_px: u32) -> Self {
        Self {
            page_width_px,
            page_height_px,
            title: "Comic".to_string(),
        }
    }

    /// 设置文档标题
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl DocumentEncoderPort for PdfEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    #[allow(clippy::cast_precision_loss)]
    fn encode(&self, pages: &[RenderedPage]) -> Result<Vec<u8>, EncodeError> {
        let doc = PdfDocument::empty(&self.title);
        let (width_mm, height_mm) = (px_to_mm(self.page_width_px), px_to_mm(self.page_height_px));

        for page in pages {
            let decoded = printpdf::image_crate::load_from_memory(&page.image.png).map_err(|e| {
                EncodeError::InvalidImage(format!("page {}: {}", page.source_index + 1, e))
            })?;
            let rgb = decoded.to_rgb8();
            let (img_w, img_h) = rgb.dimensions();
            let decoded = printpdf::image_crate::DynamicImage::ImageRgb8(rgb);

            let (page_index, layer_index) = doc.add_page(Mm(width_mm), Mm(height_mm), "Layer 1");
            let layer = doc.get_page(page_index).get_layer(layer_index);

            // dpi 固定为 96 时，缩放比即页面像素与图像像素之比
            let transform = ImageTransform {
                translate_x: Some(Mm(0.0)),
                translate_y: Some(Mm(0.0)),
                scale_x: Some(self.page_width_px as f32 / img_w.max(1) as f32),
                scale_y: Some(self.page_height_px as f32 / img_h.max(1) as f32),
                dpi: Some(PDF_DPI),
                ..Default::default()
            };
            Image::from_dynamic_image(&decoded).add_to_layer(layer, transform);
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| EncodeError::Assembly(format!("PDF save failed: {e}")))?;

        tracing::debug!(
            pages = pages.len(),
            size_bytes = bytes.len(),
            "PDF assembled"
        );
        Ok(bytes)
    }
}
