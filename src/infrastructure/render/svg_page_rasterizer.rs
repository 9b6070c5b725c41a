//! SVG Page Rasterizer
//!
//! 把页面合成为 SVG 场景，再经 usvg/resvg/tiny-skia 栅格化为 PNG。
//!
//! 流程:
//! 1. settle: 解码页面内全部分镜图像，任何一张失败则整页失败
//! 2. compose: 按网格布局生成 SVG（分镜图、旁白框、对白气泡、音效字）
//! 3. rasterize: 在阻塞线程池上渲染到临时 Pixmap 并编码 PNG
//!
//! Pixmap 只存在于单次调用内，任何路径返回时都会被释放。

use async_trait::async_trait;
use image::ImageFormat;
use std::io::Cursor;
use std::sync::Arc;
use usvg::fontdb;

use crate::application::ports::{PageRasterizerPort, RasterImage, RenderError};
use crate::domain::comic::{ImageData, Page, Panel, TextKind};
use crate::domain::layout::{layout_page, wrap_text, PanelRect, DEFAULT_PAGE_WIDTH, PAGE_PADDING};
use crate::domain::Theme;

const PAGE_SURFACE: &str = "#0F172A";
const PAGE_FRAME: &str = "#334155";
const PANEL_SURFACE: &str = "#1E293B";
const MUTED_TEXT: &str = "#94A3B8";
const FAINT_TEXT: &str = "#64748B";
const BODY_FONT: &str = "Inter, sans-serif";
const SFX_FONT: &str = "Bangers, Impact, sans-serif";

/// 近似字宽（相对字号）
const CHAR_WIDTH_RATIO: f32 = 0.55;
const BUBBLE_FONT_SIZE: f32 = 16.0;
const BUBBLE_PADDING: f32 = 12.0;
const BUBBLE_TAIL: f32 = 10.0;
const NARRATION_FONT_SIZE: f32 = 16.0;
const NARRATION_PADDING: f32 = 8.0;
const SFX_FONT_SIZE: f32 = 96.0;
const LINE_HEIGHT: f32 = 1.5;
const OVERLAY_GAP: f32 = 8.0;

/// 向 SVG 缓冲区追加格式化片段
macro_rules! push_svg {
    ($svg:expr, $($arg:tt)*) => {
        $svg.push_str(&format!($($arg)*))
    };
}

/// 栅格化配置
#[derive(Debug, Clone)]
pub struct SvgRasterizerConfig {
    /// 页面逻辑宽度
    pub page_width: u32,
    /// 输出倍率
    pub pixel_ratio: f32,
}

impl Default for SvgRasterizerConfig {
    fn default() -> Self {
        Self {
            page_width: DEFAULT_PAGE_WIDTH,
            pixel_ratio: 1.5,
        }
    }
}

/// SVG 页面栅格化器
///
/// 字体库只加载一次，在各次调用间共享
pub struct SvgPageRasterizer {
    config: SvgRasterizerConfig,
    fontdb: Arc<fontdb::Database>,
}

impl SvgPageRasterizer {
    /// 创建栅格化器并加载系统字体
    pub fn new(config: SvgRasterizerConfig) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        tracing::info!(
            page_width = config.page_width,
            pixel_ratio = config.pixel_ratio,
            fonts = db.len(),
            "SvgPageRasterizer initialized"
        );
        Self::with_fonts(config, Arc::new(db))
    }

    /// 使用给定字体库创建
    pub fn with_fonts(config: SvgRasterizerConfig, fontdb: Arc<fontdb::Database>) -> Self {
        Self { config, fontdb }
    }

    /// 生成页面的 SVG 场景
    pub fn page_svg(&self, page: &Page, theme: Theme) -> Result<String, RenderError> {
        let images = settle_images(page)?;
        Ok(compose_page(page, &images, theme, &self.config))
    }
}

#[async_trait]
impl PageRasterizerPort for SvgPageRasterizer {
    async fn rasterize(&self, page: &Page, theme: Theme) -> Result<RasterImage, RenderError> {
        let owned = page.clone();
        let config = self.config.clone();
        let fontdb = Arc::clone(&self.fontdb);

        let image = tokio::task::spawn_blocking(move || {
            let images = settle_images(&owned)?;
            let svg = compose_page(&owned, &images, theme, &config);
            render_png(&svg, fontdb)
        })
        .await
        .map_err(|e| RenderError::Raster(format!("Render task failed: {e}")))??;

        tracing::debug!(
            page_id = %page.id(),
            width = image.width,
            height = image.height,
            size_bytes = image.png.len(),
            "Page rasterized"
        );
        Ok(image)
    }
}

// ----------------------------------------------------------------------
// settle
// ----------------------------------------------------------------------

/// 解码全部分镜图像，返回与分镜一一对应的 data URI（生成中的分镜为 None）
///
/// PNG/JPEG 原样嵌入，其他格式转为 PNG
fn settle_images(page: &Page) -> Result<Vec<Option<String>>, RenderError> {
    page.panels()
        .iter()
        .enumerate()
        .map(|(index, panel)| match panel.image() {
            Some(image) if !panel.is_loading() => settle_image(image)
                .map(Some)
                .map_err(|e| RenderError::ImageDecode(format!("panel {}: {}", index + 1, e))),
            _ => Ok(None),
        })
        .collect()
}

fn settle_image(image: &ImageData) -> Result<String, String> {
    let format = image::guess_format(image.bytes()).map_err(|e| e.to_string())?;
    let decoded = image::load_from_memory_with_format(image.bytes(), format)
        .map_err(|e| e.to_string())?;

    match format {
        ImageFormat::Png | ImageFormat::Jpeg => Ok(image.to_data_uri()),
        _ => {
            let mut buffer = Cursor::new(Vec::new());
            decoded
                .write_to(&mut buffer, ImageFormat::Png)
                .map_err(|e| e.to_string())?;
            Ok(ImageData::new(buffer.into_inner(), "image/png").to_data_uri())
        }
    }
}

// ----------------------------------------------------------------------
// compose
// ----------------------------------------------------------------------

#[allow(clippy::cast_precision_loss)]
fn compose_page(
    page: &Page,
    images: &[Option<String>],
    theme: Theme,
    config: &SvgRasterizerConfig,
) -> String {
    let layout = layout_page(page.panel_count(), config.page_width as f32);
    let (w, h) = (layout.width, layout.height);
    let out_w = (w * config.pixel_ratio).round().max(1.0);
    let out_h = (h * config.pixel_ratio).round().max(1.0);

    let mut svg = String::with_capacity(4096);
    push_svg!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {w} {h}\">"
    );
    push_svg!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background_hex()
    );
    push_svg!(
        svg,
        "<rect x=\"2\" y=\"2\" width=\"{}\" height=\"{}\" rx=\"8\" fill=\"{PAGE_SURFACE}\" stroke=\"{PAGE_FRAME}\" stroke-width=\"4\"/>",
        w - 4.0,
        h - 4.0
    );

    if page.is_empty() {
        empty_placeholder(&mut svg, w, h);
    }

    for (index, (panel, rect)) in page.panels().iter().zip(&layout.panels).enumerate() {
        let image = images.get(index).and_then(Option::as_deref);
        panel_svg(&mut svg, index, panel, rect, image);
    }

    svg.push_str("</svg>");
    svg
}

fn empty_placeholder(svg: &mut String, w: f32, h: f32) {
    let x = PAGE_PADDING;
    let y = PAGE_PADDING;
    let width = w - PAGE_PADDING * 2.0;
    let height = h - PAGE_PADDING * 2.0;
    let (cx, cy) = (x + width / 2.0, y + height / 2.0);
    push_svg!(
        svg,
        "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" rx=\"6\" fill=\"none\" stroke=\"{PAGE_FRAME}\" stroke-width=\"2\" stroke-dasharray=\"8 6\"/>"
    );
    push_svg!(
        svg,
        "<text x=\"{cx}\" y=\"{}\" font-size=\"20\" font-weight=\"600\" fill=\"{MUTED_TEXT}\" text-anchor=\"middle\" font-family=\"{BODY_FONT}\">Your Comic Page Awaits</text>",
        cy - 6.0
    );
    push_svg!(
        svg,
        "<text x=\"{cx}\" y=\"{}\" font-size=\"16\" fill=\"{FAINT_TEXT}\" text-anchor=\"middle\" font-family=\"{BODY_FONT}\">Create a character and add panels to begin your story.</text>",
        cy + 20.0
    );
}

fn panel_svg(svg: &mut String, index: usize, panel: &Panel, rect: &PanelRect, image: Option<&str>) {
    let PanelRect { x, y, width, height } = *rect;
    let clip_id = format!("panel-clip-{index}");

    push_svg!(
        svg,
        "<clipPath id=\"{clip_id}\"><rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" rx=\"6\"/></clipPath>"
    );
    push_svg!(svg, "<g clip-path=\"url(#{clip_id})\">");
    push_svg!(
        svg,
        "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" fill=\"{PANEL_SURFACE}\"/>"
    );

    match image {
        Some(href) if !panel.is_loading() => {
            push_svg!(
                svg,
                "<image x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" preserveAspectRatio=\"xMidYMid slice\" href=\"{href}\"/>"
            );
            for item in panel.items_of(TextKind::Sfx) {
                sfx_svg(svg, rect, item.text());
            }
            dialogue_svg(svg, rect, panel);
            narration_svg(svg, rect, panel);
        }
        _ => loading_svg(svg, rect),
    }

    svg.push_str("</g>");
    push_svg!(
        svg,
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"6\" fill=\"none\" stroke=\"#FFFFFF\" stroke-width=\"4\"/>",
        x + 2.0,
        y + 2.0,
        width - 4.0,
        height - 4.0
    );
}

fn loading_svg(svg: &mut String, rect: &PanelRect) {
    let (cx, cy) = rect.center();
    push_svg!(
        svg,
        "<circle cx=\"{cx}\" cy=\"{}\" r=\"20\" fill=\"none\" stroke=\"{FAINT_TEXT}\" stroke-width=\"4\" stroke-dasharray=\"90 40\"/>",
        cy - 30.0
    );
    push_svg!(
        svg,
        "<text x=\"{cx}\" y=\"{}\" font-size=\"14\" fill=\"{MUTED_TEXT}\" text-anchor=\"middle\" font-family=\"{BODY_FONT}\">Generating panel...</text>",
        cy + 16.0
    );
    push_svg!(
        svg,
        "<text x=\"{cx}\" y=\"{}\" font-size=\"14\" fill=\"{MUTED_TEXT}\" text-anchor=\"middle\" font-family=\"{BODY_FONT}\">This can take a moment.</text>",
        cy + 36.0
    );
}

/// 音效字：大写、居中、逆时针旋转 12 度
fn sfx_svg(svg: &mut String, rect: &PanelRect, text: &str) {
    let (cx, cy) = rect.center();
    push_svg!(
        svg,
        "<text x=\"{cx}\" y=\"{}\" transform=\"rotate(-12 {cx} {cy})\" font-size=\"{SFX_FONT_SIZE}\" font-weight=\"900\" fill=\"#FBBF24\" stroke=\"#C2410C\" stroke-width=\"4\" paint-order=\"stroke fill\" text-anchor=\"middle\" font-family=\"{SFX_FONT}\">{}</text>",
        cy + SFX_FONT_SIZE / 3.0,
        escape_xml(&text.to_uppercase())
    );
}

#[allow(clippy::cast_precision_loss)]
fn text_width(line: &str, font_size: f32) -> f32 {
    line.chars().count() as f32 * font_size * CHAR_WIDTH_RATIO
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn chars_per_line(max_width: f32, font_size: f32) -> usize {
    (max_width / (font_size * CHAR_WIDTH_RATIO)).floor().max(1.0) as usize
}

/// 对白气泡：从底部往上堆叠，第一条在最下方
#[allow(clippy::cast_precision_loss)]
fn dialogue_svg(svg: &mut String, rect: &PanelRect, panel: &Panel) {
    let left = rect.x + 16.0;
    let max_width = (rect.width - 32.0) * 0.8;
    let line_height = BUBBLE_FONT_SIZE * LINE_HEIGHT;
    let mut bottom = rect.y + rect.height - 16.0;

    for item in panel.items_of(TextKind::Dialogue) {
        let lines = wrap_text(
            item.text(),
            chars_per_line(max_width - BUBBLE_PADDING * 2.0, BUBBLE_FONT_SIZE),
        );
        let widest = lines
            .iter()
            .map(|l| text_width(l, BUBBLE_FONT_SIZE))
            .fold(0.0_f32, f32::max);
        let bubble_w = (widest + BUBBLE_PADDING * 2.0).min(max_width);
        let bubble_h = lines.len() as f32 * line_height + BUBBLE_PADDING * 2.0;
        let top = bottom - bubble_h;

        push_svg!(
            svg,
            "<rect x=\"{left}\" y=\"{top}\" width=\"{bubble_w}\" height=\"{bubble_h}\" rx=\"12\" fill=\"#FFFFFF\"/>"
        );
        let tail_x = left + 16.0;
        push_svg!(
            svg,
            "<path d=\"M {tail_x} {bottom} L {} {bottom} L {} {} Z\" fill=\"#FFFFFF\"/>",
            tail_x + BUBBLE_TAIL * 2.0,
            tail_x + BUBBLE_TAIL,
            bottom + BUBBLE_TAIL
        );
        for (i, line) in lines.iter().enumerate() {
            let baseline = top + BUBBLE_PADDING + (i as f32 + 0.75) * line_height;
            push_svg!(
                svg,
                "<text x=\"{}\" y=\"{baseline}\" font-size=\"{BUBBLE_FONT_SIZE}\" font-weight=\"600\" fill=\"#000000\" font-family=\"{BODY_FONT}\">{}</text>",
                left + BUBBLE_PADDING,
                escape_xml(line)
            );
        }

        bottom = top - OVERLAY_GAP;
    }
}

/// 旁白框：从顶部往下堆叠，水平居中
#[allow(clippy::cast_precision_loss)]
fn narration_svg(svg: &mut String, rect: &PanelRect, panel: &Panel) {
    let max_width = rect.width - 16.0;
    let center_x = rect.x + rect.width / 2.0;
    let line_height = NARRATION_FONT_SIZE * LINE_HEIGHT;
    let mut top = rect.y + 8.0;

    for item in panel.items_of(TextKind::Narration) {
        let lines = wrap_text(
            item.text(),
            chars_per_line(max_width - NARRATION_PADDING * 2.0, NARRATION_FONT_SIZE),
        );
        let widest = lines
            .iter()
            .map(|l| text_width(l, NARRATION_FONT_SIZE))
            .fold(0.0_f32, f32::max);
        let box_w = (widest + NARRATION_PADDING * 2.0).min(max_width);
        let box_h = lines.len() as f32 * line_height + NARRATION_PADDING * 2.0;

        push_svg!(
            svg,
            "<rect x=\"{}\" y=\"{top}\" width=\"{box_w}\" height=\"{box_h}\" rx=\"6\" fill=\"#1E293B\" fill-opacity=\"0.8\" stroke=\"#475569\" stroke-width=\"2\"/>",
            center_x - box_w / 2.0
        );
        for (i, line) in lines.iter().enumerate() {
            let baseline = top + NARRATION_PADDING + (i as f32 + 0.75) * line_height;
            push_svg!(
                svg,
                "<text x=\"{center_x}\" y=\"{baseline}\" font-size=\"{NARRATION_FONT_SIZE}\" font-style=\"italic\" fill=\"#FFFFFF\" text-anchor=\"middle\" font-family=\"{BODY_FONT}\">{}</text>",
                escape_xml(line)
            );
        }

        top += box_h + OVERLAY_GAP;
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

// ----------------------------------------------------------------------
// rasterize
// ----------------------------------------------------------------------

fn render_png(svg: &str, fontdb: Arc<fontdb::Database>) -> Result<RasterImage, RenderError> {
    let mut opt = usvg::Options::default();
    opt.fontdb = fontdb;
    let tree = usvg::Tree::from_str(svg, &opt)
        .map_err(|e| RenderError::Scene(format!("SVG parsing failed: {e}")))?;

    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| RenderError::Raster("Failed to create pixmap".to_string()))?;

    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    let png = pixmap
        .encode_png()
        .map_err(|e| RenderError::Encode(format!("PNG encoding failed: {e}")))?;

    Ok(RasterImage {
        width: pixmap.width(),
        height: pixmap.height(),
        png,
    })
}
