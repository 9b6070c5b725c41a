//! Page Layout - 页面网格布局
//!
//! 纯计算：给定分镜数量与页面宽度，得出每个分镜的矩形位置和页面高度。
//! 规则:
//! - 两列网格，内边距与间距均为 16px
//! - 只有一个分镜，或分镜数为大于 2 的奇数时的最后一个分镜，独占整行
//! - 单元格保持 4:3，所有行取最高一行的高度
//! - 页面最小高度 600px

/// 页面内边距
pub const PAGE_PADDING: f32 = 16.0;
/// 单元格间距
pub const CELL_GAP: f32 = 16.0;
/// 页面最小高度
pub const MIN_PAGE_HEIGHT: f32 = 600.0;
/// 默认导出宽度（逻辑像素）
pub const DEFAULT_PAGE_WIDTH: u32 = 1280;

const COLUMNS: usize = 2;
const ASPECT_W: f32 = 4.0;
const ASPECT_H: f32 = 3.0;

/// 分镜在页面中的位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PanelRect {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// 页面布局结果
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub panels: Vec<PanelRect>,
}

/// 分镜是否独占整行
pub fn spans_full_row(index: usize, count: usize) -> bool {
    count == 1 || (count > 2 && index == count - 1 && count % 2 != 0)
}

/// 计算页面布局
#[allow(clippy::cast_precision_loss)]
pub fn layout_page(panel_count: usize, page_width: f32) -> PageLayout {
    let inner_width = (page_width - PAGE_PADDING * 2.0).max(1.0);
    let half_width = (inner_width - CELL_GAP * (COLUMNS as f32 - 1.0)) / COLUMNS as f32;

    if panel_count == 0 {
        return PageLayout {
            width: page_width,
            height: MIN_PAGE_HEIGHT,
            panels: Vec::new(),
        };
    }

    // 先划分行：每行是该行内分镜的索引
    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut index = 0;
    while index < panel_count {
        if spans_full_row(index, panel_count) {
            rows.push(vec![index]);
            index += 1;
        } else if index + 1 < panel_count && !spans_full_row(index + 1, panel_count) {
            rows.push(vec![index, index + 1]);
            index += 2;
        } else {
            rows.push(vec![index]);
            index += 1;
        }
    }

    let full_height = inner_width * ASPECT_H / ASPECT_W;
    let half_height = half_width * ASPECT_H / ASPECT_W;
    let row_height = rows
        .iter()
        .map(|row| {
            if row.len() == 1 && spans_full_row(row[0], panel_count) {
                full_height
            } else {
                half_height
            }
        })
        .fold(0.0_f32, f32::max);

    let mut panels = Vec::with_capacity(panel_count);
    for (row_index, row) in rows.iter().enumerate() {
        let y = PAGE_PADDING + row_index as f32 * (row_height + CELL_GAP);
        for (column, &panel_index) in row.iter().enumerate() {
            let full = spans_full_row(panel_index, panel_count);
            let width = if full { inner_width } else { half_width };
            let x = PAGE_PADDING + column as f32 * (half_width + CELL_GAP);
            panels.push(PanelRect {
                x,
                y,
                width,
                height: row_height,
            });
        }
    }

    let content_height =
        PAGE_PADDING * 2.0 + rows.len() as f32 * row_height + (rows.len() as f32 - 1.0) * CELL_GAP;

    PageLayout {
        width: page_width,
        height: content_height.max(MIN_PAGE_HEIGHT),
        panels,
    }
}

/// 按字符数近似折行
///
/// 以空白切词；单个超长词会被硬切分
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
