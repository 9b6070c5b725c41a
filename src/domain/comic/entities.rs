//! Comic Context - Entities

use serde::{Deserialize, Serialize};

use super::{ImageData, PageId, PanelId, TextItemId};

/// 文字元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextKind {
    /// 对白气泡
    Dialogue,
    /// 旁白框
    Narration,
    /// 拟声词
    Sfx,
}

impl TextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextKind::Dialogue => "dialogue",
            TextKind::Narration => "narration",
            TextKind::Sfx => "sfx",
        }
    }
}

/// 分镜上的文字元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextItem {
    id: TextItemId,
    #[serde(rename = "type")]
    kind: TextKind,
    text: String,
}

impl TextItem {
    pub fn new(id: TextItemId, kind: TextKind, text: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            text: text.into(),
        }
    }

    pub fn id(&self) -> TextItemId {
        self.id
    }

    pub fn kind(&self) -> TextKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// 角色参考
///
/// 创建后不可修改，只能整体替换
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    prompt: String,
    style: String,
    image: ImageData,
}

impl Character {
    pub fn new(prompt: impl Into<String>, style: impl Into<String>, image: ImageData) -> Self {
        Self {
            prompt: prompt.into(),
            style: style.into(),
            image,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn image(&self) -> &ImageData {
        &self.image
    }
}

/// 分镜
///
/// 不变量:
/// - `is_loading` 为 true 时 image 为空
/// - 生成结束后不会停留在 loading 状态（要么补全图像，要么被移除）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    id: PanelId,
    scene: String,
    #[serde(rename = "textItems")]
    text_items: Vec<TextItem>,
    image: Option<ImageData>,
    #[serde(rename = "isLoading")]
    is_loading: bool,
}

impl Panel {
    /// 创建处于生成中状态的分镜
    pub fn pending(id: PanelId, scene: impl Into<String>, text_items: Vec<TextItem>) -> Self {
        Self {
            id,
            scene: scene.into(),
            text_items,
            image: None,
            is_loading: true,
        }
    }

    /// 附加生成结果并清除 loading 标记
    pub fn complete(&mut self, image: ImageData) {
        self.image = Some(image);
        self.is_loading = false;
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn text_items(&self) -> &[TextItem] {
        &self.text_items
    }

    pub fn items_of(&self, kind: TextKind) -> impl Iterator<Item = &TextItem> {
        self.text_items.iter().filter(move |item| item.kind == kind)
    }

    pub fn image(&self) -> Option<&ImageData> {
        self.image.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }
}

/// 页面（分镜的有序容器）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    id: PageId,
    panels: Vec<Panel>,
}

impl Page {
    pub fn new(id: PageId) -> Self {
        Self {
            id,
            panels: Vec::new(),
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn contains_panel(&self, panel_id: PanelId) -> bool {
        self.panels.iter().any(|p| p.id == panel_id)
    }

    pub(crate) fn push_panel(&mut self, panel: Panel) {
        self.panels.push(panel);
    }

    pub(crate) fn panel_mut(&mut self, panel_id: PanelId) -> Option<&mut Panel> {
        self.panels.iter_mut().find(|p| p.id == panel_id)
    }

    /// 移除所有生成中的分镜，返回移除数量
    pub(crate) fn drop_pending_panels(&mut self) -> usize {
        let before = self.panels.len();
        self.panels.retain(|p| !p.is_loading);
        before - self.panels.len()
    }

    /// 按 id 移除分镜，返回是否有元素被移除
    pub(crate) fn remove_panel(&mut self, panel_id: PanelId) -> bool {
        let before = self.panels.len();
        self.panels.retain(|p| p.id != panel_id);
        self.panels.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_panel_has_no_image() {
        let panel = Panel::pending(PanelId::from_raw(1), "scene", Vec::new());
        assert!(panel.is_loading());
        assert!(panel.image().is_none());
    }

    #[test]
    fn test_complete_clears_loading() {
        let mut panel = Panel::pending(PanelId::from_raw(1), "scene", Vec::new());
        panel.complete(ImageData::new(vec![1], "image/png"));
        assert!(!panel.is_loading());
        assert_eq!(panel.image().unwrap().bytes(), &[1]);
    }

    #[test]
    fn test_page_remove_panel_by_id() {
        let mut page = Page::new(PageId::from_raw(1));
        page.push_panel(Panel::pending(PanelId::from_raw(2), "a", Vec::new()));
        page.push_panel(Panel::pending(PanelId::from_raw(3), "b", Vec::new()));

        assert!(page.remove_panel(PanelId::from_raw(2)));
        assert!(!page.remove_panel(PanelId::from_raw(2)));
        assert_eq!(page.panel_count(), 1);
        assert!(page.contains_panel(PanelId::from_raw(3)));
    }

    #[test]
    fn test_text_item_kind_serialization() {
        let item = TextItem::new(TextItemId::from_raw(5), TextKind::Sfx, "BOOM");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "sfx");
        assert_eq!(json["text"], "BOOM");
    }
}
