//! Comic Context - Aggregate Root

use serde::{Deserialize, Serialize};

use super::{Character, ComicError, ImageData, Page, PageId, Panel, PanelId, ProjectId, ProjectName};

/// Project 聚合根
///
/// 不变量:
/// - 页面序列永不为空
/// - 只有已创建角色的项目才能添加分镜
/// - 分镜的补全/撤回按 id 定位，不依赖页面位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    name: ProjectName,
    character: Option<Character>,
    pages: Vec<Page>,
}

impl Project {
    /// 创建新项目（无角色，一个空白页）
    pub fn new(id: ProjectId, name: ProjectName, first_page: PageId) -> Self {
        Self {
            id,
            name,
            character: None,
            pages: vec![Page::new(first_page)],
        }
    }

    /// 开始重新生成角色：清空角色，页面重置为单个空白页
    ///
    /// 分镜的一致性依赖参考图，换角色即作废所有分镜
    pub fn reset_for_character(&mut self, fresh_page: PageId) {
        self.character = None;
        self.pages = vec![Page::new(fresh_page)];
    }

    pub fn attach_character(&mut self, character: Character) {
        self.character = Some(character);
    }

    /// 在指定页末尾插入生成中的分镜
    pub fn push_pending_panel(&mut self, page_index: usize, panel: Panel) -> Result<(), ComicError> {
        if self.character.is_none() {
            return Err(ComicError::MissingCharacter);
        }
        let count = self.pages.len();
        let page = self
            .pages
            .get_mut(page_index)
            .ok_or(ComicError::PageOutOfRange { index: page_index, count })?;
        page.push_panel(panel);
        Ok(())
    }

    /// 扫描所有页面，补全匹配 id 的分镜
    ///
    /// 目标已不存在时返回 false
    pub fn complete_panel(&mut self, panel_id: PanelId, image: ImageData) -> bool {
        match self.pages.iter_mut().find_map(|page| page.panel_mut(panel_id)) {
            Some(panel) => {
                panel.complete(image);
                true
            }
            None => false,
        }
    }

    /// 扫描所有页面，移除匹配 id 的分镜
    pub fn retract_panel(&mut self, panel_id: PanelId) -> bool {
        self.pages.iter_mut().any(|page| page.remove_panel(panel_id))
    }

    /// 从指定页移除分镜；页或分镜不存在时不做任何事
    pub fn remove_panel(&mut self, page_index: usize, panel_id: PanelId) -> bool {
        self.pages
            .get_mut(page_index)
            .map(|page| page.remove_panel(panel_id))
            .unwrap_or(false)
    }

    /// 追加空白页，返回新页的索引
    pub fn add_page(&mut self, page_id: PageId) -> usize {
        self.pages.push(Page::new(page_id));
        self.pages.len() - 1
    }

    /// 删除指定页；只剩一页时拒绝
    pub fn remove_page(&mut self, index: usize) -> Result<Page, ComicError> {
        if self.pages.len() <= 1 {
            return Err(ComicError::LastPage);
        }
        if index >= self.pages.len() {
            return Err(ComicError::PageOutOfRange {
                index,
                count: self.pages.len(),
            });
        }
        Ok(self.pages.remove(index))
    }

    /// 修复从存储加载的项目
    ///
    /// 生成中的分镜已没有续体可以完成它们，直接移除；
    /// 页面序列为空时补一个空白页。返回移除的分镜数与是否补页
    pub(crate) fn repair_loaded(&mut self, fresh_page: impl FnOnce() -> PageId) -> (usize, bool) {
        let dropped = self.pages.iter_mut().map(Page::drop_pending_panels).sum();
        let refilled = self.pages.is_empty();
        if refilled {
            self.pages.push(Page::new(fresh_page()));
        }
        (dropped, refilled)
    }

    /// 按名称规则重新校验名称（存储中的名称未经校验）
    pub(crate) fn revalidate_name(&mut self) -> Result<(), ComicError> {
        self.name = ProjectName::new(self.name.as_str())
            .map_err(|e| ComicError::InvalidName(e.to_string()))?;
        Ok(())
    }

    // Getters
    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    pub fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 是否至少有一页包含分镜
    pub fn has_content(&self) -> bool {
        self.pages.iter().any(|p| !p.is_empty())
    }

    /// 项目内出现过的最大标识（用于播种标识生成器）
    pub fn max_raw_id(&self) -> i64 {
        let pages = self.pages.iter().flat_map(|page| {
            std::iter::once(page.id().as_i64()).chain(page.panels().iter().flat_map(|panel| {
                std::iter::once(panel.id().as_i64())
                    .chain(panel.text_items().iter().map(|item| item.id().as_i64()))
            }))
        });
        std::iter::once(self.id.as_i64()).chain(pages).max().unwrap_or(0)
    }
}
