//! Workspace - 项目集合与当前指针
//!
//! 所有项目、当前项目指针、当前页索引的唯一写入入口。
//!
//! 不变量:
//! - 项目 id 在集合内唯一
//! - 当前页索引始终落在当前项目的页面范围内
//! - 异步补丁按 (项目 id, 分镜 id) 重新定位，从不使用挂起前捕获的索引

use serde::{Deserialize, Serialize};

use crate::domain::comic::{
    Character, ComicError, IdGenerator, ImageData, Panel, PanelId, Project, ProjectId,
    ProjectName, TextItem, TextKind,
};

/// 待提交的文字元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextItemDraft {
    pub kind: TextKind,
    pub text: String,
}

impl TextItemDraft {
    pub fn new(kind: TextKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// 恢复时对存储数据所做的修复
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// 被移除的生成中分镜数
    pub dropped_pending_panels: usize,
    /// 因页面为空而补页的项目
    pub refilled_projects: Vec<ProjectId>,
    /// 名称无效而被丢弃的项目
    pub skipped_projects: Vec<ProjectId>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_pending_panels == 0
            && self.refilled_projects.is_empty()
            && self.skipped_projects.is_empty()
    }
}

/// 项目集合 + 两个指针
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    projects: Vec<Project>,
    current_project_id: Option<ProjectId>,
    current_page_index: usize,
    ids: IdGenerator,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从存储恢复
    ///
    /// - 标识生成器以已加载的最大 id 为起点
    /// - 名称无效的项目被丢弃
    /// - 生成中的分镜被移除，没有页面的项目补一个空白页
    /// - 无法解析的当前指针会被清除
    pub fn restore(projects: Vec<Project>, current_project_id: Option<ProjectId>) -> (Self, RestoreReport) {
        let max_id = projects.iter().map(Project::max_raw_id).max().unwrap_or(0);
        let mut ids = IdGenerator::seeded(max_id);
        let mut report = RestoreReport::default();

        let mut restored = Vec::with_capacity(projects.len());
        for mut project in projects {
            if project.revalidate_name().is_err() {
                report.skipped_projects.push(project.id());
                continue;
            }
            let (dropped, refilled) = project.repair_loaded(|| ids.page_id());
            report.dropped_pending_panels += dropped;
            if refilled {
                report.refilled_projects.push(project.id());
            }
            restored.push(project);
        }

        let current_project_id =
            current_project_id.filter(|id| restored.iter().any(|p| p.id() == *id));
        let workspace = Self {
            projects: restored,
            current_project_id,
            current_page_index: 0,
            ids,
        };
        (workspace, report)
    }

    // ------------------------------------------------------------------
    // 项目
    // ------------------------------------------------------------------

    /// 创建项目并设为当前项目
    pub fn create_project(&mut self, name: &str) -> Result<ProjectId, ComicError> {
        let name = ProjectName::new(name).map_err(|e| ComicError::InvalidName(e.to_string()))?;
        let id = self.ids.project_id();
        let first_page = self.ids.page_id();
        self.projects.push(Project::new(id, name, first_page));
        self.current_project_id = Some(id);
        self.current_page_index = 0;
        Ok(id)
    }

    /// 切换当前项目；id 不存在时静默忽略
    pub fn switch_project(&mut self, id: ProjectId) -> bool {
        if self.project(id).is_none() {
            return false;
        }
        self.current_project_id = Some(id);
        self.current_page_index = 0;
        true
    }

    /// 删除项目；若为当前项目则清空当前指针（不自动选择其他项目）
    pub fn delete_project(&mut self, id: ProjectId) -> bool {
        let before = self.projects.len();
        self.projects.retain(|p| p.id() != id);
        let removed = self.projects.len() != before;
        if self.current_project_id == Some(id) {
            self.current_project_id = None;
            self.current_page_index = 0;
        }
        removed
    }

    // ------------------------------------------------------------------
    // 角色
    // ------------------------------------------------------------------

    /// 角色生成开始：清空角色并把页面重置为一个空白页
    pub fn begin_character(&mut self, project_id: ProjectId) -> Result<(), ComicError> {
        let fresh_page = self.ids.page_id();
        let project = self.project_mut(project_id)?;
        project.reset_for_character(fresh_page);
        if self.current_project_id == Some(project_id) {
            self.current_page_index = 0;
        }
        Ok(())
    }

    /// 角色生成成功；项目在等待期间被删除时返回 false
    pub fn attach_character(&mut self, project_id: ProjectId, character: Character) -> bool {
        match self.project_mut(project_id) {
            Ok(project) => {
                project.attach_character(character);
                true
            }
            Err(_) => false,
        }
    }

    // ------------------------------------------------------------------
    // 分镜
    // ------------------------------------------------------------------

    /// 在目标页末尾插入生成中的分镜，返回其 id
    ///
    /// 去除首尾空白后为空的文字元素会被丢弃
    pub fn insert_pending_panel(
        &mut self,
        project_id: ProjectId,
        page_index: usize,
        scene: &str,
        text_items: Vec<TextItemDraft>,
    ) -> Result<PanelId, ComicError> {
        if scene.trim().is_empty() {
            return Err(ComicError::InvalidPanel("场景描述不能为空".to_string()));
        }
        {
            let project = self.project(project_id).ok_or(ComicError::ProjectNotFound(project_id))?;
            if project.character().is_none() {
                return Err(ComicError::MissingCharacter);
            }
        }

        let panel_id = self.ids.panel_id();
        let items = text_items
            .into_iter()
            .filter(|draft| !draft.text.trim().is_empty())
            .map(|draft| TextItem::new(self.ids.text_item_id(), draft.kind, draft.text))
            .collect();
        let panel = Panel::pending(panel_id, scene, items);

        self.project_mut(project_id)?.push_pending_panel(page_index, panel)?;
        Ok(panel_id)
    }

    /// 生成成功后按 id 补全分镜；目标不存在时返回 false（非错误）
    pub fn complete_panel(&mut self, project_id: ProjectId, panel_id: PanelId, image: ImageData) -> bool {
        self.project_mut(project_id)
            .map(|project| project.complete_panel(panel_id, image))
            .unwrap_or(false)
    }

    /// 生成失败后按 id 撤回分镜；目标不存在时返回 false（非错误）
    pub fn retract_panel(&mut self, project_id: ProjectId, panel_id: PanelId) -> bool {
        self.project_mut(project_id)
            .map(|project| project.retract_panel(panel_id))
            .unwrap_or(false)
    }

    pub fn remove_panel(&mut self, project_id: ProjectId, page_index: usize, panel_id: PanelId) -> bool {
        self.project_mut(project_id)
            .map(|project| project.remove_panel(page_index, panel_id))
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // 页面
    // ------------------------------------------------------------------

    /// 追加空白页；若为当前项目，当前页索引指向新页
    pub fn add_page(&mut self, project_id: ProjectId) -> Result<usize, ComicError> {
        let page_id = self.ids.page_id();
        let index = self.project_mut(project_id)?.add_page(page_id);
        if self.current_project_id == Some(project_id) {
            self.current_page_index = index;
        }
        Ok(index)
    }

    /// 删除当前页并把索引夹回有效范围
    pub fn remove_current_page(&mut self, project_id: ProjectId) -> Result<(), ComicError> {
        if self.current_project_id != Some(project_id) {
            return Err(ComicError::ProjectNotCurrent(project_id));
        }
        let index = self.current_page_index;
        let project = self.project_mut(project_id)?;
        project.remove_page(index)?;
        let last = project.page_count() - 1;
        self.current_page_index = index.min(last);
        Ok(())
    }

    /// 切换当前页；越界（含负数）时不做任何事
    pub fn change_page(&mut self, project_id: ProjectId, new_index: isize) -> bool {
        if self.current_project_id != Some(project_id) {
            return false;
        }
        let Some(project) = self.project(project_id) else {
            return false;
        };
        match usize::try_from(new_index) {
            Ok(index) if index < project.page_count() => {
                self.current_page_index = index;
                true
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // 查询
    // ------------------------------------------------------------------

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id() == id)
    }

    fn project_mut(&mut self, id: ProjectId) -> Result<&mut Project, ComicError> {
        self.projects
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or(ComicError::ProjectNotFound(id))
    }

    pub fn current_project_id(&self) -> Option<ProjectId> {
        self.current_project_id
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.current_project_id.and_then(|id| self.project(id))
    }

    pub fn current_page_index(&self) -> usize {
        self.current_page_index
    }
}
