//! Panel Commands

use crate::domain::comic::{PanelId, ProjectId};
use crate::domain::TextItemDraft;

/// 添加分镜命令
///
/// 分镜先以生成中状态插入，生成结束后补全或撤回
#[derive(Debug, Clone)]
pub struct AddPanel {
    pub project_id: ProjectId,
    pub page_index: usize,
    pub scene: String,
    pub text_items: Vec<TextItemDraft>,
}

/// 删除分镜命令
#[derive(Debug, Clone)]
pub struct RemovePanel {
    pub project_id: ProjectId,
    pub page_index: usize,
    pub panel_id: PanelId,
}
