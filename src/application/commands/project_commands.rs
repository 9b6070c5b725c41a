//! Project Commands

use crate::domain::comic::ProjectId;

/// 创建项目命令
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
}

/// 切换当前项目命令
#[derive(Debug, Clone)]
pub struct SwitchProject {
    pub project_id: ProjectId,
}

/// 删除项目命令
#[derive(Debug, Clone)]
pub struct DeleteProject {
    pub project_id: ProjectId,
}

/// 生成角色命令（会清空项目的全部页面）
#[derive(Debug, Clone)]
pub struct CreateCharacter {
    pub project_id: ProjectId,
    pub prompt: String,
    pub style: String,
}

/// 追加页面命令
#[derive(Debug, Clone)]
pub struct AddPage {
    pub project_id: ProjectId,
}

/// 删除当前页命令
#[derive(Debug, Clone)]
pub struct RemoveCurrentPage {
    pub project_id: ProjectId,
}

/// 切换当前页命令（允许负数，越界时忽略）
#[derive(Debug, Clone)]
pub struct ChangePage {
    pub project_id: ProjectId,
    pub index: isize,
}
