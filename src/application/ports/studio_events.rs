//! Studio Events Port - 状态变更通知
//!
//! 视图层据此重新渲染；发布方不关心是否有订阅者

use serde::{Deserialize, Serialize};

use crate::domain::comic::{PanelId, ProjectId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum StudioEvent {
    /// 项目集合或指针发生变化
    WorkspaceChanged,
    /// 分镜生成完成
    PanelCompleted {
        project_id: ProjectId,
        panel_id: PanelId,
    },
    /// 分镜生成失败并已撤回
    PanelRetracted {
        project_id: ProjectId,
        panel_id: PanelId,
        error: String,
    },
    /// 角色生成完成
    CharacterReady { project_id: ProjectId },
    /// 角色生成失败
    CharacterFailed { project_id: ProjectId, error: String },
    /// 导出进度（空字符串表示结束）
    ExportProgress { message: String },
    /// 导出完成
    ExportFinished { file_name: String },
    /// 用户可见错误消息被替换
    ErrorRaised { message: String },
}

pub trait StudioEventsPort: Send + Sync {
    fn publish(&self, event: StudioEvent);
}
