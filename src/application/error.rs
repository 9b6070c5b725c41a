//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::domain::comic::{ComicError, ProjectId};

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 项目未找到
    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 业务规则违反
    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 导出错误
    #[error("Export error: {0}")]
    ExportError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建业务规则违反错误
    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::BusinessRuleViolation(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

impl From<ComicError> for ApplicationError {
    fn from(err: ComicError) -> Self {
        match err {
            ComicError::ProjectNotFound(id) => Self::ProjectNotFound(id),
            ComicError::InvalidName(_) | ComicError::InvalidPanel(_) | ComicError::PageOutOfRange { .. } => {
                Self::ValidationError(err.to_string())
            }
            ComicError::MissingCharacter | ComicError::LastPage => {
                Self::BusinessRuleViolation(err.to_string())
            }
            ComicError::ProjectNotCurrent(_) => Self::InvalidState(err.to_string()),
        }
    }
}
