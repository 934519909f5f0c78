//! 任务创建流水线的错误类型
//!
//! 每个错误在返回给调用方之前，都会以 is_error=true 的进度事件上报一次（双通道）。

use std::fmt;

use thiserror::Error;

/// 需要解析的远端实体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Module,
    Phase,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Project => "project",
            EntityKind::Module => "module",
            EntityKind::Phase => "phase",
            EntityKind::User => "user",
        };
        f.write_str(s)
    }
}

/// 意图抽取与任务创建过程中可能出现的错误
#[derive(Error, Debug)]
pub enum TaskError {
    /// 名称解析没有得到可用的实体；message 为面向用户的提示
    #[error("{message}")]
    NotFound { entity: EntityKind, message: String },

    /// 输入不符合固定 schema（未知 tool、缺少必填参数、类型错误）
    #[error("Validation error: {0}")]
    Validation(String),

    /// 意图抽取后端失败或输出无法解析
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider timeout after {0}s")]
    ProviderTimeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// 缺少 token，或后端返回 401/403
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// 同一会话已有命令在执行
    #[error("Another command is already in progress")]
    Busy,

    #[error("Cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl TaskError {
    /// HTTP 状态码（如果有）
    pub fn status(&self) -> Option<u16> {
        match self {
            TaskError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_displays_user_message() {
        let err = TaskError::NotFound {
            entity: EntityKind::Project,
            message: "❌ Proyecto \"X\" no encontrado.".to_string(),
        };
        assert_eq!(err.to_string(), "❌ Proyecto \"X\" no encontrado.");
        assert!(err.is_not_found());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_http_status() {
        let err = TaskError::HttpStatus {
            status: 422,
            message: "name must not be empty".to_string(),
        };
        assert_eq!(err.status(), Some(422));
        assert!(err.to_string().contains("422"));
    }
}
