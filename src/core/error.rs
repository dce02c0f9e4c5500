//! 引擎错误类型
//!
//! AgentError：启动期与装配期错误（配置、注册表冲突、存储），由 main 以 anyhow 向上传播；
//! OperationFailure：单次操作分发的失败结果，作为数据回传给模型，从不中断编排循环。

use serde::Serialize;
use thiserror::Error;

use crate::content::RepositoryError;

/// 装配与启动阶段的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Config error: {0}")]
    ConfigError(String),

    /// 同名操作重复注册属于启动期致命配置错误
    #[error("Duplicate operation registered: {0}")]
    DuplicateOperation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// 分发失败：未知操作、参数校验失败、处理器错误 / 超时 / panic
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum OperationFailure {
    #[error("unknown_operation: {0}")]
    UnknownOperation(String),

    #[error("missing_field: {0}")]
    MissingField(String),

    #[error("invalid_type: {field} (expected {expected})")]
    InvalidType { field: String, expected: String },

    /// 处理器返回的错误消息，原样保留
    #[error("{0}")]
    Handler(String),

    #[error("operation_timeout: {0}")]
    Timeout(String),

    #[error("operation_panicked: {0}")]
    Panicked(String),
}

/// 分发结果：成功载荷或失败描述，dispatch 永不 panic / 抛出
pub type OperationResult = Result<serde_json::Value, OperationFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages_use_stable_prefixes() {
        assert_eq!(
            OperationFailure::UnknownOperation("fly".into()).to_string(),
            "unknown_operation: fly"
        );
        assert_eq!(
            OperationFailure::MissingField("pageId".into()).to_string(),
            "missing_field: pageId"
        );
        assert_eq!(
            OperationFailure::Handler("Page not found: x".into()).to_string(),
            "Page not found: x"
        );
    }

    #[test]
    fn test_invalid_type_message() {
        let f = OperationFailure::InvalidType {
            field: "limit".into(),
            expected: "integer".into(),
        };
        assert_eq!(f.to_string(), "invalid_type: limit (expected integer)");
    }
}
