//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：给定完整消息列表与可选模型提示，返回模型原始文本。
//! 错误按类别区分（不可用 / 鉴权 / 限流 / 请求格式错误 / 空响应 / 超时），由补全适配器决定是否重试。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// LLM 调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// 网络不可达、服务端 5xx 等
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 请求本身不合法（重试无意义）
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Empty response")]
    EmptyResponse,

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

impl LlmError {
    /// 是否值得再试一次
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Unavailable(_) | LlmError::Timeout(_) | LlmError::EmptyResponse
        )
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成；model 为调用方提示的模型名，None 时使用客户端默认模型
    async fn complete(&self, messages: &[Message], model: Option<&str>)
        -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
