//! 补全客户端适配器
//!
//! complete(messages, model_hint)：在超时内调用 LlmClient，对瞬时错误（不可用 / 超时 / 空响应）内部重试，
//! 然后把模型原始文本解析为 CompletionOutcome：纯文本、操作请求（可同时带文本）或服务错误。
//!
//! 操作请求格式为 `{"operations": [{"name": "...", "args": {...}}]}`，也接受单个
//! `{"name"|"tool": "...", "args": {...}}`；JSON 块外的文字作为文本部分。
//! JSON 无法解析时整段按文本处理。

use std::ops::Range;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tokio::time::timeout;

use crate::llm::{LlmClient, LlmError};
use crate::memory::Message;
use crate::operations::{OperationBatch, OperationRequest};

/// 一次补全的结果
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// 只有文本，没有操作请求
    Text(String),
    /// 一个或多个操作请求，text 为同时返回的文字（可为空）
    OperationRequests {
        text: Option<String>,
        requests: Vec<OperationRequest>,
    },
    /// 补全服务失败（重试后仍失败）
    ServiceError(LlmError),
}

pub struct CompletionAdapter {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
    retries: u32,
}

impl CompletionAdapter {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration, retries: u32) -> Self {
        Self {
            llm,
            timeout,
            retries,
        }
    }

    pub async fn complete(&self, messages: &[Message], model_hint: Option<&str>) -> CompletionOutcome {
        let mut attempt = 0;
        loop {
            let result = match timeout(self.timeout, self.llm.complete(messages, model_hint)).await {
                Ok(Ok(raw)) if raw.trim().is_empty() => Err(LlmError::EmptyResponse),
                Ok(r) => r,
                Err(_) => Err(LlmError::Timeout(self.timeout.as_secs())),
            };
            match result {
                Ok(raw) => return parse_completion(&raw),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(error = %e, attempt, "completion failed, retrying");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "completion failed");
                    return CompletionOutcome::ServiceError(e);
                }
            }
        }
    }
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").ok())
        .as_ref()
}

/// 定位 JSON 候选：(整段要从文本中剔除的范围, JSON 本身)
fn locate_json(raw: &str) -> Option<(Range<usize>, &str)> {
    if let Some(caps) = fence_regex().and_then(|re| re.captures(raw)) {
        if let (Some(whole), Some(json)) = (caps.get(0), caps.get(1)) {
            return Some((whole.range(), json.as_str()));
        }
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| (start..end + 1, &raw[start..=end]))
}

fn parse_requests(json: &str) -> Option<Vec<OperationRequest>> {
    let value: Value = serde_json::from_str(json).ok()?;
    if value.get("operations").is_some() {
        return serde_json::from_value::<OperationBatch>(value)
            .ok()
            .map(|b| b.operations);
    }
    if value.get("name").is_some() || value.get("tool").is_some() {
        return serde_json::from_value::<OperationRequest>(value)
            .ok()
            .map(|r| vec![r]);
    }
    None
}

/// 解析模型原始输出
pub fn parse_completion(raw: &str) -> CompletionOutcome {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CompletionOutcome::ServiceError(LlmError::EmptyResponse);
    }
    let Some((span, json)) = locate_json(trimmed) else {
        return CompletionOutcome::Text(trimmed.to_string());
    };
    let Some(requests) = parse_requests(json) else {
        tracing::warn!("model output contains JSON that is not an operation request, treating as text");
        return CompletionOutcome::Text(trimmed.to_string());
    };

    let text = format!("{}\n{}", &trimmed[..span.start], &trimmed[span.end..])
        .trim()
        .to_string();
    if requests.is_empty() {
        return CompletionOutcome::Text(text);
    }
    CompletionOutcome::OperationRequests {
        text: (!text.is_empty()).then_some(text),
        requests,
    }
}
