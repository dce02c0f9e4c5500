//! 一次 chat 调用的瞬时状态与公开结果类型
//!
//! OrchestrationSession 在 chat 开始时创建、结束时丢弃；跨调用的身份只来自调用方重新传入的对话历史。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::OperationResult;
use crate::memory::ConversationTurn;
use crate::operations::OperationRequest;

/// 终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// 模型给出文本且不再请求操作
    ModelFinished,
    /// 达到往返上限
    IterationLimit,
    /// 补全服务失败，已走降级回答
    ExternalFailure,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::ModelFinished => "model_finished",
            TerminationReason::IterationLimit => "iteration_limit",
            TerminationReason::ExternalFailure => "external_failure",
        }
    }
}

/// 已执行的操作：请求与结果成对保存
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutedOperation {
    pub request: OperationRequest,
    pub result: OperationResult,
}

impl ExecutedOperation {
    pub fn name(&self) -> &str {
        &self.request.name
    }
}

/// chat 入口参数
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub turns: Vec<ConversationTurn>,
    pub conversation_id: Option<String>,
    pub model_hint: Option<String>,
    /// 结构化提示，如 {"editingPageId": "page-1"}，并入 system 段
    pub context: Option<Value>,
}

impl ChatRequest {
    pub fn new(turns: Vec<ConversationTurn>) -> Self {
        Self {
            turns,
            ..Default::default()
        }
    }

    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn with_model_hint(mut self, model: impl Into<String>) -> Self {
        self.model_hint = Some(model.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// chat 结果：始终是完整的结构，错误已在内部恢复
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub conversation_id: String,
    pub text: String,
    pub operations_executed: Vec<ExecutedOperation>,
    pub termination_reason: TerminationReason,
}

/// 编排过程中的瞬时状态
#[derive(Debug)]
pub(crate) struct OrchestrationSession {
    pub turns: Vec<ConversationTurn>,
    pub executed: Vec<ExecutedOperation>,
    pub iterations: usize,
    texts: Vec<String>,
}

impl OrchestrationSession {
    pub fn new(turns: Vec<ConversationTurn>) -> Self {
        Self {
            turns,
            executed: Vec::new(),
            iterations: 0,
            texts: Vec::new(),
        }
    }

    pub fn push_text(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.texts.push(text.to_string());
        }
    }

    pub fn accumulated_text(&self) -> String {
        self.texts.join("\n\n")
    }

    /// 最近一条 user 消息，作为降级检索的查询
    pub fn last_user_input(&self) -> &str {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == crate::memory::Role::User)
            .map(|t| t.content.as_str())
            .unwrap_or("")
    }

    pub fn finish(
        self,
        conversation_id: String,
        text: String,
        reason: TerminationReason,
    ) -> ChatResponse {
        ChatResponse {
            conversation_id,
            text,
            operations_executed: self.executed,
            termination_reason: reason,
        }
    }
}
