//! 上下文构建器
//!
//! 每轮往返按固定顺序生成模型输入：
//! 1. system：persona + 调用方上下文提示 + 操作目录 + 请求格式
//! 2. system：内容库概要（条数与字符数均有上限）
//! 3. 调用方传入的历史轮次（原顺序）
//! 4. 本次交换中已执行的操作：每个操作一对「请求 / 结果」消息，按解析完成的请求顺序排列

use serde_json::Value;

use crate::content::index::excerpt;
use crate::content::StoreSnapshot;
use crate::engine::ExecutedOperation;
use crate::memory::{ConversationTurn, Message, Role};
use crate::operations::{request_format_schema_json, OperationRegistry};

pub const DEFAULT_PERSONA: &str = "You are Pagewright, an assistant that manages website content \
(pages, clusters, knowledge documents, media and SEO metadata) for an operator. \
Inspect the content store with operations before changing it, make only the changes the \
operator asked for, and report clearly what you did.";

/// 构建器的输出上限
#[derive(Debug, Clone, Copy)]
pub struct ContextLimits {
    pub max_result_chars: usize,
    pub max_snapshot_chars: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_result_chars: 4000,
            max_snapshot_chars: 2000,
        }
    }
}

pub struct ContextBuilder {
    instructions: String,
    limits: ContextLimits,
}

impl ContextBuilder {
    /// 目录在构造时渲染一次（注册表启动后只读）
    pub fn new(persona: &str, registry: &OperationRegistry, limits: ContextLimits) -> Self {
        let instructions = format!(
            "{persona}\n\n\
             ## Available operations\n{catalog}\n\n\
             ## Requesting operations\n\
             To run operations, include exactly one JSON object of the form \
             {{\"operations\": [{{\"name\": \"<operation>\", \"args\": {{...}}}}]}} \
             (optionally inside a ```json fence). Operations in one request run in the listed order \
             and their results are returned to you. When you are done, answer in plain text \
             without any JSON.\n\
             JSON Schema:\n{schema}",
            catalog = registry.to_schema_json(),
            schema = request_format_schema_json(),
        );
        Self {
            instructions,
            limits,
        }
    }

    pub fn build(
        &self,
        turns: &[ConversationTurn],
        snapshot: Option<&StoreSnapshot>,
        hint: Option<&Value>,
        executed: &[ExecutedOperation],
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2 + turns.len() + executed.len() * 2);

        let mut system = self.instructions.clone();
        if let Some(hint) = hint {
            system.push_str("\n\n## Current operator context\n");
            system.push_str(&hint.to_string());
        }
        messages.push(Message::system(system));
        messages.push(Message::system(self.render_snapshot(snapshot)));

        messages.extend(
            turns
                .iter()
                .filter(|t| t.role != Role::System)
                .cloned(),
        );

        for (i, op) in executed.iter().enumerate() {
            messages.push(Message::assistant(render_request(i + 1, op)));
            messages.push(Message::user(self.render_result(i + 1, op)));
        }
        messages
    }

    fn render_snapshot(&self, snapshot: Option<&StoreSnapshot>) -> String {
        let Some(s) = snapshot else {
            return "## Content store snapshot\n(unavailable)".to_string();
        };
        let mut out = format!(
            "## Content store snapshot\npages: {} ({} published), clusters: {}, documents: {}, media: {}",
            s.page_count, s.published_count, s.cluster_count, s.document_count, s.media_count
        );
        if !s.recent_pages.is_empty() {
            out.push_str("\nrecently updated pages:");
            for p in &s.recent_pages {
                out.push_str(&format!("\n- {} \"{}\" ({})", p.id, p.title, p.status.as_str()));
            }
        }
        excerpt(&out, self.limits.max_snapshot_chars)
    }

    fn render_result(&self, n: usize, op: &ExecutedOperation) -> String {
        match &op.result {
            Ok(payload) => format!(
                "Operation result #{n} ({}): OK {}",
                op.name(),
                excerpt(&payload.to_string(), self.limits.max_result_chars)
            ),
            Err(failure) => format!("Operation result #{n} ({}): FAILED {}", op.name(), failure),
        }
    }
}

fn render_request(n: usize, op: &ExecutedOperation) -> String {
    format!("Operation request #{n}: {} {}", op.name(), op.request.args)
}
