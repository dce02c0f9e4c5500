//! Mock LLM 客户端（用于测试与无 API Key 的本地运行）
//!
//! 按脚本顺序返回预设的回复或错误，并记录每次收到的消息列表，便于断言上下文内容。
//! 脚本耗尽后返回 Unavailable，使引擎走降级回答。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::Message;

/// 一条脚本化响应
pub type ScriptedReply = Result<String, LlmError>;

/// 生成器：根据调用序号生成响应（用于「永远请求新操作」之类的场景）
type ReplyFn = dyn Fn(usize) -> ScriptedReply + Send + Sync;

/// Mock 客户端：脚本队列 + 可选生成器 + 请求记录
#[derive(Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<ScriptedReply>>,
    generator: Option<Box<ReplyFn>>,
    requests: Mutex<Vec<(Vec<Message>, Option<String>)>>,
}

impl MockLlmClient {
    pub fn new(script: Vec<ScriptedReply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// 每次调用都由 f(调用序号) 生成响应
    pub fn from_fn(f: impl Fn(usize) -> ScriptedReply + Send + Sync + 'static) -> Self {
        Self {
            generator: Some(Box::new(f)),
            ..Self::default()
        }
    }

    /// 已收到的调用次数
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// 第 n 次调用收到的消息列表
    pub fn request(&self, n: usize) -> Option<Vec<Message>> {
        self.requests
            .lock()
            .ok()
            .and_then(|r| r.get(n).map(|(messages, _)| messages.clone()))
    }

    /// 第 n 次调用收到的模型提示
    pub fn model_hint(&self, n: usize) -> Option<String> {
        self.requests
            .lock()
            .ok()
            .and_then(|r| r.get(n).and_then(|(_, model)| model.clone()))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        model: Option<&str>,
    ) -> Result<String, LlmError> {
        let n = {
            let mut requests = self
                .requests
                .lock()
                .map_err(|_| LlmError::Unavailable("mock lock poisoned".into()))?;
            requests.push((messages.to_vec(), model.map(String::from)));
            requests.len() - 1
        };
        if let Some(f) = &self.generator {
            return f(n);
        }
        self.script
            .lock()
            .map_err(|_| LlmError::Unavailable("mock lock poisoned".into()))?
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Unavailable("mock script exhausted".into())))
    }
}
