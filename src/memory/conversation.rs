//! 对话轮次与模型消息
//!
//! 调用方传入的对话历史由 user / assistant 消息组成，发送后不可变；
//! System 仅由上下文构建器生成。ConversationHistory 供 CLI 等前端保留最近若干轮。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// 调用方提供的对话轮次（role 仅为 user / assistant）
pub type ConversationTurn = Message;

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 前端侧的对话历史：每次问答追加一对消息，超过 max_turns 轮时丢弃最旧部分
#[derive(Clone, Debug)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
    max_turns: usize,
}

impl ConversationHistory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: max_turns.max(1),
        }
    }

    /// 返回「历史 + 新的用户输入」，作为一次 chat 调用的 turns
    pub fn with_user_input(&self, input: &str) -> Vec<ConversationTurn> {
        let mut turns = self.turns.clone();
        turns.push(Message::user(input));
        turns
    }

    /// 记录一轮完成的问答；空回复不写入 assistant 消息
    pub fn record_exchange(&mut self, input: &str, reply: &str) {
        self.turns.push(Message::user(input));
        if !reply.is_empty() {
            self.turns.push(Message::assistant(reply));
        }
        let keep = self.max_turns * 2;
        if self.turns.len() > keep {
            let excess = self.turns.len() - keep;
            self.turns.drain(..excess);
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_prunes_oldest_turns() {
        let mut history = ConversationHistory::new(2);
        history.record_exchange("a", "1");
        history.record_exchange("b", "2");
        history.record_exchange("c", "3");
        let contents: Vec<&str> = history.turns().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["b", "2", "c", "3"]);
    }

    #[test]
    fn test_with_user_input_appends_without_mutating() {
        let mut history = ConversationHistory::new(5);
        history.record_exchange("hello", "hi");
        let turns = history.with_user_input("list pages");
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[2], Message::user("list pages"));
        assert_eq!(history.turns().len(), 2);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("ok")).unwrap();
        assert!(json.contains("\"assistant\""));
    }
}
