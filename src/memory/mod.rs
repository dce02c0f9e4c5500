//! 记忆层：对话轮次与前端侧历史

pub mod conversation;

pub use conversation::{ConversationHistory, ConversationTurn, Message, Role};
