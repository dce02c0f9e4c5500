//! DeepSeek API 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://api.deepseek.com
//! - 模型: deepseek-chat (常规对话), deepseek-reasoner (思考模式)

use crate::llm::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";
pub const DEEPSEEK_REASONER: &str = "deepseek-reasoner";

/// 创建 DeepSeek 客户端；api_key 由装配层从配置/环境解析后传入
pub fn create_deepseek_client(api_key: &str, model: Option<&str>) -> OpenAiClient {
    OpenAiClient::new(
        Some(DEEPSEEK_BASE_URL),
        model.unwrap_or(DEEPSEEK_CHAT),
        api_key,
    )
}
