//! 引擎装配
//!
//! 供 CLI 与嵌入方调用：create_content_store 按配置创建内容库（SQLite / 内存，可选演示数据），
//! create_llm_from_config 选择补全后端，create_engine 注册内容操作并构建 ChatEngine。
//! 环境变量（API Key）只在这里读取一次。

use std::sync::Arc;

use crate::config::{AppConfig, LlmSection};
use crate::content::{
    seed_demo_content, ContentRepository, InMemoryContentRepository, SqliteContentRepository,
};
use crate::core::AgentError;
use crate::engine::{ChatEngine, DEFAULT_PERSONA};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::operations::{register_content_operations, OperationRegistry};

/// 按 [store] 创建内容库；seed_demo 只对空库生效
pub fn create_content_store(cfg: &AppConfig) -> Result<Arc<dyn ContentRepository>, AgentError> {
    let repo: Arc<dyn ContentRepository> = match &cfg.store.sqlite_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            tracing::info!("Using SQLite content store at {}", path.display());
            Arc::new(SqliteContentRepository::open(path)?)
        }
        None => {
            tracing::info!("Using in-memory content store");
            Arc::new(InMemoryContentRepository::new())
        }
    };
    if cfg.store.seed_demo && seed_demo_content(repo.as_ref())? {
        tracing::info!("Seeded demo content");
    }
    Ok(repo)
}

/// 选择补全后端：配置中的 api_key 优先，其次 DEEPSEEK_API_KEY / OPENAI_API_KEY；都没有时退回 Mock
pub fn create_llm_from_config(llm: &LlmSection) -> Arc<dyn LlmClient> {
    let provider = llm.provider.to_lowercase();
    if provider == "mock" {
        tracing::info!("Using Mock LLM (configured)");
        return Arc::new(MockLlmClient::default());
    }

    let env_key = |name: &str| std::env::var(name).ok().filter(|k| !k.trim().is_empty());
    let key = llm.api_key.clone().filter(|k| !k.trim().is_empty()).or_else(|| match provider.as_str() {
        "openai" => env_key("OPENAI_API_KEY"),
        _ => env_key("DEEPSEEK_API_KEY").or_else(|| env_key("OPENAI_API_KEY")),
    });

    let Some(key) = key else {
        tracing::warn!("No API key set for provider '{}', using Mock LLM", provider);
        return Arc::new(MockLlmClient::default());
    };

    match provider.as_str() {
        "openai" => {
            let model = llm.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
            tracing::info!("Using OpenAI LLM ({})", model);
            Arc::new(OpenAiClient::new(llm.base_url.as_deref(), &model, &key))
        }
        _ => {
            let client = match llm.base_url.as_deref() {
                Some(base) => OpenAiClient::new(
                    Some(base),
                    llm.model.as_deref().unwrap_or(crate::llm::DEEPSEEK_CHAT),
                    &key,
                ),
                None => create_deepseek_client(&key, llm.model.as_deref()),
            };
            tracing::info!("Using DeepSeek LLM ({})", client.model());
            Arc::new(client)
        }
    }
}

/// 读取 persona：配置路径 > config/prompts/system.txt > 内置提示词
pub fn load_persona(cfg: &AppConfig) -> String {
    let configured = cfg.app.system_prompt_path.iter().map(|p| p.to_path_buf());
    let defaults = ["config/prompts/system.txt", "../config/prompts/system.txt"]
        .into_iter()
        .map(std::path::PathBuf::from);
    configured
        .chain(defaults)
        .find_map(|p| std::fs::read_to_string(p).ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PERSONA.to_string())
}

/// 注册内容操作并构建引擎；重复注册等装配错误直接返回
pub fn create_engine(
    cfg: &AppConfig,
    repo: Arc<dyn ContentRepository>,
    llm: Arc<dyn LlmClient>,
) -> Result<ChatEngine, AgentError> {
    let mut registry = OperationRegistry::new();
    register_content_operations(&mut registry, repo.clone())?;
    tracing::info!(operations = registry.len(), "Operation registry ready");
    let persona = load_persona(cfg);
    Ok(ChatEngine::new(cfg, registry, llm, repo, &persona))
}

/// 一步装配：内容库 + 后端 + 引擎（内容库由引擎与操作共同持有）
pub fn create_agent(cfg: &AppConfig) -> Result<ChatEngine, AgentError> {
    let repo = create_content_store(cfg)?;
    let llm = create_llm_from_config(&cfg.llm);
    create_engine(cfg, repo, llm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_content_store_seeds_demo_once() {
        let mut cfg = AppConfig::default();
        cfg.store.seed_demo = true;
        let repo = create_content_store(&cfg).unwrap();
        let snapshot = repo.snapshot(5).unwrap();
        assert!(snapshot.page_count > 0);
        // 非空库不会再次写入
        assert!(!seed_demo_content(repo.as_ref()).unwrap());
    }

    #[test]
    fn test_create_content_store_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.store.sqlite_path = Some(dir.path().join("data").join("content.db"));
        let repo = create_content_store(&cfg).unwrap();
        assert_eq!(repo.snapshot(5).unwrap().page_count, 0);
    }

    #[test]
    fn test_create_engine_registers_catalogue() {
        let cfg = AppConfig::default();
        let repo: Arc<dyn ContentRepository> = Arc::new(InMemoryContentRepository::new());
        let engine = create_engine(&cfg, repo, Arc::new(MockLlmClient::default())).unwrap();
        assert_eq!(engine.registry().len(), 15);
        assert_eq!(engine.max_iterations(), 5);
    }

    #[test]
    fn test_create_agent_with_mock_provider() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".into();
        let engine = create_agent(&cfg).unwrap();
        assert_eq!(engine.registry().len(), 15);
    }

    #[test]
    fn test_mock_provider_needs_no_key() {
        let mut llm = LlmSection::default();
        llm.provider = "mock".into();
        let client = create_llm_from_config(&llm);
        assert_eq!(client.token_usage(), (0, 0, 0));
    }
}
