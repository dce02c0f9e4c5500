//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PAGEWRIGHT__*` 覆盖（双下划线表示嵌套，如 `PAGEWRIGHT__ENGINE__MAX_ITERATIONS=8`）。
//! 启动时加载一次，按引用传入各组件；编排循环内不再读取任何环境状态。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub engine: EngineSection,
    pub store: StoreSection,
    pub fallback: FallbackSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 自定义 persona / system prompt 文件；未设置或读取失败时使用内置提示词
    pub system_prompt_path: Option<PathBuf>,
    /// CLI 保留的对话轮数
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "pagewright".to_string(),
            system_prompt_path: None,
            max_context_turns: 20,
        }
    }
}

/// [llm] 段：后端选择、模型、超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// deepseek / openai / mock
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// 未设置时从 DEEPSEEK_API_KEY / OPENAI_API_KEY 读取（仅在装配时读取一次）
    pub api_key: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: None,
            base_url: None,
            api_key: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次补全请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [engine] 段：编排循环的资源上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// 每次 chat 最多执行操作的往返轮数
    pub max_iterations: usize,
    /// 补全失败后的内部重试次数
    pub completion_retries: u32,
    pub max_concurrent_operations: usize,
    pub operation_timeout_secs: u64,
    /// 单个操作结果写入上下文的最大字符数
    pub max_result_chars: usize,
    pub snapshot_recent_items: usize,
    pub max_snapshot_chars: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            completion_retries: 1,
            max_concurrent_operations: 4,
            operation_timeout_secs: 30,
            max_result_chars: 4000,
            snapshot_recent_items: 5,
            max_snapshot_chars: 2000,
        }
    }
}

/// [store] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StoreSection {
    /// 设置后使用 SQLite 内容库，否则使用内存库
    pub sqlite_path: Option<PathBuf>,
    /// 空库时写入演示数据（默认关闭，config/default.toml 中开启）
    pub seed_demo: bool,
}

/// [fallback] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackSection {
    pub max_hits: usize,
    pub unavailable_message: String,
}

impl Default for FallbackSection {
    fn default() -> Self {
        Self {
            max_hits: 3,
            unavailable_message: "Sorry, the assistant service is unavailable right now and \
                                  I couldn't find anything relevant locally. Please try again later."
                .to_string(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 PAGEWRIGHT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（必须存在）
/// 3. 最后叠加环境变量 PAGEWRIGHT__*
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        if std::path::Path::new(&format!("{name}.toml")).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PAGEWRIGHT")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
