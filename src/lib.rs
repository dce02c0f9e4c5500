//! Pagewright - 内容管理智能体的编排引擎
//!
//! 模块划分：
//! - **agent**: 引擎装配（内容库、补全后端、操作注册）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **content**: 页面 / 集群 / 文档 / 媒体模型，内容库（内存 / SQLite）与关键词索引
//! - **core**: 错误类型
//! - **engine**: 上下文构建、补全适配、编排循环、降级回答
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 对话轮次与 CLI 侧历史
//! - **operations**: 操作注册表、分发器与内置内容操作

pub mod agent;
pub mod config;
pub mod content;
pub mod core;
pub mod engine;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod operations;

pub use engine::{ChatEngine, ChatRequest, ChatResponse, TerminationReason};
