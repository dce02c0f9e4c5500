//! 编排引擎：上下文构建、补全适配、编排循环、降级回答与过程事件

pub mod completion;
pub mod context;
pub mod events;
pub mod fallback;
pub mod orchestrator;
pub mod session;

pub use completion::{parse_completion, CompletionAdapter, CompletionOutcome};
pub use context::{ContextBuilder, ContextLimits, DEFAULT_PERSONA};
pub use events::EngineEvent;
pub use fallback::FallbackResponder;
pub use orchestrator::ChatEngine;
pub(crate) use session::OrchestrationSession;
pub use session::{ChatRequest, ChatResponse, ExecutedOperation, TerminationReason};
