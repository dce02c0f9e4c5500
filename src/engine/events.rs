//! 引擎过程事件：用于 CLI / 前端实时展示往返、操作调用与终止原因

use serde::Serialize;

use crate::engine::TerminationReason;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// 开始第 iteration 次往返（从 0 计）
    RoundTrip { iteration: usize, max_iterations: usize },
    /// 模型请求了操作
    OperationCall {
        name: String,
        args: serde_json::Value,
    },
    /// 操作结果（预览）
    OperationOutcome {
        name: String,
        ok: bool,
        preview: String,
    },
    /// 补全服务失败，转入降级回答
    Fallback { reason: String },
    Finished { reason: TerminationReason },
}
