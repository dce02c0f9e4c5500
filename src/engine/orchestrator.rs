//! 编排循环
//!
//! Start -> AwaitingCompletion -> (Dispatching -> AwaitingCompletion)* -> Done
//!
//! 每轮：由会话状态构建上下文 -> 调用补全适配器 ->
//! - ServiceError：调用降级回答，以 external_failure 结束；
//! - 纯文本：累积文本，以 model_finished 结束；
//! - 操作请求：按顺序分发并把 (请求, 结果) 追加到会话，轮数 +1，达到上限则以 iteration_limit 结束，否则进入下一轮。
//!
//! 下一轮必须等本轮分发全部完成后才开始（上下文依赖上一轮结果）。chat 永不返回错误。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::content::ContentRepository;
use crate::engine::{
    ChatRequest, ChatResponse, CompletionAdapter, CompletionOutcome, ContextBuilder,
    ContextLimits, EngineEvent, ExecutedOperation, FallbackResponder, OrchestrationSession,
    TerminationReason,
};
use crate::llm::LlmClient;
use crate::operations::{Dispatcher, OperationRegistry};

const OUTCOME_PREVIEW_CHARS: usize = 200;

pub struct ChatEngine {
    context: ContextBuilder,
    completion: CompletionAdapter,
    dispatcher: Dispatcher,
    fallback: FallbackResponder,
    repo: Arc<dyn ContentRepository>,
    max_iterations: usize,
    snapshot_recent_items: usize,
    event_tx: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl ChatEngine {
    /// 由启动时加载的配置装配引擎；registry 此后只读
    pub fn new(
        cfg: &AppConfig,
        registry: OperationRegistry,
        llm: Arc<dyn LlmClient>,
        repo: Arc<dyn ContentRepository>,
        persona: &str,
    ) -> Self {
        let engine = &cfg.engine;
        let registry = Arc::new(registry);
        Self {
            context: ContextBuilder::new(
                persona,
                &registry,
                ContextLimits {
                    max_result_chars: engine.max_result_chars,
                    max_snapshot_chars: engine.max_snapshot_chars,
                },
            ),
            completion: CompletionAdapter::new(
                llm,
                Duration::from_secs(cfg.llm.timeouts.request.max(1)),
                engine.completion_retries,
            ),
            dispatcher: Dispatcher::new(
                registry,
                engine.operation_timeout_secs,
                engine.max_concurrent_operations,
            ),
            fallback: FallbackResponder::new(
                repo.clone(),
                cfg.fallback.max_hits,
                cfg.fallback.unavailable_message.clone(),
            ),
            repo,
            max_iterations: engine.max_iterations.max(1),
            snapshot_recent_items: engine.snapshot_recent_items,
            event_tx: None,
        }
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn registry(&self) -> &OperationRegistry {
        self.dispatcher.registry()
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    fn emit(&self, ev: EngineEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ev);
        }
    }

    /// 公开入口：总是返回完整的 ChatResponse
    pub async fn chat(&self, request: ChatRequest) -> ChatResponse {
        let conversation_id = request
            .conversation_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let span = tracing::info_span!(
            "chat",
            conversation_id = %conversation_id,
            turns = request.turns.len(),
            model_hint = request.model_hint.as_deref().unwrap_or("-"),
        );
        self.run(request, conversation_id).instrument(span).await
    }

    async fn run(&self, request: ChatRequest, conversation_id: String) -> ChatResponse {
        let ChatRequest {
            turns,
            model_hint,
            context: hint,
            ..
        } = request;
        let mut session = OrchestrationSession::new(turns);

        loop {
            self.emit(EngineEvent::RoundTrip {
                iteration: session.iterations,
                max_iterations: self.max_iterations,
            });

            let snapshot = match self.repo.snapshot(self.snapshot_recent_items) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!(error = %e, "content snapshot unavailable");
                    None
                }
            };
            let messages =
                self.context
                    .build(&session.turns, snapshot.as_ref(), hint.as_ref(), &session.executed);

            match self.completion.complete(&messages, model_hint.as_deref()).await {
                CompletionOutcome::ServiceError(e) => {
                    self.emit(EngineEvent::Fallback {
                        reason: e.to_string(),
                    });
                    let fallback = self.fallback.respond(session.last_user_input());
                    let partial = session.accumulated_text();
                    let text = if partial.is_empty() {
                        fallback
                    } else {
                        format!("{partial}\n\n{fallback}")
                    };
                    return self.finish(session, conversation_id, text, TerminationReason::ExternalFailure);
                }
                CompletionOutcome::Text(text) => {
                    session.push_text(&text);
                    let text = session.accumulated_text();
                    return self.finish(session, conversation_id, text, TerminationReason::ModelFinished);
                }
                CompletionOutcome::OperationRequests { text, requests } => {
                    if let Some(t) = text {
                        session.push_text(&t);
                    }
                    for req in &requests {
                        self.emit(EngineEvent::OperationCall {
                            name: req.name.clone(),
                            args: req.args.clone(),
                        });
                    }
                    let results = self.dispatcher.dispatch_all(&requests).await;
                    for (request, result) in requests.into_iter().zip(results) {
                        self.emit(EngineEvent::OperationOutcome {
                            name: request.name.clone(),
                            ok: result.is_ok(),
                            preview: outcome_preview(&result),
                        });
                        session.executed.push(ExecutedOperation { request, result });
                    }
                    session.iterations += 1;
                    if session.iterations >= self.max_iterations {
                        tracing::warn!(
                            iterations = session.iterations,
                            "iteration limit reached, returning partial progress"
                        );
                        let text = session.accumulated_text();
                        return self.finish(session, conversation_id, text, TerminationReason::IterationLimit);
                    }
                }
            }
        }
    }

    fn finish(
        &self,
        session: OrchestrationSession,
        conversation_id: String,
        text: String,
        reason: TerminationReason,
    ) -> ChatResponse {
        tracing::info!(
            reason = reason.as_str(),
            iterations = session.iterations,
            operations = session.executed.len(),
            "chat finished"
        );
        self.emit(EngineEvent::Finished { reason });
        session.finish(conversation_id, text, reason)
    }
}

fn outcome_preview(result: &crate::core::OperationResult) -> String {
    let s = match result {
        Ok(v) => v.to_string(),
        Err(e) => e.to_string(),
    };
    crate::content::index::excerpt(&s, OUTCOME_PREVIEW_CHARS)
}
