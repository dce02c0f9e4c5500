//! 操作分发器
//!
//! dispatch(name, args)：查表 -> 校验必填与类型 -> 在超时与 panic 隔离下调用处理器恰好一次，
//! 所有失败都转为 OperationFailure 返回，绝不向外传播。每次调用输出一条 JSON 审计日志。
//!
//! dispatch_all(requests)：同一轮的多个请求按目标实体分道（lane），不同道并发执行（受信号量限制），
//! 同一道内按请求顺序串行；结果按原请求顺序返回。

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use futures_util::FutureExt;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::core::{OperationFailure, OperationResult};
use crate::operations::{OperationDescriptor, OperationRegistry, OperationRequest};

pub struct Dispatcher {
    registry: Arc<OperationRegistry>,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    /// timeout_secs 约束单次处理器调用。处理器在 tokio 任务中执行：多线程运行时下同步阻塞的处理器
    /// 也会按时得到 operation_timeout（其线程在后台跑完）；单线程运行时只能约束会 await 的处理器。
    pub fn new(registry: Arc<OperationRegistry>, timeout_secs: u64, max_concurrent: usize) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs.max(1)),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// 分发单个请求
    pub async fn dispatch(&self, name: &str, args: Value) -> OperationResult {
        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = self.dispatch_inner(name, args).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(OperationFailure::UnknownOperation(_)) => "unknown_operation",
            Err(OperationFailure::MissingField(_) | OperationFailure::InvalidType { .. }) => {
                "invalid_arguments"
            }
            Err(OperationFailure::Handler(_)) => "error",
            Err(OperationFailure::Timeout(_)) => "timeout",
            Err(OperationFailure::Panicked(_)) => "panic",
        };
        let audit = serde_json::json!({
            "event": "operation_audit",
            "operation": name,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "operation");
        result
    }

    async fn dispatch_inner(&self, name: &str, args: Value) -> OperationResult {
        let Some((descriptor, handler)) = self.registry.entry(name) else {
            return Err(OperationFailure::UnknownOperation(name.to_string()));
        };
        let args = validate(descriptor, args)?;

        let _permit = self.permits.acquire().await.ok();
        // 处理器在独立任务中运行：同步阻塞的处理器占住的是另一个工作线程，超时仍能按时返回
        let mut task = tokio::spawn(async move {
            AssertUnwindSafe(handler.execute(args)).catch_unwind().await
        });
        match timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(Ok(payload)))) => Ok(payload),
            Ok(Ok(Ok(Err(msg)))) => Err(OperationFailure::Handler(msg)),
            Ok(Ok(Err(panic))) => Err(OperationFailure::Panicked(panic_message(panic))),
            Ok(Err(join)) => Err(OperationFailure::Panicked(join.to_string())),
            Err(_) => {
                task.abort();
                Err(OperationFailure::Timeout(name.to_string()))
            }
        }
    }

    /// 分发同一轮的全部请求，结果与 requests 一一对应
    pub async fn dispatch_all(&self, requests: &[OperationRequest]) -> Vec<OperationResult> {
        let mut lanes: Vec<Vec<usize>> = Vec::new();
        let mut lane_of: HashMap<String, usize> = HashMap::new();
        for (i, req) in requests.iter().enumerate() {
            match self.entity_key(req) {
                Some(key) => {
                    let lane = *lane_of.entry(key).or_insert_with(|| {
                        lanes.push(Vec::new());
                        lanes.len() - 1
                    });
                    lanes[lane].push(i);
                }
                None => lanes.push(vec![i]),
            }
        }

        let runs = lanes.into_iter().map(|lane| async move {
            let mut out = Vec::with_capacity(lane.len());
            for i in lane {
                let req = &requests[i];
                out.push((i, self.dispatch(&req.name, req.args.clone()).await));
            }
            out
        });

        let mut slots: Vec<Option<OperationResult>> = (0..requests.len()).map(|_| None).collect();
        for lane in join_all(runs).await {
            for (i, result) in lane {
                slots[i] = Some(result);
            }
        }
        slots
            .into_iter()
            .zip(requests)
            .map(|(slot, req)| {
                slot.unwrap_or_else(|| Err(OperationFailure::Handler(format!("{} was not dispatched", req.name))))
            })
            .collect()
    }

    /// 请求指向的实体键（如 page:page-1a2b）；未声明实体或未携带 ID 时为 None
    fn entity_key(&self, req: &OperationRequest) -> Option<String> {
        let target = self.registry.lookup(&req.name)?.entity?;
        let id = match req.args.get(target.param)? {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Some(format!("{}:{}", target.kind, id))
    }
}

/// 必填存在性 + 已提供参数的类型校验；null 视为未提供
fn validate(descriptor: &OperationDescriptor, args: Value) -> Result<Value, OperationFailure> {
    let map = match args {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => {
            return Err(OperationFailure::InvalidType {
                field: "args".into(),
                expected: "object".into(),
            })
        }
    };
    for param in &descriptor.parameters {
        match map.get(&param.name) {
            None | Some(Value::Null) if param.required => {
                return Err(OperationFailure::MissingField(param.name.clone()));
            }
            Some(v) if !v.is_null() && !param.kind.matches(v) => {
                return Err(OperationFailure::InvalidType {
                    field: param.name.clone(),
                    expected: param.kind.as_str().into(),
                });
            }
            _ => {}
        }
    }
    Ok(Value::Object(map))
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::operations::{EntityTarget, Operation, ParamSpec, ParamType};

    /// 记录调用次数与调用顺序的测试操作
    struct Spy {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        log: Arc<Mutex<Vec<String>>>,
        delay_ms: u64,
        block_ms: u64,
        behavior: fn(&Value) -> Result<Value, String>,
    }

    impl Spy {
        fn new(name: &'static str, behavior: fn(&Value) -> Result<Value, String>) -> Self {
            Self {
                name,
                calls: Arc::new(AtomicUsize::new(0)),
                log: Arc::new(Mutex::new(Vec::new())),
                delay_ms: 0,
                block_ms: 0,
                behavior,
            }
        }
    }

    #[async_trait]
    impl Operation for Spy {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "spy"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            vec![
                ParamSpec::required("pageId", ParamType::String, "page"),
                ParamSpec::optional("limit", ParamType::Integer, "limit"),
            ]
        }

        fn entity(&self) -> Option<EntityTarget> {
            Some(EntityTarget {
                kind: "page",
                param: "pageId",
            })
        }

        async fn execute(&self, args: Value) -> Result<Value, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let tag = format!("{}:{}:start", self.name, args["pageId"].as_str().unwrap_or(""));
            self.log.lock().unwrap().push(tag);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.block_ms > 0 {
                std::thread::sleep(Duration::from_millis(self.block_ms));
            }
            let tag = format!("{}:{}:end", self.name, args["pageId"].as_str().unwrap_or(""));
            self.log.lock().unwrap().push(tag);
            (self.behavior)(&args)
        }
    }

    fn echo(args: &Value) -> Result<Value, String> {
        Ok(args.clone())
    }

    fn dispatcher_with(spy: Spy) -> (Dispatcher, Arc<AtomicUsize>) {
        let calls = spy.calls.clone();
        let mut registry = OperationRegistry::new();
        registry.register(spy).unwrap();
        (Dispatcher::new(Arc::new(registry), 5, 4), calls)
    }

    #[tokio::test]
    async fn test_unknown_operation_invokes_nothing() {
        let (d, calls) = dispatcher_with(Spy::new("getPage", echo));
        let result = d.dispatch("fly", json!({"pageId": "p1"})).await;
        assert_eq!(result, Err(OperationFailure::UnknownOperation("fly".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_required_field_skips_handler() {
        let (d, calls) = dispatcher_with(Spy::new("getPage", echo));
        let result = d.dispatch("getPage", json!({"limit": 3})).await;
        assert_eq!(result, Err(OperationFailure::MissingField("pageId".into())));
        let result = d.dispatch("getPage", json!({"pageId": null})).await;
        assert_eq!(result, Err(OperationFailure::MissingField("pageId".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_type_skips_handler() {
        let (d, calls) = dispatcher_with(Spy::new("getPage", echo));
        let result = d.dispatch("getPage", json!({"pageId": "p1", "limit": "ten"})).await;
        assert!(matches!(result, Err(OperationFailure::InvalidType { ref field, .. }) if field == "limit"));
        let result = d.dispatch("getPage", json!(["p1"])).await;
        assert!(matches!(result, Err(OperationFailure::InvalidType { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_invokes_handler_once() {
        let (d, calls) = dispatcher_with(Spy::new("getPage", echo));
        let result = d.dispatch("getPage", json!({"pageId": "p1"})).await;
        assert_eq!(result, Ok(json!({"pageId": "p1"})));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_error_is_carried_verbatim() {
        let (d, _) = dispatcher_with(Spy::new("updatePage", |_| Err("Page not found: x".into())));
        let result = d.dispatch("updatePage", json!({"pageId": "x"})).await;
        assert_eq!(result, Err(OperationFailure::Handler("Page not found: x".into())));
    }

    #[tokio::test]
    async fn test_handler_panic_is_isolated() {
        let (d, _) = dispatcher_with(Spy::new("boom", |_| panic!("kaboom")));
        let result = d.dispatch("boom", json!({"pageId": "x"})).await;
        assert_eq!(result, Err(OperationFailure::Panicked("kaboom".into())));
    }

    #[tokio::test]
    async fn test_slow_handler_times_out() {
        let mut spy = Spy::new("slow", echo);
        spy.delay_ms = 1_500;
        let mut registry = OperationRegistry::new();
        registry.register(spy).unwrap();
        let d = Dispatcher::new(Arc::new(registry), 1, 1);
        let result = d.dispatch("slow", json!({"pageId": "x"})).await;
        assert_eq!(result, Err(OperationFailure::Timeout("slow".into())));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_handler_times_out() {
        let mut spy = Spy::new("blocking", echo);
        spy.block_ms = 3_000;
        let mut registry = OperationRegistry::new();
        registry.register(spy).unwrap();
        let d = Dispatcher::new(Arc::new(registry), 1, 1);
        let start = Instant::now();
        let result = d.dispatch("blocking", json!({"pageId": "x"})).await;
        assert_eq!(result, Err(OperationFailure::Timeout("blocking".into())));
        assert!(start.elapsed() < Duration::from_millis(2_500));
    }

    #[tokio::test]
    async fn test_dispatch_all_preserves_request_order() {
        let mut slow = Spy::new("slowOp", echo);
        slow.delay_ms = 50;
        let mut registry = OperationRegistry::new();
        registry.register(slow).unwrap();
        registry.register(Spy::new("fastOp", echo)).unwrap();
        let d = Dispatcher::new(Arc::new(registry), 5, 4);

        let requests = vec![
            OperationRequest::new("slowOp", json!({"pageId": "a"})),
            OperationRequest::new("fastOp", json!({"pageId": "b"})),
            OperationRequest::new("nope", json!({})),
        ];
        let results = d.dispatch_all(&requests).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Ok(json!({"pageId": "a"})));
        assert_eq!(results[1], Ok(json!({"pageId": "b"})));
        assert_eq!(results[2], Err(OperationFailure::UnknownOperation("nope".into())));
    }

    #[tokio::test]
    async fn test_same_entity_requests_are_serialized() {
        let mut spy = Spy::new("updatePage", echo);
        spy.delay_ms = 30;
        let log = spy.log.clone();
        let mut registry = OperationRegistry::new();
        registry.register(spy).unwrap();
        let d = Dispatcher::new(Arc::new(registry), 5, 4);

        let requests = vec![
            OperationRequest::new("updatePage", json!({"pageId": "p1", "limit": 1})),
            OperationRequest::new("updatePage", json!({"pageId": "p1", "limit": 2})),
        ];
        d.dispatch_all(&requests).await;
        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "updatePage:p1:start",
                "updatePage:p1:end",
                "updatePage:p1:start",
                "updatePage:p1:end"
            ]
        );
    }

    #[tokio::test]
    async fn test_distinct_entities_run_concurrently() {
        let mut spy = Spy::new("updatePage", echo);
        spy.delay_ms = 30;
        let log = spy.log.clone();
        let mut registry = OperationRegistry::new();
        registry.register(spy).unwrap();
        let d = Dispatcher::new(Arc::new(registry), 5, 4);

        let requests = vec![
            OperationRequest::new("updatePage", json!({"pageId": "p1"})),
            OperationRequest::new("updatePage", json!({"pageId": "p2"})),
        ];
        d.dispatch_all(&requests).await;
        let log = log.lock().unwrap().clone();
        // 两个请求都先开始，再结束
        assert_eq!(log[0], "updatePage:p1:start");
        assert_eq!(log[1], "updatePage:p2:start");
    }
}
