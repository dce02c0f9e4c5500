//! 操作注册表
//!
//! 每个操作实现 Operation trait（名称 / 描述 / 参数表 / 可选的目标实体 / 异步执行），
//! 启动时按名注册到 OperationRegistry；之后只读。同名重复注册返回 AgentError::DuplicateOperation，
//! 由装配层作为致命配置错误处理。注册顺序即对模型发布目录的顺序。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::core::AgentError;

/// 参数类型标签
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

/// 单个参数声明
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// 操作作用的内容实体：kind 为实体类别（page / media 等），param 为携带实体 ID 的参数名。
/// 同一轮中指向同一实体的请求会被串行分发。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EntityTarget {
    pub kind: &'static str,
    pub param: &'static str,
}

/// 操作 trait
#[async_trait]
pub trait Operation: Send + Sync {
    /// 操作名（模型请求中的 "name" 字段）
    fn name(&self) -> &str;

    /// 供模型理解的功能描述
    fn description(&self) -> &str;

    /// 有序参数表；无参数时为空
    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    fn entity(&self) -> Option<EntityTarget> {
        None
    }

    /// 执行；args 已通过必填与类型校验，保证为 JSON 对象
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

/// 注册时固化的操作描述
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
    #[serde(skip)]
    pub entity: Option<EntityTarget>,
}

impl OperationDescriptor {
    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// JSON Schema 形式的参数描述（required 为空时仍列出全部可选参数）
    pub fn parameters_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({ "type": p.kind.as_str(), "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self.required_params().map(|p| p.name.as_str()).collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

struct Registered {
    descriptor: OperationDescriptor,
    handler: Arc<dyn Operation>,
}

#[derive(Default)]
pub struct OperationRegistry {
    entries: Vec<Registered>,
    index: HashMap<String, usize>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, op: impl Operation + 'static) -> Result<(), AgentError> {
        self.register_arc(Arc::new(op))
    }

    pub fn register_arc(&mut self, op: Arc<dyn Operation>) -> Result<(), AgentError> {
        let name = op.name().to_string();
        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateOperation(name));
        }
        let descriptor = OperationDescriptor {
            name: name.clone(),
            description: op.description().to_string(),
            parameters: op.parameters(),
            entity: op.entity(),
        };
        self.index.insert(name, self.entries.len());
        self.entries.push(Registered {
            descriptor,
            handler: op,
        });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&OperationDescriptor> {
        self.index.get(name).map(|&i| &self.entries[i].descriptor)
    }

    pub(crate) fn entry(&self, name: &str) -> Option<(&OperationDescriptor, Arc<dyn Operation>)> {
        self.index.get(name).map(|&i| {
            let e = &self.entries[i];
            (&e.descriptor, e.handler.clone())
        })
    }

    /// 全部描述，按注册顺序
    pub fn describe_all(&self) -> Vec<&OperationDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.descriptor.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 目录 JSON：[{name, description, parameters}]，拼入 system prompt
    pub fn to_schema_json(&self) -> String {
        let ops: Vec<Value> = self
            .entries
            .iter()
            .map(|e| {
                json!({
                    "name": e.descriptor.name,
                    "description": e.descriptor.description,
                    "parameters": e.descriptor.parameters_schema(),
                })
            })
            .collect();
        serde_json::to_string_pretty(&ops).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Operation for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test op"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            vec![
                ParamSpec::required("pageId", ParamType::String, "page id"),
                ParamSpec::optional("limit", ParamType::Integer, "max rows"),
            ]
        }

        async fn execute(&self, _args: Value) -> Result<Value, String> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = OperationRegistry::new();
        registry.register(Named("getPage")).unwrap();
        let err = registry.register(Named("getPage")).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateOperation(n) if n == "getPage"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_describe_all_keeps_registration_order() {
        let mut registry = OperationRegistry::new();
        registry.register(Named("b")).unwrap();
        registry.register(Named("a")).unwrap();
        assert_eq!(registry.names(), vec!["b", "a"]);
        assert!(registry.lookup("a").is_some());
        assert!(registry.lookup("c").is_none());
    }

    #[test]
    fn test_parameters_schema_lists_optional_params() {
        let mut registry = OperationRegistry::new();
        registry.register(Named("getPage")).unwrap();
        let schema = registry.lookup("getPage").unwrap().parameters_schema();
        assert_eq!(schema["required"], json!(["pageId"]));
        assert_eq!(schema["properties"]["limit"]["type"], "integer");
    }

    #[test]
    fn test_param_type_matches() {
        assert!(ParamType::Integer.matches(&json!(3)));
        assert!(!ParamType::Integer.matches(&json!(3.5)));
        assert!(ParamType::Number.matches(&json!(3.5)));
        assert!(!ParamType::String.matches(&json!(1)));
        assert!(ParamType::Array.matches(&json!([])));
    }
}
