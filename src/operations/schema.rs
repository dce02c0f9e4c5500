//! 操作请求格式与其 JSON Schema（schemars 自动生成）
//!
//! 模型通过输出 `{"operations": [{"name": "...", "args": {...}}]}` 请求操作；
//! 该格式的 Schema 拼入 system prompt，减少模型输出格式错误。

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 一次操作请求：名称 + 参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OperationRequest {
    /// 操作名，必须是目录中列出的名称之一，如 listPages、updatePage
    #[serde(alias = "tool")]
    pub name: String,
    /// 参数对象，键为参数名
    #[serde(default = "empty_args")]
    pub args: Value,
}

fn empty_args() -> Value {
    Value::Object(Default::default())
}

impl OperationRequest {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// 一轮中的全部操作请求，按执行顺序排列
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct OperationBatch {
    pub operations: Vec<OperationRequest>,
}

/// 返回请求格式的 JSON Schema 字符串
pub fn request_format_schema_json() -> String {
    let schema = schema_for!(OperationBatch);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mentions_operations_and_args() {
        let schema = request_format_schema_json();
        assert!(schema.contains("operations"));
        assert!(schema.contains("args"));
    }

    #[test]
    fn test_request_defaults_missing_args_to_empty_object() {
        let req: OperationRequest = serde_json::from_str(r#"{"name": "listPages"}"#).unwrap();
        assert_eq!(req.args, serde_json::json!({}));
    }
}
