//! 处理器共用的参数读取与结果序列化辅助函数

use serde::Serialize;
use serde_json::Value;

use crate::content::{PageStatus, RepositoryError};

pub(crate) fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

/// 分发器已保证必填参数存在；这里仍对空串报错
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    match str_arg(args, key).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(format!("{key} must be a non-empty string")),
    }
}

pub(crate) fn usize_arg(args: &Value, key: &str) -> Option<usize> {
    args.get(key).and_then(|v| v.as_u64()).map(|n| n as usize)
}

pub(crate) fn bool_arg(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(|v| v.as_bool())
}

pub(crate) fn string_list_arg(args: &Value, key: &str) -> Option<Vec<String>> {
    args.get(key).and_then(|v| v.as_array()).map(|items| {
        items
            .iter()
            .filter_map(|i| i.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

pub(crate) fn status_arg(args: &Value, key: &str) -> Result<Option<PageStatus>, String> {
    match str_arg(args, key) {
        None => Ok(None),
        Some(s) => PageStatus::parse(s)
            .map(Some)
            .ok_or_else(|| format!("Invalid status: {s} (expected draft, published or archived)")),
    }
}

pub(crate) fn to_payload<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

pub(crate) fn repo_err(err: RepositoryError) -> String {
    err.to_string()
}
