//! # 会话存储
//!
//! flash 组件只通过 `Session` trait 访问会话，路径以 `.` 分隔（如 `Flash.flash`），
//! 值统一使用 `serde_json::Value` 表示。`MemorySession` 是进程内的实现。

use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 以点分路径寻址的键值会话存储
#[cfg_attr(test, mockall::automock)]
pub trait Session {
    /// 路径上是否存在非 null 的值
    fn check(&self, path: &str) -> bool;
    fn read(&self, path: &str) -> Option<Value>;
    /// 写入值，中间缺失（或不是对象）的节点会被创建为对象
    fn write(&mut self, path: &str, value: Value);
    fn delete(&mut self, path: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySession {
    data: Map<String, Value>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 整个会话作为一个 JSON 对象
    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }
}

impl Session for MemorySession {
    fn check(&self, path: &str) -> bool {
        matches!(self.read(path), Some(v) if !v.is_null())
    }

    fn read(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut node = self.data.get(first)?;
        for segment in segments {
            node = node.as_object()?.get(segment)?;
        }
        Some(node.clone())
    }

    fn write(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => return,
        };

        let mut map = &mut self.data;
        for segment in parents {
            let entry = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            map = match entry.as_object_mut() {
                Some(m) => m,
                None => return,
            };
        }
        map.insert(last.to_string(), value);
    }

    fn delete(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => return,
        };

        let mut map = &mut self.data;
        for segment in parents {
            map = match map.get_mut(*segment) {
                Some(Value::Object(m)) => m,
                _ => return,
            };
        }
        map.remove(*last);
    }
}
