//! # flash 消息数据模型
//!
//! - `FlashMessage`：写入会话 `Flash.<key>` 队列中的单条记录。
//! - `FlashContent`：调用方提供的消息来源，文本或带错误码的错误。
//! - `FlashOptions`：调用处的可选覆盖项，未给出的字段回落到 `FlashConfig`。

use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    config::FlashConfig,
    exception::{CodedError, Exception},
};

/// 会话队列中的一条 flash 消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub message: String,
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// 负责渲染该消息的模板标识，如 `flash/success` 或 `Blog.flash/custom`
    pub element: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// 消息来源
#[derive(Debug, Clone, PartialEq)]
pub enum FlashContent {
    Text(String),
    /// 错误文本作为消息正文，错误码合并进 `params.code`
    Error { message: String, code: Option<i64> },
}

impl FlashContent {
    pub fn from_error<E: CodedError + ?Sized>(error: &E) -> Self {
        FlashContent::Error {
            message: error.to_string(),
            code: error.code(),
        }
    }
}

impl From<&str> for FlashContent {
    fn from(text: &str) -> Self {
        FlashContent::Text(text.to_string())
    }
}

impl From<String> for FlashContent {
    fn from(text: String) -> Self {
        FlashContent::Text(text)
    }
}

impl From<&Exception> for FlashContent {
    fn from(error: &Exception) -> Self {
        FlashContent::from_error(error)
    }
}

impl From<&std::io::Error> for FlashContent {
    fn from(error: &std::io::Error) -> Self {
        FlashContent::from_error(error)
    }
}

/// 调用处选项。所有字段都是可选的，`None` 表示沿用更低一层的默认值。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashOptions {
    pub key: Option<String>,
    pub element: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub params: Option<Map<String, Value>>,
    pub clear: Option<bool>,
    pub duplicate: Option<bool>,
    pub escape: Option<bool>,
    /// 仅在 severity 简写中使用，把默认模板放到插件命名空间下
    pub plugin: Option<String>,
}

impl FlashOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn element(mut self, element: &str) -> Self {
        self.element = Some(element.to_string());
        self
    }

    pub fn kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// 追加单个模板参数
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), value.into());
        self
    }

    pub fn clear(mut self, clear: bool) -> Self {
        self.clear = Some(clear);
        self
    }

    pub fn duplicate(mut self, duplicate: bool) -> Self {
        self.duplicate = Some(duplicate);
        self
    }

    pub fn escape(mut self, escape: bool) -> Self {
        self.escape = Some(escape);
        self
    }

    pub fn plugin(mut self, plugin: &str) -> Self {
        self.plugin = Some(plugin.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 以 `self` 为准合并到 `base` 之上
    pub fn merge_over(self, base: FlashOptions) -> FlashOptions {
        FlashOptions {
            key: self.key.or(base.key),
            element: self.element.or(base.element),
            kind: self.kind.or(base.kind),
            params: self.params.or(base.params),
            clear: self.clear.or(base.clear),
            duplicate: self.duplicate.or(base.duplicate),
            escape: self.escape.or(base.escape),
            plugin: self.plugin.or(base.plugin),
        }
    }

    pub(crate) fn resolve(self, defaults: &FlashConfig) -> ResolvedOptions {
        ResolvedOptions {
            key: self.key.unwrap_or_else(|| defaults.key.clone()),
            element: self.element.unwrap_or_else(|| defaults.element.clone()),
            kind: self.kind.unwrap_or_else(|| defaults.kind.clone()),
            params: self.params.unwrap_or_else(|| defaults.params.clone()),
            clear: self.clear.unwrap_or(defaults.clear),
            duplicate: self.duplicate.unwrap_or(defaults.duplicate),
            escape: self.escape,
        }
    }
}

/// 与组件默认值合并后的完整选项
#[derive(Debug, Clone)]
pub(crate) struct ResolvedOptions {
    pub key: String,
    pub element: String,
    pub kind: String,
    pub params: Map<String, Value>,
    pub clear: bool,
    pub duplicate: bool,
    pub escape: Option<bool>,
}
