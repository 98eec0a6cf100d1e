// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了 flash 消息组件及其宿主服务器在请求处理生命周期中可能抛出的各类异常。
//!
//! ## 设计意图
//! - **错误分类**：涵盖了协议解析错误、配置加载错误以及 flash 会话数据错误。
//! - **错误码**：通过 `CodedError`，异常可以携带数字错误码，写入 flash 消息的 `params.code`。
//! - **用户友好**：通过实现 `std::fmt::Display`，错误信息可以直接作为 flash 消息文本使用。

use std::{fmt, io};

/// 组件处理请求过程中发生的异常类型。
#[derive(Debug, Clone, PartialEq)]
pub enum Exception {
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求行格式错误或使用了不支持的 HTTP 方法。
    UnSupportedRequestMethod,
    /// 客户端使用了不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
    /// 配置文件不存在或无法读取。
    ConfigUnreadable,
    /// 会话中的 `Flash` 分支结构非法。携带出错的队列名（分支本身非法时为 `Flash`）。
    MalformedFlash(String),
    /// 以 severity 简写方式调用时没有提供消息。
    FlashMessageMissing,
    /// flash 数据无法编码为 JSON。
    EncodeFailed,
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            ConfigUnreadable => write!(f, "Config file can't be read"),
            MalformedFlash(key) => write!(f, "Value for flash setting key '{}' must be an array", key),
            FlashMessageMissing => write!(f, "Flash message missing"),
            EncodeFailed => write!(f, "Flash messages can't be encoded as JSON"),
        }
    }
}

impl std::error::Error for Exception {}

/// 可以作为 flash 消息来源的错误类型。
///
/// 错误文本成为消息正文，`code()` 返回的错误码会被合并进 `params.code`。
pub trait CodedError: fmt::Display {
    fn code(&self) -> Option<i64> {
        None
    }
}

impl CodedError for Exception {
    /// 对应的 HTTP 状态码
    fn code(&self) -> Option<i64> {
        match self {
            RequestIsNotUtf8 | UnSupportedRequestMethod => Some(400),
            UnsupportedHttpVersion => Some(505),
            FlashMessageMissing => Some(400),
            ConfigUnreadable | MalformedFlash(_) | EncodeFailed => Some(500),
        }
    }
}

impl CodedError for io::Error {
    fn code(&self) -> Option<i64> {
        self.raw_os_error().map(i64::from)
    }
}
