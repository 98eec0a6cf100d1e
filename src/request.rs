// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求模块
//!
//! 该模块将 TCP 流中读取的原始字节解析为强类型的 `Request` 结构体，
//! 并为 flash 组件提供它所依赖的请求侧能力：
//! 1. 请求行（Request-Line）的解析（方法、路径、版本）。
//! 2. 完整保留的 HTTP 标头列表，支持按名称（大小写不敏感）读取多个值。
//! 3. AJAX 请求识别（`X-Requested-With: XMLHttpRequest`）。
//! 4. 会话 Cookie 的提取。

use crate::{exception::Exception, param::*};
use lazy_static::lazy_static;
use log::error;
use regex::Regex;

lazy_static! {
    static ref SESSION_COOKIE_RE: Regex =
        Regex::new(&format!(r"(?:^|;)\s*{}=([^;\s]+)", SESSION_COOKIE)).unwrap();
}

/// 表示一个完整的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法（GET, POST 等）
    method: HttpRequestMethod,
    /// 请求的资源路径（包含查询字符串）
    path: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 按出现顺序保存的标头，名称保持原样
    headers: Vec<(String, String)>,
    /// 请求体文本
    body: String,
}

impl Request {
    /// 以给定的方法和路径构造一个不带标头的请求。
    pub fn new(method: HttpRequestMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            version: HttpVersion::V1_1,
            headers: vec![],
            body: String::new(),
        }
    }

    /// 追加一个标头，返回新的请求。同名标头可以出现多次。
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：确保请求数据是合法的 UTF-8 字符串。
    /// 2. 解析请求行：提取方法、路径和协议版本。
    /// 3. 逐行解析标头，直到空行为止。
    /// 4. 空行之后的内容作为请求体（去除读取缓冲区尾部的 `\0` 填充）。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 全局请求 ID，用于在多线程环境下追踪日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string.trim_end_matches('\0'),
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let (head, body) = match request_string.split_once("\r\n\r\n") {
            Some((head, body)) => (head, body),
            None => (request_string, ""),
        };
        let mut request_lines = head.split(CRLF);

        // 请求行 (e.g., "POST /flash/success HTTP/1.1")
        let first_line = request_lines.next().unwrap_or("");
        let first_line_parts: Vec<&str> = first_line.split(' ').collect();
        if first_line_parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, first_line);
            return Err(Exception::UnSupportedRequestMethod);
        }

        let method_str = first_line_parts[0].to_uppercase();
        let method = match method_str.as_str() {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            "OPTIONS" => HttpRequestMethod::Options,
            "POST" => HttpRequestMethod::Post,
            _ => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, &method_str);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        let version_str = first_line_parts[first_line_parts.len() - 1].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 路径中可能包含空格，虽然不规范但通过 join 尝试恢复
        let path = first_line_parts[1..first_line_parts.len() - 1].join(" ");

        let headers = request_lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        Ok(Self {
            method,
            path,
            version,
            headers,
            body: body.to_string(),
        })
    }
}

impl Request {
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// 获取某个标头的全部取值，名称大小写不敏感，每一行标头对应一个元素。
    pub fn get_header(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// 获取某个标头的第一个取值
    pub fn header(&self, name: &str) -> Option<&str> {
        self.get_header(name).into_iter().next()
    }

    pub fn user_agent(&self) -> &str {
        self.header("User-Agent").unwrap_or("")
    }

    /// 是否为浏览器脚本发起的异步请求
    pub fn is_ajax(&self) -> bool {
        self.get_header(HEADER_REQUESTED_WITH)
            .iter()
            .any(|v| *v == AJAX_MARKER)
    }

    /// 从 `Cookie` 标头中取出会话 ID
    pub fn session_id(&self) -> Option<&str> {
        self.get_header("Cookie").into_iter().find_map(|cookies| {
            SESSION_COOKIE_RE
                .captures(cookies)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
        })
    }
}
