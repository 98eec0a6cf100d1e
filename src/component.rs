//! # Flash 组件
//!
//! 请求处理过程中把一次性的提示消息写入会话，在下一次渲染时取出并丢弃。
//!
//! ## 数据流
//! 1. 处理器通过 `set` 或 severity 简写（`success`、`error` 等）写入 `Flash.<key>` 队列。
//! 2. 渲染前钩子 `before_render`：若请求是 AJAX 且带有 `X-Get-Flash: yes`，
//!    一次性取出整个 `Flash` 分支，编码为 JSON 放入 `X-Flash` 响应头。
//! 3. 否则由视图层调用 `consume` 读取并清空队列。

use std::collections::BTreeMap;

use log::{debug, error, warn};
use serde_derive::Serialize;
use serde_json::Value;

use crate::{
    config::FlashConfig,
    controller::RenderEvent,
    exception::Exception,
    message::{FlashContent, FlashMessage, FlashOptions},
    param::*,
    session::Session,
    util::{plugin_split, to_ascii_json, underscore},
};

/// `X-Flash` 头中每条消息的形态，缺失的字段编码为 `null`
#[derive(Debug, Serialize)]
struct FlashPayload {
    message: Value,
    #[serde(rename = "type")]
    kind: Value,
    params: Value,
}

impl FlashPayload {
    fn from_record(record: &Value) -> Self {
        let field = |name: &str| record.get(name).cloned().unwrap_or(Value::Null);
        Self {
            message: field("message"),
            kind: field("type"),
            params: field("params"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlashComponent {
    config: FlashConfig,
}

impl FlashComponent {
    pub fn new(config: FlashConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// 向 `Flash.<key>` 队列追加一条消息。
    ///
    /// `duplicate` 为 false 且队列中已有相同文本（只比较 `message`）时不写入，也不报错。
    pub fn set(
        &self,
        session: &mut dyn Session,
        message: impl Into<FlashContent>,
        options: FlashOptions,
    ) -> Result<(), Exception> {
        let options = options.resolve(&self.config);
        let mut params = options.params;

        let text = match message.into() {
            FlashContent::Text(text) => text,
            FlashContent::Error { message, code } => {
                if let Some(code) = code {
                    params.entry("code").or_insert(Value::from(code));
                }
                message
            }
        };
        if let Some(escape) = options.escape {
            params.entry("escape").or_insert(Value::Bool(escape));
        }

        let element = match plugin_split(&options.element) {
            (Some(plugin), name) => format!("{}.flash/{}", plugin, name),
            (None, name) => format!("flash/{}", name),
        };

        let path = queue_path(&options.key);
        let mut queue = if options.clear {
            vec![]
        } else {
            load_queue(session, &path)
        };

        if !options.duplicate
            && queue
                .iter()
                .any(|record| record.get("message").and_then(Value::as_str) == Some(text.as_str()))
        {
            debug!("{}中已存在相同的消息，跳过写入", path);
            return Ok(());
        }

        let record = FlashMessage {
            message: text,
            key: options.key,
            kind: options.kind,
            element,
            params,
        };
        let record = serde_json::to_value(&record).map_err(|e| {
            error!("无法编码flash消息：{}", e);
            Exception::EncodeFailed
        })?;
        queue.push(record);
        debug!("{}队列长度：{}", path, queue.len());
        session.write(&path, Value::Array(queue));
        Ok(())
    }

    /// severity 简写：`name` 同时作为消息类型，并派生出默认模板名（`notFound` -> `not_found`）。
    ///
    /// 选项中的 `plugin` 会把模板固定为 `<plugin>.<derived>`，其余选项覆盖简写的默认值。
    pub fn call(
        &self,
        session: &mut dyn Session,
        name: &str,
        message: Option<FlashContent>,
        options: Option<FlashOptions>,
    ) -> Result<(), Exception> {
        let element = underscore(name);
        let message = message.ok_or(Exception::FlashMessageMissing)?;

        let base = FlashOptions::new().element(&element).kind(name);
        let options = match options {
            Some(mut supplied) if !supplied.is_empty() => {
                if let Some(plugin) = supplied.plugin.take().filter(|p| !p.is_empty()) {
                    supplied.element = Some(format!("{}.{}", plugin, element));
                }
                supplied.merge_over(base)
            }
            _ => base,
        };

        self.set(session, message, options)
    }

    pub fn success(
        &self,
        session: &mut dyn Session,
        message: impl Into<FlashContent>,
        options: Option<FlashOptions>,
    ) -> Result<(), Exception> {
        self.call(session, "success", Some(message.into()), options)
    }

    pub fn error(
        &self,
        session: &mut dyn Session,
        message: impl Into<FlashContent>,
        options: Option<FlashOptions>,
    ) -> Result<(), Exception> {
        self.call(session, "error", Some(message.into()), options)
    }

    pub fn warning(
        &self,
        session: &mut dyn Session,
        message: impl Into<FlashContent>,
        options: Option<FlashOptions>,
    ) -> Result<(), Exception> {
        self.call(session, "warning", Some(message.into()), options)
    }

    pub fn info(
        &self,
        session: &mut dyn Session,
        message: impl Into<FlashContent>,
        options: Option<FlashOptions>,
    ) -> Result<(), Exception> {
        self.call(session, "info", Some(message.into()), options)
    }

    /// 视图层读取并删除一个队列。无法解码的记录会被丢弃。
    pub fn consume(&self, session: &mut dyn Session, key: &str) -> Vec<FlashMessage> {
        let path = queue_path(key);
        let records = load_queue(session, &path);
        session.delete(&path);

        records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<FlashMessage>(record) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("{}中的记录无法解析，已丢弃：{}", path, e);
                    None
                }
            })
            .collect()
    }

    /// 队列中尚未被读取的消息数
    pub fn pending(&self, session: &dyn Session, key: &str) -> usize {
        match session.read(&queue_path(key)) {
            Some(Value::Array(records)) => records.len(),
            _ => 0,
        }
    }

    /// 渲染前钩子。仅对带有 `X-Get-Flash: yes` 的 AJAX 请求生效。
    ///
    /// 出错时响应和会话都保持原样。
    pub fn before_render(&self, event: &mut RenderEvent<'_, '_>) -> Result<(), Exception> {
        let controller = event.subject();

        let request = controller.request();
        if !request.is_ajax() {
            return Ok(());
        }
        let wants_flash = request
            .get_header(HEADER_GET_FLASH)
            .iter()
            .any(|v| v.eq_ignore_ascii_case("yes"));
        if !wants_flash {
            return Ok(());
        }

        let branch = match controller.session().read(FLASH_ROOT) {
            None | Some(Value::Null) => return Ok(()),
            Some(branch) => branch,
        };
        let payload = collect_payload(branch)?;
        let encoded = to_ascii_json(&payload).map_err(|e| {
            error!("无法编码flash消息：{}", e);
            Exception::EncodeFailed
        })?;

        controller.session_mut().delete(FLASH_ROOT);
        let response = controller.response().clone().with_header(HEADER_FLASH, &encoded);
        controller.set_response(response);
        debug!("已通过{}头投递{}个flash队列", HEADER_FLASH, payload.len());
        Ok(())
    }
}

fn queue_path(key: &str) -> String {
    format!("{}.{}", FLASH_ROOT, key)
}

fn load_queue(session: &dyn Session, path: &str) -> Vec<Value> {
    match session.read(path) {
        Some(Value::Array(records)) => records,
        None | Some(Value::Null) => vec![],
        Some(_) => {
            warn!("{}不是数组，按空队列处理", path);
            vec![]
        }
    }
}

fn collect_payload(branch: Value) -> Result<BTreeMap<String, Vec<FlashPayload>>, Exception> {
    let queues = match branch {
        Value::Object(queues) => queues,
        _ => return Err(Exception::MalformedFlash(FLASH_ROOT.to_string())),
    };

    let mut payload = BTreeMap::new();
    for (key, queue) in queues {
        let records = match queue {
            Value::Array(records) => records,
            _ => return Err(Exception::MalformedFlash(key)),
        };
        payload.insert(key, records.iter().map(FlashPayload::from_record).collect());
    }
    Ok(payload)
}
