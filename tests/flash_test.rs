//! # flash 组件集成测试
//!
//! 只通过公开 API 驱动组件：写入、简写、视图层读取以及 AJAX 渲染前钩子。

use proptest::prelude::*;
use serde_json::{json, Value};

use webflash::{
    param::{AJAX_MARKER, HEADER_FLASH, HEADER_GET_FLASH, HEADER_REQUESTED_WITH},
    Controller, Exception, FlashComponent, FlashContent, FlashMessage, FlashOptions,
    HttpRequestMethod, MemorySession, RenderEvent, Request, Session,
};

fn queue(session: &MemorySession, key: &str) -> Vec<FlashMessage> {
    session
        .read(&format!("Flash.{}", key))
        .map(|v| serde_json::from_value(v).unwrap())
        .unwrap_or_default()
}

fn ajax_request() -> Request {
    let raw = format!(
        "GET /dashboard HTTP/1.1\r\nHost: localhost\r\n{}: {}\r\n{}: yes\r\n\r\n",
        HEADER_REQUESTED_WITH, AJAX_MARKER, HEADER_GET_FLASH
    );
    Request::try_from(raw.as_bytes(), 1).unwrap()
}

#[test]
fn test_messages_keep_insertion_order() {
    let flash = FlashComponent::default();
    let mut session = MemorySession::new();

    flash.set(&mut session, "M1", FlashOptions::new()).unwrap();
    flash.set(&mut session, "M2", FlashOptions::new()).unwrap();

    let texts: Vec<String> = queue(&session, "flash").into_iter().map(|m| m.message).collect();
    assert_eq!(texts, vec!["M1", "M2"]);
}

#[test]
fn test_clear_leaves_single_message() {
    let flash = FlashComponent::default();
    let mut session = MemorySession::new();

    for text in ["a", "b", "c"] {
        flash.set(&mut session, text, FlashOptions::new()).unwrap();
    }
    flash
        .set(&mut session, "d", FlashOptions::new().clear(true))
        .unwrap();

    assert_eq!(queue(&session, "flash").len(), 1);
}

#[test]
fn test_error_message_and_code() {
    let flash = FlashComponent::default();
    let mut session = MemorySession::new();

    flash
        .set(
            &mut session,
            FlashContent::Error {
                message: "Record not found".to_string(),
                code: Some(404),
            },
            FlashOptions::new().kind("error"),
        )
        .unwrap();

    let messages = queue(&session, "flash");
    let message = &messages[0];
    assert_eq!(message.message, "Record not found");
    assert_eq!(message.params["code"], 404);
}

#[test]
fn test_writes_do_not_touch_other_keys() {
    let flash = FlashComponent::default();
    let mut session = MemorySession::new();
    session.write("Auth.user", json!("alice"));

    flash
        .set(&mut session, "x", FlashOptions::new().key("alerts"))
        .unwrap();
    flash
        .set(&mut session, "y", FlashOptions::new().clear(true))
        .unwrap();

    assert_eq!(queue(&session, "alerts").len(), 1);
    assert_eq!(queue(&session, "flash").len(), 1);
    assert_eq!(session.read("Auth.user"), Some(json!("alice")));
}

#[test]
fn test_shorthand_success_record() {
    let flash = FlashComponent::default();
    let mut session = MemorySession::new();

    flash.success(&mut session, "Saved", None).unwrap();

    let messages = queue(&session, "flash");
    let message = &messages[0];
    assert_eq!(message.kind, "success");
    assert_eq!(message.element, "flash/success");
    assert_eq!(message.message, "Saved");
}

#[test]
fn test_shorthand_requires_message() {
    let flash = FlashComponent::default();
    let mut session = MemorySession::new();

    let err = flash.call(&mut session, "error", None, None).unwrap_err();
    assert_eq!(err, Exception::FlashMessageMissing);
    assert_eq!(err.to_string(), "Flash message missing");
    assert!(session.is_empty());
}

#[test]
fn test_view_and_ajax_paths_both_drain() {
    let flash = FlashComponent::default();
    let mut session = MemorySession::new();
    flash.success(&mut session, "first", None).unwrap();

    // 视图层读取
    let rendered = flash.consume(&mut session, "flash");
    assert_eq!(rendered.len(), 1);

    // 下一次请求只能看到新写入的消息
    flash.info(&mut session, "second", None).unwrap();
    let mut controller = Controller::new(ajax_request(), &mut session);
    flash
        .before_render(&mut RenderEvent::new(&mut controller))
        .unwrap();

    let header = controller.response().header(HEADER_FLASH).unwrap().to_string();
    drop(controller);
    let decoded: Value = serde_json::from_str(&header).unwrap();
    assert_eq!(
        decoded,
        json!({"flash": [{"message": "second", "type": "info", "params": {}}]})
    );
    assert!(!session.check("Flash"));
}

#[test]
fn test_non_ajax_request_untouched() {
    let flash = FlashComponent::default();
    let mut session = MemorySession::new();
    flash.success(&mut session, "Saved", None).unwrap();
    let before = session.clone();

    let request = Request::new(HttpRequestMethod::Get, "/").with_header(HEADER_GET_FLASH, "yes");
    let mut controller = Controller::new(request, &mut session);
    flash
        .before_render(&mut RenderEvent::new(&mut controller))
        .unwrap();

    assert!(controller.response().headers().is_empty());
    drop(controller);
    assert_eq!(session, before);
}

#[test]
fn test_ajax_header_exact_encoding() {
    let flash = FlashComponent::default();
    let mut session = MemorySession::new();
    session.write(
        "Flash.flash",
        json!([{"message": "Saved", "type": "success", "params": null}]),
    );

    let mut controller = Controller::new(ajax_request(), &mut session);
    flash
        .before_render(&mut RenderEvent::new(&mut controller))
        .unwrap();

    let bytes = controller.response().as_bytes();
    let raw = String::from_utf8_lossy(&bytes);
    assert!(raw.contains(
        "X-Flash: {\"flash\":[{\"message\":\"Saved\",\"type\":\"success\",\"params\":null}]}\r\n"
    ));
    drop(controller);
    assert_eq!(session.read("Flash"), None);
}

#[test]
fn test_malformed_branch_rejected() {
    let flash = FlashComponent::default();
    let mut session = MemorySession::new();
    session.write("Flash.flash", json!(7));

    let mut controller = Controller::new(ajax_request(), &mut session);
    let err = flash
        .before_render(&mut RenderEvent::new(&mut controller))
        .unwrap_err();

    assert_eq!(err, Exception::MalformedFlash("flash".to_string()));
    assert_eq!(controller.response().header(HEADER_FLASH), None);
    drop(controller);
    assert_eq!(session.read("Flash.flash"), Some(json!(7)));
}

proptest! {
    #[test]
    fn prop_queue_preserves_order(texts in prop::collection::vec("[a-zA-Z0-9 ]{0,12}", 1..16)) {
        let flash = FlashComponent::default();
        let mut session = MemorySession::new();
        for text in &texts {
            flash.set(&mut session, text.as_str(), FlashOptions::new()).unwrap();
        }

        let stored: Vec<String> = queue(&session, "flash").into_iter().map(|m| m.message).collect();
        prop_assert_eq!(stored, texts);
    }

    #[test]
    fn prop_no_duplicates_when_disabled(texts in prop::collection::vec("[abc]{1,2}", 1..24)) {
        let flash = FlashComponent::default();
        let mut session = MemorySession::new();
        for text in &texts {
            flash
                .set(&mut session, text.as_str(), FlashOptions::new().duplicate(false))
                .unwrap();
        }

        let stored: Vec<String> = queue(&session, "flash").into_iter().map(|m| m.message).collect();
        let mut expected: Vec<String> = vec![];
        for text in texts {
            if !expected.contains(&text) {
                expected.push(text);
            }
        }
        prop_assert_eq!(stored, expected);
    }

    #[test]
    fn prop_element_namespacing(name in "[a-z_]{1,10}", plugin in proptest::option::of("[A-Z][a-z]{1,8}")) {
        let flash = FlashComponent::default();
        let mut session = MemorySession::new();
        let element = match &plugin {
            Some(p) => format!("{}.{}", p, name),
            None => name.clone(),
        };
        flash
            .set(&mut session, "x", FlashOptions::new().element(&element))
            .unwrap();

        let expected = match plugin {
            Some(p) => format!("{}.flash/{}", p, name),
            None => format!("flash/{}", name),
        };
        let stored = queue(&session, "flash");
        prop_assert_eq!(&stored[0].element, &expected);
    }
}
