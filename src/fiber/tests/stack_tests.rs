//! Tests for the frame stack operations

use super::helpers::{dialog, resume};
use crate::fiber::{Fiber, ProtocolError, Rest, Val, Wait};
use serde_json::json;

#[test]
fn test_start_pushes_root_with_args_pending() {
    let mut fiber = Fiber::new();
    fiber.start(dialog("root"), Val::Num(1.0)).unwrap();

    assert_eq!(fiber.depth(), 1);
    assert_eq!(fiber.top().unwrap().rest, Rest::Start);
    assert_eq!(fiber.wait, Wait::Done(Val::Num(1.0)));
}

#[test]
fn test_start_twice_fails() {
    let mut fiber = Fiber::new();
    fiber.start(dialog("root"), Val::Null).unwrap();

    let err = fiber.start(dialog("root"), Val::Null).unwrap_err();
    assert_eq!(err, ProtocolError::AlreadyStarted);
}

#[test]
fn test_call_sets_parent_resume_and_pushes_child() {
    let mut fiber = Fiber::new();
    fiber.start(dialog("parent"), Val::Null).unwrap();
    fiber
        .call(dialog("child"), Val::Str("args".into()), json!("after_child"))
        .unwrap();

    assert_eq!(fiber.depth(), 2);
    assert_eq!(fiber.frames[0].rest, resume("after_child"));
    assert_eq!(fiber.frames[1].rest, Rest::Start);
    assert_eq!(fiber.wait, Wait::Done(Val::Str("args".into())));
}

#[test]
fn test_call_on_empty_stack_fails() {
    let mut fiber = Fiber::new();
    let err = fiber.call(dialog("child"), Val::Null, json!("r")).unwrap_err();
    assert_eq!(err, ProtocolError::EmptyStack { op: "call" });
}

#[test]
fn test_done_feeds_result_to_parent() {
    let mut fiber = Fiber::new();
    fiber.start(dialog("parent"), Val::Null).unwrap();
    fiber.call(dialog("child"), Val::Null, json!("r")).unwrap();

    let terminal = fiber.done(Val::Num(42.0)).unwrap();

    assert_eq!(terminal, None);
    assert_eq!(fiber.depth(), 1);
    assert_eq!(fiber.wait, Wait::Done(Val::Num(42.0)));
}

#[test]
fn test_done_on_last_frame_is_terminal() {
    let mut fiber = Fiber::new();
    fiber.start(dialog("root"), Val::Null).unwrap();

    let terminal = fiber.done(Val::Num(42.0)).unwrap();

    assert_eq!(terminal, Some(Val::Num(42.0)));
    assert!(fiber.is_terminal());
    assert_eq!(fiber.wait, Wait::None);
}

#[test]
fn test_done_on_empty_stack_underflows() {
    let mut fiber = Fiber::new();
    assert_eq!(fiber.done(Val::Null).unwrap_err(), ProtocolError::Underflow);
}

#[test]
fn test_post_requires_pending_wait() {
    let mut fiber = Fiber::new();
    fiber.start(dialog("root"), Val::Null).unwrap();

    // Root has not waited yet - its start item is still pending
    let err = fiber.post(Val::Str("hi".into())).unwrap_err();
    assert_eq!(err, ProtocolError::NoPendingWait { found: "running" });
}

#[test]
fn test_post_twice_is_duplicate_delivery() {
    let mut fiber = Fiber::new();
    fiber.start(dialog("root"), Val::Null).unwrap();
    fiber.take_item();
    fiber.wait(json!("on_message")).unwrap();
    assert!(fiber.is_suspended());

    fiber.post(Val::Str("hi".into())).unwrap();
    let err = fiber.post(Val::Str("hi again".into())).unwrap_err();

    assert_eq!(err, ProtocolError::NoPendingWait { found: "running" });
}

#[test]
fn test_post_to_terminal_fiber_fails() {
    let mut fiber = Fiber::new();
    let err = fiber.post(Val::Null).unwrap_err();
    assert_eq!(err, ProtocolError::NoPendingWait { found: "terminal" });
}

#[test]
fn test_describe_lists_frames() {
    let mut fiber = Fiber::new();
    fiber.start(dialog("outer"), Val::Null).unwrap();
    fiber.call(dialog("inner"), Val::Null, json!("after_inner")).unwrap();

    let text = fiber.describe();
    assert!(text.contains("state: running (depth 2)"));
    assert!(text.contains("#0 outer [resume \"after_inner\"]"));
    assert!(text.contains("#1 inner [start]"));
}
