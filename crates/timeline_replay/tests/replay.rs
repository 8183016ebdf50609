use std::io::Cursor;
use std::sync::Arc;

use acp_timeline::{ChatState, HostBridge};
use agent_events::{Session, SessionStatus, ToolCallStatus, ToolKind};
use agent_events_mock::ScriptedTurn;
use message_store::MessageStore;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use timeline_replay::{replay_reader, restore_from_store, ReplayError, StoreHost};

mod support;

fn setup() -> (TempDir, Arc<MessageStore>, support::SharedBuffer, HostBridge) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = Arc::new(MessageStore::new(dir.path().join("messages")));
    let outbound = support::SharedBuffer::default();
    let host = Arc::new(StoreHost::new(
        Arc::clone(&store),
        Box::new(outbound.clone()),
    ));
    let bridge = HostBridge::new(ChatState::new(), host).expect("fresh channel");
    (dir, store, outbound, bridge)
}

fn log_lines(turns: Vec<ScriptedTurn>) -> String {
    let mut log = String::new();
    for turn in turns {
        for (event, payload) in turn.into_payloads().expect("payloads serialize") {
            log.push_str(&json!({ "event": event, "payload": payload }).to_string());
            log.push('\n');
        }
    }
    log
}

#[test]
fn completed_turn_is_persisted_once() {
    let (_dir, store, _outbound, bridge) = setup();
    let log = log_lines(vec![ScriptedTurn::new("s1", "m1")
        .text("Hello world")
        .complete()
        .complete()]);

    let summary = replay_reader(&bridge, Cursor::new(log)).expect("replay succeeds");
    assert_eq!(summary.events, 4);
    assert_eq!(summary.flush.map(|flush| flush.messages), Some(0));

    let saved = store.load_messages("s1").expect("log loads");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].content, "Hello world");
    assert!(!saved[0].is_streaming);

    let raw = std::fs::read_to_string(store.session_path("s1")).expect("log readable");
    assert_eq!(raw.lines().count(), 2, "header plus exactly one message record");
}

#[test]
fn unfinished_turn_is_flushed_with_interrupted_tool_call() {
    let (_dir, store, _outbound, bridge) = setup();
    let log = log_lines(vec![ScriptedTurn::new("s2", "m1")
        .text("Running tests ")
        .tool_started("call-1", "cargo test", ToolKind::Execute)]);

    let summary = replay_reader(&bridge, Cursor::new(log)).expect("replay succeeds");
    let flush = summary.flush.expect("flush ran");
    assert_eq!(flush.messages, 1);
    assert_eq!(flush.interrupted_tool_calls, 1);
    assert_eq!(flush.persist_failures, 0);

    let saved = store.load_messages("s2").expect("log loads");
    assert_eq!(saved.len(), 1);
    assert!(!saved[0].is_streaming);
    assert_eq!(
        saved[0].tool_call("call-1").map(|call| call.status),
        Some(ToolCallStatus::Interrupted)
    );
}

#[test]
fn undecodable_events_are_skipped_and_bad_lines_fail() {
    let (_dir, _store, _outbound, bridge) = setup();
    let log = [
        json!({ "event": "terminal-output", "payload": {} }).to_string(),
        json!({ "event": "stream-chunk", "payload": { "content": "no ids" } }).to_string(),
        json!({
            "event": "stream-chunk",
            "payload": { "sessionId": "s1", "messageId": "m1", "content": "ok", "isComplete": true }
        })
        .to_string(),
    ]
    .join("\n");

    let summary = replay_reader(&bridge, Cursor::new(log)).expect("replay succeeds");
    assert_eq!(summary.rejected_events, 2);
    assert_eq!(summary.events, 1);

    let (_dir, _store, _outbound, bridge) = setup();
    let error = replay_reader(&bridge, Cursor::new("not json\n")).expect_err("bad line");
    assert!(matches!(error, ReplayError::Parse { line: 1, .. }));
}

#[test]
fn restored_history_is_final_and_outbound_rpcs_are_written() {
    let (_dir, store, outbound, bridge) = setup();
    let mut previous = agent_events::ChatMessage::assistant_streaming("s1", "old");
    previous.content = "earlier answer".to_string();
    previous.is_streaming = false;
    store.save_message(&previous).expect("seeded");

    assert_eq!(restore_from_store(&bridge, &store).expect("restores"), 1);
    bridge.with_state(|state| {
        assert_eq!(state.messages("s1").len(), 1);
        assert!(state.timeline().streaming_message("s1").is_none());
    });

    let mut session = Session::new("s1", "Restored");
    session.status = SessionStatus::Active;
    bridge.with_state_mut(|state| state.register_session(session));
    let failures = bridge.send_message("s1", "and now?").expect("send allowed");
    assert!(failures.is_empty());

    assert_eq!(
        outbound.lines(),
        vec![json!({ "rpc": "send_message", "sessionId": "s1", "content": "and now?" })]
    );
    assert_eq!(store.load_messages("s1").expect("log loads").len(), 2);
}
