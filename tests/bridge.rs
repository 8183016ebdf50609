use std::sync::Arc;

use acp_timeline::{ActionError, Banner, ChatState, HostBridge};
use agent_events::{Session, SessionStatus};
use agent_events_mock::{HostCall, HostCallKind, RecordingHost, ScriptedTurn};
use pretty_assertions::assert_eq;
use serde_json::json;

fn bridge_with_active(ids: &[&str]) -> (Arc<RecordingHost>, HostBridge) {
    let mut state = ChatState::new();
    for id in ids {
        let mut session = Session::new(*id, *id);
        session.status = SessionStatus::Active;
        session.acp_session_id = Some(format!("acp-{id}"));
        state.register_session(session);
    }
    let host = Arc::new(RecordingHost::new());
    let bridge = HostBridge::new(state, host.clone()).expect("fresh channel");
    (host, bridge)
}

fn push_turn(bridge: &HostBridge, turn: ScriptedTurn) {
    for (name, payload) in turn.into_payloads().expect("payloads serialize") {
        assert_eq!(bridge.push_event(name, payload).ok(), Some(true));
    }
}

#[test]
fn events_wait_in_the_queue_until_drained() {
    let (host, bridge) = bridge_with_active(&["s1"]);
    push_turn(
        &bridge,
        ScriptedTurn::new("s1", "m1").text("Hello there").complete(),
    );

    assert_eq!(bridge.pending_len(), 3);
    assert!(bridge.with_state(|state| state.messages("s1").is_empty()));

    assert_eq!(bridge.drain_pending_events(), 3);
    assert_eq!(bridge.pending_len(), 0);
    let saved = host.saved_messages();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].content, "Hello there");
    assert!(!bridge.with_state(|state| state.registry().is_input_disabled("s1")));
}

#[test]
fn send_then_stream_round_trip() {
    let (host, bridge) = bridge_with_active(&["s1"]);

    let failures = bridge.submit("s1", "list the files").expect("send allowed");
    assert!(failures.is_empty());
    assert!(bridge.with_state(|state| state.registry().is_input_disabled("s1")));
    assert!(matches!(
        bridge.send_message("s1", "again"),
        Err(ActionError::InputDisabled { .. })
    ));

    push_turn(&bridge, ScriptedTurn::new("s1", "m1").text("src tests").complete());
    bridge.drain_pending_events();

    assert_eq!(
        host.calls()
            .iter()
            .map(HostCall::kind)
            .collect::<Vec<_>>(),
        vec![
            HostCallKind::SaveMessage,
            HostCallKind::SendMessage,
            HostCallKind::SaveMessage,
        ]
    );
    bridge.with_state(|state| {
        let messages = state.messages("s1");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "list the files");
        assert_eq!(messages[1].content, "src tests");
        assert!(!state.registry().is_input_disabled("s1"));
    });
}

#[test]
fn prompt_is_cleared_even_when_the_response_fails() {
    let (host, bridge) = bridge_with_active(&["s1"]);
    host.fail(HostCallKind::InteractionResponse);

    let prompt = json!({
        "sessionId": "s1",
        "promptType": "permission",
        "message": "Run cargo test?",
        "requestId": "req-7",
        "options": [
            { "kind": "allow_once", "name": "Allow", "optionId": "allow" },
            { "kind": "reject_once", "name": "Reject", "optionId": "reject" }
        ]
    });
    assert_eq!(bridge.push_event("interaction-prompt", prompt).ok(), Some(true));
    bridge.drain_pending_events();
    assert!(bridge.with_state(|state| state.prompts().has_pending("s1")));
    assert!(matches!(
        bridge.send_message("s1", "hello"),
        Err(ActionError::PromptPending { .. })
    ));

    let failures = bridge.submit("s1", " allow ").expect("prompt pending");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].effect, "send_interaction_response");

    let Some(HostCall::InteractionResponse(response)) = host.calls().pop() else {
        panic!("expected an interaction response call");
    };
    assert_eq!(response.request_id.as_deref(), Some("req-7"));
    assert_eq!(response.option_id.as_deref(), Some("allow"));

    bridge.with_state(|state| {
        assert!(!state.prompts().has_pending("s1"));
        assert!(matches!(
            state.registry().banner("s1"),
            Some(Banner::Error(message)) if message.starts_with("send_interaction_response failed")
        ));
    });
    assert!(matches!(
        bridge.resolve_prompt("s1", "allow"),
        Err(ActionError::NoPendingPrompt { .. })
    ));
}

#[test]
fn failed_send_unlocks_input_and_shows_banner() {
    let (host, bridge) = bridge_with_active(&["s1"]);
    host.fail(HostCallKind::SendMessage);

    let failures = bridge.send_message("s1", "hello").expect("send allowed");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].session_id, "s1");

    bridge.with_state(|state| {
        assert!(!state.registry().is_input_disabled("s1"));
        assert_eq!(state.messages("s1").len(), 1);
        assert!(state
            .registry()
            .error("s1")
            .is_some_and(|error| error.starts_with("send_message failed")));
    });

    host.recover(HostCallKind::SendMessage);
    assert!(bridge.send_message("s1", "retry").expect("send allowed").is_empty());
    assert!(bridge.with_state(|state| state.registry().error("s1").is_none()));
}

#[test]
fn resume_marks_resuming_until_active_status_arrives() {
    let (host, bridge) = bridge_with_active(&["s1"]);
    bridge
        .push_event(
            "session-status-changed",
            json!({ "sessionId": "s1", "status": "paused" }),
        )
        .expect("payload decodes");
    bridge.drain_pending_events();

    bridge.resume("s1").expect("resumable");
    assert!(bridge.with_state(|state| matches!(
        state.registry().banner("s1"),
        Some(Banner::Resuming)
    )));

    bridge
        .push_event(
            "session-status-changed",
            json!({ "sessionId": "s1", "status": "active" }),
        )
        .expect("payload decodes");
    bridge.drain_pending_events();

    assert!(bridge.with_state(|state| state.registry().banner("s1").is_none()));
    assert_eq!(host.count(HostCallKind::ResumeSession), 1);
}

#[test]
fn terminate_with_cleanup_forgets_the_session() {
    let (host, bridge) = bridge_with_active(&["s1", "s2"]);
    push_turn(&bridge, ScriptedTurn::new("s1", "m1").text("partial"));
    bridge.drain_pending_events();

    bridge.terminate("s1", true).expect("known session");

    bridge.with_state(|state| {
        assert!(!state.registry().contains("s1"));
        assert!(state.messages("s1").is_empty());
        assert!(state.registry().contains("s2"));
    });
    assert!(matches!(
        bridge.stop("s1"),
        Err(ActionError::UnknownSession { .. })
    ));
    assert_eq!(
        host.calls().last(),
        Some(&HostCall::TerminateSession {
            session_id: "s1".to_string(),
            cleanup: true,
        })
    );

    push_turn(&bridge, ScriptedTurn::new("s1", "m1").text(" late").complete());
    push_turn(&bridge, ScriptedTurn::new("s1", "m2").text("ghost"));
    bridge.drain_pending_events();
    assert!(bridge.with_state(|state| state.messages("s1").is_empty()));
    assert_eq!(host.count(HostCallKind::SaveMessage), 0);
    assert_eq!(bridge.shutdown().map(|report| report.messages), Some(0));
}

#[test]
fn mode_and_model_are_applied_locally() {
    let (host, bridge) = bridge_with_active(&["s1"]);

    bridge.set_mode("s1", "plan").expect("known session");
    bridge.set_model("s1", "large").expect("known session");

    bridge.with_state(|state| {
        let session = state.registry().get("s1").expect("session exists");
        assert_eq!(session.current_mode_id.as_deref(), Some("plan"));
        assert_eq!(session.current_model_id.as_deref(), Some("large"));
    });
    assert_eq!(host.count(HostCallKind::SetSessionMode), 1);
    assert_eq!(host.count(HostCallKind::SetSessionModel), 1);
}

#[test]
fn shutdown_unsubscribes_and_flushes_once() {
    let (host, bridge) = bridge_with_active(&["s1"]);
    push_turn(&bridge, ScriptedTurn::new("s1", "m1").text("half a thought"));

    let report = bridge.shutdown().expect("first shutdown flushes");
    assert_eq!(report.messages, 1);
    assert_eq!(host.count(HostCallKind::SaveMessage), 1);

    let late = json!({ "sessionId": "s1", "messageId": "m2", "content": "late" });
    assert_eq!(bridge.push_event("stream-chunk", late).ok(), Some(false));
    assert_eq!(bridge.pending_len(), 0);

    assert!(bridge.shutdown().is_none());
    drop(bridge);
    assert_eq!(host.count(HostCallKind::SaveMessage), 1);
}

#[test]
fn unknown_event_names_are_rejected() {
    let (_host, bridge) = bridge_with_active(&[]);
    assert!(bridge.push_event("terminal-output", json!({})).is_err());
    assert_eq!(bridge.pending_len(), 0);
}
