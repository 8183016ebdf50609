use std::sync::{Arc, Mutex};

use acp_timeline::{ChatState, TeardownGuard};
use agent_events::{HostEvent, Session, SessionStatus, StreamChunk, ToolCallStatus, ToolKind};
use agent_events_mock::{HostCallKind, RecordingHost, ScriptedTurn};
use pretty_assertions::assert_eq;

fn state_with(events: Vec<HostEvent>) -> Arc<Mutex<ChatState>> {
    let mut state = ChatState::new();
    for event in events {
        state.apply_event(event);
    }
    Arc::new(Mutex::new(state))
}

#[test]
fn flush_interrupts_running_tool_call_and_persists_once() {
    let state = state_with(
        ScriptedTurn::new("s1", "m1")
            .text("Running ")
            .tool_started("call-1", "cargo test", ToolKind::Execute)
            .into_events(),
    );
    let host = Arc::new(RecordingHost::new());
    let guard = TeardownGuard::new(Arc::clone(&state), host.clone());

    let report = guard.flush().expect("first flush runs");
    assert_eq!(report.sessions, 1);
    assert_eq!(report.messages, 1);
    assert_eq!(report.interrupted_tool_calls, 1);

    let saved = host.saved_messages();
    assert_eq!(saved.len(), 1);
    assert!(!saved[0].is_streaming);
    assert_eq!(
        saved[0].tool_call("call-1").map(|call| call.status),
        Some(ToolCallStatus::Interrupted)
    );

    let state = state.lock().expect("state lock");
    assert!(!state.messages("s1")[0].is_streaming);
    assert!(!state.registry().is_input_disabled("s1"));
}

#[test]
fn flush_runs_once_even_when_dropped_afterwards() {
    let state = state_with(ScriptedTurn::new("s1", "m1").text("partial").into_events());
    let host = Arc::new(RecordingHost::new());

    {
        let guard = TeardownGuard::new(Arc::clone(&state), host.clone());
        assert!(guard.flush().is_some());
        assert!(guard.flush().is_none());
        assert!(guard.has_fired());
    }

    assert_eq!(host.count(HostCallKind::SaveMessage), 1);
}

#[test]
fn dropping_the_guard_flushes() {
    let state = state_with(ScriptedTurn::new("s1", "m1").text("partial").into_events());
    let host = Arc::new(RecordingHost::new());

    drop(TeardownGuard::new(Arc::clone(&state), host.clone()));

    assert_eq!(host.count(HostCallKind::SaveMessage), 1);
}

#[test]
fn persistence_failures_are_counted_not_raised() {
    let state = state_with(
        [
            ScriptedTurn::new("a", "m1").text("one").into_events(),
            ScriptedTurn::new("b", "m1").text("two").into_events(),
        ]
        .concat(),
    );
    let host = Arc::new(RecordingHost::new());
    host.fail(HostCallKind::SaveMessage);
    let guard = TeardownGuard::new(Arc::clone(&state), host.clone());

    let report = guard.flush().expect("flush runs");
    assert_eq!(report.sessions, 2);
    assert_eq!(report.persist_failures, 2);

    let state = state.lock().expect("state lock");
    assert!(state.timeline().sessions_with_streaming().is_empty());
}

#[test]
fn completed_and_idle_sessions_are_left_alone() {
    let mut state = ChatState::new();
    let mut idle = Session::new("idle", "Idle");
    idle.status = SessionStatus::Active;
    state.register_session(idle);
    for event in ScriptedTurn::new("done", "m1").text("all done").complete().into_events() {
        state.apply_event(event);
    }
    let state = Arc::new(Mutex::new(state));
    let host = Arc::new(RecordingHost::new());

    let report = TeardownGuard::new(Arc::clone(&state), host.clone())
        .flush()
        .expect("flush runs");
    assert_eq!(report.messages, 0);
    assert_eq!(host.count(HostCallKind::SaveMessage), 0);
}

#[test]
fn streaming_message_outside_the_streaming_set_is_still_flushed() {
    let mut state = ChatState::new();
    let mut session = Session::new("s1", "One");
    session.status = SessionStatus::Active;
    state.register_session(session);
    state.apply_event(HostEvent::StreamChunk(StreamChunk::text("s1", "m1", "partial")));
    state.terminate("s1", false).expect("known session");
    assert!(!state.registry().is_input_disabled("s1"));

    let host = Arc::new(RecordingHost::new());
    let report = TeardownGuard::new(Arc::new(Mutex::new(state)), host.clone())
        .flush()
        .expect("flush runs");

    assert_eq!(report.messages, 1);
    assert_eq!(host.saved_messages()[0].content, "partial");
}
