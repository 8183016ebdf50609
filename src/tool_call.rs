//! Tool-call lifecycle: `pending -> running -> {completed | error | interrupted}`.
//!
//! Updates are merged field by field over the existing record. A status that
//! would leave a terminal state (or move `running` back to `pending`) is
//! rejected while the remaining fields of the same update still apply.

use agent_events::{ToolCallInfo, ToolCallStatus, ToolCallUpdate, ToolKind};
use tracing::debug;

/// Result of merging one update into a message's tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Updated,
    TransitionRejected {
        from: ToolCallStatus,
        to: ToolCallStatus,
    },
}

/// Returns whether an inbound update may move `from` to `to`.
#[must_use]
pub fn can_transition(from: ToolCallStatus, to: ToolCallStatus) -> bool {
    use ToolCallStatus::{Completed, Error, Interrupted, Pending, Running, Unknown};

    match (from, to) {
        (_, Unknown) => false,
        _ if from == to => true,
        (Pending, _) => true,
        (Running, Completed | Error | Interrupted) => true,
        _ => false,
    }
}

/// Builds a fresh record from the first update seen for an id.
#[must_use]
pub fn create(update: ToolCallUpdate) -> ToolCallInfo {
    let mut info = ToolCallInfo::new(update.tool_call_id.clone());
    merge(&mut info, update);
    info
}

/// Shallow-merges `update` over `info`.
pub fn merge(info: &mut ToolCallInfo, update: ToolCallUpdate) -> MergeOutcome {
    let ToolCallUpdate {
        tool_call_id: _,
        status,
        tool_name,
        title,
        kind,
        raw_input,
        content,
        locations,
    } = update;

    tool_name.apply_to(&mut info.tool_name);
    title.apply_to(&mut info.title);
    kind.apply_to(&mut info.kind);
    raw_input.apply_to(&mut info.raw_input);
    content.apply_to_list(&mut info.content);
    locations.apply_to_list(&mut info.locations);

    match status {
        Some(ToolCallStatus::Unknown) => {
            debug!(
                tool_call_id = %info.tool_call_id,
                status = info.status.as_str(),
                "kept status over unrecognized update"
            );
            MergeOutcome::Updated
        }
        Some(next) if !can_transition(info.status, next) => {
            debug!(
                tool_call_id = %info.tool_call_id,
                from = info.status.as_str(),
                to = next.as_str(),
                "rejected tool call status transition"
            );
            MergeOutcome::TransitionRejected {
                from: info.status,
                to: next,
            }
        }
        Some(next) => {
            info.status = next;
            MergeOutcome::Updated
        }
        None => MergeOutcome::Updated,
    }
}

/// Forces a non-terminal call to `interrupted`. Only teardown may call this.
pub fn interrupt(info: &mut ToolCallInfo) -> bool {
    if info.status.is_terminal() {
        return false;
    }

    info.status = ToolCallStatus::Interrupted;
    true
}

/// Visual treatment picked for a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolIcon {
    Spinner,
    Check,
    Cross,
    Stopped,
    File,
    Pencil,
    Trash,
    Arrows,
    Magnifier,
    Terminal,
    Brain,
    Globe,
    Switch,
    Gear,
}

const STATUS_ICONS: [(ToolCallStatus, Option<ToolIcon>); 6] = [
    (ToolCallStatus::Pending, None),
    (ToolCallStatus::Running, Some(ToolIcon::Spinner)),
    (ToolCallStatus::Completed, Some(ToolIcon::Check)),
    (ToolCallStatus::Error, Some(ToolIcon::Cross)),
    (ToolCallStatus::Interrupted, Some(ToolIcon::Stopped)),
    (ToolCallStatus::Unknown, None),
];

const KIND_ICONS: [(ToolKind, ToolIcon); 10] = [
    (ToolKind::Read, ToolIcon::File),
    (ToolKind::Edit, ToolIcon::Pencil),
    (ToolKind::Delete, ToolIcon::Trash),
    (ToolKind::Move, ToolIcon::Arrows),
    (ToolKind::Search, ToolIcon::Magnifier),
    (ToolKind::Execute, ToolIcon::Terminal),
    (ToolKind::Think, ToolIcon::Brain),
    (ToolKind::Fetch, ToolIcon::Globe),
    (ToolKind::SwitchMode, ToolIcon::Switch),
    (ToolKind::Other, ToolIcon::Gear),
];

#[must_use]
pub fn status_icon(status: ToolCallStatus) -> Option<ToolIcon> {
    STATUS_ICONS
        .iter()
        .find(|(candidate, _)| *candidate == status)
        .and_then(|(_, icon)| *icon)
}

#[must_use]
pub fn kind_icon(kind: ToolKind) -> ToolIcon {
    KIND_ICONS
        .iter()
        .find(|(candidate, _)| *candidate == kind)
        .map_or(ToolIcon::Gear, |(_, icon)| *icon)
}

/// Status table first; the kind table only when status says nothing yet.
#[must_use]
pub fn icon_for(info: &ToolCallInfo) -> ToolIcon {
    status_icon(info.status)
        .unwrap_or_else(|| info.kind.map_or(ToolIcon::Gear, kind_icon))
}

#[cfg(test)]
mod tests {
    use agent_events::{
        Patch, ToolCallContent, ToolCallStatus, ToolCallUpdate, ToolKind, ToolLocation,
    };
    use serde_json::json;

    use super::{can_transition, create, icon_for, interrupt, merge, MergeOutcome, ToolIcon};

    #[test]
    fn merge_preserves_fields_absent_from_the_update() {
        let mut info = create(
            ToolCallUpdate::new("call-1")
                .with_status(ToolCallStatus::Running)
                .with_title("Read README.md")
                .with_raw_input(json!({ "path": "README.md" })),
        );

        let outcome = merge(
            &mut info,
            ToolCallUpdate::new("call-1")
                .with_status(ToolCallStatus::Completed)
                .with_content(vec![ToolCallContent::text("# Title")]),
        );

        assert_eq!(outcome, MergeOutcome::Updated);
        assert_eq!(info.status, ToolCallStatus::Completed);
        assert_eq!(info.title.as_deref(), Some("Read README.md"));
        assert_eq!(info.raw_input, Some(json!({ "path": "README.md" })));
        assert_eq!(info.content, vec![ToolCallContent::text("# Title")]);
    }

    #[test]
    fn explicit_clear_removes_a_field() {
        let mut info = create(ToolCallUpdate::new("call-1").with_title("Edit"));
        let mut update = ToolCallUpdate::new("call-1");
        update.title = Patch::Clear;

        merge(&mut info, update);
        assert_eq!(info.title, None);
    }

    #[test]
    fn content_is_replaced_not_appended() {
        let mut info = create(
            ToolCallUpdate::new("call-1").with_content(vec![ToolCallContent::text("partial")]),
        );
        merge(
            &mut info,
            ToolCallUpdate::new("call-1")
                .with_content(vec![ToolCallContent::text("full output")])
                .with_locations(vec![ToolLocation {
                    path: "src/main.rs".to_string(),
                    line: Some(3),
                }]),
        );

        assert_eq!(info.content, vec![ToolCallContent::text("full output")]);
        assert_eq!(info.locations.len(), 1);
    }

    #[test]
    fn terminal_states_reject_inbound_transitions_but_merge_other_fields() {
        let mut info = create(ToolCallUpdate::new("call-1").with_status(ToolCallStatus::Completed));

        let outcome = merge(
            &mut info,
            ToolCallUpdate::new("call-1")
                .with_status(ToolCallStatus::Running)
                .with_title("late title"),
        );

        assert_eq!(
            outcome,
            MergeOutcome::TransitionRejected {
                from: ToolCallStatus::Completed,
                to: ToolCallStatus::Running,
            }
        );
        assert_eq!(info.status, ToolCallStatus::Completed);
        assert_eq!(info.title.as_deref(), Some("late title"));
    }

    #[test]
    fn transition_table_matches_lifecycle() {
        use ToolCallStatus::{Completed, Error, Interrupted, Pending, Running};

        assert!(can_transition(Pending, Running));
        assert!(can_transition(Pending, Completed));
        assert!(can_transition(Running, Error));
        assert!(can_transition(Running, Interrupted));
        assert!(!can_transition(Running, Pending));
        assert!(!can_transition(Completed, Error));
        assert!(!can_transition(Interrupted, Running));
    }

    #[test]
    fn unrecognized_status_keeps_the_current_one() {
        let mut info = create(
            ToolCallUpdate::new("call-1")
                .with_status(ToolCallStatus::Unknown)
                .with_title("Fetch docs"),
        );
        assert_eq!(info.status, ToolCallStatus::Pending);

        merge(&mut info, ToolCallUpdate::new("call-1").with_status(ToolCallStatus::Running));
        let outcome = merge(
            &mut info,
            ToolCallUpdate::new("call-1").with_status(ToolCallStatus::Unknown),
        );

        assert_eq!(outcome, MergeOutcome::Updated);
        assert_eq!(info.status, ToolCallStatus::Running);
        assert_eq!(info.title.as_deref(), Some("Fetch docs"));
        assert!(!can_transition(ToolCallStatus::Pending, ToolCallStatus::Unknown));
    }

    #[test]
    fn interrupt_only_touches_non_terminal_calls() {
        let mut running = create(ToolCallUpdate::new("a").with_status(ToolCallStatus::Running));
        let mut done = create(ToolCallUpdate::new("b").with_status(ToolCallStatus::Completed));

        assert!(interrupt(&mut running));
        assert_eq!(running.status, ToolCallStatus::Interrupted);
        assert!(!interrupt(&mut done));
        assert_eq!(done.status, ToolCallStatus::Completed);
    }

    #[test]
    fn status_takes_precedence_over_kind_for_icons() {
        let pending = create(ToolCallUpdate::new("a").with_kind(ToolKind::Search));
        let running = create(
            ToolCallUpdate::new("b")
                .with_kind(ToolKind::Search)
                .with_status(ToolCallStatus::Running),
        );
        let bare = create(ToolCallUpdate::new("c"));

        assert_eq!(icon_for(&pending), ToolIcon::Magnifier);
        assert_eq!(icon_for(&running), ToolIcon::Spinner);
        assert_eq!(icon_for(&bare), ToolIcon::Gear);
    }
}
