//! Session metadata and per-session activity.
//!
//! A session is in at most one of the `streaming`, `resuming` or `creating`
//! sets at a time; the sets are stored as a single map so they cannot overlap.

use std::collections::HashMap;

use agent_events::{Session, SessionStatus, SessionStatusEvent};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    Streaming,
    Resuming,
    Creating,
}

impl Activity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Resuming => "resuming",
            Self::Creating => "creating",
        }
    }
}

/// Banner to show above a session's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner<'a> {
    Creating,
    Resuming,
    Error(&'a str),
}

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
    order: Vec<String>,
    activity: HashMap<String, Activity>,
    errors: HashMap<String, String>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a session's metadata, keeping its original position.
    pub fn upsert(&mut self, session: Session) {
        if !self.sessions.contains_key(&session.id) {
            self.order.push(session.id.clone());
        }
        if session.status == SessionStatus::Creating {
            self.activity.insert(session.id.clone(), Activity::Creating);
        } else {
            self.clear_activity(&session.id, Activity::Creating);
        }
        self.sessions.insert(session.id.clone(), session);
    }

    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(session_id)
    }

    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Sessions in registration order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> + '_ {
        self.order.iter().filter_map(|id| self.sessions.get(id))
    }

    /// Applies an out-of-band status change.
    ///
    /// Returns `false` when the event names a session this registry does not
    /// know and carries no metadata to register it with.
    pub fn apply_status(&mut self, event: SessionStatusEvent) -> bool {
        let SessionStatusEvent {
            session_id,
            status,
            session,
            error,
        } = event;

        match session {
            Some(mut session) => {
                session.status = status;
                self.upsert(session);
            }
            None => match self.sessions.get_mut(&session_id) {
                Some(existing) => existing.status = status,
                None => {
                    debug!(%session_id, "status change for unknown session");
                    return false;
                }
            },
        }

        match status {
            SessionStatus::Creating => self.mark(&session_id, Activity::Creating),
            SessionStatus::Active => {
                self.clear_activity_if(&session_id, &[Activity::Creating, Activity::Resuming]);
                self.errors.remove(&session_id);
            }
            SessionStatus::Paused => {
                self.clear_activity_if(&session_id, &[Activity::Creating, Activity::Resuming]);
            }
            SessionStatus::Terminated => {
                self.activity.remove(&session_id);
            }
            SessionStatus::Error => {
                self.activity.remove(&session_id);
                let message = error.unwrap_or_else(|| "session failed".to_string());
                self.errors.insert(session_id, message);
            }
        }

        true
    }

    pub fn mark(&mut self, session_id: &str, activity: Activity) {
        self.activity.insert(session_id.to_string(), activity);
    }

    /// Removes `activity` if it is the session's current one.
    pub fn clear_activity(&mut self, session_id: &str, activity: Activity) -> bool {
        self.clear_activity_if(session_id, &[activity])
    }

    fn clear_activity_if(&mut self, session_id: &str, activities: &[Activity]) -> bool {
        let matches = self
            .activity
            .get(session_id)
            .is_some_and(|current| activities.contains(current));
        if matches {
            self.activity.remove(session_id);
        }
        matches
    }

    #[must_use]
    pub fn activity(&self, session_id: &str) -> Option<Activity> {
        self.activity.get(session_id).copied()
    }

    /// Sorted ids of sessions with the given activity.
    #[must_use]
    pub fn members(&self, activity: Activity) -> Vec<String> {
        let mut ids: Vec<String> = self
            .activity
            .iter()
            .filter(|(_, current)| **current == activity)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn is_input_disabled(&self, session_id: &str) -> bool {
        self.activity.contains_key(session_id)
    }

    #[must_use]
    pub fn banner(&self, session_id: &str) -> Option<Banner<'_>> {
        if let Some(error) = self.errors.get(session_id) {
            return Some(Banner::Error(error));
        }

        match self.activity(session_id)? {
            Activity::Creating => Some(Banner::Creating),
            Activity::Resuming => Some(Banner::Resuming),
            Activity::Streaming => None,
        }
    }

    pub fn record_error(&mut self, session_id: &str, message: impl Into<String>) {
        self.errors.insert(session_id.to_string(), message.into());
    }

    #[must_use]
    pub fn error(&self, session_id: &str) -> Option<&str> {
        self.errors.get(session_id).map(String::as_str)
    }

    pub fn clear_error(&mut self, session_id: &str) {
        self.errors.remove(session_id);
    }

    /// Drops every trace of the session.
    pub fn remove(&mut self, session_id: &str) -> Option<Session> {
        self.order.retain(|id| id != session_id);
        self.activity.remove(session_id);
        self.errors.remove(session_id);
        self.sessions.remove(session_id)
    }
}
