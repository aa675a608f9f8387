//! Session events and listener registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::messages::RealTimeUpdate;

/// Event names. Inbound update types without a dedicated variant pass
/// through as [`EventKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Connected,
    Disconnected,
    Error,
    UserJoined,
    UserLeft,
    ItemUpdated,
    CommentAdded,
    CommentUpdated,
    CommentDeleted,
    ReactionAdded,
    ThreadResolved,
    CursorMoved,
    TypingStatus,
    CollaboratorRoleChanged,
    CollaboratorRemoved,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Connected => "connected",
            EventKind::Disconnected => "disconnected",
            EventKind::Error => "error",
            EventKind::UserJoined => "user_joined",
            EventKind::UserLeft => "user_left",
            EventKind::ItemUpdated => "item_updated",
            EventKind::CommentAdded => "comment_added",
            EventKind::CommentUpdated => "comment_updated",
            EventKind::CommentDeleted => "comment_deleted",
            EventKind::ReactionAdded => "reaction_added",
            EventKind::ThreadResolved => "thread_resolved",
            EventKind::CursorMoved => "cursor_moved",
            EventKind::TypingStatus => "typing_status",
            EventKind::CollaboratorRoleChanged => "collaborator_role_changed",
            EventKind::CollaboratorRemoved => "collaborator_removed",
            EventKind::Other(name) => name,
        }
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            "connected" => EventKind::Connected,
            "disconnected" => EventKind::Disconnected,
            "error" => EventKind::Error,
            "user_joined" => EventKind::UserJoined,
            "user_left" => EventKind::UserLeft,
            "item_updated" => EventKind::ItemUpdated,
            "comment_added" => EventKind::CommentAdded,
            "comment_updated" => EventKind::CommentUpdated,
            "comment_deleted" => EventKind::CommentDeleted,
            "reaction_added" => EventKind::ReactionAdded,
            "thread_resolved" => EventKind::ThreadResolved,
            "cursor_moved" => EventKind::CursorMoved,
            "typing_status" => EventKind::TypingStatus,
            "collaborator_role_changed" => EventKind::CollaboratorRoleChanged,
            "collaborator_removed" => EventKind::CollaboratorRemoved,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        EventKind::from(s.as_str())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What listeners receive
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected { user_id: String, project_id: String },
    Disconnected,
    Error { message: String },
    Update(RealTimeUpdate),
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::Connected { .. } => EventKind::Connected,
            SessionEvent::Disconnected => EventKind::Disconnected,
            SessionEvent::Error { .. } => EventKind::Error,
            SessionEvent::Update(update) => update.kind.clone(),
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Handlers per event kind, in registration order
#[derive(Default)]
pub struct Listeners {
    handlers: HashMap<EventKind, Vec<EventHandler>>,
}

impl Listeners {
    pub fn on(&mut self, kind: EventKind, handler: EventHandler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Remove the first registration of `handler` for `kind`. Returns whether
    /// anything was removed.
    pub fn off(&mut self, kind: &EventKind, handler: &EventHandler) -> bool {
        let Some(handlers) = self.handlers.get_mut(kind) else {
            return false;
        };
        match handlers.iter().position(|h| Arc::ptr_eq(h, handler)) {
            Some(index) => {
                handlers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Clone out the handlers for `kind` so they can run without a lock held
    pub fn snapshot(&self, kind: &EventKind) -> Vec<EventHandler> {
        self.handlers.get(kind).cloned().unwrap_or_default()
    }
}
