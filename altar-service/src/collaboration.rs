//! Real-time collaboration session.
//!
//! [`SessionManager`] keeps one reconnecting socket to the collaboration
//! relay, dispatches typed events to listeners, and keeps project-local state
//! (comment threads, presence, activity, versions, notifications) in memory.

mod activity;
mod events;
mod messages;
mod models;
mod operations;
mod session;
mod threads;
mod transport;
mod versions;

pub use activity::{ACTIVITY_LOG_CAPACITY, ActivityLog};
pub use events::{EventHandler, EventKind, Listeners, SessionEvent};
pub use messages::RealTimeUpdate;
pub use models::{
    Action, ActiveUser, ActivityLogEntry, ActivityType, CollaborationInvite, Collaborator,
    Comment, CommentAuthor, CommentThread, Cursor, FieldChange, INVITE_TTL_MS, InviteRole,
    InviteStatus, ItemType, Notification, NotificationKind, Permissions, Reaction, Role,
    VersionHistory,
};
pub use session::{ConnectionState, SessionManager};
pub use threads::CommentThreads;
pub use transport::{Connector, Transport, TransportError, TransportEvent, WsConnector};
pub use versions::VersionStore;
