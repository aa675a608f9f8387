//! Collaboration relay
//!
//! Server side of the collaboration socket. Every connection joins a project
//! room; `RealTimeUpdate` frames from one participant are fanned out to the
//! other connections in the same project, and joins and leaves are announced
//! as `user_joined` / `user_left`.

mod broadcast;
mod handlers;
mod manager;

pub use handlers::{CollaborationQuery, handle_ws_connection};
pub use manager::{Participant, RelayManager};
