//! Relay connection manager.
//!
//! Tracks every open collaboration socket and the project room it belongs to.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Who is on the other end of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub user_id: String,
    pub user_name: String,
    pub project_id: String,
}

/// State for a single relay connection
pub(crate) struct ConnectionState {
    pub(crate) participant: Participant,
    pub(crate) tx: mpsc::UnboundedSender<String>,
}

/// Manager for all relay connections
pub struct RelayManager {
    pub(crate) connections: DashMap<String, ConnectionState>,
}

impl Default for RelayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayManager {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub(crate) fn add_connection(
        &self,
        session_id: String,
        participant: Participant,
        tx: mpsc::UnboundedSender<String>,
    ) {
        debug!(
            session_id = %session_id,
            user_id = %participant.user_id,
            project_id = %participant.project_id,
            "Adding relay connection"
        );
        self.connections
            .insert(session_id, ConnectionState { participant, tx });
    }

    pub(crate) fn remove_connection(&self, session_id: &str) -> Option<Participant> {
        debug!(session_id = %session_id, "Removing relay connection");
        self.connections
            .remove(session_id)
            .map(|(_, conn)| conn.participant)
    }

    /// Send a raw frame to one connection
    pub fn send_to(&self, session_id: &str, frame: String) {
        if let Some(conn) = self.connections.get(session_id)
            && conn.tx.send(frame).is_err()
        {
            warn!(session_id = %session_id, "Failed to send frame to connection");
        }
    }

    /// Participants of a project, excluding one session
    pub fn project_members(&self, project_id: &str, except_session: &str) -> Vec<Participant> {
        self.connections
            .iter()
            .filter(|entry| {
                entry.key() != except_session && entry.value().participant.project_id == project_id
            })
            .map(|entry| entry.value().participant.clone())
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn project_connection_count(&self, project_id: &str) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().participant.project_id == project_id)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(user_id: &str, project_id: &str) -> Participant {
        Participant {
            user_id: user_id.to_string(),
            user_name: user_id.to_uppercase(),
            project_id: project_id.to_string(),
        }
    }

    #[test]
    fn test_relay_manager() {
        let manager = RelayManager::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let (tx3, _rx3) = mpsc::unbounded_channel();

        manager.add_connection("s1".to_string(), participant("ana", "wedding-1"), tx1);
        manager.add_connection("s2".to_string(), participant("luis", "wedding-1"), tx2);
        manager.add_connection("s3".to_string(), participant("kim", "wedding-2"), tx3);
        assert_eq!(manager.connection_count(), 3);
        assert_eq!(manager.project_connection_count("wedding-1"), 2);

        let members = manager.project_members("wedding-1", "s1");
        assert_eq!(members, vec![participant("luis", "wedding-1")]);

        let removed = manager.remove_connection("s2");
        assert_eq!(removed, Some(participant("luis", "wedding-1")));
        assert_eq!(manager.project_connection_count("wedding-1"), 1);
        assert!(manager.remove_connection("s2").is_none());
    }

    #[test]
    fn test_send_to() {
        let manager = RelayManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.add_connection("s1".to_string(), participant("ana", "p"), tx);

        manager.send_to("s1", "hello".to_string());
        manager.send_to("missing", "ignored".to_string());
        assert_eq!(rx.try_recv().unwrap(), "hello");
        assert!(rx.try_recv().is_err());
    }
}
