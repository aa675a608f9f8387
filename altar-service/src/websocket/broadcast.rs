//! Fan-out of collaboration frames to project rooms.

use tracing::debug;

use super::manager::RelayManager;

impl RelayManager {
    /// Send a frame to every connection in `project_id` except the sender.
    /// Returns how many connections accepted it.
    pub fn broadcast_to_project(&self, project_id: &str, from_session: &str, frame: &str) -> usize {
        let mut sent_count = 0;

        for entry in self.connections.iter() {
            let conn = entry.value();
            if entry.key() != from_session
                && conn.participant.project_id == project_id
                && conn.tx.send(frame.to_string()).is_ok()
            {
                sent_count += 1;
            }
        }

        if sent_count > 0 {
            debug!(
                project_id = %project_id,
                sent_count = sent_count,
                "Relayed collaboration frame"
            );
        }
        sent_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::Participant;
    use tokio::sync::mpsc;

    #[test]
    fn test_broadcast_skips_sender_and_other_projects() {
        let manager = RelayManager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let (tx3, mut rx3) = mpsc::unbounded_channel();

        let join = |user: &str, project: &str| Participant {
            user_id: user.to_string(),
            user_name: user.to_string(),
            project_id: project.to_string(),
        };
        manager.add_connection("s1".to_string(), join("ana", "p1"), tx1);
        manager.add_connection("s2".to_string(), join("luis", "p1"), tx2);
        manager.add_connection("s3".to_string(), join("kim", "p2"), tx3);

        let sent = manager.broadcast_to_project("p1", "s1", r#"{"type":"item_updated"}"#);
        assert_eq!(sent, 1);
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().unwrap(), r#"{"type":"item_updated"}"#);
        assert!(rx3.try_recv().is_err());
    }
}
