//! Relay connection handler.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::collaboration::{EventKind, RealTimeUpdate};

use super::manager::{Participant, RelayManager};

const DEFAULT_PAGE: &str = "dashboard";

/// Query string of `/collaboration`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationQuery {
    pub user_id: String,
    pub project_id: String,
    pub user_name: Option<String>,
}

/// Handle one relay connection from upgrade to close
pub async fn handle_ws_connection(
    socket: WebSocket,
    relay: Arc<RelayManager>,
    query: CollaborationQuery,
) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let participant = Participant {
        user_name: query.user_name.unwrap_or_else(|| query.user_id.clone()),
        user_id: query.user_id,
        project_id: query.project_id,
    };
    info!(
        session_id = %session_id,
        user_id = %participant.user_id,
        project_id = %participant.project_id,
        "New collaboration connection"
    );

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<String>();

    let existing = relay.project_members(&participant.project_id, &session_id);
    relay.add_connection(session_id.clone(), participant.clone(), frame_tx);

    let session_id_clone = session_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        debug!(session_id = %session_id_clone, "Relay send task ended");
    });

    // Tell the newcomer who is already here, then announce the newcomer
    for member in &existing {
        if let Some(frame) = presence_frame(EventKind::UserJoined, member) {
            relay.send_to(&session_id, frame);
        }
    }
    if let Some(frame) = presence_frame(EventKind::UserJoined, &participant) {
        relay.broadcast_to_project(&participant.project_id, &session_id, &frame);
    }

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => relay_frame(&relay, &session_id, &participant, &text),
            Ok(Message::Binary(data)) => {
                if let Ok(text) = std::str::from_utf8(&data) {
                    relay_frame(&relay, &session_id, &participant, text);
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Collaboration connection closed by client");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Collaboration socket error");
                break;
            }
        }
    }

    relay.remove_connection(&session_id);
    send_task.abort();
    if let Some(frame) = presence_frame(EventKind::UserLeft, &participant) {
        relay.broadcast_to_project(&participant.project_id, &session_id, &frame);
    }
    info!(session_id = %session_id, "Collaboration connection closed");
}

/// Forward a client frame to the rest of its project. Frames that are not
/// `RealTimeUpdate`s are dropped.
fn relay_frame(relay: &RelayManager, session_id: &str, participant: &Participant, text: &str) {
    match serde_json::from_str::<RealTimeUpdate>(text) {
        Ok(update) => {
            debug!(
                session_id = %session_id,
                kind = %update.kind,
                "Relaying collaboration update"
            );
            relay.broadcast_to_project(&participant.project_id, session_id, text);
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Dropping malformed collaboration frame");
        }
    }
}

fn presence_frame(kind: EventKind, participant: &Participant) -> Option<String> {
    let update = RealTimeUpdate::new(
        kind,
        participant.user_id.clone(),
        participant.user_name.clone(),
        json!({
            "userId": participant.user_id,
            "userName": participant.user_name,
            "page": DEFAULT_PAGE,
        }),
    );
    match serde_json::to_string(&update) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!(error = %e, "Failed to serialize presence frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_query_deserialization() {
        let query: CollaborationQuery =
            serde_json::from_value(json!({ "userId": "u 1", "projectId": "p1" })).unwrap();
        assert_eq!(query.user_id, "u 1");
        assert!(query.user_name.is_none());
    }

    #[test]
    fn test_presence_frame_shape() {
        let participant = Participant {
            user_id: "u1".to_string(),
            user_name: "Ana".to_string(),
            project_id: "p1".to_string(),
        };
        let frame = presence_frame(EventKind::UserLeft, &participant).unwrap();
        let update: RealTimeUpdate = serde_json::from_str(&frame).unwrap();

        assert_eq!(update.kind, EventKind::UserLeft);
        assert_eq!(update.data["userId"], "u1");
        assert_eq!(update.data["page"], "dashboard");
    }

    #[test]
    fn test_relay_frame_drops_malformed() {
        let relay = RelayManager::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let ana = Participant {
            user_id: "ana".to_string(),
            user_name: "Ana".to_string(),
            project_id: "p1".to_string(),
        };
        let luis = Participant {
            user_id: "luis".to_string(),
            ..ana.clone()
        };
        relay.add_connection("s1".to_string(), ana.clone(), tx1);
        relay.add_connection("s2".to_string(), luis, tx2);

        relay_frame(&relay, "s1", &ana, "{not json");
        assert!(rx2.try_recv().is_err());

        let frame = serde_json::to_string(&RealTimeUpdate::new(
            EventKind::ItemUpdated,
            "ana",
            "Ana",
            json!({ "itemId": "cake" }),
        ))
        .unwrap();
        relay_frame(&relay, "s1", &ana, &frame);
        assert_eq!(rx2.try_recv().unwrap(), frame);
    }
}
