//! Socket frame format shared by the session manager and the relay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::events::EventKind;

/// One JSON frame on the collaboration socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeUpdate {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl RealTimeUpdate {
    pub fn new(
        kind: EventKind,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            kind,
            user_id: user_id.into(),
            user_name: user_name.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// Field of `data` as a string, if present
    pub fn data_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_serialization() {
        let update = RealTimeUpdate::new(
            EventKind::CursorMoved,
            "u1",
            "Ana",
            json!({ "page": "budget", "cursor": { "x": 10.0, "y": 20.0 } }),
        );
        let json = serde_json::to_string(&update).unwrap();

        assert!(json.contains(r#""type":"cursor_moved""#));
        assert!(json.contains(r#""userId":"u1""#));
        assert!(json.contains(r#""userName":"Ana""#));
        assert!(json.contains(r#""timestamp":""#));
    }

    #[test]
    fn test_frame_parsing_keeps_unknown_types() {
        let frame = r#"{
            "type": "seating_chart_changed",
            "userId": "u2",
            "userName": "Luis",
            "data": {"table": 4},
            "timestamp": "2025-05-01T12:00:00Z"
        }"#;
        let update: RealTimeUpdate = serde_json::from_str(frame).unwrap();

        assert_eq!(
            update.kind,
            EventKind::Other("seating_chart_changed".to_string())
        );
        assert_eq!(update.data["table"], 4);
        assert!(update.data_str("table").is_none());
    }
}
