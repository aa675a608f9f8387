use std::collections::HashMap;

use chrono::Utc;

use super::models::{FieldChange, VersionHistory, new_id};
use crate::error::CollaborationError;

/// In-memory revision history per `(item_type, item_id)`
#[derive(Debug, Default)]
pub struct VersionStore {
    items: HashMap<(String, String), Vec<VersionHistory>>,
}

impl VersionStore {
    /// Record a new revision; version numbers start at 1 for each item
    pub fn save(
        &mut self,
        item_type: &str,
        item_id: &str,
        changes: Vec<FieldChange>,
        changed_by: &str,
        description: &str,
    ) -> VersionHistory {
        let history = self
            .items
            .entry((item_type.to_string(), item_id.to_string()))
            .or_default();

        let version = VersionHistory {
            id: new_id(),
            item_type: item_type.to_string(),
            item_id: item_id.to_string(),
            version: history.last().map_or(1, |v| v.version + 1),
            changes,
            changed_by: changed_by.to_string(),
            changed_at: Utc::now(),
            description: description.to_string(),
        };
        history.push(version.clone());
        version
    }

    /// Revisions of an item, newest first
    pub fn history(&self, item_type: &str, item_id: &str) -> Vec<VersionHistory> {
        self.items
            .get(&(item_type.to_string(), item_id.to_string()))
            .map(|history| history.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn find(&self, version_id: &str) -> Result<&VersionHistory, CollaborationError> {
        self.items
            .values()
            .flatten()
            .find(|v| v.id == version_id)
            .ok_or_else(|| CollaborationError::VersionNotFound {
                version_id: version_id.to_string(),
            })
    }
}
