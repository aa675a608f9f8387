use std::collections::VecDeque;

use super::models::ActivityLogEntry;

/// Entries kept before the oldest is dropped
pub const ACTIVITY_LOG_CAPACITY: usize = 50;

/// Bounded activity buffer, newest first
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: VecDeque<ActivityLogEntry>,
}

impl ActivityLog {
    pub fn push(&mut self, entry: ActivityLogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(ACTIVITY_LOG_CAPACITY);
    }

    pub fn snapshot(&self) -> Vec<ActivityLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
