use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::models::{Comment, CommentThread, ItemType};
use crate::error::CollaborationError;

/// Comment threads keyed by thread id (`"{item_type}-{item_id}"`)
#[derive(Debug, Default)]
pub struct CommentThreads {
    threads: HashMap<String, CommentThread>,
}

impl CommentThreads {
    /// Find the thread for an item, creating it with `participant` on first use
    pub fn get_or_create(
        &mut self,
        item_type: ItemType,
        item_id: &str,
        participant: &str,
    ) -> &mut CommentThread {
        let thread = self
            .threads
            .entry(CommentThread::thread_id(item_type, item_id))
            .or_insert_with(|| CommentThread::new(item_type, item_id));
        thread.add_participant(participant);
        thread
    }

    pub fn get(&self, thread_id: &str) -> Option<&CommentThread> {
        self.threads.get(thread_id)
    }

    pub fn find(&self, item_type: ItemType, item_id: &str) -> Option<&CommentThread> {
        self.get(&CommentThread::thread_id(item_type, item_id))
    }

    /// Append to an existing thread. Returns false when the thread is unknown.
    pub fn append(&mut self, thread_id: &str, comment: Comment) -> bool {
        match self.threads.get_mut(thread_id) {
            Some(thread) => {
                thread.add_participant(&comment.author.id);
                thread.comments.push(comment);
                true
            }
            None => false,
        }
    }

    /// Remove a comment from a thread, returning it
    pub fn remove(
        &mut self,
        thread_id: &str,
        comment_id: &str,
    ) -> Result<Comment, CollaborationError> {
        let thread = self.thread_mut(thread_id)?;
        let index = thread
            .comments
            .iter()
            .position(|c| c.id == comment_id)
            .ok_or_else(|| CollaborationError::CommentNotFound {
                comment_id: comment_id.to_string(),
            })?;
        Ok(thread.comments.remove(index))
    }

    /// Look a comment up by id across all threads
    pub fn comment_mut(&mut self, comment_id: &str) -> Result<&mut Comment, CollaborationError> {
        self.threads
            .values_mut()
            .flat_map(|thread| thread.comments.iter_mut())
            .find(|c| c.id == comment_id)
            .ok_or_else(|| CollaborationError::CommentNotFound {
                comment_id: comment_id.to_string(),
            })
    }

    /// Remove a comment wherever it lives
    pub fn delete(&mut self, comment_id: &str) -> Result<Comment, CollaborationError> {
        let thread_id = self
            .threads
            .values()
            .find(|thread| thread.comments.iter().any(|c| c.id == comment_id))
            .map(|thread| thread.id.clone())
            .ok_or_else(|| CollaborationError::CommentNotFound {
                comment_id: comment_id.to_string(),
            })?;
        self.remove(&thread_id, comment_id)
    }

    pub fn edit(
        &mut self,
        comment_id: &str,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CollaborationError> {
        let comment = self.comment_mut(comment_id)?;
        comment.content = content.to_string();
        comment.updated_at = Some(at);
        comment.is_edited = true;
        Ok(())
    }

    pub fn resolve(
        &mut self,
        thread_id: &str,
        resolved_by: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CollaborationError> {
        let thread = self.thread_mut(thread_id)?;
        thread.is_resolved = true;
        thread.resolved_by = Some(resolved_by.to_string());
        thread.resolved_at = Some(at);
        Ok(())
    }

    fn thread_mut(&mut self, thread_id: &str) -> Result<&mut CommentThread, CollaborationError> {
        self.threads
            .get_mut(thread_id)
            .ok_or_else(|| CollaborationError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaboration::models::CommentAuthor;

    fn comment(author: &str, content: &str) -> Comment {
        Comment::new(
            CommentAuthor {
                id: author.to_string(),
                name: author.to_uppercase(),
                avatar: None,
            },
            content,
            vec![],
        )
    }

    #[test]
    fn test_lazy_creation_and_participants() {
        let mut threads = CommentThreads::default();
        assert!(threads.find(ItemType::Checklist, "7").is_none());

        threads.get_or_create(ItemType::Checklist, "7", "u1");
        threads.get_or_create(ItemType::Checklist, "7", "u1");
        let thread = threads.get_or_create(ItemType::Checklist, "7", "u2");

        assert_eq!(thread.id, "checklist-7");
        assert_eq!(thread.participants, vec!["u1", "u2"]);
    }

    #[test]
    fn test_append_requires_known_thread() {
        let mut threads = CommentThreads::default();
        assert!(!threads.append("budget-1", comment("u1", "too pricey")));

        threads.get_or_create(ItemType::Budget, "1", "u1");
        assert!(threads.append("budget-1", comment("u3", "agreed")));

        let thread = threads.get("budget-1").unwrap();
        assert_eq!(thread.comments.len(), 1);
        assert!(thread.participants.contains(&"u3".to_string()));
    }

    #[test]
    fn test_remove_and_missing_comment() {
        let mut threads = CommentThreads::default();
        threads.get_or_create(ItemType::Vendor, "florist", "u1");
        let first = comment("u1", "call them");
        let first_id = first.id.clone();
        threads.append("vendor-florist", first);

        let removed = threads.remove("vendor-florist", &first_id).unwrap();
        assert_eq!(removed.content, "call them");

        assert!(matches!(
            threads.remove("vendor-florist", &first_id),
            Err(CollaborationError::CommentNotFound { .. })
        ));
        assert!(matches!(
            threads.remove("vendor-caterer", &first_id),
            Err(CollaborationError::ThreadNotFound { .. })
        ));
    }

    #[test]
    fn test_edit_delete_resolve() {
        let mut threads = CommentThreads::default();
        threads.get_or_create(ItemType::Timeline, "ceremony", "u1");
        let c = comment("u1", "4pm?");
        let id = c.id.clone();
        threads.append("timeline-ceremony", c);

        let now = Utc::now();
        threads.edit(&id, "4:30pm?", now).unwrap();
        let edited = threads.comment_mut(&id).unwrap();
        assert!(edited.is_edited);
        assert_eq!(edited.content, "4:30pm?");
        assert_eq!(edited.updated_at, Some(now));

        threads.resolve("timeline-ceremony", "u1", now).unwrap();
        assert!(threads.get("timeline-ceremony").unwrap().is_resolved);

        threads.delete(&id).unwrap();
        assert!(threads.get("timeline-ceremony").unwrap().comments.is_empty());
        assert!(threads.delete(&id).is_err());
    }
}
