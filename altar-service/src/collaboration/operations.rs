//! Higher-level collaboration operations.
//!
//! Local state is updated optimistically and the matching update goes out
//! fire-and-forget. Nothing here waits for an acknowledgment.

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::events::EventKind;
use super::models::{
    ActiveUser, ActivityLogEntry, ActivityType, CollaborationInvite, Collaborator, Comment,
    CommentAuthor, CommentThread, Cursor, FieldChange, InviteRole, ItemType, Notification, Role,
    VersionHistory, new_id,
};
use super::session::SessionManager;
use crate::error::CollaborationError;

impl SessionManager {
    /// Broadcast the page and cursor position of the local user
    pub fn update_presence(&self, page: &str, cursor: Option<Cursor>) -> bool {
        self.send_update(
            EventKind::CursorMoved,
            json!({ "page": page, "cursor": cursor }),
        )
    }

    pub fn set_typing_status(&self, is_typing: bool, item_id: Option<&str>) -> bool {
        self.send_update(
            EventKind::TypingStatus,
            json!({ "isTyping": is_typing, "itemId": item_id }),
        )
    }

    /// Create a pending invite. Delivery (email) is outside this service.
    pub fn invite_collaborator(&self, email: &str, role: InviteRole) -> CollaborationInvite {
        let (user_id, _) = self.local_user();
        let invite = CollaborationInvite::new(email, role, user_id);
        info!(email = %email, role = %role, invite_id = %invite.id, "Created collaboration invite");

        self.log_activity(
            ActivityType::Invite,
            &format!("Invited {} as {}", email, role),
            Some(json!({ "inviteId": invite.id })),
        );
        invite
    }

    /// Accept an invite as the local user
    pub fn accept_invite(
        &self,
        invite: &mut CollaborationInvite,
    ) -> Result<Collaborator, CollaborationError> {
        let (user_id, user_name) = self.local_user();
        let collaborator = invite.accept(&user_id, &user_name, Utc::now())?;

        self.log_activity(
            ActivityType::Update,
            &format!("Joined the project as {}", collaborator.role()),
            Some(json!({ "inviteId": invite.id })),
        );
        Ok(collaborator)
    }

    /// Change a collaborator's role locally and announce it. Returns the
    /// previous role so the caller can revert.
    pub fn update_collaborator_role(&self, collaborator: &mut Collaborator, role: Role) -> Role {
        let previous = collaborator.set_role(role);
        self.send_update(
            EventKind::CollaboratorRoleChanged,
            json!({
                "collaboratorId": collaborator.id,
                "role": role,
                "previousRole": previous,
            }),
        );
        self.log_activity(
            ActivityType::RoleChange,
            &format!("Changed role of {} to {}", collaborator.name, role),
            None,
        );
        previous
    }

    pub fn remove_collaborator(&self, collaborator_id: &str) {
        self.send_update(
            EventKind::CollaboratorRemoved,
            json!({ "collaboratorId": collaborator_id }),
        );
        self.log_activity(ActivityType::Update, "Removed collaborator", None);
    }

    /// Comment on an item, creating its thread on first use
    pub fn add_comment(
        &self,
        item_type: ItemType,
        item_id: &str,
        content: &str,
        mentions: Vec<String>,
    ) -> Comment {
        let (user_id, user_name) = self.local_user();
        let comment = Comment::new(
            CommentAuthor {
                id: user_id.clone(),
                name: user_name,
                avatar: None,
            },
            content,
            mentions,
        );

        let thread_id = {
            let mut data = self.data();
            let thread = data.threads.get_or_create(item_type, item_id, &user_id);
            thread.comments.push(comment.clone());
            thread.id.clone()
        };

        self.send_update(
            EventKind::CommentAdded,
            json!({ "threadId": thread_id, "comment": comment }),
        );

        let mut entry = self.activity_entry(
            ActivityType::Comment,
            &format!("Added comment on {}", item_type),
            None,
        );
        entry.item_type = Some(item_type.to_string());
        entry.item_id = Some(item_id.to_string());
        self.data().activity.push(entry);

        comment
    }

    /// Undo an optimistic comment after the remote side rejected it
    pub fn rollback_comment(
        &self,
        thread_id: &str,
        comment_id: &str,
    ) -> Result<Comment, CollaborationError> {
        let removed = self.data().threads.remove(thread_id, comment_id)?;
        debug!(thread_id = %thread_id, comment_id = %comment_id, "Rolled back comment");
        Ok(removed)
    }

    pub fn update_comment(&self, comment_id: &str, content: &str) -> Result<(), CollaborationError> {
        self.data().threads.edit(comment_id, content, Utc::now())?;
        self.send_update(
            EventKind::CommentUpdated,
            json!({ "commentId": comment_id, "content": content }),
        );
        Ok(())
    }

    pub fn delete_comment(&self, comment_id: &str) -> Result<Comment, CollaborationError> {
        let removed = self.data().threads.delete(comment_id)?;
        self.send_update(
            EventKind::CommentDeleted,
            json!({ "commentId": comment_id }),
        );
        Ok(removed)
    }

    pub fn add_reaction(&self, comment_id: &str, emoji: &str) -> Result<(), CollaborationError> {
        let (user_id, _) = self.local_user();
        self.data().threads.comment_mut(comment_id)?.react(emoji, &user_id);
        self.send_update(
            EventKind::ReactionAdded,
            json!({ "commentId": comment_id, "emoji": emoji }),
        );
        Ok(())
    }

    pub fn resolve_thread(&self, thread_id: &str) -> Result<(), CollaborationError> {
        let (user_id, _) = self.local_user();
        self.data().threads.resolve(thread_id, &user_id, Utc::now())?;
        self.send_update(EventKind::ThreadResolved, json!({ "threadId": thread_id }));
        Ok(())
    }

    pub fn comment_thread(&self, item_type: ItemType, item_id: &str) -> Option<CommentThread> {
        self.data().threads.find(item_type, item_id).cloned()
    }

    /// Record an activity entry for the local user
    pub fn log_activity(
        &self,
        kind: ActivityType,
        description: &str,
        metadata: Option<Value>,
    ) -> ActivityLogEntry {
        let entry = self.activity_entry(kind, description, metadata);
        debug!(kind = %kind, description = %description, "Activity logged");
        self.data().activity.push(entry.clone());
        entry
    }

    /// Activity entries, newest first
    pub fn activity_log(&self) -> Vec<ActivityLogEntry> {
        self.data().activity.snapshot()
    }

    pub fn save_version(
        &self,
        item_type: &str,
        item_id: &str,
        changes: Vec<FieldChange>,
        description: &str,
    ) -> VersionHistory {
        let (user_id, _) = self.local_user();
        let version = self
            .data()
            .versions
            .save(item_type, item_id, changes, &user_id, description);
        debug!(
            item_type = %item_type,
            item_id = %item_id,
            version = version.version,
            "Version saved"
        );
        version
    }

    /// Saved versions of an item, newest first
    pub fn version_history(&self, item_type: &str, item_id: &str) -> Vec<VersionHistory> {
        self.data().versions.history(item_type, item_id)
    }

    /// Announce that an item was rolled back to a saved version and return it.
    /// Applying the version's field values is up to the item's owner.
    pub fn restore_version(&self, version_id: &str) -> Result<VersionHistory, CollaborationError> {
        let version = self.data().versions.find(version_id)?.clone();

        self.send_update(
            EventKind::ItemUpdated,
            json!({
                "itemType": version.item_type,
                "itemId": version.item_id,
                "restoredVersion": version.version,
                "changes": version.changes,
            }),
        );
        self.log_activity(
            ActivityType::Update,
            &format!(
                "Restored {} {} to version {}",
                version.item_type, version.item_id, version.version
            ),
            None,
        );
        Ok(version)
    }

    pub fn mark_notification_read(&self, notification_id: &str) -> Result<(), CollaborationError> {
        let mut data = self.data();
        let notification = data
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or_else(|| CollaborationError::NotificationNotFound {
                notification_id: notification_id.to_string(),
            })?;
        notification.is_read = true;
        Ok(())
    }

    pub fn unread_notifications(&self) -> Vec<Notification> {
        self.data()
            .notifications
            .iter()
            .filter(|n| !n.is_read)
            .cloned()
            .collect()
    }

    /// Permission check. Owners may do anything; an unknown action is
    /// allowed for editors only.
    pub fn has_permission(&self, collaborator: &Collaborator, action: &str) -> bool {
        collaborator.can(action)
    }

    pub fn active_users(&self) -> Vec<ActiveUser> {
        self.data().presence.clone()
    }

    fn activity_entry(
        &self,
        kind: ActivityType,
        description: &str,
        metadata: Option<Value>,
    ) -> ActivityLogEntry {
        let (user_id, user_name) = self.local_user();
        ActivityLogEntry {
            id: new_id(),
            kind,
            user_id,
            user_name,
            description: description.to_string(),
            timestamp: Utc::now(),
            metadata,
            item_type: None,
            item_id: None,
            item_name: None,
        }
    }
}
