//! Collaboration records.
//!
//! Everything here crosses the socket inside `RealTimeUpdate.data`, so field
//! names serialize in camelCase.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::error::CollaborationError;

/// How long an invite stays acceptable, in milliseconds
pub const INVITE_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

const INVITE_TOKEN_LEN: usize = 26;
const INVITE_TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Project role of a collaborator
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

/// Roles that can be handed out through an invite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InviteRole {
    Editor,
    Viewer,
}

impl From<InviteRole> for Role {
    fn from(role: InviteRole) -> Self {
        match role {
            InviteRole::Editor => Role::Editor,
            InviteRole::Viewer => Role::Viewer,
        }
    }
}

/// Named actions gated by a permission flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    EditBudget,
    EditChecklist,
    EditVisionBoard,
    EditVendors,
    InviteOthers,
    ManageRoles,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_edit_budget: bool,
    pub can_edit_checklist: bool,
    pub can_edit_vision_board: bool,
    pub can_edit_vendors: bool,
    pub can_invite_others: bool,
    pub can_manage_roles: bool,
}

impl Permissions {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Owner => Self {
                can_edit_budget: true,
                can_edit_checklist: true,
                can_edit_vision_board: true,
                can_edit_vendors: true,
                can_invite_others: true,
                can_manage_roles: true,
            },
            Role::Editor => Self {
                can_edit_budget: true,
                can_edit_checklist: true,
                can_edit_vision_board: true,
                can_edit_vendors: true,
                can_invite_others: false,
                can_manage_roles: false,
            },
            Role::Viewer => Self::default(),
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::EditBudget => self.can_edit_budget,
            Action::EditChecklist => self.can_edit_checklist,
            Action::EditVisionBoard => self.can_edit_vision_board,
            Action::EditVendors => self.can_edit_vendors,
            Action::InviteOthers => self.can_invite_others,
            Action::ManageRoles => self.can_manage_roles,
        }
    }
}

/// A member of a wedding project.
///
/// `permissions` always matches the table entry for `role`; the only way to
/// change either is [`Collaborator::set_role`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub id: String,
    pub email: String,
    pub name: String,
    role: Role,
    permissions: Permissions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub invited_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    pub last_active: DateTime<Utc>,
    pub is_online: bool,
}

impl Collaborator {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            role,
            permissions: Permissions::for_role(role),
            avatar: None,
            invited_at: now,
            accepted_at: None,
            last_active: now,
            is_online: false,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// Change the role and recompute permissions. Returns the previous role.
    pub fn set_role(&mut self, role: Role) -> Role {
        let previous = std::mem::replace(&mut self.role, role);
        self.permissions = Permissions::for_role(role);
        previous
    }

    /// Check an action by name.
    ///
    /// Owners may do anything. Unknown action names are allowed for editors
    /// and refused for viewers.
    pub fn can(&self, action: &str) -> bool {
        if self.role == Role::Owner {
            return true;
        }
        match action.parse::<Action>() {
            Ok(action) => self.permissions.allows(action),
            Err(_) => self.role == Role::Editor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Expired,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationInvite {
    pub id: String,
    pub email: String,
    pub role: InviteRole,
    pub invited_by: String,
    pub invited_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token: String,
    pub status: InviteStatus,
}

impl CollaborationInvite {
    pub fn new(email: impl Into<String>, role: InviteRole, invited_by: impl Into<String>) -> Self {
        let invited_at = Utc::now();
        Self {
            id: new_id(),
            email: email.into(),
            role,
            invited_by: invited_by.into(),
            invited_at,
            expires_at: invited_at + Duration::milliseconds(INVITE_TTL_MS),
            token: invite_token(),
            status: InviteStatus::Pending,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Accept on behalf of `user_id`, producing the new collaborator.
    ///
    /// An expired invite is marked `Expired` before the error is returned.
    pub fn accept(
        &mut self,
        user_id: &str,
        user_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Collaborator, CollaborationError> {
        if self.status != InviteStatus::Pending {
            return Err(CollaborationError::InviteNotPending {
                invite_id: self.id.clone(),
                status: self.status,
            });
        }
        if self.is_expired_at(now) {
            self.status = InviteStatus::Expired;
            return Err(CollaborationError::InviteExpired {
                invite_id: self.id.clone(),
                expires_at: self.expires_at,
            });
        }

        self.status = InviteStatus::Accepted;

        let mut collaborator =
            Collaborator::new(user_id, self.email.clone(), user_name, self.role.into());
        collaborator.invited_at = self.invited_at;
        collaborator.accepted_at = Some(now);
        collaborator.last_active = now;
        collaborator.is_online = true;
        Ok(collaborator)
    }
}

fn invite_token() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_TOKEN_LEN)
        .map(|_| INVITE_TOKEN_CHARSET[rng.gen_range(0..INVITE_TOKEN_CHARSET.len())] as char)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author: CommentAuthor,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub replies: Vec<Comment>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Comment {
    pub fn new(author: CommentAuthor, content: impl Into<String>, mentions: Vec<String>) -> Self {
        Self {
            id: new_id(),
            content: content.into(),
            author,
            created_at: Utc::now(),
            updated_at: None,
            is_edited: false,
            mentions,
            replies: Vec::new(),
            reactions: Vec::new(),
        }
    }

    /// Add a reaction; each user counts once per emoji
    pub fn react(&mut self, emoji: &str, user_id: &str) {
        match self.reactions.iter_mut().find(|r| r.emoji == emoji) {
            Some(reaction) => {
                if !reaction.users.iter().any(|u| u == user_id) {
                    reaction.users.push(user_id.to_string());
                }
            }
            None => self.reactions.push(Reaction {
                emoji: emoji.to_string(),
                users: vec![user_id.to_string()],
            }),
        }
    }
}

/// Kinds of planning items that carry comment threads
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ItemType {
    Checklist,
    Budget,
    VisionBoard,
    Vendor,
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    pub id: String,
    pub item_type: ItemType,
    pub item_id: String,
    pub comments: Vec<Comment>,
    pub is_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub participants: Vec<String>,
}

impl CommentThread {
    pub fn thread_id(item_type: ItemType, item_id: &str) -> String {
        format!("{}-{}", item_type, item_id)
    }

    pub fn new(item_type: ItemType, item_id: impl Into<String>) -> Self {
        let item_id = item_id.into();
        Self {
            id: Self::thread_id(item_type, &item_id),
            item_type,
            item_id,
            comments: Vec::new(),
            is_resolved: false,
            resolved_by: None,
            resolved_at: None,
            participants: Vec::new(),
        }
    }

    pub fn add_participant(&mut self, user_id: &str) {
        if !self.participants.iter().any(|p| p == user_id) {
            self.participants.push(user_id.to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityType {
    Create,
    Update,
    Delete,
    Comment,
    Invite,
    RoleChange,
    Login,
    View,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub user_id: String,
    pub user_name: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
}

/// One saved revision of a planning item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistory {
    pub id: String,
    pub item_type: String,
    pub item_id: String,
    pub version: u32,
    pub changes: Vec<FieldChange>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

/// Presence entry for a user currently in the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub current_page: String,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub is_typing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    Mention,
    Comment,
    Update,
    Invite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub user_id: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_table() {
        let owner = Permissions::for_role(Role::Owner);
        assert!(owner.can_invite_others && owner.can_manage_roles && owner.can_edit_budget);

        let editor = Permissions::for_role(Role::Editor);
        assert!(editor.can_edit_budget);
        assert!(editor.can_edit_checklist);
        assert!(editor.can_edit_vision_board);
        assert!(editor.can_edit_vendors);
        assert!(!editor.can_invite_others);
        assert!(!editor.can_manage_roles);

        assert_eq!(Permissions::for_role(Role::Viewer), Permissions::default());
    }

    #[test]
    fn test_set_role_recomputes_permissions() {
        let mut collaborator = Collaborator::new("u2", "sam@example.com", "Sam", Role::Viewer);
        assert!(!collaborator.permissions().can_edit_budget);

        let previous = collaborator.set_role(Role::Editor);
        assert_eq!(previous, Role::Viewer);
        assert_eq!(collaborator.role(), Role::Editor);
        assert_eq!(collaborator.permissions(), Permissions::for_role(Role::Editor));
    }

    #[test]
    fn test_can_fallback_for_unknown_actions() {
        let owner = Collaborator::new("u1", "a@example.com", "A", Role::Owner);
        let editor = Collaborator::new("u2", "b@example.com", "B", Role::Editor);
        let viewer = Collaborator::new("u3", "c@example.com", "C", Role::Viewer);

        assert!(owner.can("export_guest_list"));
        assert!(owner.can("manage_roles"));

        assert!(editor.can("edit_vendors"));
        assert!(!editor.can("invite_others"));
        assert!(editor.can("export_guest_list"));

        assert!(!viewer.can("edit_budget"));
        assert!(!viewer.can("export_guest_list"));
    }

    #[test]
    fn test_invite_defaults() {
        let invite = CollaborationInvite::new("guest@example.com", InviteRole::Editor, "u1");

        assert_eq!(invite.status, InviteStatus::Pending);
        assert_eq!(invite.role, InviteRole::Editor);
        assert_eq!(
            (invite.expires_at - invite.invited_at).num_milliseconds(),
            604_800_000
        );
        assert_eq!(invite.token.len(), 26);
        assert!(
            invite
                .token
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_accept_invite() {
        let mut invite = CollaborationInvite::new("guest@example.com", InviteRole::Viewer, "u1");
        let now = invite.invited_at + Duration::hours(1);

        let collaborator = invite.accept("u9", "Guest", now).unwrap();
        assert_eq!(invite.status, InviteStatus::Accepted);
        assert_eq!(collaborator.role(), Role::Viewer);
        assert_eq!(collaborator.accepted_at, Some(now));
        assert_eq!(collaborator.email, "guest@example.com");

        let err = invite.accept("u9", "Guest", now).unwrap_err();
        assert!(matches!(
            err,
            CollaborationError::InviteNotPending {
                status: InviteStatus::Accepted,
                ..
            }
        ));
    }

    #[test]
    fn test_accept_expired_invite() {
        let mut invite = CollaborationInvite::new("late@example.com", InviteRole::Editor, "u1");
        let at_expiry = invite.expires_at;

        let err = invite.accept("u9", "Late", at_expiry).unwrap_err();
        assert!(matches!(err, CollaborationError::InviteExpired { .. }));
        assert_eq!(invite.status, InviteStatus::Expired);
    }

    #[test]
    fn test_thread_id_format() {
        assert_eq!(
            CommentThread::thread_id(ItemType::VisionBoard, "board-1"),
            "vision-board-board-1"
        );
        assert_eq!(CommentThread::new(ItemType::Budget, "42").id, "budget-42");
    }

    #[test]
    fn test_react_once_per_user() {
        let author = CommentAuthor {
            id: "u1".to_string(),
            name: "Ana".to_string(),
            avatar: None,
        };
        let mut comment = Comment::new(author, "Love this venue", vec![]);
        comment.react("❤️", "u2");
        comment.react("❤️", "u2");
        comment.react("❤️", "u3");
        comment.react("🎉", "u2");

        assert_eq!(comment.reactions.len(), 2);
        assert_eq!(comment.reactions[0].users, vec!["u2", "u3"]);
    }

    #[test]
    fn test_collaborator_serializes_camel_case() {
        let collaborator = Collaborator::new("u1", "a@example.com", "Ana", Role::Owner);
        let json = serde_json::to_value(&collaborator).unwrap();

        assert_eq!(json["role"], "owner");
        assert_eq!(json["permissions"]["canManageRoles"], true);
        assert_eq!(json["isOnline"], false);
        assert!(json.get("acceptedAt").is_none());
    }
}
