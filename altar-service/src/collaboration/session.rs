//! Reconnecting collaboration session.
//!
//! Each [`SessionManager::connect`] spawns one driver task that owns the
//! transport and the reconnect timer. Both are tied to a
//! [`CancellationToken`]; `connect` and `disconnect` cancel the previous one,
//! so a stale driver can never touch session state again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use strum::Display;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::activity::ActivityLog;
use super::events::{EventHandler, EventKind, Listeners, SessionEvent};
use super::messages::RealTimeUpdate;
use super::models::{ActiveUser, Comment, Cursor, Notification, NotificationKind, new_id};
use super::threads::CommentThreads;
use super::transport::{Connector, TransportError, TransportEvent};
use super::versions::VersionStore;
use crate::config::CollaborationConfig;

const DEFAULT_PAGE: &str = "dashboard";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

struct LocalUser {
    id: String,
    name: String,
}

#[derive(Default)]
struct SessionState {
    connection: ConnectionState,
    degraded: bool,
    outbound: Option<mpsc::UnboundedSender<String>>,
    cancel: Option<CancellationToken>,
    reconnect_attempts: u32,
}

/// Project data held for the lifetime of the session manager
#[derive(Default)]
pub(super) struct SessionData {
    pub threads: CommentThreads,
    pub activity: ActivityLog,
    pub versions: VersionStore,
    pub presence: Vec<ActiveUser>,
    pub notifications: Vec<Notification>,
}

pub(super) struct Inner {
    connector: Arc<dyn Connector>,
    config: CollaborationConfig,
    user: Mutex<LocalUser>,
    state: Mutex<SessionState>,
    listeners: Mutex<Listeners>,
    data: Mutex<SessionData>,
}

/// Real-time collaboration client for one user in one project
#[derive(Clone)]
pub struct SessionManager {
    pub(super) inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionManager {
    pub fn new(config: CollaborationConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                config,
                user: Mutex::new(LocalUser {
                    id: "current-user".to_string(),
                    name: "Current User".to_string(),
                }),
                state: Mutex::new(SessionState::default()),
                listeners: Mutex::new(Listeners::default()),
                data: Mutex::new(SessionData::default()),
            }),
        }
    }

    /// Display name stamped on outbound updates and authored records
    pub fn set_user_name(&self, name: impl Into<String>) {
        lock(&self.inner.user).name = name.into();
    }

    pub fn user_id(&self) -> String {
        lock(&self.inner.user).id.clone()
    }

    /// Open the session socket, replacing any existing connection.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, user_id: &str, project_id: &str) {
        let token = CancellationToken::new();
        {
            let mut state = lock(&self.inner.state);
            if let Some(previous) = state.cancel.replace(token.clone()) {
                previous.cancel();
            }
            state.outbound = None;
            state.degraded = false;
            state.reconnect_attempts = 0;
            state.connection = ConnectionState::Connecting;
        }
        lock(&self.inner.user).id = user_id.to_string();

        let url = format!(
            "ws://{}/collaboration?userId={}&projectId={}",
            self.inner.config.host,
            urlencoding::encode(user_id),
            urlencoding::encode(project_id)
        );
        info!(user_id = %user_id, project_id = %project_id, "Connecting to collaboration relay");

        tokio::spawn(run_session(
            self.inner.clone(),
            token,
            url,
            user_id.to_string(),
            project_id.to_string(),
        ));
    }

    /// Close the connection and cancel any pending reconnect. No-op when
    /// already disconnected.
    pub fn disconnect(&self) {
        let was_active = {
            let mut state = lock(&self.inner.state);
            if let Some(token) = state.cancel.take() {
                token.cancel();
            }
            state.outbound = None;
            state.degraded = false;
            state.reconnect_attempts = 0;
            std::mem::replace(&mut state.connection, ConnectionState::Disconnected)
                != ConnectionState::Disconnected
        };

        if was_active {
            info!("Disconnected from collaboration relay");
            self.inner.emit(&SessionEvent::Disconnected);
        }
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.state).connection
    }

    /// True when `connected` was synthesized because no transport could be built
    pub fn is_degraded(&self) -> bool {
        lock(&self.inner.state).degraded
    }

    pub fn on(&self, kind: EventKind, handler: EventHandler) {
        lock(&self.inner.listeners).on(kind, handler);
    }

    pub fn off(&self, kind: &EventKind, handler: &EventHandler) -> bool {
        lock(&self.inner.listeners).off(kind, handler)
    }

    /// Send an update to the other participants. Returns false when there is
    /// no live transport; the update is dropped, not queued.
    pub fn send_update(&self, kind: EventKind, data: Value) -> bool {
        let update = {
            let user = lock(&self.inner.user);
            RealTimeUpdate::new(kind, user.id.clone(), user.name.clone(), data)
        };

        let Some(outbound) = lock(&self.inner.state).outbound.clone() else {
            debug!(kind = %update.kind, "Not connected; dropping update");
            return false;
        };

        match serde_json::to_string(&update) {
            Ok(text) => outbound.send(text).is_ok(),
            Err(e) => {
                warn!(kind = %update.kind, error = %e, "Failed to serialize update");
                false
            }
        }
    }

    pub(super) fn local_user(&self) -> (String, String) {
        let user = lock(&self.inner.user);
        (user.id.clone(), user.name.clone())
    }

    pub(super) fn data(&self) -> MutexGuard<'_, SessionData> {
        lock(&self.inner.data)
    }
}

impl Inner {
    fn emit(&self, event: &SessionEvent) {
        let handlers = lock(&self.listeners).snapshot(&event.kind());
        for handler in handlers {
            handler(event);
        }
    }

    /// Install a freshly opened transport unless this driver was superseded
    fn mark_connected(
        &self,
        token: &CancellationToken,
        outbound: mpsc::UnboundedSender<String>,
    ) -> bool {
        let mut state = lock(&self.state);
        if token.is_cancelled() {
            return false;
        }
        state.connection = ConnectionState::Connected;
        state.outbound = Some(outbound);
        state.reconnect_attempts = 0;
        true
    }

    fn mark_degraded(&self, token: &CancellationToken) -> bool {
        let mut state = lock(&self.state);
        if token.is_cancelled() {
            return false;
        }
        state.connection = ConnectionState::Connected;
        state.degraded = true;
        state.outbound = None;
        true
    }

    fn mark_disconnected(&self, token: &CancellationToken) -> bool {
        let mut state = lock(&self.state);
        if token.is_cancelled() {
            return false;
        }
        state.connection = ConnectionState::Disconnected;
        state.outbound = None;
        true
    }

    /// Report a lost or failed connection: `error` first when there is one,
    /// then `disconnected`
    fn connection_lost(&self, token: &CancellationToken, error: Option<String>) -> bool {
        if let Some(message) = error {
            if token.is_cancelled() {
                return false;
            }
            self.emit(&SessionEvent::Error { message });
        }
        if !self.mark_disconnected(token) {
            return false;
        }
        self.emit(&SessionEvent::Disconnected);
        true
    }

    /// Wait out the next linear backoff step. Returns false when attempts are
    /// exhausted or the session was cancelled.
    async fn schedule_reconnect(&self, token: &CancellationToken) -> bool {
        let max = self.config.max_reconnect_attempts;
        let attempt = {
            let mut state = lock(&self.state);
            if token.is_cancelled() {
                return false;
            }
            if state.reconnect_attempts >= max {
                warn!(attempts = max, "Giving up on collaboration relay");
                return false;
            }
            state.reconnect_attempts += 1;
            state.reconnect_attempts
        };

        let delay = self.config.reconnect_base_delay() * attempt;
        info!(
            attempt = attempt,
            max_attempts = max,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        tokio::select! {
            _ = token.cancelled() => false,
            _ = sleep(delay) => {
                let mut state = lock(&self.state);
                if token.is_cancelled() {
                    return false;
                }
                state.connection = ConnectionState::Connecting;
                true
            }
        }
    }

    fn handle_inbound(&self, text: &str) {
        let update: RealTimeUpdate = match serde_json::from_str(text) {
            Ok(update) => update,
            Err(e) => {
                warn!(error = %e, "Skipping unparseable collaboration frame");
                return;
            }
        };

        self.fold(&update);
        self.emit(&SessionEvent::Update(update));
    }

    /// Apply an inbound update to local session data
    fn fold(&self, update: &RealTimeUpdate) {
        let local_user = lock(&self.user).id.clone();
        let mut data = lock(&self.data);
        let now = Utc::now();

        match &update.kind {
            EventKind::UserJoined => {
                let user_id = update.data_str("userId").unwrap_or(update.user_id.as_str());
                if !data.presence.iter().any(|u| u.user_id == user_id) {
                    data.presence.push(ActiveUser {
                        user_id: user_id.to_string(),
                        user_name: update
                            .data_str("userName")
                            .unwrap_or(update.user_name.as_str())
                            .to_string(),
                        avatar: update.data_str("avatar").map(str::to_string),
                        current_page: update.data_str("page").unwrap_or(DEFAULT_PAGE).to_string(),
                        last_seen: now,
                        is_typing: false,
                        cursor: None,
                    });
                }
            }
            EventKind::UserLeft => {
                let user_id = update.data_str("userId").unwrap_or(update.user_id.as_str());
                data.presence.retain(|u| u.user_id != user_id);
            }
            EventKind::CursorMoved => {
                let cursor = update
                    .data
                    .get("cursor")
                    .and_then(|c| serde_json::from_value::<Cursor>(c.clone()).ok());
                let page = update.data_str("page").map(str::to_string);
                match data.presence.iter().position(|u| u.user_id == update.user_id) {
                    Some(index) => {
                        let user = &mut data.presence[index];
                        if let Some(page) = page {
                            user.current_page = page;
                        }
                        user.cursor = cursor;
                        user.last_seen = now;
                    }
                    None => data.presence.push(ActiveUser {
                        user_id: update.user_id.clone(),
                        user_name: update.user_name.clone(),
                        avatar: None,
                        current_page: page.unwrap_or_else(|| DEFAULT_PAGE.to_string()),
                        last_seen: now,
                        is_typing: false,
                        cursor,
                    }),
                }
            }
            EventKind::TypingStatus => {
                let is_typing = update
                    .data
                    .get("isTyping")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if let Some(user) = data.presence.iter_mut().find(|u| u.user_id == update.user_id)
                {
                    user.is_typing = is_typing;
                    user.last_seen = now;
                }
            }
            EventKind::CommentAdded => {
                let Some(thread_id) = update.data_str("threadId") else {
                    return;
                };
                let comment = match update
                    .data
                    .get("comment")
                    .map(|c| serde_json::from_value::<Comment>(c.clone()))
                {
                    Some(Ok(comment)) => comment,
                    Some(Err(e)) => {
                        warn!(error = %e, "Ignoring malformed comment");
                        return;
                    }
                    None => return,
                };

                let mentioned = comment.mentions.iter().any(|m| *m == local_user);
                if !data.threads.append(thread_id, comment) {
                    debug!(thread_id = %thread_id, "Comment for unknown thread ignored");
                    return;
                }
                if mentioned {
                    data.notifications.push(Notification {
                        id: new_id(),
                        kind: NotificationKind::Mention,
                        message: format!("{} mentioned you in a comment", update.user_name),
                        user_id: local_user,
                        is_read: false,
                        created_at: now,
                    });
                }
            }
            EventKind::CommentUpdated => {
                if let (Some(comment_id), Some(content)) =
                    (update.data_str("commentId"), update.data_str("content"))
                {
                    let _ = data.threads.edit(comment_id, content, update.timestamp);
                }
            }
            EventKind::CommentDeleted => {
                if let Some(comment_id) = update.data_str("commentId") {
                    let _ = data.threads.delete(comment_id);
                }
            }
            EventKind::ReactionAdded => {
                if let (Some(comment_id), Some(emoji)) =
                    (update.data_str("commentId"), update.data_str("emoji"))
                {
                    if let Ok(comment) = data.threads.comment_mut(comment_id) {
                        comment.react(emoji, &update.user_id);
                    }
                }
            }
            EventKind::ThreadResolved => {
                if let Some(thread_id) = update.data_str("threadId") {
                    let _ = data.threads.resolve(thread_id, &update.user_id, update.timestamp);
                }
            }
            _ => {}
        }
    }
}

async fn run_session(
    inner: Arc<Inner>,
    token: CancellationToken,
    url: String,
    user_id: String,
    project_id: String,
) {
    loop {
        let opened = tokio::select! {
            _ = token.cancelled() => return,
            result = timeout(inner.config.connect_timeout(), inner.connector.open(&url)) => result,
        };

        let transport = match opened {
            Ok(Ok(transport)) => transport,
            Ok(Err(TransportError::Setup { url, message })) => {
                warn!(url = %url, error = %message, "Cannot build collaboration transport; running offline");
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = sleep(inner.config.degraded_delay()) => {}
                }
                if inner.mark_degraded(&token) {
                    inner.emit(&SessionEvent::Connected {
                        user_id: user_id.clone(),
                        project_id: project_id.clone(),
                    });
                }
                return;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Collaboration connect failed");
                if !inner.connection_lost(&token, Some(e.to_string()))
                    || !inner.schedule_reconnect(&token).await
                {
                    return;
                }
                continue;
            }
            Err(_) => {
                let e = TransportError::Timeout { url: url.clone() };
                warn!(error = %e, "Collaboration connect failed");
                if !inner.connection_lost(&token, Some(e.to_string()))
                    || !inner.schedule_reconnect(&token).await
                {
                    return;
                }
                continue;
            }
        };

        let mut inbound = transport.inbound;
        if !inner.mark_connected(&token, transport.outbound) {
            return;
        }
        info!(user_id = %user_id, project_id = %project_id, "Collaboration session connected");
        inner.emit(&SessionEvent::Connected {
            user_id: user_id.clone(),
            project_id: project_id.clone(),
        });

        loop {
            let event = tokio::select! {
                _ = token.cancelled() => return,
                event = inbound.recv() => event,
            };
            match event {
                Some(TransportEvent::Message(text)) => inner.handle_inbound(&text),
                Some(TransportEvent::Error(message)) => {
                    warn!(error = %message, "Collaboration socket error");
                    inner.emit(&SessionEvent::Error { message });
                }
                Some(TransportEvent::Closed) | None => break,
            }
        }

        info!("Collaboration socket closed");
        if !inner.connection_lost(&token, None) || !inner.schedule_reconnect(&token).await {
            return;
        }
    }
}
