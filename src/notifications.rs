//! Notification cache with optimistic read-state mutations.
//!
//! The backend is the source of truth for notifications; this module keeps a
//! client-side cache of three views (the full list, the unread count, and
//! the most recent unread notification) that must stay mutually consistent.
//! Mark-as-read mutations apply locally before the backend confirms them and
//! are rolled back if the confirmation fails.
//!
//! Rollback is a per-mutation inverse patch applied to the state current at
//! failure time, so a mutation confirmed while another is still in flight is
//! never clobbered by the earlier one failing.

use crate::api::TelemetryBackend;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, warn};

pub type NotificationId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    WaterLevel,
    Disconnection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSensor {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub threshold_value: f64,
    pub current_value: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub read: bool,
    #[serde(rename = "sensors")]
    pub sensor: NotificationSensor,
}

/// Inverse patch for a single optimistic mark-as-read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRollback {
    id: NotificationId,
}

/// Inverse patch for an optimistic mark-all-as-read: exactly the ids that
/// were unread when the mutation was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAllRollback {
    ids: Vec<NotificationId>,
}

impl ReadAllRollback {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug)]
pub struct NotificationStore {
    notifications: Vec<Notification>,
    unread_count: usize,
    last_unread: Option<Notification>,
    notifications_tx: watch::Sender<Vec<Notification>>,
    unread_count_tx: watch::Sender<usize>,
    last_unread_tx: watch::Sender<Option<Notification>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        let (notifications_tx, _notifications_rx) = watch::channel(Vec::new());
        let (unread_count_tx, _unread_count_rx) = watch::channel(0);
        let (last_unread_tx, _last_unread_rx) = watch::channel(None);
        Self {
            notifications: Vec::new(),
            unread_count: 0,
            last_unread: None,
            notifications_tx,
            unread_count_tx,
            last_unread_tx,
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn last_unread(&self) -> Option<&Notification> {
        self.last_unread.as_ref()
    }

    pub fn subscribe_notifications(&self) -> watch::Receiver<Vec<Notification>> {
        self.notifications_tx.subscribe()
    }

    pub fn subscribe_unread_count(&self) -> watch::Receiver<usize> {
        self.unread_count_tx.subscribe()
    }

    pub fn subscribe_last_unread(&self) -> watch::Receiver<Option<Notification>> {
        self.last_unread_tx.subscribe()
    }

    /// Install a freshly fetched list. The unread count and last-unread
    /// pointer are derived from the list; server-reported aggregates that
    /// disagree are logged and overridden so the three views never drift
    /// apart.
    pub fn refresh(
        &mut self,
        notifications: Vec<Notification>,
        server_count: usize,
        server_last: Option<Notification>,
    ) -> Result<(), AppError> {
        self.notifications = notifications;
        self.recompute_derived();

        if self.unread_count != server_count {
            warn!(
                derived = self.unread_count,
                reported = server_count,
                "Server unread count disagrees with notification list"
            );
        }
        let derived_last = self.last_unread.as_ref().map(|n| n.id.as_str());
        let reported_last = server_last.as_ref().map(|n| n.id.as_str());
        if derived_last != reported_last {
            warn!(
                derived = derived_last.unwrap_or("none"),
                reported = reported_last.unwrap_or("none"),
                "Server last-unread pointer disagrees with notification list"
            );
        }

        self.publish()
    }

    /// Optimistically mark one notification read. Returns the inverse patch,
    /// or `None` when the id is unknown or already read (no-op, nothing to
    /// confirm).
    pub fn apply_mark_as_read(&mut self, id: &str) -> Result<Option<ReadRollback>, AppError> {
        let Some(notification) = self.notifications.iter_mut().find(|n| n.id == id) else {
            debug!(id, "Ignoring mark-as-read for unknown notification");
            return Ok(None);
        };
        if notification.read {
            return Ok(None);
        }
        notification.read = true;
        self.recompute_derived();
        self.publish()?;
        Ok(Some(ReadRollback { id: id.to_string() }))
    }

    /// Undo a failed mark-as-read against the current state. The item may
    /// have been dropped by a refresh in the meantime; that leaves nothing
    /// to undo.
    pub fn revert_mark_as_read(&mut self, rollback: ReadRollback) -> Result<(), AppError> {
        let Some(notification) = self
            .notifications
            .iter_mut()
            .find(|n| n.id == rollback.id)
        else {
            return Ok(());
        };
        notification.read = false;
        self.recompute_derived();
        self.publish()
    }

    /// Optimistically mark every notification read. The returned patch is
    /// empty when nothing was unread, in which case no state changed and no
    /// confirmation is needed.
    pub fn apply_mark_all_as_read(&mut self) -> Result<ReadAllRollback, AppError> {
        let ids: Vec<NotificationId> = self
            .notifications
            .iter()
            .filter(|n| !n.read)
            .map(|n| n.id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(ReadAllRollback { ids });
        }

        for notification in &mut self.notifications {
            notification.read = true;
        }
        self.recompute_derived();
        self.publish()?;
        Ok(ReadAllRollback { ids })
    }

    /// Undo a failed mark-all-as-read: only the ids that were unread at
    /// issuance go back to unread, so reads confirmed in the meantime stick.
    pub fn revert_mark_all_as_read(&mut self, rollback: ReadAllRollback) -> Result<(), AppError> {
        let mut changed = false;
        for notification in &mut self.notifications {
            if rollback.ids.contains(&notification.id) {
                notification.read = false;
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }
        self.recompute_derived();
        self.publish()
    }

    // Derived views are recomputed from the list inside the same critical
    // section as every list mutation; readers can never observe the three
    // views out of step.
    fn recompute_derived(&mut self) {
        self.unread_count = self.notifications.iter().filter(|n| !n.read).count();

        let mut latest: Option<&Notification> = None;
        for notification in self.notifications.iter().filter(|n| !n.read) {
            // Strict comparison keeps the earliest list position on ties.
            if latest.is_none_or(|current| notification.created_at > current.created_at) {
                latest = Some(notification);
            }
        }
        self.last_unread = latest.cloned();
    }

    fn publish(&self) -> Result<(), AppError> {
        self.notifications_tx
            .send(self.notifications.clone())
            .map_err(|_| AppError::WatchSend)?;
        self.unread_count_tx
            .send(self.unread_count)
            .map_err(|_| AppError::WatchSend)?;
        self.last_unread_tx
            .send(self.last_unread.clone())
            .map_err(|_| AppError::WatchSend)
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch all three notification views from the backend and install them.
pub async fn refresh<B>(
    backend: &B,
    store: &Arc<RwLock<NotificationStore>>,
) -> Result<(), AppError>
where
    B: TelemetryBackend,
{
    let notifications = backend.fetch_notifications().await?;
    let unread_count = backend.fetch_unread_count().await?;
    let last_unread = backend.fetch_last_unread().await?;

    let mut guard = store.write().map_err(|_| AppError::StateLock)?;
    guard.refresh(notifications, unread_count, last_unread)
}

/// Mark one notification read: apply locally, confirm with the backend,
/// revert on failure. Unknown or already-read ids are silently skipped.
pub async fn mark_as_read<B>(
    backend: &B,
    store: &Arc<RwLock<NotificationStore>>,
    id: &str,
) -> Result<(), AppError>
where
    B: TelemetryBackend,
{
    let rollback = {
        let mut guard = store.write().map_err(|_| AppError::StateLock)?;
        guard.apply_mark_as_read(id)?
    };
    let Some(rollback) = rollback else {
        return Ok(());
    };

    if let Err(err) = backend.confirm_mark_as_read(id).await {
        warn!(id, error = %err, "Mark-as-read rejected by backend, reverting");
        let mut guard = store.write().map_err(|_| AppError::StateLock)?;
        guard.revert_mark_as_read(rollback)?;
        return Err(err);
    }
    Ok(())
}

/// Mark every notification read: apply locally, confirm with the backend,
/// revert on failure. A list with nothing unread skips the network call.
pub async fn mark_all_as_read<B>(
    backend: &B,
    store: &Arc<RwLock<NotificationStore>>,
) -> Result<(), AppError>
where
    B: TelemetryBackend,
{
    let rollback = {
        let mut guard = store.write().map_err(|_| AppError::StateLock)?;
        guard.apply_mark_all_as_read()?
    };
    if rollback.is_empty() {
        return Ok(());
    }

    if let Err(err) = backend.confirm_mark_all_as_read().await {
        warn!(error = %err, "Mark-all-as-read rejected by backend, reverting");
        let mut guard = store.write().map_err(|_| AppError::StateLock)?;
        guard.revert_mark_all_as_read(rollback)?;
        return Err(err);
    }
    Ok(())
}
