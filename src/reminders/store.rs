use std::collections::HashSet;

use uuid::Uuid;

use super::types::{Notification, NotificationOrigin, ReminderError, ReminderGroup};

/// In-memory notification list backed by RwLock, most recent first.
/// Lives for the session only; nothing is persisted.
pub struct NotificationStore {
    pub(crate) items: std::sync::RwLock<Vec<Notification>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            items: std::sync::RwLock::new(Vec::new()),
        }
    }

    /// Prepend a notification. No deduplication.
    pub fn add(&self, notification: Notification) -> Result<(), ReminderError> {
        let mut items = self.items.write().map_err(|_| ReminderError::LockFailed)?;
        items.insert(0, notification);
        Ok(())
    }

    /// Reconcile the store with the output of a derivation pass.
    ///
    /// Each appointment holds at most one derived notification per
    /// [`ReminderGroup`](super::types::ReminderGroup). A fresh one replaces
    /// the previous entry under its key and moves to the front; the `read`
    /// flag carries over only when the category is unchanged, so an
    /// escalation from today to imminent shows up as unread. Derived entries
    /// the pass no longer produces are dropped. Manual entries are never
    /// touched. Returns how many notifications took a key that had none.
    pub fn merge_derived(&self, notifications: Vec<Notification>) -> Result<usize, ReminderError> {
        let mut items = self.items.write().map_err(|_| ReminderError::LockFailed)?;

        let fresh: HashSet<(String, ReminderGroup)> = notifications
            .iter()
            .map(|n| (n.appointment_id.clone(), n.category.group()))
            .collect();
        let before = items.len();
        items.retain(|n| {
            n.origin == NotificationOrigin::Manual
                || fresh.contains(&(n.appointment_id.clone(), n.category.group()))
        });
        let dropped = before - items.len();
        if dropped > 0 {
            tracing::debug!(dropped, "Dropped notifications no longer derived");
        }

        let mut added = 0;
        // Reverse so the first derived notification ends up on top.
        for mut notification in notifications.into_iter().rev() {
            let existing = items.iter().position(|n| {
                n.origin == NotificationOrigin::Derived && n.dedup_key() == notification.dedup_key()
            });
            match existing {
                Some(pos) => {
                    let previous = items.remove(pos);
                    if previous.category == notification.category {
                        notification.read = previous.read;
                    }
                    tracing::debug!(
                        appointment_id = %notification.appointment_id,
                        from = previous.category.as_str(),
                        to = notification.category.as_str(),
                        "Replacing existing notification"
                    );
                }
                None => added += 1,
            }
            items.insert(0, notification);
        }

        Ok(added)
    }

    /// Mark one notification read. Unknown ids are ignored.
    pub fn mark_read(&self, id: &Uuid) -> Result<(), ReminderError> {
        let mut items = self.items.write().map_err(|_| ReminderError::LockFailed)?;
        if let Some(n) = items.iter_mut().find(|n| n.id == *id) {
            n.read = true;
        }
        Ok(())
    }

    pub fn mark_all_read(&self) -> Result<(), ReminderError> {
        let mut items = self.items.write().map_err(|_| ReminderError::LockFailed)?;
        items.iter_mut().for_each(|n| n.read = true);
        Ok(())
    }

    /// Dismiss one notification. Unknown ids are ignored.
    pub fn remove(&self, id: &Uuid) -> Result<(), ReminderError> {
        let mut items = self.items.write().map_err(|_| ReminderError::LockFailed)?;
        items.retain(|n| n.id != *id);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ReminderError> {
        let mut items = self.items.write().map_err(|_| ReminderError::LockFailed)?;
        items.clear();
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> Result<Option<Notification>, ReminderError> {
        let items = self.items.read().map_err(|_| ReminderError::LockFailed)?;
        Ok(items.iter().find(|n| n.id == *id).cloned())
    }

    pub fn unread_count(&self) -> Result<usize, ReminderError> {
        let items = self.items.read().map_err(|_| ReminderError::LockFailed)?;
        Ok(items.iter().filter(|n| !n.read).count())
    }

    /// Snapshot of the current list, most recent first.
    pub fn list(&self) -> Result<Vec<Notification>, ReminderError> {
        let items = self.items.read().map_err(|_| ReminderError::LockFailed)?;
        Ok(items.clone())
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}
