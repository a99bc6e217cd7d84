use std::sync::Arc;

use futures::{stream, StreamExt};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    RwLock,
};
use tracing::{debug, instrument};

use crate::domain::Notification;

use super::{NotificationStore, NotificationStream, Result};

// Consts

const CHANGE_CHANNEL_CAPACITY: usize = 16;

// Errors

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("notification `{0}` not found")]
    NotificationNotFound(String),
}

// MemoryNotificationStore

/// Notification store backed by process memory.
pub struct MemoryNotificationStore {
    changed_tx: broadcast::Sender<()>,
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        let (changed_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            changed_tx,
            notifications: Arc::new(RwLock::new(vec![])),
        }
    }

    #[instrument(skip(self, notif), fields(notif.id = notif.id, notif.user = notif.user_id))]
    pub async fn publish(&self, notif: Notification) {
        let mut notifs = self.notifications.write().await;
        notifs.push(notif);
        drop(notifs);
        debug!("notification published");
        self.changed_tx.send(()).ok();
    }
}

impl NotificationStore for MemoryNotificationStore {
    #[instrument(skip(self, id), fields(notif.id = id))]
    async fn mark_viewed(&self, id: &str) -> Result {
        let mut notifs = self.notifications.write().await;
        let notif = notifs
            .iter_mut()
            .find(|notif| notif.id == id)
            .ok_or_else(|| Error::NotificationNotFound(id.into()))?;
        let changed = !notif.viewed;
        notif.viewed = true;
        drop(notifs);
        if changed {
            debug!("notification marked as viewed");
            self.changed_tx.send(()).ok();
        }
        Ok(())
    }

    #[instrument(skip(self, user_id), fields(notif.user = user_id))]
    async fn watch(&self, user_id: &str) -> Result<NotificationStream> {
        let changed_rx = self.changed_tx.subscribe();
        let notifications = self.notifications.clone();
        let user_id = user_id.to_string();
        let initial = snapshot(&notifications, &user_id).await;
        debug!("watch started");
        let changes = stream::unfold(
            (notifications, user_id, changed_rx),
            |(notifications, user_id, mut changed_rx)| async move {
                match changed_rx.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        let notifs = snapshot(&notifications, &user_id).await;
                        Some((notifs, (notifications, user_id, changed_rx)))
                    }
                    Err(RecvError::Closed) => None,
                }
            },
        );
        Ok(stream::once(async move { initial }).chain(changes).boxed())
    }
}

// Functions

async fn snapshot(notifications: &RwLock<Vec<Notification>>, user_id: &str) -> Vec<Notification> {
    let notifs = notifications.read().await;
    let mut notifs: Vec<Notification> = notifs
        .iter()
        .filter(|notif| notif.user_id == user_id)
        .cloned()
        .collect();
    notifs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    notifs
}

// super::Error

impl From<Error> for super::Error {
    fn from(err: Error) -> Self {
        Self(Box::new(err))
    }
}

// Tests
