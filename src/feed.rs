use std::sync::Arc;

use futures::{future, StreamExt};
use tokio::{
    select,
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    domain::Notification,
    store::{NotificationStore, NotificationStream},
};

// NotificationFeed

/// Live view of the notifications of a user.
///
/// The feed follows one identity at a time. Every batch emitted by the store
/// replaces the view entirely, then each notification of the batch that is
/// not viewed yet is marked as viewed. Marking failures are logged and left
/// for the next batch.
pub struct NotificationFeed {
    identity_tx: watch::Sender<Option<String>>,
    stop_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
    view_rx: watch::Receiver<Vec<Notification>>,
}

impl NotificationFeed {
    pub fn start<STORE: NotificationStore + 'static>(store: Arc<STORE>) -> Self {
        let (identity_tx, identity_rx) = watch::channel(None);
        let (stop_tx, stop_rx) = broadcast::channel(1);
        let (view_tx, view_rx) = watch::channel(vec![]);
        let task = tokio::spawn(run(identity_rx, store, stop_rx, view_tx));
        Self {
            identity_tx,
            stop_tx,
            task,
            view_rx,
        }
    }

    /// Switches the followed user. `None` leaves the view empty.
    pub fn set_identity(&self, user_id: Option<String>) {
        self.identity_tx.send_replace(user_id);
    }

    /// Receiver over the current batch of notifications, newest first.
    pub fn view(&self) -> watch::Receiver<Vec<Notification>> {
        self.view_rx.clone()
    }

    /// Stops the feed. No write is issued once it returns.
    pub async fn stop(self) {
        self.stop_tx.send(()).ok();
        if let Err(err) = self.task.await {
            warn!("{err}");
        }
    }
}

// Functions

async fn run<STORE: NotificationStore>(
    mut identity_rx: watch::Receiver<Option<String>>,
    store: Arc<STORE>,
    mut stop_rx: broadcast::Receiver<()>,
    view_tx: watch::Sender<Vec<Notification>>,
) {
    let mut stream: Option<NotificationStream> = None;
    info!("notification feed started");
    loop {
        select! {
            _ = stop_rx.recv() => {
                debug!("stop signal received");
                break;
            }
            res = identity_rx.changed() => {
                if res.is_err() {
                    debug!("identity channel closed");
                    break;
                }
                stream = None;
                view_tx.send_replace(vec![]);
                let user_id = identity_rx.borrow_and_update().clone();
                if let Some(user_id) = user_id {
                    stream = subscribe(&*store, &user_id).await;
                }
            }
            batch = next_batch(&mut stream) => match batch {
                Some(notifs) => {
                    view_tx.send_replace(notifs.clone());
                    acknowledge(&*store, &notifs).await;
                }
                None => {
                    debug!("notification stream ended");
                    stream = None;
                }
            }
        }
    }
    info!("notification feed stopped");
}

async fn acknowledge<STORE: NotificationStore>(store: &STORE, notifs: &[Notification]) {
    for notif in notifs {
        if notif.viewed {
            continue;
        }
        debug!("marking notification `{}` as viewed", notif.id);
        if let Err(err) = store.mark_viewed(&notif.id).await {
            error!("failed to mark notification `{}` as viewed: {err}", notif.id);
        }
    }
}

async fn next_batch(stream: &mut Option<NotificationStream>) -> Option<Vec<Notification>> {
    match stream {
        Some(stream) => stream.next().await,
        None => future::pending().await,
    }
}

#[instrument(skip(store, user_id), fields(notif.user = user_id))]
async fn subscribe<STORE: NotificationStore>(
    store: &STORE,
    user_id: &str,
) -> Option<NotificationStream> {
    debug!("subscribing to notifications");
    match store.watch(user_id).await {
        Ok(stream) => Some(stream),
        Err(err) => {
            error!("{err}");
            None
        }
    }
}

// Tests
