use futures::{future::Future, stream::BoxStream};

use crate::domain::Notification;

// Mods

pub mod memory;

// Types

pub type NotificationStream = BoxStream<'static, Vec<Notification>>;

pub type Result<T = ()> = std::result::Result<T, Error>;

// Errors

#[derive(Debug, thiserror::Error)]
#[error("store error: {0}")]
pub struct Error(#[source] pub Box<dyn std::error::Error + Send + Sync>);

// Traits

#[cfg_attr(test, mockall::automock)]
pub trait NotificationStore: Send + Sync {
    /// Sets the viewed flag of a notification. Setting an already set flag is
    /// a no-op.
    fn mark_viewed(&self, id: &str) -> impl Future<Output = Result> + Send;

    /// Opens a live query on the notifications of a user.
    ///
    /// The stream yields the full result set, newest first, immediately and
    /// then again on every change. Dropping it closes the query.
    fn watch(&self, user_id: &str) -> impl Future<Output = Result<NotificationStream>> + Send;
}
