//! Notification dispatcher doubles.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use votecast_core::notify::{DispatchError, Notification, NotificationDispatcher};

/// Dispatcher that records every notification for later assertion
#[derive(Default)]
pub struct CollectingDispatcher {
    sent: Mutex<Vec<Notification>>,
}

impl CollectingDispatcher {
    /// Creates an empty collector
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Everything dispatched so far, in order
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of notifications dispatched so far
    #[must_use]
    pub fn count(&self) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl NotificationDispatcher for CollectingDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<(), DispatchError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}

/// Dispatcher that always fails, for exercising best-effort delivery
#[derive(Default, Clone, Copy)]
pub struct FailingDispatcher;

impl FailingDispatcher {
    /// Creates a dispatcher that fails every delivery
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn dispatch(&self, _notification: Notification) -> Result<(), DispatchError> {
        Err(DispatchError("dispatcher wired to fail".to_string()))
    }
}
