//! Organizer notifications.
//!
//! Notifications are best-effort side effects dispatched after a vote or
//! purchase commits. Delivery failure never affects the committed write —
//! the cast path logs the failure and moves on.

use crate::types::{Contest, Contestant, UserId, Vote};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// What a notification is about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A contestant received a vote
    VoteReceived,
    /// A vote package purchase completed
    OrderCompleted,
}

impl NotificationKind {
    /// Database/string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VoteReceived => "vote_received",
            Self::OrderCompleted => "order_completed",
        }
    }
}

/// A notification addressed to one user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// What the notification is about
    pub kind: NotificationKind,
    /// Short headline
    pub title: String,
    /// Human-readable body
    pub message: String,
    /// Addressee
    pub recipient: UserId,
    /// Structured payload for clients (ids, amounts)
    pub metadata: serde_json::Value,
}

impl Notification {
    /// Builds the organizer notification for a freshly committed vote
    #[must_use]
    pub fn vote_received(contest: &Contest, contestant: &Contestant, vote: &Vote) -> Self {
        Self {
            kind: NotificationKind::VoteReceived,
            title: "New vote received".to_string(),
            message: format!(
                "{} received a new {} vote in {}",
                contestant.name, vote.kind, contest.name
            ),
            recipient: contest.owner_id,
            metadata: json!({
                "contest_id": contest.id,
                "contestant_id": contestant.id,
                "vote_id": vote.id,
                "vote_kind": vote.kind,
            }),
        }
    }
}

/// Delivery failure; informational only, never fatal to the caller
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct DispatchError(pub String);

/// Asynchronous notification delivery seam.
///
/// Implementations persist to an outbox, push to a device, send an email —
/// the engine doesn't care. Callers treat failures as log-and-continue.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Delivers one notification.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when delivery fails; callers log and
    /// continue.
    async fn dispatch(&self, notification: Notification) -> Result<(), DispatchError>;
}
