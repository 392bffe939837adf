//! Notification outbox.
//!
//! The production dispatcher persists notifications to an outbox table;
//! delivery channels (in-app feed, push, digest email) read from it on
//! their own schedule. This keeps the cast path's side effect to a single
//! cheap insert, and a failed insert is logged by the caller and never
//! fails the vote.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use votecast_core::notify::{DispatchError, Notification, NotificationDispatcher};
use votecast_core::types::UserId;

/// A notification row as stored in the outbox
#[derive(Debug, Clone)]
pub struct StoredNotification {
    /// Outbox row id
    pub id: i64,
    /// Addressee
    pub recipient: UserId,
    /// Notification kind string
    pub kind: String,
    /// Short headline
    pub title: String,
    /// Human-readable body
    pub message: String,
    /// Structured payload
    pub metadata: serde_json::Value,
    /// When the notification was enqueued
    pub created_at: DateTime<Utc>,
    /// When the recipient read it, if ever
    pub read_at: Option<DateTime<Utc>>,
}

/// PostgreSQL-backed notification outbox
#[derive(Clone)]
pub struct PgNotificationOutbox {
    pool: PgPool,
}

impl PgNotificationOutbox {
    /// Creates an outbox over the given pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists a recipient's unread notifications, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the query fails.
    pub async fn list_unread(
        &self,
        recipient: UserId,
        limit: i64,
    ) -> Result<Vec<StoredNotification>, DispatchError> {
        let rows = sqlx::query(
            "SELECT id, recipient_id, kind, title, message, metadata, created_at, read_at
             FROM notifications
             WHERE recipient_id = $1 AND read_at IS NULL
             ORDER BY created_at
             LIMIT $2",
        )
        .bind(recipient.as_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DispatchError(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(StoredNotification {
                    id: row.try_get("id").map_err(|e| DispatchError(e.to_string()))?,
                    recipient: UserId::from_uuid(
                        row.try_get("recipient_id")
                            .map_err(|e| DispatchError(e.to_string()))?,
                    ),
                    kind: row
                        .try_get("kind")
                        .map_err(|e| DispatchError(e.to_string()))?,
                    title: row
                        .try_get("title")
                        .map_err(|e| DispatchError(e.to_string()))?,
                    message: row
                        .try_get("message")
                        .map_err(|e| DispatchError(e.to_string()))?,
                    metadata: row
                        .try_get("metadata")
                        .map_err(|e| DispatchError(e.to_string()))?,
                    created_at: row
                        .try_get("created_at")
                        .map_err(|e| DispatchError(e.to_string()))?,
                    read_at: row
                        .try_get("read_at")
                        .map_err(|e| DispatchError(e.to_string()))?,
                })
            })
            .collect()
    }

    /// Marks one notification as read.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the update fails.
    pub async fn mark_read(&self, id: i64) -> Result<(), DispatchError> {
        sqlx::query("UPDATE notifications SET read_at = now() WHERE id = $1 AND read_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DispatchError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for PgNotificationOutbox {
    async fn dispatch(&self, notification: Notification) -> Result<(), DispatchError> {
        sqlx::query(
            "INSERT INTO notifications (recipient_id, kind, title, message, metadata)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(notification.recipient.as_uuid())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| DispatchError(e.to_string()))?;
        Ok(())
    }
}
