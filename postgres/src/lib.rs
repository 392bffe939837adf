//! PostgreSQL store adapter for the Votecast engine.
//!
//! Provides [`PgVoteStore`], the production `VoteStore` implementation, and
//! [`PgNotificationOutbox`], a notification dispatcher that persists to an
//! outbox table. Uses sqlx with runtime-bound queries and embedded SQL
//! migrations.
//!
//! The write-side guarantees the engine depends on live in the schema:
//!
//! - partial unique indexes enforce the guest-per-contest and
//!   free-vote-per-contestant rules; the adapter maps violations to typed
//!   conflicts
//! - single-vote contests insert through a conditional
//!   `INSERT … WHERE NOT EXISTS`, checked by affected-row count
//! - the paid path runs one transaction: a guarded decrement
//!   (`WHERE votes_remaining > 0`) followed by the vote insert, so the
//!   order balance can never go negative under concurrent casts

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod outbox;
mod store;

pub use config::PostgresConfig;
pub use outbox::{PgNotificationOutbox, StoredNotification};
pub use store::PgVoteStore;

/// Embedded schema migrations, applied by [`PgVoteStore::connect`]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
