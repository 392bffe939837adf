//! # Votecast
//!
//! Application layer for the Votecast contest-voting engine: configuration,
//! telemetry, the platform-fee policy, and the [`VotingService`] facade the
//! surrounding application calls in-process.
//!
//! ```ignore
//! use votecast::{Config, VotingService};
//!
//! let config = Config::from_env();
//! votecast::telemetry::init_tracing(&config.log_level);
//! let service = votecast::postgres(&config).await?;
//!
//! let vote = service
//!     .cast_free_vote(contest_id, contestant_id, session_user, &network)
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod fees;
mod service;
pub mod telemetry;

pub use config::{Config, PlatformConfig};
pub use fees::{FixedFeePolicy, PlatformFeePolicy};
pub use service::{OrderError, PublicResults, SetupError, VotingService};

use std::sync::Arc;
use votecast_core::environment::SystemClock;
use votecast_core::store::StoreError;
use votecast_postgres::{PgNotificationOutbox, PgVoteStore};

/// Builds a production service: Postgres store (with migrations applied),
/// outbox-backed notifications, system clock, configured platform fee.
///
/// # Errors
///
/// Returns [`StoreError::Storage`] when the database is unreachable or
/// migrations fail.
pub async fn postgres(config: &Config) -> Result<VotingService, StoreError> {
    let store = PgVoteStore::connect(&config.postgres).await?;
    let outbox = PgNotificationOutbox::new(store.pool().clone());
    Ok(VotingService::new(
        Arc::new(store),
        Arc::new(outbox),
        Arc::new(SystemClock),
        Arc::new(FixedFeePolicy::new(config.platform.fee_percent)),
    ))
}
