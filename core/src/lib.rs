//! # Votecast Core
//!
//! Domain types and the voting rule engine for contest voting: free and
//! paid votes, guest and member voters, vote packages and orders.
//!
//! ## Architecture
//!
//! Functional core, imperative shell:
//!
//! ```text
//!                 ┌──────────────────┐
//!     snapshots   │   eligibility    │   Decision
//!    ───────────▶ │  (pure, no I/O)  │ ───────────▶
//!                 └──────────────────┘
//!                           ▲
//!                           │ evaluate
//!                 ┌──────────────────┐       ┌──────────────────┐
//!     request ──▶ │    VoteCaster    │ ────▶ │    VoteStore     │
//!                 │ (load, evaluate, │       │ (constraints +   │
//!                 │  commit, notify) │       │  guarded writes) │
//!                 └──────────────────┘       └──────────────────┘
//!                           │
//!                           ▼ best-effort
//!                 ┌──────────────────┐
//!                 │   Notification   │
//!                 │    Dispatcher    │
//!                 └──────────────────┘
//! ```
//!
//! - [`eligibility`] decides; it is a pure function of snapshots and never
//!   performs I/O.
//! - [`casting`] commits; the store's unique constraints and guarded
//!   decrement are the authoritative word under concurrency, and conflicts
//!   map back to ordinary rejections.
//! - [`results`] aggregates counts, percentages, ranks, and revenue.
//! - All request context (voter identity, client network details) is
//!   threaded explicitly — no ambient session state.
//!
//! Business rejections are values ([`eligibility::Decision`],
//! [`casting::CastError::Rejected`]), never panics or opaque errors;
//! infrastructure faults stay a separate variant so callers cannot confuse
//! "you already voted" with "the database is down".

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod casting;
pub mod eligibility;
pub mod environment;
pub mod notify;
pub mod results;
pub mod store;
pub mod types;

pub use casting::{CastError, Missing, VoteCaster};
pub use eligibility::{evaluate, Decision, RejectionReason, VoteAttempt, VoterHistory};
pub use environment::{Clock, SystemClock};
pub use notify::{DispatchError, Notification, NotificationDispatcher, NotificationKind};
pub use results::{ContestResults, ContestantStanding, ResultsAggregator, RevenueSummary};
pub use store::{RevenueTotals, StoreError, VoteConflict, VoteStore};
pub use types::*;
