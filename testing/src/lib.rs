//! # Votecast Testing
//!
//! Test collaborators for the Votecast engine:
//!
//! - [`InMemoryVoteStore`]: a `VoteStore` with the same conflict semantics
//!   as the Postgres adapter (unique guest/free-vote rules, conditional
//!   single-vote insert, guarded order decrement), all applied atomically
//!   under one lock so concurrency tests behave like the real store.
//! - [`FixedClock`]: deterministic, settable time.
//! - [`CollectingDispatcher`] / [`FailingDispatcher`]: notification doubles
//!   for asserting delivery and best-effort behavior.
//! - [`fixtures`]: builders for contests, contestants, packages, and orders.
//!
//! ## Example
//!
//! ```ignore
//! let store = Arc::new(InMemoryVoteStore::new());
//! let clock = Arc::new(FixedClock::at(Utc::now()));
//! let notifications = Arc::new(CollectingDispatcher::new());
//! let caster = VoteCaster::new(store.clone(), notifications.clone(), clock);
//!
//! store.create_contest(&fixtures::ContestBuilder::free().build()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod dispatch;
pub mod fixtures;
mod memory;

pub use clock::FixedClock;
pub use dispatch::{CollectingDispatcher, FailingDispatcher};
pub use memory::InMemoryVoteStore;
