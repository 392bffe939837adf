//! Persistent-store contract for the voting engine.
//!
//! [`VoteStore`] is the seam between the engine and its database. The
//! write-side methods carry the concurrency guarantees the engine relies on:
//! vote uniqueness is enforced by the store (unique constraints and
//! conditional inserts), and the paid-vote path couples the order decrement
//! and the vote insert in one atomic operation with a guarded
//! (`votes_remaining > 0`) decrement. The pre-commit eligibility check is
//! advisory; a [`StoreError::Conflict`] or [`StoreError::VotesExhausted`]
//! from these methods is the authoritative rejection signal.

use crate::eligibility::{RejectionReason, VoterHistory};
use crate::types::{
    Contest, ContestId, Contestant, ContestantId, ContestantStatus, Money, PaymentStatus, Vote,
    VoteOrder, VoteOrderId, VotePackage, Voter,
};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// A vote write that lost to an earlier vote under a store-level uniqueness
/// rule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteConflict {
    /// A guest vote from this IP already exists in the contest
    GuestAlreadyVoted,
    /// A free vote by this member for this contestant already exists
    DuplicateFreeVote,
    /// The contest permits one vote per member and one already exists
    SingleVoteContest,
}

impl VoteConflict {
    /// The rejection the conflict stands for; constraint violations surface
    /// to voters as ordinary rejections
    #[must_use]
    pub const fn as_rejection(self) -> RejectionReason {
        match self {
            Self::GuestAlreadyVoted => RejectionReason::AlreadyVoted,
            Self::DuplicateFreeVote => RejectionReason::AlreadyVotedContestant,
            Self::SingleVoteContest => RejectionReason::OneContestantOnly,
        }
    }
}

/// Failures surfaced by a [`VoteStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule rejected the write; carries which rule fired
    #[error("conflicting vote already exists")]
    Conflict(VoteConflict),

    /// The guarded decrement found no votes remaining on the order
    #[error("order has no votes remaining")]
    VotesExhausted,

    /// A contestant with the same contest number already exists
    #[error("contest number already taken in this contest")]
    DuplicateContestNumber,

    /// Infrastructure fault (connection, query, serialization). Never to be
    /// interpreted as a business rejection.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Completed-order revenue sums for one contest
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RevenueTotals {
    /// Sum of `total_amount` over completed orders
    pub gross: Money,
    /// Sum of `platform_fee` over completed orders
    pub fees: Money,
}

/// Persistent store for contests, contestants, packages, orders, and votes.
///
/// Implementations must provide at least read-committed isolation and the
/// uniqueness guarantees described on the write methods.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Persists a new contest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn create_contest(&self, contest: &Contest) -> Result<(), StoreError>;

    /// Looks up a contest by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn contest(&self, id: ContestId) -> Result<Option<Contest>, StoreError>;

    /// Persists a new contestant. The contest number must be unique within
    /// the contest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateContestNumber`] when the number is
    /// taken, [`StoreError::Storage`] on infrastructure faults.
    async fn create_contestant(&self, contestant: &Contestant) -> Result<(), StoreError>;

    /// Looks up a contestant by id, scoped to its contest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn contestant(
        &self,
        contest_id: ContestId,
        id: ContestantId,
    ) -> Result<Option<Contestant>, StoreError>;

    /// Lists a contest's contestants in contest-number order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn contestants(&self, contest_id: ContestId) -> Result<Vec<Contestant>, StoreError>;

    /// Updates a contestant's lifecycle status (disqualify/withdraw/restore).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn set_contestant_status(
        &self,
        contest_id: ContestId,
        id: ContestantId,
        status: ContestantStatus,
    ) -> Result<(), StoreError>;

    /// Persists a new vote package.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn create_package(&self, package: &VotePackage) -> Result<(), StoreError>;

    /// Lists a contest's packages in sort order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn packages(&self, contest_id: ContestId) -> Result<Vec<VotePackage>, StoreError>;

    /// Persists a new (pending) vote order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn create_order(&self, order: &VoteOrder) -> Result<(), StoreError>;

    /// Looks up a vote order by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn vote_order(&self, id: VoteOrderId) -> Result<Option<VoteOrder>, StoreError>;

    /// Settles a pending order after payment verification.
    ///
    /// The transition is conditional on the order still being pending,
    /// which makes replayed payment callbacks harmless. Returns the settled
    /// order, or `None` when the order is missing or already settled.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn settle_order(
        &self,
        id: VoteOrderId,
        outcome: PaymentStatus,
    ) -> Result<Option<VoteOrder>, StoreError>;

    /// Assembles the voter's prior activity in the contest, scoped to the
    /// target contestant, in one consistent read.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn voter_history(
        &self,
        contest_id: ContestId,
        contestant_id: ContestantId,
        voter: &Voter,
    ) -> Result<VoterHistory, StoreError>;

    /// Inserts a free vote.
    ///
    /// Uniqueness rules are enforced here, not by the caller's pre-check:
    /// guest votes are unique per (contest, IP), member free votes unique
    /// per (contestant, member), and when `single_vote_contest` is set the
    /// insert only succeeds if the member has no prior vote in the contest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when a uniqueness rule fires,
    /// [`StoreError::Storage`] on infrastructure faults.
    async fn insert_free_vote(
        &self,
        vote: &Vote,
        single_vote_contest: bool,
    ) -> Result<(), StoreError>;

    /// Inserts a paid vote and spends one vote from the order, atomically.
    ///
    /// The order decrement is guarded (`votes_remaining > 0`) and checked by
    /// affected-row count; when the order is already exhausted the whole
    /// operation fails with [`StoreError::VotesExhausted`] and no vote row
    /// is created. The same uniqueness rules as free votes apply for
    /// `single_vote_contest`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VotesExhausted`] when the order has no votes
    /// left, [`StoreError::Conflict`] when a uniqueness rule fires,
    /// [`StoreError::Storage`] on infrastructure faults.
    async fn insert_paid_vote(
        &self,
        vote: &Vote,
        order_id: VoteOrderId,
        single_vote_contest: bool,
    ) -> Result<(), StoreError>;

    /// Per-contestant vote counts for a contest. Contestants with no votes
    /// are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn vote_tallies(
        &self,
        contest_id: ContestId,
    ) -> Result<HashMap<ContestantId, u64>, StoreError>;

    /// All votes cast in a contest, oldest first, for organizer audit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn votes_for_contest(&self, contest_id: ContestId) -> Result<Vec<Vote>, StoreError>;

    /// Revenue sums over the contest's completed orders.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] on infrastructure faults.
    async fn revenue_totals(&self, contest_id: ContestId) -> Result<RevenueTotals, StoreError>;
}
