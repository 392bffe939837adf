//! Vote casting.
//!
//! [`VoteCaster`] is the imperative shell around the pure eligibility
//! evaluation: it loads fresh snapshots, evaluates, commits through the
//! store, and dispatches the organizer notification.
//!
//! The evaluate step is advisory — two concurrent requests can both pass it.
//! The store write is where correctness lives: uniqueness constraints and
//! the guarded order decrement reject the loser atomically, and the caster
//! maps those conflicts back to the same rejection reasons the evaluator
//! would have produced. Notification dispatch happens after the commit and
//! its failure is logged, never propagated.

use crate::eligibility::{self, RejectionReason, VoteAttempt};
use crate::environment::Clock;
use crate::notify::{Notification, NotificationDispatcher};
use crate::store::{StoreError, VoteStore};
use crate::types::{
    Contest, ContestId, Contestant, ContestantId, NetworkContext, UserId, Vote, VoteId, VoteKind,
    VoteOrderId, Voter,
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Which entity a lookup failed to find
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Missing {
    /// No contest with the requested id
    Contest,
    /// No contestant with the requested id in the contest
    Contestant,
    /// No vote order with the requested id for the contest
    VoteOrder,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contest => f.write_str("contest"),
            Self::Contestant => f.write_str("contestant"),
            Self::VoteOrder => f.write_str("vote order"),
        }
    }
}

/// Why a cast did not produce a vote.
///
/// The three cases are deliberately distinct: a rejection is an expected
/// business outcome, a missing entity is a bad reference, and a store
/// failure is infrastructure — callers must never present a store failure
/// as "vote rejected".
#[derive(Debug, Error)]
pub enum CastError {
    /// The vote was evaluated and turned down
    #[error("vote rejected: {0}")]
    Rejected(RejectionReason),

    /// A referenced entity does not exist
    #[error("{0} not found")]
    NotFound(Missing),

    /// Infrastructure fault; retry or surface as a system error
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CastError {
    /// Store-level conflicts are authoritative rejections (the constraint
    /// caught what the pre-check could not); everything else stays an
    /// infrastructure fault.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(conflict) => Self::Rejected(conflict.as_rejection()),
            StoreError::VotesExhausted => Self::Rejected(RejectionReason::NoVotesRemaining),
            other => Self::Store(other),
        }
    }
}

/// Orchestrates eligibility evaluation and the transactional vote commit
pub struct VoteCaster {
    store: Arc<dyn VoteStore>,
    notifications: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl VoteCaster {
    /// Creates a caster over the given collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn VoteStore>,
        notifications: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifications,
            clock,
        }
    }

    /// Casts a free vote for `contestant_id` as `voter`.
    ///
    /// # Errors
    ///
    /// [`CastError::Rejected`] when a voting rule turns the vote down,
    /// [`CastError::NotFound`] for bad references, [`CastError::Store`] on
    /// infrastructure faults.
    #[tracing::instrument(skip(self, voter, network), fields(guest = voter.is_guest()))]
    pub async fn cast_free(
        &self,
        contest_id: ContestId,
        contestant_id: ContestantId,
        voter: Voter,
        network: &NetworkContext,
    ) -> Result<Vote, CastError> {
        let (contest, contestant) = self.load_target(contest_id, contestant_id).await?;
        let history = self
            .store
            .voter_history(contest_id, contestant_id, &voter)
            .await?;

        let now = self.clock.now();
        let decision = eligibility::evaluate(
            &contest,
            &contestant,
            &voter,
            &VoteAttempt::Free,
            &history,
            now,
        );
        if let Some(reason) = decision.rejection() {
            return Err(CastError::Rejected(reason));
        }

        let vote = Vote {
            id: VoteId::new(),
            contest_id,
            contestant_id,
            voter_id: voter.user_id(),
            order_id: None,
            kind: VoteKind::Free,
            ip_address: network.ip_address.clone(),
            user_agent: network.user_agent.clone(),
            cast_at: now,
        };
        self.store
            .insert_free_vote(&vote, !contest.allow_multiple_votes)
            .await?;

        tracing::info!(vote_id = %vote.id, contest_id = %contest_id, "free vote recorded");
        self.notify_vote(&contest, &contestant, &vote).await;
        Ok(vote)
    }

    /// Casts a paid vote for `contestant_id`, spending one vote from
    /// `order_id`.
    ///
    /// Requires an authenticated member — guests cannot own orders.
    ///
    /// # Errors
    ///
    /// [`CastError::Rejected`] when a voting rule turns the vote down
    /// (including concurrent exhaustion of the order's last vote),
    /// [`CastError::NotFound`] for bad references, [`CastError::Store`] on
    /// infrastructure faults.
    #[tracing::instrument(skip(self, network))]
    pub async fn cast_paid(
        &self,
        contest_id: ContestId,
        contestant_id: ContestantId,
        user_id: UserId,
        order_id: VoteOrderId,
        network: &NetworkContext,
    ) -> Result<Vote, CastError> {
        let (contest, contestant) = self.load_target(contest_id, contestant_id).await?;
        let order = self
            .store
            .vote_order(order_id)
            .await?
            .filter(|order| order.contest_id == contest_id)
            .ok_or(CastError::NotFound(Missing::VoteOrder))?;

        let voter = Voter::member(user_id);
        let history = self
            .store
            .voter_history(contest_id, contestant_id, &voter)
            .await?;

        let now = self.clock.now();
        let decision = eligibility::evaluate(
            &contest,
            &contestant,
            &voter,
            &VoteAttempt::Paid(&order),
            &history,
            now,
        );
        if let Some(reason) = decision.rejection() {
            return Err(CastError::Rejected(reason));
        }

        let vote = Vote {
            id: VoteId::new(),
            contest_id,
            contestant_id,
            voter_id: Some(user_id),
            order_id: Some(order_id),
            kind: VoteKind::Paid,
            ip_address: network.ip_address.clone(),
            user_agent: network.user_agent.clone(),
            cast_at: now,
        };
        self.store
            .insert_paid_vote(&vote, order_id, !contest.allow_multiple_votes)
            .await?;

        tracing::info!(
            vote_id = %vote.id,
            order_id = %order_id,
            contest_id = %contest_id,
            "paid vote recorded"
        );
        self.notify_vote(&contest, &contestant, &vote).await;
        Ok(vote)
    }

    async fn load_target(
        &self,
        contest_id: ContestId,
        contestant_id: ContestantId,
    ) -> Result<(Contest, Contestant), CastError> {
        let contest = self
            .store
            .contest(contest_id)
            .await?
            .ok_or(CastError::NotFound(Missing::Contest))?;
        let contestant = self
            .store
            .contestant(contest_id, contestant_id)
            .await?
            .ok_or(CastError::NotFound(Missing::Contestant))?;
        Ok((contest, contestant))
    }

    /// Best-effort: the vote is already committed, so a delivery failure is
    /// only worth a warning.
    async fn notify_vote(&self, contest: &Contest, contestant: &Contestant, vote: &Vote) {
        let notification = Notification::vote_received(contest, contestant, vote);
        if let Err(err) = self.notifications.dispatch(notification).await {
            tracing::warn!(
                vote_id = %vote.id,
                error = %err,
                "organizer notification failed; vote stands"
            );
        }
    }
}
