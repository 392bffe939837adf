//! In-memory `VoteStore`.
//!
//! Mirrors the Postgres adapter's write semantics exactly: the single-vote
//! conditional insert, the guest and free-vote uniqueness rules, and the
//! guarded order decrement. Every write happens under one lock, so two
//! concurrent casts race the same way they would against the real
//! constraints — one wins, one conflicts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use votecast_core::eligibility::VoterHistory;
use votecast_core::store::{RevenueTotals, StoreError, VoteConflict, VoteStore};
use votecast_core::types::{
    Contest, ContestId, Contestant, ContestantId, ContestantStatus, PaymentStatus, Vote, VoteKind,
    VoteOrder, VoteOrderId, VotePackage, Voter,
};

#[derive(Default)]
struct Inner {
    contests: HashMap<ContestId, Contest>,
    contestants: Vec<Contestant>,
    packages: Vec<VotePackage>,
    orders: HashMap<VoteOrderId, VoteOrder>,
    votes: Vec<Vote>,
}

/// In-memory store for engine tests and local development
#[derive(Default)]
pub struct InMemoryVoteStore {
    inner: Mutex<Inner>,
}

impl InMemoryVoteStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of every vote in the store, for assertions
    #[must_use]
    pub fn all_votes(&self) -> Vec<Vote> {
        self.lock().votes.clone()
    }

    /// Applies the same uniqueness rules the database constraints encode.
    fn check_vote_conflicts(
        inner: &Inner,
        vote: &Vote,
        single_vote_contest: bool,
    ) -> Result<(), StoreError> {
        match vote.voter_id {
            None => {
                let guest_dup = inner.votes.iter().any(|existing| {
                    existing.contest_id == vote.contest_id
                        && existing.voter_id.is_none()
                        && existing.ip_address == vote.ip_address
                });
                if guest_dup {
                    return Err(StoreError::Conflict(VoteConflict::GuestAlreadyVoted));
                }
            }
            Some(voter_id) => {
                // The conditional insert fires before any unique index would.
                if single_vote_contest {
                    let any_prior = inner.votes.iter().any(|existing| {
                        existing.contest_id == vote.contest_id
                            && existing.voter_id == Some(voter_id)
                    });
                    if any_prior {
                        return Err(StoreError::Conflict(VoteConflict::SingleVoteContest));
                    }
                }
                if vote.kind == VoteKind::Free {
                    let free_dup = inner.votes.iter().any(|existing| {
                        existing.contestant_id == vote.contestant_id
                            && existing.voter_id == Some(voter_id)
                            && existing.kind == VoteKind::Free
                    });
                    if free_dup {
                        return Err(StoreError::Conflict(VoteConflict::DuplicateFreeVote));
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl VoteStore for InMemoryVoteStore {
    async fn create_contest(&self, contest: &Contest) -> Result<(), StoreError> {
        self.lock().contests.insert(contest.id, contest.clone());
        Ok(())
    }

    async fn contest(&self, id: ContestId) -> Result<Option<Contest>, StoreError> {
        Ok(self.lock().contests.get(&id).cloned())
    }

    async fn create_contestant(&self, contestant: &Contestant) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let number_taken = inner.contestants.iter().any(|existing| {
            existing.contest_id == contestant.contest_id
                && existing.contest_number == contestant.contest_number
        });
        if number_taken {
            return Err(StoreError::DuplicateContestNumber);
        }
        inner.contestants.push(contestant.clone());
        Ok(())
    }

    async fn contestant(
        &self,
        contest_id: ContestId,
        id: ContestantId,
    ) -> Result<Option<Contestant>, StoreError> {
        Ok(self
            .lock()
            .contestants
            .iter()
            .find(|contestant| contestant.contest_id == contest_id && contestant.id == id)
            .cloned())
    }

    async fn contestants(&self, contest_id: ContestId) -> Result<Vec<Contestant>, StoreError> {
        let mut roster: Vec<Contestant> = self
            .lock()
            .contestants
            .iter()
            .filter(|contestant| contestant.contest_id == contest_id)
            .cloned()
            .collect();
        roster.sort_by_key(|contestant| contestant.contest_number);
        Ok(roster)
    }

    async fn set_contestant_status(
        &self,
        contest_id: ContestId,
        id: ContestantId,
        status: ContestantStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(contestant) = inner
            .contestants
            .iter_mut()
            .find(|contestant| contestant.contest_id == contest_id && contestant.id == id)
        {
            contestant.status = status;
        }
        Ok(())
    }

    async fn create_package(&self, package: &VotePackage) -> Result<(), StoreError> {
        self.lock().packages.push(package.clone());
        Ok(())
    }

    async fn packages(&self, contest_id: ContestId) -> Result<Vec<VotePackage>, StoreError> {
        let mut packages: Vec<VotePackage> = self
            .lock()
            .packages
            .iter()
            .filter(|package| package.contest_id == contest_id)
            .cloned()
            .collect();
        packages.sort_by_key(|package| package.sort_order);
        Ok(packages)
    }

    async fn create_order(&self, order: &VoteOrder) -> Result<(), StoreError> {
        self.lock().orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn vote_order(&self, id: VoteOrderId) -> Result<Option<VoteOrder>, StoreError> {
        Ok(self.lock().orders.get(&id).cloned())
    }

    async fn settle_order(
        &self,
        id: VoteOrderId,
        outcome: PaymentStatus,
    ) -> Result<Option<VoteOrder>, StoreError> {
        let mut inner = self.lock();
        match inner.orders.get_mut(&id) {
            Some(order) if order.payment_status == PaymentStatus::Pending => {
                order.payment_status = outcome;
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn voter_history(
        &self,
        contest_id: ContestId,
        contestant_id: ContestantId,
        voter: &Voter,
    ) -> Result<VoterHistory, StoreError> {
        let inner = self.lock();
        let mut history = VoterHistory::none();
        match voter {
            Voter::Guest { ip_address } => {
                history.guest_voted_in_contest = inner.votes.iter().any(|vote| {
                    vote.contest_id == contest_id
                        && vote.voter_id.is_none()
                        && vote.ip_address == *ip_address
                });
            }
            Voter::Member { user_id } => {
                for vote in inner
                    .votes
                    .iter()
                    .filter(|vote| {
                        vote.contest_id == contest_id && vote.voter_id == Some(*user_id)
                    })
                {
                    history.total_votes_in_contest += 1;
                    if vote.kind == VoteKind::Free {
                        history.free_votes_in_contest += 1;
                        if vote.contestant_id == contestant_id {
                            history.voted_free_for_contestant = true;
                        }
                    }
                }
            }
        }
        Ok(history)
    }

    async fn insert_free_vote(
        &self,
        vote: &Vote,
        single_vote_contest: bool,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_vote_conflicts(&inner, vote, single_vote_contest)?;
        inner.votes.push(vote.clone());
        Ok(())
    }

    async fn insert_paid_vote(
        &self,
        vote: &Vote,
        order_id: VoteOrderId,
        single_vote_contest: bool,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_vote_conflicts(&inner, vote, single_vote_contest)?;

        // Guarded decrement first, exactly like the database transaction;
        // an exhausted order aborts before any vote row exists.
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::Storage(format!("order {order_id} not found")))?;
        if order.votes_remaining == 0 {
            return Err(StoreError::VotesExhausted);
        }
        order.votes_used += 1;
        order.votes_remaining -= 1;

        inner.votes.push(vote.clone());
        Ok(())
    }

    async fn vote_tallies(
        &self,
        contest_id: ContestId,
    ) -> Result<HashMap<ContestantId, u64>, StoreError> {
        let inner = self.lock();
        let mut tallies = HashMap::new();
        for vote in inner.votes.iter().filter(|vote| vote.contest_id == contest_id) {
            *tallies.entry(vote.contestant_id).or_insert(0) += 1;
        }
        Ok(tallies)
    }

    async fn votes_for_contest(&self, contest_id: ContestId) -> Result<Vec<Vote>, StoreError> {
        Ok(self
            .lock()
            .votes
            .iter()
            .filter(|vote| vote.contest_id == contest_id)
            .cloned()
            .collect())
    }

    async fn revenue_totals(&self, contest_id: ContestId) -> Result<RevenueTotals, StoreError> {
        let inner = self.lock();
        let mut totals = RevenueTotals::default();
        for order in inner.orders.values().filter(|order| {
            order.contest_id == contest_id && order.payment_status == PaymentStatus::Completed
        }) {
            totals.gross = totals.gross.add(order.total_amount);
            totals.fees = totals.fees.add(order.platform_fee);
        }
        Ok(totals)
    }
}
