//! Contest results aggregation.
//!
//! Computes per-contestant vote counts, percentages, and rank ordering, plus
//! revenue figures for paid contests. Vote counts are taken over every vote
//! row regardless of contestant status — disqualified contestants keep their
//! historical counts for audit; the public roster view filters them out.

use crate::store::{StoreError, VoteStore};
use crate::types::{ContestId, Contestant, ContestantId, ContestantStatus, Money, VoteKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// One contestant's line in the standings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContestantStanding {
    /// Contestant identifier
    pub contestant_id: ContestantId,
    /// Display name
    pub name: String,
    /// Ballot number
    pub contest_number: u32,
    /// Lifecycle status (inactive contestants keep their counts)
    pub status: ContestantStatus,
    /// Votes received
    pub votes: u64,
    /// Share of the contest's total votes, rounded to 2 decimal places;
    /// 0.00 when the contest has no votes at all
    pub percentage: f64,
    /// Position by descending vote count, starting at 1. Ties get strictly
    /// increasing ranks in roster order (positional, not competition rank).
    pub rank: u32,
}

/// Revenue figures for a paid contest, summed over completed orders
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSummary {
    /// Gross revenue (charges including the platform's cut)
    pub total_revenue: Money,
    /// The platform's cut
    pub platform_fees: Money,
    /// What the organizer keeps
    pub net_revenue: Money,
}

/// Aggregated results for one contest
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContestResults {
    /// The contest
    pub contest_id: ContestId,
    /// Total votes cast across all contestants
    pub total_votes: u64,
    /// Standings, best rank first, every contestant included
    pub standings: Vec<ContestantStanding>,
    /// Revenue figures; present for paid contests only
    pub revenue: Option<RevenueSummary>,
}

impl ContestResults {
    /// The public roster: standings without disqualified or withdrawn
    /// contestants. Ranks are kept as computed over the full field.
    #[must_use]
    pub fn active_roster(&self) -> Vec<&ContestantStanding> {
        self.standings
            .iter()
            .filter(|standing| standing.status == ContestantStatus::Active)
            .collect()
    }
}

/// Failures surfaced by [`ResultsAggregator::aggregate`]
#[derive(Debug, Error)]
pub enum ResultsError {
    /// No contest with the requested id
    #[error("contest not found")]
    ContestNotFound,

    /// Underlying store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Computes standings from a roster and a tally map.
///
/// Pure: sorting is stable on the roster order, so tied contestants rank in
/// roster (contest-number) order. Returns the total vote count alongside the
/// standings.
#[must_use]
pub fn compute_standings(
    contestants: &[Contestant],
    tallies: &HashMap<ContestantId, u64>,
) -> (u64, Vec<ContestantStanding>) {
    let total_votes: u64 = tallies.values().sum();

    let mut standings: Vec<ContestantStanding> = contestants
        .iter()
        .map(|contestant| ContestantStanding {
            contestant_id: contestant.id,
            name: contestant.name.clone(),
            contest_number: contestant.contest_number,
            status: contestant.status,
            votes: tallies.get(&contestant.id).copied().unwrap_or(0),
            percentage: 0.0,
            rank: 0,
        })
        .collect();

    // Stable sort: ties keep roster order, so positional ranks are
    // deterministic.
    standings.sort_by(|a, b| b.votes.cmp(&a.votes));

    for (index, standing) in standings.iter_mut().enumerate() {
        standing.rank = u32::try_from(index + 1).unwrap_or(u32::MAX);
        standing.percentage = percentage_of(standing.votes, total_votes);
    }

    (total_votes, standings)
}

/// Vote share as a percentage rounded to 2 decimal places; zero total votes
/// yields 0.0 rather than a division fault.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage_of(votes: u64, total_votes: u64) -> f64 {
    if total_votes == 0 {
        return 0.0;
    }
    let raw = votes as f64 / total_votes as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Read-side aggregator over a [`VoteStore`]
pub struct ResultsAggregator {
    store: Arc<dyn VoteStore>,
}

impl ResultsAggregator {
    /// Creates an aggregator over the given store
    #[must_use]
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        Self { store }
    }

    /// Aggregates a contest's standings and, for paid contests, revenue.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError::ContestNotFound`] for an unknown contest and
    /// [`ResultsError::Store`] on infrastructure faults.
    #[tracing::instrument(skip(self))]
    pub async fn aggregate(&self, contest_id: ContestId) -> Result<ContestResults, ResultsError> {
        let contest = self
            .store
            .contest(contest_id)
            .await?
            .ok_or(ResultsError::ContestNotFound)?;

        let contestants = self.store.contestants(contest_id).await?;
        let tallies = self.store.vote_tallies(contest_id).await?;
        let (total_votes, standings) = compute_standings(&contestants, &tallies);

        let revenue = match contest.voting_kind {
            VoteKind::Free => None,
            VoteKind::Paid => {
                let totals = self.store.revenue_totals(contest_id).await?;
                Some(RevenueSummary {
                    total_revenue: totals.gross,
                    platform_fees: totals.fees,
                    net_revenue: totals.gross.saturating_sub(totals.fees),
                })
            }
        };

        Ok(ContestResults {
            contest_id,
            total_votes,
            standings,
            revenue,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Contestant;
    use proptest::prelude::*;

    fn roster(counts: &[u64]) -> (Vec<Contestant>, HashMap<ContestantId, u64>) {
        let contest_id = ContestId::new();
        let mut contestants = Vec::new();
        let mut tallies = HashMap::new();
        for (index, &count) in counts.iter().enumerate() {
            let number = u32::try_from(index).unwrap() + 1;
            let contestant = Contestant::new(contest_id, number, format!("Contestant {number}"));
            if count > 0 {
                tallies.insert(contestant.id, count);
            }
            contestants.push(contestant);
        }
        (contestants, tallies)
    }

    #[test]
    fn zero_votes_yields_zero_percentages() {
        let (contestants, tallies) = roster(&[0, 0, 0]);
        let (total, standings) = compute_standings(&contestants, &tallies);

        assert_eq!(total, 0);
        for standing in &standings {
            assert_eq!(standing.votes, 0);
            assert!(standing.percentage.abs() < f64::EPSILON);
            assert!(standing.percentage.is_finite());
        }
    }

    #[test]
    fn percentages_and_ranks_for_a_simple_field() {
        let (contestants, tallies) = roster(&[30, 20, 10]);
        let (total, standings) = compute_standings(&contestants, &tallies);

        assert_eq!(total, 60);
        let percentages: Vec<f64> = standings.iter().map(|s| s.percentage).collect();
        let ranks: Vec<u32> = standings.iter().map(|s| s.rank).collect();
        assert_eq!(percentages, vec![50.00, 33.33, 16.67]);
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(standings[0].contest_number, 1);
        assert_eq!(standings[2].contest_number, 3);
    }

    #[test]
    fn ties_rank_in_roster_order() {
        let (contestants, tallies) = roster(&[10, 25, 10, 5]);
        let (_, standings) = compute_standings(&contestants, &tallies);

        // 25 first, then the two tied tens in roster order, then 5
        let numbers: Vec<u32> = standings.iter().map(|s| s.contest_number).collect();
        let ranks: Vec<u32> = standings.iter().map(|s| s.rank).collect();
        assert_eq!(numbers, vec![2, 1, 3, 4]);
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn inactive_contestants_keep_counts_but_leave_the_roster() {
        let (mut contestants, tallies) = roster(&[40, 15]);
        contestants[0].status = ContestantStatus::Disqualified;
        let (_, standings) = compute_standings(&contestants, &tallies);

        let results = ContestResults {
            contest_id: contestants[0].contest_id,
            total_votes: 55,
            standings,
            revenue: None,
        };

        // Audit view retains the disqualified leader
        assert_eq!(results.standings[0].votes, 40);
        assert_eq!(
            results.standings[0].status,
            ContestantStatus::Disqualified
        );

        // Public roster drops them, ranks untouched
        let roster = results.active_roster();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].votes, 15);
        assert_eq!(roster[0].rank, 2);
    }

    #[test]
    fn votes_for_unlisted_contestants_still_count_toward_total() {
        // A tally entry can outlive roster membership (e.g. a deleted row);
        // the total keeps every vote.
        let (contestants, mut tallies) = roster(&[5]);
        tallies.insert(ContestantId::new(), 3);
        let (total, standings) = compute_standings(&contestants, &tallies);

        assert_eq!(total, 8);
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].percentage, 62.5);
    }

    proptest! {
        #[test]
        fn percentages_are_always_finite_and_bounded(
            counts in proptest::collection::vec(0u64..100_000, 0..12)
        ) {
            let (contestants, tallies) = roster(&counts);
            let (total, standings) = compute_standings(&contestants, &tallies);

            prop_assert_eq!(total, counts.iter().sum::<u64>());
            for standing in &standings {
                prop_assert!(standing.percentage.is_finite());
                prop_assert!(standing.percentage >= 0.0);
                prop_assert!(standing.percentage <= 100.0);
            }
        }

        #[test]
        fn ranks_are_strictly_increasing_and_counts_descend(
            counts in proptest::collection::vec(0u64..10_000, 1..12)
        ) {
            let (contestants, tallies) = roster(&counts);
            let (_, standings) = compute_standings(&contestants, &tallies);

            for (index, standing) in standings.iter().enumerate() {
                prop_assert_eq!(standing.rank as usize, index + 1);
            }
            for pair in standings.windows(2) {
                prop_assert!(pair[0].votes >= pair[1].votes);
            }
        }
    }
}
