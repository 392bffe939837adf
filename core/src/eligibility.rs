//! Vote eligibility evaluation.
//!
//! [`evaluate`] is a pure function over snapshots: given a contest
//! configuration, the target contestant, the voter's identity and prior
//! voting history, and the current instant, it decides whether a vote may
//! proceed and classifies the reason when it may not.
//!
//! Evaluation performs no I/O and never throws for business-rule outcomes —
//! callers branch on the returned [`Decision`]. Rules are checked in a fixed
//! order and the first failing rule wins. Re-evaluating unchanged snapshots
//! always yields the same decision.
//!
//! The pre-check is advisory under concurrency: two requests can both pass
//! evaluation before either commits. The commit path closes that gap with
//! store-level constraints (see the store module); this module is only the
//! fast, explainable first line.

use crate::types::{Contest, Contestant, VoteKind, VoteOrder, Voter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a vote was not allowed.
///
/// Every variant maps to a distinct user-facing message — rejections are
/// expected outcomes, not faults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// The contestant is disqualified or withdrawn
    ContestantInactive,
    /// The voting window has not opened yet
    VotingNotStarted,
    /// The voting window has closed
    VotingEnded,
    /// The request's vote kind doesn't match the contest's voting kind
    WrongVotingType,
    /// The contest does not accept guest votes
    GuestVotingDisabled,
    /// This guest (by IP) already voted in the contest
    AlreadyVoted,
    /// The member already cast a free vote for this contestant
    AlreadyVotedContestant,
    /// The contest allows voting for a single contestant only
    OneContestantOnly,
    /// The member reached the contest's free-vote cap
    VoteLimitReached,
    /// The supplied order belongs to a different member
    OrderNotOwned,
    /// The order's payment has not completed
    PaymentIncomplete,
    /// The order has no votes left to spend
    NoVotesRemaining,
    /// The order's votes expired
    OrderExpired,
}

impl RejectionReason {
    /// Stable machine-readable code for API payloads and logs
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ContestantInactive => "CONTESTANT_INACTIVE",
            Self::VotingNotStarted => "VOTING_NOT_STARTED",
            Self::VotingEnded => "VOTING_ENDED",
            Self::WrongVotingType => "WRONG_VOTING_TYPE",
            Self::GuestVotingDisabled => "GUEST_VOTING_DISABLED",
            Self::AlreadyVoted => "ALREADY_VOTED",
            Self::AlreadyVotedContestant => "ALREADY_VOTED_CONTESTANT",
            Self::OneContestantOnly => "ONE_CONTESTANT_ONLY",
            Self::VoteLimitReached => "VOTE_LIMIT_REACHED",
            Self::OrderNotOwned => "ORDER_NOT_OWNED",
            Self::PaymentIncomplete => "PAYMENT_INCOMPLETE",
            Self::NoVotesRemaining => "NO_VOTES_REMAINING",
            Self::OrderExpired => "ORDER_EXPIRED",
        }
    }

    /// Voter-facing explanation; each reason reads differently so the voter
    /// understands what actually happened
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::ContestantInactive => "This contestant is no longer accepting votes",
            Self::VotingNotStarted => "Voting has not started yet",
            Self::VotingEnded => "Voting has ended",
            Self::WrongVotingType => "This contest does not accept that kind of vote",
            Self::GuestVotingDisabled => "This contest requires an account to vote",
            Self::AlreadyVoted => "You have already voted in this contest",
            Self::AlreadyVotedContestant => "You have already voted for this contestant",
            Self::OneContestantOnly => "This contest allows voting for one contestant only",
            Self::VoteLimitReached => "You have reached the vote limit for this contest",
            Self::OrderNotOwned => "That vote purchase belongs to a different account",
            Self::PaymentIncomplete => "Payment for your votes has not completed yet",
            Self::NoVotesRemaining => "Your vote purchase has no votes remaining",
            Self::OrderExpired => "Your purchased votes have expired",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The outcome of evaluating a vote attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// The vote may proceed to commit
    Allowed,
    /// The vote may not proceed, and why
    Rejected(RejectionReason),
}

impl Decision {
    /// True when the vote may proceed
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// The rejection reason, if any
    #[must_use]
    pub const fn rejection(&self) -> Option<RejectionReason> {
        match self {
            Self::Allowed => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }
}

/// What kind of vote is being attempted, with the backing order for paid
/// votes.
///
/// Carrying the order in the variant makes "paid vote without an order"
/// unrepresentable.
#[derive(Clone, Copy, Debug)]
pub enum VoteAttempt<'a> {
    /// A free vote
    Free,
    /// A paid vote drawn from the referenced order
    Paid(&'a VoteOrder),
}

impl VoteAttempt<'_> {
    /// The vote kind this attempt would produce
    #[must_use]
    pub const fn kind(&self) -> VoteKind {
        match self {
            Self::Free => VoteKind::Free,
            Self::Paid(_) => VoteKind::Paid,
        }
    }
}

/// Snapshot of a voter's prior activity in one contest, scoped to the
/// contestant under evaluation.
///
/// The store assembles this in a single query; the evaluator never touches
/// storage itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoterHistory {
    /// Member: total votes of any kind already cast in the contest
    pub total_votes_in_contest: u32,
    /// Member: free votes already cast in the contest
    pub free_votes_in_contest: u32,
    /// Member: whether a free vote for the target contestant exists
    pub voted_free_for_contestant: bool,
    /// Guest: whether any vote from this IP (with no member attached)
    /// exists in the contest
    pub guest_voted_in_contest: bool,
}

impl VoterHistory {
    /// History for a voter with no prior activity
    #[must_use]
    pub const fn none() -> Self {
        Self {
            total_votes_in_contest: 0,
            free_votes_in_contest: 0,
            voted_free_for_contestant: false,
            guest_voted_in_contest: false,
        }
    }
}

/// Decides whether a vote may be cast.
///
/// Rules are evaluated in a fixed order; the first failing rule determines
/// the rejection reason. `contestant` must belong to `contest` — the
/// orchestrator resolves contestants within their contest before calling.
#[must_use]
pub fn evaluate(
    contest: &Contest,
    contestant: &Contestant,
    voter: &Voter,
    attempt: &VoteAttempt<'_>,
    history: &VoterHistory,
    now: DateTime<Utc>,
) -> Decision {
    debug_assert_eq!(contestant.contest_id, contest.id);

    if !contestant.is_active() {
        return Decision::Rejected(RejectionReason::ContestantInactive);
    }
    if contest.voting_not_started(now) {
        return Decision::Rejected(RejectionReason::VotingNotStarted);
    }
    if contest.voting_ended(now) {
        return Decision::Rejected(RejectionReason::VotingEnded);
    }
    if attempt.kind() != contest.voting_kind {
        return Decision::Rejected(RejectionReason::WrongVotingType);
    }

    match voter {
        Voter::Guest { .. } => evaluate_guest(contest, attempt, history),
        Voter::Member { user_id } => match attempt {
            VoteAttempt::Free => evaluate_member_free(contest, history),
            VoteAttempt::Paid(order) => {
                evaluate_member_paid(contest, *user_id, order, history, now)
            }
        },
    }
}

/// Guests get at most one vote in the whole contest, tracked by IP, no
/// matter what `allow_multiple_votes` says — an IP is a much weaker
/// identity than an account.
fn evaluate_guest(
    contest: &Contest,
    attempt: &VoteAttempt<'_>,
    history: &VoterHistory,
) -> Decision {
    if !contest.allow_guest_voting {
        return Decision::Rejected(RejectionReason::GuestVotingDisabled);
    }
    if history.guest_voted_in_contest {
        return Decision::Rejected(RejectionReason::AlreadyVoted);
    }
    match attempt {
        VoteAttempt::Free => Decision::Allowed,
        // Orders are purchased by members; a guest can never own one.
        VoteAttempt::Paid(_) => Decision::Rejected(RejectionReason::OrderNotOwned),
    }
}

fn evaluate_member_free(contest: &Contest, history: &VoterHistory) -> Decision {
    if history.voted_free_for_contestant {
        return Decision::Rejected(RejectionReason::AlreadyVotedContestant);
    }
    if !contest.allow_multiple_votes && history.total_votes_in_contest > 0 {
        return Decision::Rejected(RejectionReason::OneContestantOnly);
    }
    if let Some(limit) = contest.max_votes_per_user {
        if history.free_votes_in_contest >= limit {
            return Decision::Rejected(RejectionReason::VoteLimitReached);
        }
    }
    Decision::Allowed
}

fn evaluate_member_paid(
    contest: &Contest,
    user_id: crate::types::UserId,
    order: &VoteOrder,
    history: &VoterHistory,
    now: DateTime<Utc>,
) -> Decision {
    if order.user_id != user_id {
        return Decision::Rejected(RejectionReason::OrderNotOwned);
    }
    if order.payment_status != crate::types::PaymentStatus::Completed {
        return Decision::Rejected(RejectionReason::PaymentIncomplete);
    }
    if order.votes_remaining == 0 {
        return Decision::Rejected(RejectionReason::NoVotesRemaining);
    }
    if order.is_expired(now) {
        return Decision::Rejected(RejectionReason::OrderExpired);
    }
    // Contest-wide, not order-wide: a member of a single-vote contest who
    // has any prior vote is done, votes remaining or not.
    if !contest.allow_multiple_votes && history.total_votes_in_contest > 0 {
        return Decision::Rejected(RejectionReason::OneContestantOnly);
    }
    Decision::Allowed
}
