//! Builders and canned values for engine tests.

use chrono::{DateTime, Utc};
use votecast_core::types::{
    Contest, ContestId, Contestant, Money, NetworkContext, PaymentStatus, UserId, VoteKind,
    VoteOrder, VoteOrderId, VotePackage, VotePackageId,
};

/// Fluent contest builder; starts from a permissive free contest and
/// tightens from there
pub struct ContestBuilder {
    contest: Contest,
}

impl ContestBuilder {
    /// A free contest, open window, members only, multiple votes allowed
    #[must_use]
    pub fn free() -> Self {
        Self {
            contest: Contest {
                id: ContestId::new(),
                owner_id: UserId::new(),
                name: "Test Contest".to_string(),
                voting_kind: VoteKind::Free,
                voting_starts_at: None,
                voting_ends_at: None,
                allow_guest_voting: false,
                allow_multiple_votes: true,
                max_votes_per_user: None,
                vote_packages_enabled: false,
                default_vote_price: None,
                show_live_results: true,
                show_voter_names: false,
            },
        }
    }

    /// A paid contest selling vote packages
    #[must_use]
    pub fn paid() -> Self {
        let mut builder = Self::free();
        builder.contest.voting_kind = VoteKind::Paid;
        builder.contest.vote_packages_enabled = true;
        builder
    }

    /// Sets the organizer
    #[must_use]
    pub fn owner(mut self, owner_id: UserId) -> Self {
        self.contest.owner_id = owner_id;
        self
    }

    /// Sets the voting window
    #[must_use]
    pub fn window(mut self, starts: DateTime<Utc>, ends: DateTime<Utc>) -> Self {
        self.contest.voting_starts_at = Some(starts);
        self.contest.voting_ends_at = Some(ends);
        self
    }

    /// Opens the contest to guest voters
    #[must_use]
    pub fn allow_guests(mut self) -> Self {
        self.contest.allow_guest_voting = true;
        self
    }

    /// Restricts members to a single contestant
    #[must_use]
    pub fn single_vote(mut self) -> Self {
        self.contest.allow_multiple_votes = false;
        self
    }

    /// Caps a member's free votes
    #[must_use]
    pub fn max_votes_per_user(mut self, limit: u32) -> Self {
        self.contest.max_votes_per_user = Some(limit);
        self
    }

    /// Sells individual votes at `price` instead of packages
    #[must_use]
    pub fn priced_per_vote(mut self, price: Money) -> Self {
        self.contest.vote_packages_enabled = false;
        self.contest.default_vote_price = Some(price);
        self
    }

    /// Hides standings while voting is open
    #[must_use]
    pub fn hide_live_results(mut self) -> Self {
        self.contest.show_live_results = false;
        self
    }

    /// Finishes the build
    #[must_use]
    pub fn build(self) -> Contest {
        self.contest
    }
}

/// An active contestant in `contest` with the given ballot number
#[must_use]
pub fn contestant(contest: &Contest, number: u32, name: &str) -> Contestant {
    Contestant::new(contest.id, number, name)
}

/// A vote package for `contest`
#[must_use]
pub fn package(contest: &Contest, name: &str, vote_count: u32, price: Money) -> VotePackage {
    VotePackage {
        id: VotePackageId::new(),
        contest_id: contest.id,
        name: name.to_string(),
        vote_count,
        price,
        sort_order: 0,
    }
}

/// A fully paid order holding `vote_count` unspent votes
#[must_use]
pub fn completed_order(contest: &Contest, user_id: UserId, vote_count: u32) -> VoteOrder {
    VoteOrder {
        id: VoteOrderId::new(),
        user_id,
        contest_id: contest.id,
        package_id: None,
        total_amount: Money::from_dollars(10),
        platform_fee: Money::from_dollars(1),
        vote_count,
        votes_used: 0,
        votes_remaining: vote_count,
        payment_status: PaymentStatus::Completed,
        expires_at: None,
        created_at: Utc::now(),
    }
}

/// A plausible request network context
#[must_use]
pub fn network() -> NetworkContext {
    NetworkContext::new("203.0.113.10", "votecast-tests/1.0")
}

/// A distinct guest network context per IP
#[must_use]
pub fn network_from(ip: &str) -> NetworkContext {
    NetworkContext::new(ip, "votecast-tests/1.0")
}
