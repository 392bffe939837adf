//! Domain types for the Votecast contest engine.
//!
//! This module contains all value objects and entities shared by the
//! eligibility engine, the cast path, and the results aggregator: contests,
//! contestants, votes, vote packages, and vote orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a contest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContestId(Uuid);

impl ContestId {
    /// Creates a new random `ContestId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ContestId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ContestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a contestant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContestantId(Uuid);

impl ContestantId {
    /// Creates a new random `ContestantId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ContestantId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ContestantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContestantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an authenticated user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a vote
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteId(Uuid);

impl VoteId {
    /// Creates a new random `VoteId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `VoteId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for VoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a vote package
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VotePackageId(Uuid);

impl VotePackageId {
    /// Creates a new random `VotePackageId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `VotePackageId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for VotePackageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VotePackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a vote order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteOrderId(Uuid);

impl VoteOrderId {
    /// Creates a new random `VoteOrderId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `VoteOrderId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for VoteOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VoteOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from dollars
    ///
    /// # Panics
    ///
    /// Panics if the conversion would overflow (dollars * 100 > `u64::MAX`).
    /// Use `checked_from_dollars` for non-panicking conversion.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_dollars(dollars: u64) -> Self {
        match dollars.checked_mul(100) {
            Some(cents) => Self(cents),
            None => panic!("Money::from_dollars overflow"),
        }
    }

    /// Creates a `Money` value from dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the whole-dollar part of the amount
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Returns true if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies the amount by a count, saturating on overflow
    #[must_use]
    pub const fn multiply(&self, count: u32) -> Self {
        Self(self.0.saturating_mul(count as u64))
    }

    /// Adds two amounts, saturating on overflow
    #[must_use]
    pub const fn add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts another amount, saturating at zero
    #[must_use]
    pub const fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Computes a percentage of the amount, truncating fractional cents.
    ///
    /// Used for platform-fee computation: `fee = price.percent(pct)`.
    #[must_use]
    pub const fn percent(&self, pct: u8) -> Self {
        Self(self.0.saturating_mul(pct as u64) / 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// How votes are cast in a contest, and what kind an individual vote is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    /// Votes are free; no purchase involved
    Free,
    /// Votes are drawn from purchased vote orders
    Paid,
}

impl VoteKind {
    /// Database/string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
        }
    }

    /// Parse from the database string representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the string doesn't match a known kind.
    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "free" => Ok(Self::Free),
            "paid" => Ok(Self::Paid),
            _ => Err(ParseEnumError::new("VoteKind", s)),
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a contestant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestantStatus {
    /// Eligible to receive votes
    Active,
    /// Removed by the organizer; retains historical votes
    Disqualified,
    /// Withdrew voluntarily; retains historical votes
    Withdrawn,
}

impl ContestantStatus {
    /// Database/string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disqualified => "disqualified",
            Self::Withdrawn => "withdrawn",
        }
    }

    /// Parse from the database string representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the string doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "active" => Ok(Self::Active),
            "disqualified" => Ok(Self::Disqualified),
            "withdrawn" => Ok(Self::Withdrawn),
            _ => Err(ParseEnumError::new("ContestantStatus", s)),
        }
    }
}

/// Payment lifecycle of a vote order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created, awaiting payment verification
    Pending,
    /// Payment verified; votes are spendable
    Completed,
    /// Payment failed; votes never become spendable
    Failed,
}

impl PaymentStatus {
    /// Database/string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse from the database string representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the string doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseEnumError::new("PaymentStatus", s)),
        }
    }
}

/// Error returned when a stored enum string doesn't match any known variant
#[derive(Debug, Clone, Error)]
#[error("invalid {type_name} value: {value}")]
pub struct ParseEnumError {
    type_name: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(type_name: &'static str, value: &str) -> Self {
        Self {
            type_name,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// Contest
// ============================================================================

/// A voting contest and its complete voting configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    /// Contest identifier
    pub id: ContestId,
    /// Organizer who owns the contest (notification recipient)
    pub owner_id: UserId,
    /// Display name
    pub name: String,
    /// Whether this contest takes free or paid votes
    pub voting_kind: VoteKind,
    /// Voting opens at this instant (unset ⇒ open immediately)
    pub voting_starts_at: Option<DateTime<Utc>>,
    /// Voting closes after this instant (unset ⇒ never closes)
    pub voting_ends_at: Option<DateTime<Utc>>,
    /// Whether unauthenticated voters may participate
    pub allow_guest_voting: bool,
    /// Whether a member may vote for more than one contestant
    pub allow_multiple_votes: bool,
    /// Cap on a member's free votes across the contest (unset ⇒ unlimited)
    pub max_votes_per_user: Option<u32>,
    /// Whether paid votes are sold through packages
    pub vote_packages_enabled: bool,
    /// Per-vote price when packages are disabled
    pub default_vote_price: Option<Money>,
    /// Whether standings are publicly visible while voting is open
    pub show_live_results: bool,
    /// Whether member names appear in the public vote feed
    pub show_voter_names: bool,
}

/// Configuration problems detected by [`Contest::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContestConfigError {
    /// Paid contest without packages needs a positive per-vote price
    #[error("paid contests without vote packages require a per-vote price greater than zero")]
    MissingDefaultPrice,
    /// Voting window closes before it opens
    #[error("voting end date precedes the start date")]
    WindowInverted,
}

impl Contest {
    /// Validates the voting configuration.
    ///
    /// A paid contest that does not sell packages must carry a positive
    /// per-vote price, and the voting window must not be inverted.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found.
    pub fn validate(&self) -> Result<(), ContestConfigError> {
        if self.voting_kind == VoteKind::Paid && !self.vote_packages_enabled {
            match self.default_vote_price {
                Some(price) if !price.is_zero() => {}
                _ => return Err(ContestConfigError::MissingDefaultPrice),
            }
        }
        if let (Some(start), Some(end)) = (self.voting_starts_at, self.voting_ends_at) {
            if end < start {
                return Err(ContestConfigError::WindowInverted);
            }
        }
        Ok(())
    }

    /// True when `now` falls before the voting window opens
    #[must_use]
    pub fn voting_not_started(&self, now: DateTime<Utc>) -> bool {
        self.voting_starts_at.is_some_and(|start| now < start)
    }

    /// True when `now` falls after the voting window closed.
    ///
    /// The boundary instant itself is still open.
    #[must_use]
    pub fn voting_ended(&self, now: DateTime<Utc>) -> bool {
        self.voting_ends_at.is_some_and(|end| now > end)
    }
}

// ============================================================================
// Contestant
// ============================================================================

/// A participant in a contest eligible to receive votes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contestant {
    /// Contestant identifier
    pub id: ContestantId,
    /// Contest this contestant belongs to
    pub contest_id: ContestId,
    /// Display name
    pub name: String,
    /// Ballot number, unique within the contest
    pub contest_number: u32,
    /// Lifecycle status; only active contestants may receive votes
    pub status: ContestantStatus,
}

impl Contestant {
    /// Creates a new active contestant
    #[must_use]
    pub fn new(contest_id: ContestId, contest_number: u32, name: impl Into<String>) -> Self {
        Self {
            id: ContestantId::new(),
            contest_id,
            name: name.into(),
            contest_number,
            status: ContestantStatus::Active,
        }
    }

    /// True when the contestant may receive votes
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ContestantStatus::Active
    }
}

// ============================================================================
// Vote
// ============================================================================

/// A single cast vote. Immutable once created; never updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Vote identifier
    pub id: VoteId,
    /// Contest the vote belongs to
    pub contest_id: ContestId,
    /// Contestant the vote was cast for
    pub contestant_id: ContestantId,
    /// Voting member, or `None` for a guest vote
    pub voter_id: Option<UserId>,
    /// Order the vote was drawn from (paid votes only)
    pub order_id: Option<VoteOrderId>,
    /// Free or paid
    pub kind: VoteKind,
    /// Client IP recorded for audit and guest identification
    pub ip_address: String,
    /// Client user agent recorded for audit
    pub user_agent: String,
    /// When the vote was cast
    pub cast_at: DateTime<Utc>,
}

// ============================================================================
// Vote packages & orders
// ============================================================================

/// A purchasable bundle of paid votes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePackage {
    /// Package identifier
    pub id: VotePackageId,
    /// Contest the package belongs to
    pub contest_id: ContestId,
    /// Display name (e.g. "Starter", "Superfan")
    pub name: String,
    /// Number of votes in the bundle; always positive
    pub vote_count: u32,
    /// Bundle price
    pub price: Money,
    /// Display ordering among the contest's packages
    pub sort_order: i32,
}

/// A purchase record tracking how many paid votes were bought, used, and remain.
///
/// `votes_used + votes_remaining == vote_count` holds at all times;
/// `votes_remaining` only ever decrements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOrder {
    /// Order identifier
    pub id: VoteOrderId,
    /// Purchasing member
    pub user_id: UserId,
    /// Contest the votes apply to
    pub contest_id: ContestId,
    /// Package purchased, if any
    pub package_id: Option<VotePackageId>,
    /// Amount charged, platform fee included
    pub total_amount: Money,
    /// Platform's cut of `total_amount`
    pub platform_fee: Money,
    /// Votes purchased
    pub vote_count: u32,
    /// Votes already spent
    pub votes_used: u32,
    /// Votes still spendable
    pub votes_remaining: u32,
    /// Payment lifecycle
    pub payment_status: PaymentStatus,
    /// Votes become unusable after this instant, if set
    pub expires_at: Option<DateTime<Utc>>,
    /// When the order was created
    pub created_at: DateTime<Utc>,
}

impl VoteOrder {
    /// Creates a pending order for a vote package.
    ///
    /// The platform fee is carved out of the package price at the supplied
    /// percentage.
    #[must_use]
    pub fn for_package(
        user_id: UserId,
        package: &VotePackage,
        fee_percent: u8,
        now: DateTime<Utc>,
    ) -> Self {
        Self::pending(
            user_id,
            package.contest_id,
            Some(package.id),
            package.price,
            package.vote_count,
            fee_percent,
            now,
        )
    }

    /// Creates a pending order for `quantity` individually-priced votes
    /// (contests that sell votes without packages).
    #[must_use]
    pub fn for_single_votes(
        user_id: UserId,
        contest_id: ContestId,
        quantity: u32,
        unit_price: Money,
        fee_percent: u8,
        now: DateTime<Utc>,
    ) -> Self {
        Self::pending(
            user_id,
            contest_id,
            None,
            unit_price.multiply(quantity),
            quantity,
            fee_percent,
            now,
        )
    }

    fn pending(
        user_id: UserId,
        contest_id: ContestId,
        package_id: Option<VotePackageId>,
        total_amount: Money,
        vote_count: u32,
        fee_percent: u8,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VoteOrderId::new(),
            user_id,
            contest_id,
            package_id,
            total_amount,
            platform_fee: total_amount.percent(fee_percent),
            vote_count,
            votes_used: 0,
            votes_remaining: vote_count,
            payment_status: PaymentStatus::Pending,
            expires_at: None,
            created_at: now,
        }
    }

    /// True when the order carries an expiry that has passed
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| now > expiry)
    }

    /// True while the used/remaining split still accounts for every
    /// purchased vote
    #[must_use]
    pub const fn balance_consistent(&self) -> bool {
        self.votes_used + self.votes_remaining == self.vote_count
    }

    /// Revenue retained by the organizer after the platform's cut
    #[must_use]
    pub const fn net_amount(&self) -> Money {
        self.total_amount.saturating_sub(self.platform_fee)
    }
}

// ============================================================================
// Voter identity & network context
// ============================================================================

/// The identity a vote is cast under.
///
/// Members are identified by user id; guests only by the request IP. Both
/// are threaded explicitly into every call — there is no ambient session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Voter {
    /// Authenticated member
    Member {
        /// The member's user id
        user_id: UserId,
    },
    /// Unauthenticated guest, identified by request IP
    Guest {
        /// The guest's request IP
        ip_address: String,
    },
}

impl Voter {
    /// Creates a member voter
    #[must_use]
    pub const fn member(user_id: UserId) -> Self {
        Self::Member { user_id }
    }

    /// Creates a guest voter from the request's network context
    #[must_use]
    pub fn guest(network: &NetworkContext) -> Self {
        Self::Guest {
            ip_address: network.ip_address.clone(),
        }
    }

    /// The member's user id, or `None` for guests
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Member { user_id } => Some(*user_id),
            Self::Guest { .. } => None,
        }
    }

    /// True for guest voters
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }
}

/// Request network context recorded on every vote for audit, and used as
/// the guest identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkContext {
    /// Client IP address, `"unknown"` when undeterminable
    pub ip_address: String,
    /// Client user agent, `"unknown"` when absent
    pub user_agent: String,
}

impl NetworkContext {
    /// Fallback value when a header is missing or empty
    pub const UNKNOWN: &'static str = "unknown";

    /// Creates a context from explicit values
    #[must_use]
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Resolves the client address from proxy headers: the first entry of
    /// the forwarded-for list wins, then the real-ip header, then
    /// `"unknown"`.
    #[must_use]
    pub fn from_headers(
        forwarded_for: Option<&str>,
        real_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Self {
        let ip_address = forwarded_for
            .and_then(|list| list.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .or(real_ip)
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .unwrap_or(Self::UNKNOWN)
            .to_string();
        let user_agent = user_agent
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .unwrap_or(Self::UNKNOWN)
            .to_string();
        Self {
            ip_address,
            user_agent,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn money_display_pads_cents() {
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(1250).to_string(), "$12.50");
        assert_eq!(Money::from_dollars(3).to_string(), "$3.00");
    }

    #[test]
    fn money_percent_truncates_fractional_cents() {
        // 10% of $0.99 is 9.9 cents; fractional cents are dropped
        assert_eq!(Money::from_cents(99).percent(10), Money::from_cents(9));
        assert_eq!(Money::from_dollars(20).percent(15), Money::from_dollars(3));
        assert_eq!(Money::from_cents(0).percent(50), Money::ZERO);
    }

    #[test]
    fn paid_contest_without_packages_requires_price() {
        let mut contest = fixtures::paid_contest();
        contest.vote_packages_enabled = false;
        contest.default_vote_price = None;
        assert_eq!(
            contest.validate(),
            Err(ContestConfigError::MissingDefaultPrice)
        );

        contest.default_vote_price = Some(Money::ZERO);
        assert_eq!(
            contest.validate(),
            Err(ContestConfigError::MissingDefaultPrice)
        );

        contest.default_vote_price = Some(Money::from_dollars(1));
        assert!(contest.validate().is_ok());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let mut contest = fixtures::free_contest();
        let now = Utc::now();
        contest.voting_starts_at = Some(now);
        contest.voting_ends_at = Some(now - chrono::Duration::hours(1));
        assert_eq!(contest.validate(), Err(ContestConfigError::WindowInverted));
    }

    #[test]
    fn window_boundaries_are_open() {
        let mut contest = fixtures::free_contest();
        let start = Utc::now();
        let end = start + chrono::Duration::hours(2);
        contest.voting_starts_at = Some(start);
        contest.voting_ends_at = Some(end);

        assert!(contest.voting_not_started(start - chrono::Duration::seconds(1)));
        assert!(!contest.voting_not_started(start));
        assert!(!contest.voting_ended(end));
        assert!(contest.voting_ended(end + chrono::Duration::seconds(1)));
    }

    #[test]
    fn package_order_carves_out_platform_fee() {
        let package = VotePackage {
            id: VotePackageId::new(),
            contest_id: ContestId::new(),
            name: "Superfan".to_string(),
            vote_count: 50,
            price: Money::from_dollars(20),
            sort_order: 1,
        };
        let order = VoteOrder::for_package(UserId::new(), &package, 10, Utc::now());

        assert_eq!(order.total_amount, Money::from_dollars(20));
        assert_eq!(order.platform_fee, Money::from_dollars(2));
        assert_eq!(order.net_amount(), Money::from_dollars(18));
        assert_eq!(order.vote_count, 50);
        assert_eq!(order.votes_remaining, 50);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert!(order.balance_consistent());
    }

    #[test]
    fn single_vote_order_multiplies_unit_price() {
        let order = VoteOrder::for_single_votes(
            UserId::new(),
            ContestId::new(),
            4,
            Money::from_cents(150),
            5,
            Utc::now(),
        );
        assert_eq!(order.total_amount, Money::from_cents(600));
        assert_eq!(order.platform_fee, Money::from_cents(30));
        assert_eq!(order.vote_count, 4);
    }

    #[test]
    fn forwarded_for_first_entry_wins() {
        let ctx = NetworkContext::from_headers(
            Some("203.0.113.7, 10.0.0.1, 10.0.0.2"),
            Some("10.0.0.9"),
            Some("Mozilla/5.0"),
        );
        assert_eq!(ctx.ip_address, "203.0.113.7");
        assert_eq!(ctx.user_agent, "Mozilla/5.0");
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let ctx = NetworkContext::from_headers(None, Some("198.51.100.4"), None);
        assert_eq!(ctx.ip_address, "198.51.100.4");
        assert_eq!(ctx.user_agent, NetworkContext::UNKNOWN);
    }

    #[test]
    fn missing_headers_resolve_to_unknown() {
        let ctx = NetworkContext::from_headers(Some("  "), None, Some(""));
        assert_eq!(ctx.ip_address, NetworkContext::UNKNOWN);
        assert_eq!(ctx.user_agent, NetworkContext::UNKNOWN);
    }

    /// Shared minimal fixtures for in-module tests
    pub mod fixtures {
        use super::*;

        pub fn free_contest() -> Contest {
            Contest {
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
            }
        }

        pub fn paid_contest() -> Contest {
            Contest {
                voting_kind: VoteKind::Paid,
                vote_packages_enabled: true,
                ..free_contest()
            }
        }
    }
}
