//! The application-facing voting facade.
//!
//! [`VotingService`] wires the engine to its collaborators and exposes the
//! operations the surrounding application calls: organizer setup, vote
//! purchases and payment settlement, vote casting for members and guests,
//! and results in both organizer (audit) and public form.

use crate::fees::PlatformFeePolicy;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use votecast_core::casting::{CastError, VoteCaster};
use votecast_core::environment::Clock;
use votecast_core::notify::{Notification, NotificationDispatcher, NotificationKind};
use votecast_core::results::{ContestResults, ContestantStanding, ResultsAggregator, ResultsError};
use votecast_core::store::{StoreError, VoteStore};
use votecast_core::types::{
    Contest, ContestConfigError, ContestId, Contestant, ContestantId, ContestantStatus,
    NetworkContext, PaymentStatus, UserId, Vote, VoteKind, VoteOrder, VoteOrderId, VotePackage,
    VotePackageId, Voter,
};

/// Failures from organizer setup operations
#[derive(Debug, Error)]
pub enum SetupError {
    /// The contest configuration is invalid
    #[error(transparent)]
    InvalidConfig(#[from] ContestConfigError),

    /// A package must contain at least one vote
    #[error("vote packages must contain at least one vote")]
    EmptyPackage,

    /// Underlying store failure (including duplicate contest numbers)
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures from the vote purchase flow
#[derive(Debug, Error)]
pub enum OrderError {
    /// No contest with the requested id
    #[error("contest not found")]
    ContestNotFound,

    /// No package with the requested id in the contest
    #[error("vote package not found")]
    PackageNotFound,

    /// Free contests have nothing to sell
    #[error("this contest does not sell votes")]
    VotesNotForSale,

    /// The contest sells packages, not individual votes
    #[error("this contest sells votes in packages")]
    PackagesOnly,

    /// The contest sells individual votes, not packages
    #[error("this contest does not sell vote packages")]
    PackagesDisabled,

    /// An order must contain at least one vote
    #[error("vote quantity must be positive")]
    ZeroQuantity,

    /// Underlying store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Public standings, gated by the contest's visibility settings
#[derive(Clone, Debug)]
pub struct PublicResults {
    /// The contest
    pub contest_id: ContestId,
    /// Total votes cast so far
    pub total_votes: u64,
    /// Active-roster standings; `None` while the organizer hides live
    /// results and voting is still open
    pub standings: Option<Vec<ContestantStanding>>,
}

/// Application facade over the voting engine and its collaborators
pub struct VotingService {
    store: Arc<dyn VoteStore>,
    notifications: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    fees: Arc<dyn PlatformFeePolicy>,
    caster: VoteCaster,
    results: ResultsAggregator,
}

impl VotingService {
    /// Wires a service over the given collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn VoteStore>,
        notifications: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        fees: Arc<dyn PlatformFeePolicy>,
    ) -> Self {
        let caster = VoteCaster::new(store.clone(), notifications.clone(), clock.clone());
        let results = ResultsAggregator::new(store.clone());
        Self {
            store,
            notifications,
            clock,
            fees,
            caster,
            results,
        }
    }

    // ========================================================================
    // Organizer setup
    // ========================================================================

    /// Creates a contest after validating its voting configuration.
    ///
    /// # Errors
    ///
    /// [`SetupError::InvalidConfig`] for bad configurations,
    /// [`SetupError::Store`] on store failures.
    pub async fn create_contest(&self, contest: &Contest) -> Result<(), SetupError> {
        contest.validate()?;
        self.store.create_contest(contest).await?;
        tracing::info!(contest_id = %contest.id, "contest created");
        Ok(())
    }

    /// Adds a contestant; the contest number must be free.
    ///
    /// # Errors
    ///
    /// [`SetupError::Store`] on store failures, including
    /// [`StoreError::DuplicateContestNumber`].
    pub async fn add_contestant(&self, contestant: &Contestant) -> Result<(), SetupError> {
        self.store.create_contestant(contestant).await?;
        Ok(())
    }

    /// Changes a contestant's lifecycle status (disqualify, withdraw,
    /// reinstate).
    ///
    /// # Errors
    ///
    /// [`SetupError::Store`] on store failures.
    pub async fn set_contestant_status(
        &self,
        contest_id: ContestId,
        contestant_id: ContestantId,
        status: ContestantStatus,
    ) -> Result<(), SetupError> {
        self.store
            .set_contestant_status(contest_id, contestant_id, status)
            .await?;
        Ok(())
    }

    /// Creates a vote package.
    ///
    /// # Errors
    ///
    /// [`SetupError::EmptyPackage`] for zero-vote packages,
    /// [`SetupError::Store`] on store failures.
    pub async fn create_package(&self, package: &VotePackage) -> Result<(), SetupError> {
        if package.vote_count == 0 {
            return Err(SetupError::EmptyPackage);
        }
        self.store.create_package(package).await?;
        Ok(())
    }

    /// Lists a contest's packages in display order.
    ///
    /// # Errors
    ///
    /// [`SetupError::Store`] on store failures.
    pub async fn packages(&self, contest_id: ContestId) -> Result<Vec<VotePackage>, SetupError> {
        Ok(self.store.packages(contest_id).await?)
    }

    // ========================================================================
    // Purchases & settlement
    // ========================================================================

    /// Creates a pending order for one of the contest's vote packages.
    ///
    /// # Errors
    ///
    /// [`OrderError::ContestNotFound`] / [`OrderError::PackageNotFound`]
    /// for bad references, [`OrderError::VotesNotForSale`] for free
    /// contests, [`OrderError::PackagesDisabled`] when the contest prices
    /// votes individually, [`OrderError::Store`] on store failures.
    #[tracing::instrument(skip(self))]
    pub async fn purchase_package(
        &self,
        user_id: UserId,
        contest_id: ContestId,
        package_id: VotePackageId,
    ) -> Result<VoteOrder, OrderError> {
        let contest = self.paid_contest(contest_id).await?;
        if !contest.vote_packages_enabled {
            return Err(OrderError::PackagesDisabled);
        }
        let package = self
            .store
            .packages(contest_id)
            .await?
            .into_iter()
            .find(|package| package.id == package_id)
            .ok_or(OrderError::PackageNotFound)?;

        let order = VoteOrder::for_package(
            user_id,
            &package,
            self.fees.fee_percent(),
            self.clock.now(),
        );
        self.store.create_order(&order).await?;
        tracing::info!(order_id = %order.id, package = %package.name, "vote order created");
        Ok(order)
    }

    /// Creates a pending order for `quantity` individually-priced votes
    /// (contests that sell votes without packages).
    ///
    /// # Errors
    ///
    /// [`OrderError::ZeroQuantity`] for empty orders,
    /// [`OrderError::PackagesOnly`] when the contest sells packages,
    /// [`OrderError::VotesNotForSale`] for free contests,
    /// [`OrderError::Store`] on store failures.
    #[tracing::instrument(skip(self))]
    pub async fn purchase_votes(
        &self,
        user_id: UserId,
        contest_id: ContestId,
        quantity: u32,
    ) -> Result<VoteOrder, OrderError> {
        if quantity == 0 {
            return Err(OrderError::ZeroQuantity);
        }
        let contest = self.paid_contest(contest_id).await?;
        let unit_price = match (contest.vote_packages_enabled, contest.default_vote_price) {
            (true, _) => return Err(OrderError::PackagesOnly),
            (false, Some(price)) => price,
            // validate() keeps this unrepresentable for stored contests
            (false, None) => return Err(OrderError::VotesNotForSale),
        };

        let order = VoteOrder::for_single_votes(
            user_id,
            contest_id,
            quantity,
            unit_price,
            self.fees.fee_percent(),
            self.clock.now(),
        );
        self.store.create_order(&order).await?;
        tracing::info!(order_id = %order.id, quantity, "vote order created");
        Ok(order)
    }

    /// Applies a payment-verification outcome to a pending order.
    ///
    /// Idempotent: replayed callbacks and already-settled orders return
    /// `None`. A completed settlement notifies the organizer (best-effort).
    ///
    /// # Errors
    ///
    /// [`OrderError::Store`] on store failures.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        order_id: VoteOrderId,
        outcome: PaymentStatus,
    ) -> Result<Option<VoteOrder>, OrderError> {
        let settled = self.store.settle_order(order_id, outcome).await?;

        if let Some(order) = &settled {
            if order.payment_status == PaymentStatus::Completed {
                self.notify_purchase(order).await;
            }
        }
        Ok(settled)
    }

    // ========================================================================
    // Casting
    // ========================================================================

    /// Casts a free vote. `session` carries the authenticated member, if
    /// any; without one the vote is cast as a guest identified by the
    /// request IP.
    ///
    /// # Errors
    ///
    /// See [`VoteCaster::cast_free`].
    pub async fn cast_free_vote(
        &self,
        contest_id: ContestId,
        contestant_id: ContestantId,
        session: Option<UserId>,
        network: &NetworkContext,
    ) -> Result<Vote, CastError> {
        let voter = session.map_or_else(|| Voter::guest(network), Voter::member);
        self.caster
            .cast_free(contest_id, contestant_id, voter, network)
            .await
    }

    /// Casts a paid vote drawn from the member's order.
    ///
    /// # Errors
    ///
    /// See [`VoteCaster::cast_paid`].
    pub async fn cast_paid_vote(
        &self,
        contest_id: ContestId,
        contestant_id: ContestantId,
        user_id: UserId,
        order_id: VoteOrderId,
        network: &NetworkContext,
    ) -> Result<Vote, CastError> {
        self.caster
            .cast_paid(contest_id, contestant_id, user_id, order_id, network)
            .await
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Full organizer view: every contestant, historical counts, revenue.
    ///
    /// # Errors
    ///
    /// See [`ResultsAggregator::aggregate`].
    pub async fn results(&self, contest_id: ContestId) -> Result<ContestResults, ResultsError> {
        self.results.aggregate(contest_id).await
    }

    /// Public view: the active roster only, and standings withheld while
    /// the organizer hides live results and voting is still open.
    ///
    /// # Errors
    ///
    /// See [`ResultsAggregator::aggregate`].
    pub async fn public_results(
        &self,
        contest_id: ContestId,
    ) -> Result<PublicResults, ResultsError> {
        let contest = self
            .store
            .contest(contest_id)
            .await
            .map_err(ResultsError::Store)?
            .ok_or(ResultsError::ContestNotFound)?;
        let full = self.results.aggregate(contest_id).await?;

        let visible = contest.show_live_results || contest.voting_ended(self.clock.now());
        let standings = visible.then(|| {
            full.active_roster()
                .into_iter()
                .cloned()
                .collect::<Vec<_>>()
        });

        Ok(PublicResults {
            contest_id,
            total_votes: full.total_votes,
            standings,
        })
    }

    /// Append-only vote listing for organizer audit.
    ///
    /// # Errors
    ///
    /// [`SetupError::Store`] on store failures.
    pub async fn contest_votes(&self, contest_id: ContestId) -> Result<Vec<Vote>, SetupError> {
        Ok(self.store.votes_for_contest(contest_id).await?)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn paid_contest(&self, contest_id: ContestId) -> Result<Contest, OrderError> {
        let contest = self
            .store
            .contest(contest_id)
            .await?
            .ok_or(OrderError::ContestNotFound)?;
        if contest.voting_kind != VoteKind::Paid {
            return Err(OrderError::VotesNotForSale);
        }
        Ok(contest)
    }

    /// Purchase notifications are best-effort, like vote notifications: the
    /// settlement already happened.
    async fn notify_purchase(&self, order: &VoteOrder) {
        let recipient = match self.store.contest(order.contest_id).await {
            Ok(Some(contest)) => contest.owner_id,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(order_id = %order.id, error = %err, "purchase notification skipped");
                return;
            }
        };

        let notification = Notification {
            kind: NotificationKind::OrderCompleted,
            title: "Vote package purchased".to_string(),
            message: format!(
                "A purchase of {} votes ({}) completed",
                order.vote_count, order.total_amount
            ),
            recipient,
            metadata: json!({
                "order_id": order.id,
                "contest_id": order.contest_id,
                "vote_count": order.vote_count,
                "total_amount_cents": order.total_amount.cents(),
                "platform_fee_cents": order.platform_fee.cents(),
            }),
        };
        if let Err(err) = self.notifications.dispatch(notification).await {
            tracing::warn!(order_id = %order.id, error = %err, "purchase notification failed");
        }
    }
}
