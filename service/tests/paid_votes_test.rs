//! Paid-vote and purchase-flow tests over the in-memory store.
//!
//! Covers the order lifecycle (purchase, settlement, spend-down), the
//! order-scoped rejection reasons, and the order balance invariant.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use chrono::{Duration, Utc};
use proptest::prelude::*;
use std::sync::Arc;
use votecast::{FixedFeePolicy, OrderError, VotingService};
use votecast_core::Clock;
use votecast_core::casting::{CastError, Missing};
use votecast_core::eligibility::RejectionReason;
use votecast_core::notify::NotificationKind;
use votecast_core::store::VoteStore;
use votecast_core::types::{Money, PaymentStatus, UserId, VoteKind, VotePackageId};
use votecast_testing::{fixtures, CollectingDispatcher, FixedClock, InMemoryVoteStore};

struct Harness {
    service: VotingService,
    store: Arc<InMemoryVoteStore>,
    clock: Arc<FixedClock>,
    notifications: Arc<CollectingDispatcher>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryVoteStore::new());
    let clock = Arc::new(FixedClock::at(Utc::now()));
    let notifications = Arc::new(CollectingDispatcher::new());
    let service = VotingService::new(
        store.clone(),
        notifications.clone(),
        clock.clone(),
        Arc::new(FixedFeePolicy::new(10)),
    );
    Harness {
        service,
        store,
        clock,
        notifications,
    }
}

fn rejected(result: Result<votecast_core::types::Vote, CastError>) -> RejectionReason {
    match result {
        Err(CastError::Rejected(reason)) => reason,
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn package_purchase_and_settlement_flow() {
    let h = harness();
    let owner = UserId::new();
    let contest = fixtures::ContestBuilder::paid().owner(owner).build();
    let package = fixtures::package(&contest, "Superfan", 50, Money::from_dollars(20));
    h.service.create_contest(&contest).await.unwrap();
    h.service.create_package(&package).await.unwrap();

    let buyer = UserId::new();
    let order = h
        .service
        .purchase_package(buyer, contest.id, package.id)
        .await
        .unwrap();

    assert_eq!(order.total_amount, Money::from_dollars(20));
    assert_eq!(order.platform_fee, Money::from_dollars(2)); // 10%
    assert_eq!(order.vote_count, 50);
    assert_eq!(order.payment_status, PaymentStatus::Pending);

    let settled = h
        .service
        .confirm_payment(order.id, PaymentStatus::Completed)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Completed);

    // Organizer hears about the completed purchase
    let sent = h.notifications.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::OrderCompleted);
    assert_eq!(sent[0].recipient, owner);

    // Replayed payment callback is a no-op
    let replay = h
        .service
        .confirm_payment(order.id, PaymentStatus::Completed)
        .await
        .unwrap();
    assert!(replay.is_none());
    assert_eq!(h.notifications.count(), 1);
}

#[tokio::test]
async fn purchase_errors_cover_the_configuration_space() {
    let h = harness();
    let buyer = UserId::new();

    // Free contest sells nothing
    let free = fixtures::ContestBuilder::free().build();
    h.service.create_contest(&free).await.unwrap();
    assert!(matches!(
        h.service.purchase_votes(buyer, free.id, 3).await,
        Err(OrderError::VotesNotForSale)
    ));

    // Package contest rejects per-vote purchases and unknown packages
    let packaged = fixtures::ContestBuilder::paid().build();
    h.service.create_contest(&packaged).await.unwrap();
    assert!(matches!(
        h.service.purchase_votes(buyer, packaged.id, 3).await,
        Err(OrderError::PackagesOnly)
    ));
    assert!(matches!(
        h.service
            .purchase_package(buyer, packaged.id, VotePackageId::new())
            .await,
        Err(OrderError::PackageNotFound)
    ));

    // Per-vote contest rejects package purchases and empty orders
    let per_vote = fixtures::ContestBuilder::paid()
        .priced_per_vote(Money::from_cents(150))
        .build();
    h.service.create_contest(&per_vote).await.unwrap();
    assert!(matches!(
        h.service
            .purchase_package(buyer, per_vote.id, VotePackageId::new())
            .await,
        Err(OrderError::PackagesDisabled)
    ));
    assert!(matches!(
        h.service.purchase_votes(buyer, per_vote.id, 0).await,
        Err(OrderError::ZeroQuantity)
    ));

    let order = h
        .service
        .purchase_votes(buyer, per_vote.id, 4)
        .await
        .unwrap();
    assert_eq!(order.total_amount, Money::from_cents(600));
    assert_eq!(order.platform_fee, Money::from_cents(60));
}

#[tokio::test]
async fn order_spends_down_to_exhaustion() {
    let h = harness();
    let contest = fixtures::ContestBuilder::paid().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();

    let member = UserId::new();
    let order = fixtures::completed_order(&contest, member, 5);
    h.store.create_order(&order).await.unwrap();

    let network = fixtures::network();
    for expected_remaining in (0..5).rev() {
        let vote = h
            .service
            .cast_paid_vote(contest.id, alice.id, member, order.id, &network)
            .await
            .unwrap();
        assert_eq!(vote.kind, VoteKind::Paid);
        assert_eq!(vote.order_id, Some(order.id));

        let current = h.store.vote_order(order.id).await.unwrap().unwrap();
        assert_eq!(current.votes_remaining, expected_remaining);
        assert!(current.balance_consistent());
    }

    let sixth = h
        .service
        .cast_paid_vote(contest.id, alice.id, member, order.id, &network)
        .await;
    assert_eq!(rejected(sixth), RejectionReason::NoVotesRemaining);

    let spent = h.store.vote_order(order.id).await.unwrap().unwrap();
    assert_eq!(spent.votes_used, 5);
    assert_eq!(spent.votes_remaining, 0);
    assert_eq!(h.store.all_votes().len(), 5);
}

#[tokio::test]
async fn order_rejections_by_reason() {
    let h = harness();
    let contest = fixtures::ContestBuilder::paid().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();

    let member = UserId::new();
    let network = fixtures::network();

    // Someone else's order
    let other_order = fixtures::completed_order(&contest, UserId::new(), 5);
    h.store.create_order(&other_order).await.unwrap();
    let not_owned = h
        .service
        .cast_paid_vote(contest.id, alice.id, member, other_order.id, &network)
        .await;
    assert_eq!(rejected(not_owned), RejectionReason::OrderNotOwned);

    // Unpaid order
    let mut pending = fixtures::completed_order(&contest, member, 5);
    pending.payment_status = PaymentStatus::Pending;
    h.store.create_order(&pending).await.unwrap();
    let unpaid = h
        .service
        .cast_paid_vote(contest.id, alice.id, member, pending.id, &network)
        .await;
    assert_eq!(rejected(unpaid), RejectionReason::PaymentIncomplete);

    // Expired order
    let mut expired = fixtures::completed_order(&contest, member, 5);
    expired.expires_at = Some(h.clock.now() - Duration::hours(1));
    h.store.create_order(&expired).await.unwrap();
    let too_late = h
        .service
        .cast_paid_vote(contest.id, alice.id, member, expired.id, &network)
        .await;
    assert_eq!(rejected(too_late), RejectionReason::OrderExpired);

    // Order from a different contest is a bad reference, not a rejection
    let other_contest = fixtures::ContestBuilder::paid().build();
    h.service.create_contest(&other_contest).await.unwrap();
    let foreign = fixtures::completed_order(&other_contest, member, 5);
    h.store.create_order(&foreign).await.unwrap();
    let wrong_contest = h
        .service
        .cast_paid_vote(contest.id, alice.id, member, foreign.id, &network)
        .await;
    assert!(matches!(
        wrong_contest,
        Err(CastError::NotFound(Missing::VoteOrder))
    ));

    // None of the rejected attempts left a vote behind
    assert!(h.store.all_votes().is_empty());
}

#[tokio::test]
async fn free_vote_on_paid_contest_is_wrong_type() {
    let h = harness();
    let contest = fixtures::ContestBuilder::paid().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();

    let result = h
        .service
        .cast_free_vote(contest.id, alice.id, Some(UserId::new()), &fixtures::network())
        .await;
    assert_eq!(rejected(result), RejectionReason::WrongVotingType);
}

proptest! {
    // Spending an order down by any interleaving of valid casts keeps
    // votes_used + votes_remaining == vote_count at every step and never
    // drives the balance negative.
    #[test]
    fn order_balance_invariant_holds_for_any_spend_length(
        vote_count in 1u32..30,
        attempts in 1u32..40,
    ) {
        tokio_test::block_on(async move {
            let h = harness();
            let contest = fixtures::ContestBuilder::paid().build();
            let alice = fixtures::contestant(&contest, 1, "Alice");
            h.service.create_contest(&contest).await.unwrap();
            h.service.add_contestant(&alice).await.unwrap();

            let member = UserId::new();
            let order = fixtures::completed_order(&contest, member, vote_count);
            h.store.create_order(&order).await.unwrap();

            let network = fixtures::network();
            let mut successes = 0u32;
            for _ in 0..attempts {
                let result = h
                    .service
                    .cast_paid_vote(contest.id, alice.id, member, order.id, &network)
                    .await;
                match result {
                    Ok(_) => successes += 1,
                    Err(CastError::Rejected(RejectionReason::NoVotesRemaining)) => {}
                    Err(other) => panic!("unexpected cast failure: {other:?}"),
                }

                let current = h.store.vote_order(order.id).await.unwrap().unwrap();
                prop_assert!(current.balance_consistent());
                prop_assert_eq!(
                    current.votes_remaining,
                    vote_count - successes
                );
            }

            prop_assert_eq!(successes, attempts.min(vote_count));
            Ok(())
        })?;
    }
}
