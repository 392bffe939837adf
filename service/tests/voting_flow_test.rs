//! Free-vote flow tests over the in-memory store.
//!
//! Covers the member and guest paths end to end: window enforcement,
//! single-vote contests, duplicate votes, vote caps, and the best-effort
//! organizer notification.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use chrono::{Duration, Utc};
use std::sync::Arc;
use votecast::{FixedFeePolicy, VotingService};
use votecast_core::Clock;
use votecast_core::casting::{CastError, Missing};
use votecast_core::eligibility::RejectionReason;
use votecast_core::notify::NotificationKind;
use votecast_core::types::{
    ContestantId, ContestantStatus, NetworkContext, UserId, VoteKind,
};
use votecast_testing::{
    fixtures, CollectingDispatcher, FailingDispatcher, FixedClock, InMemoryVoteStore,
};

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
async fn member_casts_a_free_vote() {
    let h = harness();
    let contest = fixtures::ContestBuilder::free().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();

    let member = UserId::new();
    let vote = h
        .service
        .cast_free_vote(contest.id, alice.id, Some(member), &fixtures::network())
        .await
        .unwrap();

    assert_eq!(vote.contest_id, contest.id);
    assert_eq!(vote.contestant_id, alice.id);
    assert_eq!(vote.voter_id, Some(member));
    assert_eq!(vote.kind, VoteKind::Free);
    assert_eq!(vote.order_id, None);
    assert_eq!(h.store.all_votes().len(), 1);
}

#[tokio::test]
async fn single_vote_contest_allows_one_contestant_only() {
    let h = harness();
    let contest = fixtures::ContestBuilder::free().single_vote().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    let bob = fixtures::contestant(&contest, 2, "Bob");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();
    h.service.add_contestant(&bob).await.unwrap();

    let member = UserId::new();
    let network = fixtures::network();
    h.service
        .cast_free_vote(contest.id, alice.id, Some(member), &network)
        .await
        .unwrap();

    let second = h
        .service
        .cast_free_vote(contest.id, bob.id, Some(member), &network)
        .await;
    assert_eq!(rejected(second), RejectionReason::OneContestantOnly);
    assert_eq!(h.store.all_votes().len(), 1);
}

#[tokio::test]
async fn duplicate_free_vote_for_same_contestant_is_rejected() {
    let h = harness();
    let contest = fixtures::ContestBuilder::free().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();

    let member = UserId::new();
    let network = fixtures::network();
    h.service
        .cast_free_vote(contest.id, alice.id, Some(member), &network)
        .await
        .unwrap();

    let again = h
        .service
        .cast_free_vote(contest.id, alice.id, Some(member), &network)
        .await;
    assert_eq!(rejected(again), RejectionReason::AlreadyVotedContestant);
}

#[tokio::test]
async fn free_vote_cap_stops_further_votes() {
    let h = harness();
    let contest = fixtures::ContestBuilder::free().max_votes_per_user(2).build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    let bob = fixtures::contestant(&contest, 2, "Bob");
    let carol = fixtures::contestant(&contest, 3, "Carol");
    h.service.create_contest(&contest).await.unwrap();
    for contestant in [&alice, &bob, &carol] {
        h.service.add_contestant(contestant).await.unwrap();
    }

    let member = UserId::new();
    let network = fixtures::network();
    for contestant in [&alice, &bob] {
        h.service
            .cast_free_vote(contest.id, contestant.id, Some(member), &network)
            .await
            .unwrap();
    }

    let third = h
        .service
        .cast_free_vote(contest.id, carol.id, Some(member), &network)
        .await;
    assert_eq!(rejected(third), RejectionReason::VoteLimitReached);
}

#[tokio::test]
async fn voting_window_is_enforced_around_the_boundaries() {
    let h = harness();
    let start = h.clock.now() + Duration::hours(1);
    let end = start + Duration::days(1);
    let contest = fixtures::ContestBuilder::free().window(start, end).build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();

    let network = fixtures::network();

    // Before the window opens
    let early = h
        .service
        .cast_free_vote(contest.id, alice.id, Some(UserId::new()), &network)
        .await;
    assert_eq!(rejected(early), RejectionReason::VotingNotStarted);

    // Exactly at the opening instant
    h.clock.set(start);
    h.service
        .cast_free_vote(contest.id, alice.id, Some(UserId::new()), &network)
        .await
        .unwrap();

    // Exactly at the closing instant
    h.clock.set(end);
    h.service
        .cast_free_vote(contest.id, alice.id, Some(UserId::new()), &network)
        .await
        .unwrap();

    // Past the end
    h.clock.advance(Duration::seconds(1));
    let late = h
        .service
        .cast_free_vote(contest.id, alice.id, Some(UserId::new()), &network)
        .await;
    assert_eq!(rejected(late), RejectionReason::VotingEnded);
}

#[tokio::test]
async fn inactive_contestant_cannot_receive_votes() {
    let h = harness();
    let contest = fixtures::ContestBuilder::free().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();
    h.service
        .set_contestant_status(contest.id, alice.id, ContestantStatus::Disqualified)
        .await
        .unwrap();

    let result = h
        .service
        .cast_free_vote(contest.id, alice.id, Some(UserId::new()), &fixtures::network())
        .await;
    assert_eq!(rejected(result), RejectionReason::ContestantInactive);
}

#[tokio::test]
async fn guest_votes_once_per_contest_by_ip() {
    let h = harness();
    let contest = fixtures::ContestBuilder::free().allow_guests().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    let bob = fixtures::contestant(&contest, 2, "Bob");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();
    h.service.add_contestant(&bob).await.unwrap();

    let network = fixtures::network_from("1.2.3.4");
    let vote = h
        .service
        .cast_free_vote(contest.id, alice.id, None, &network)
        .await
        .unwrap();
    assert_eq!(vote.voter_id, None);
    assert_eq!(vote.ip_address, "1.2.3.4");

    // Same IP, different contestant: still one vote per contest
    let second = h
        .service
        .cast_free_vote(contest.id, bob.id, None, &network)
        .await;
    assert_eq!(rejected(second), RejectionReason::AlreadyVoted);

    // A different IP is a different guest
    h.service
        .cast_free_vote(contest.id, bob.id, None, &fixtures::network_from("5.6.7.8"))
        .await
        .unwrap();
}

#[tokio::test]
async fn guests_are_rejected_when_disabled() {
    let h = harness();
    let contest = fixtures::ContestBuilder::free().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();

    let result = h
        .service
        .cast_free_vote(contest.id, alice.id, None, &fixtures::network())
        .await;
    assert_eq!(rejected(result), RejectionReason::GuestVotingDisabled);
}

#[tokio::test]
async fn unknown_references_are_not_found_not_rejected() {
    let h = harness();
    let contest = fixtures::ContestBuilder::free().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");

    // Contest never created
    let no_contest = h
        .service
        .cast_free_vote(contest.id, alice.id, Some(UserId::new()), &fixtures::network())
        .await;
    assert!(matches!(
        no_contest,
        Err(CastError::NotFound(Missing::Contest))
    ));

    // Contest exists, contestant doesn't
    h.service.create_contest(&contest).await.unwrap();
    let no_contestant = h
        .service
        .cast_free_vote(
            contest.id,
            ContestantId::new(),
            Some(UserId::new()),
            &fixtures::network(),
        )
        .await;
    assert!(matches!(
        no_contestant,
        Err(CastError::NotFound(Missing::Contestant))
    ));
}

#[tokio::test]
async fn organizer_is_notified_of_each_vote() {
    let h = harness();
    let owner = UserId::new();
    let contest = fixtures::ContestBuilder::free().owner(owner).build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();

    h.service
        .cast_free_vote(contest.id, alice.id, Some(UserId::new()), &fixtures::network())
        .await
        .unwrap();

    let sent = h.notifications.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::VoteReceived);
    assert_eq!(sent[0].recipient, owner);
    assert!(sent[0].message.contains("Alice"));
}

#[tokio::test]
async fn notification_failure_never_fails_the_vote() {
    let store = Arc::new(InMemoryVoteStore::new());
    let clock = Arc::new(FixedClock::at(Utc::now()));
    let service = VotingService::new(
        store.clone(),
        Arc::new(FailingDispatcher::new()),
        clock,
        Arc::new(FixedFeePolicy::new(10)),
    );

    let contest = fixtures::ContestBuilder::free().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    service.create_contest(&contest).await.unwrap();
    service.add_contestant(&alice).await.unwrap();

    let vote = service
        .cast_free_vote(contest.id, alice.id, Some(UserId::new()), &fixtures::network())
        .await
        .unwrap();

    // Dispatch failed, but the vote is committed
    assert_eq!(store.all_votes(), vec![vote]);
}

#[tokio::test]
async fn network_context_falls_back_through_headers() {
    // Wiring check: the resolved IP is what guest identity keys on
    let ctx = NetworkContext::from_headers(Some("9.9.9.9, 10.0.0.1"), Some("8.8.8.8"), None);
    assert_eq!(ctx.ip_address, "9.9.9.9");

    let h = harness();
    let contest = fixtures::ContestBuilder::free().allow_guests().build();
    let alice = fixtures::contestant(&contest, 1, "Alice");
    h.service.create_contest(&contest).await.unwrap();
    h.service.add_contestant(&alice).await.unwrap();

    let vote = h
        .service
        .cast_free_vote(contest.id, alice.id, None, &ctx)
        .await
        .unwrap();
    assert_eq!(vote.ip_address, "9.9.9.9");
    assert_eq!(vote.user_agent, NetworkContext::UNKNOWN);
}
