use bmate_core::event_names;
use bmate_robot::{MAX_PENDING_CANDIDATES, NegotiationState};
use serde_json::json;

use crate::integration::{init_tracing, registered_session};
use crate::utils::PeerCall;

#[tokio::test]
async fn test_early_candidates_are_applied_after_answer() {
    init_tracing();

    let session = registered_session().await;
    session.relay(event_names::VIEWER_ADD, json!([{ "id": "v1" }])).await;
    session.candidate("v1", "candidate:early").await;

    session.request_offer("v1").await;
    assert!(session.wait_for_state("v1", NegotiationState::OfferSent).await);
    session.candidate("v1", "candidate:before-answer").await;

    session.answer("v1").await;
    assert!(
        session
            .wait_for_state("v1", NegotiationState::CandidatesExchanging)
            .await
    );
    session.candidate("v1", "candidate:late").await;
    session.settle().await;

    let calls = session.peers.latest("v1").unwrap().calls();
    let remote = calls
        .iter()
        .position(|c| matches!(c, PeerCall::SetRemote(_)))
        .unwrap();
    let added: Vec<_> = calls
        .iter()
        .enumerate()
        .filter_map(|(i, c)| match c {
            PeerCall::AddCandidate(line) => Some((i, line.clone())),
            _ => None,
        })
        .collect();

    assert_eq!(
        added.iter().map(|(_, l)| l.as_str()).collect::<Vec<_>>(),
        vec!["candidate:early", "candidate:before-answer", "candidate:late"]
    );
    assert!(added.iter().all(|(i, _)| *i > remote));
    assert!(session.notifier.errors().is_empty());
}

#[tokio::test]
async fn test_candidates_for_unknown_party_are_dropped() {
    init_tracing();

    let session = registered_session().await;
    session.candidate("ghost", "candidate:1").await;
    session.settle().await;

    assert_eq!(session.peers.total(), 0);
    assert!(session.directory.is_empty());
    assert!(session.notifier.errors().is_empty());
}

#[tokio::test]
async fn test_idle_party_keeps_only_recent_candidates() {
    init_tracing();

    let session = registered_session().await;
    session.relay(event_names::VIEWER_ADD, json!([{ "id": "v1" }])).await;

    let sent = MAX_PENDING_CANDIDATES + 5;
    for i in 0..sent {
        session.candidate("v1", &format!("candidate:{i}")).await;
    }

    session.request_offer("v1").await;
    assert!(session.wait_for_state("v1", NegotiationState::OfferSent).await);
    session.answer("v1").await;
    assert!(
        session
            .wait_for_state("v1", NegotiationState::CandidatesExchanging)
            .await
    );
    session.settle().await;

    let added: Vec<_> = session
        .peers
        .latest("v1")
        .unwrap()
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            PeerCall::AddCandidate(line) => Some(line),
            _ => None,
        })
        .collect();

    let expected: Vec<_> = (sent - MAX_PENDING_CANDIDATES..sent)
        .map(|i| format!("candidate:{i}"))
        .collect();
    assert_eq!(added, expected);
    assert!(session.notifier.errors().is_empty());
}
