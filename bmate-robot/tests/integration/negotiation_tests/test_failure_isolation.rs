use bmate_core::SignalKind;
use bmate_robot::{IceConnectivity, NegotiationState, PeerEventKind, SessionError};

use crate::integration::{WAIT_MS, init_tracing, registered_session};
use crate::utils::{FailStep, PeerCall, wait_until};

#[tokio::test]
async fn test_capability_error_fails_only_that_party() {
    init_tracing();

    let session = registered_session().await;
    session.peers.fail("v1", FailStep::CreateOffer);

    session.request_offer("v1").await;
    session.request_offer("v2").await;

    assert!(session.wait_for_state("v1", NegotiationState::Failed).await);
    assert!(session.wait_for_state("v2", NegotiationState::OfferSent).await);
    assert!(session.notifier.has_error(|e| matches!(
        e,
        SessionError::Negotiation { party, .. } if party.as_str() == "v1"
    )));

    let offers = session.signaling.signals_of(SignalKind::Offer);
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].to.as_ref().map(|p| p.as_str()), Some("v2"));
}

#[tokio::test]
async fn test_connect_error_fails_party() {
    init_tracing();

    let session = registered_session().await;
    session.peers.fail("v1", FailStep::Connect);

    session.request_offer("v1").await;

    assert!(session.wait_for_state("v1", NegotiationState::Failed).await);
    assert_eq!(session.peers.total(), 0);
}

#[tokio::test]
async fn test_rejected_answer_fails_party() {
    init_tracing();

    let session = registered_session().await;
    session.request_offer("v1").await;
    assert!(session.wait_for_state("v1", NegotiationState::OfferSent).await);

    session.peers.fail("v1", FailStep::SetRemote);
    session.answer("v1").await;

    assert!(session.wait_for_state("v1", NegotiationState::Failed).await);
}

#[tokio::test]
async fn test_ice_failure_then_rebuild() {
    init_tracing();

    let session = registered_session().await;
    session.request_offer("v1").await;
    assert!(session.wait_for_state("v1", NegotiationState::OfferSent).await);
    session.answer("v1").await;
    session
        .peers
        .connectivity("v1", IceConnectivity::Connected)
        .await;
    assert!(session.wait_for_state("v1", NegotiationState::Connected).await);

    session
        .peers
        .connectivity("v1", IceConnectivity::Disconnected)
        .await;
    assert!(session.wait_for_state("v1", NegotiationState::Failed).await);

    // failed absorbs further connectivity changes
    session
        .peers
        .connectivity("v1", IceConnectivity::Connected)
        .await;
    session.settle().await;
    assert_eq!(session.state("v1"), Some(NegotiationState::Failed));

    session.request_offer("v1").await;
    assert!(session.wait_for_state("v1", NegotiationState::OfferSent).await);

    let connections = session.peers.connections("v1");
    assert_eq!(connections.len(), 2);
    assert!(connections[0].is_closed());
    assert!(connections[1].epoch > connections[0].epoch);
    assert!(connections[1].calls().iter().any(|c| matches!(c, PeerCall::AttachStream(_))));
    assert_eq!(session.signaling.signals_of(SignalKind::Offer).len(), 2);
}

#[tokio::test]
async fn test_stale_epoch_events_are_dropped() {
    init_tracing();

    let session = registered_session().await;
    session.request_offer("v1").await;
    assert!(session.wait_for_state("v1", NegotiationState::OfferSent).await);
    session
        .peers
        .connectivity("v1", IceConnectivity::Failed)
        .await;
    assert!(session.wait_for_state("v1", NegotiationState::Failed).await);

    session.request_offer("v1").await;
    assert!(
        wait_until(WAIT_MS, || session.peers.connections("v1").len() == 2).await
    );
    assert!(session.wait_for_state("v1", NegotiationState::OfferSent).await);

    let stale = session.peers.connections("v1")[0].epoch;
    session
        .peers
        .inject(
            "v1",
            stale,
            PeerEventKind::Connectivity(IceConnectivity::Failed),
        )
        .await;
    session.settle().await;

    assert_eq!(session.state("v1"), Some(NegotiationState::OfferSent));
}

#[tokio::test]
async fn test_relay_failure_while_offering_fails_party() {
    init_tracing();

    let session = registered_session().await;
    session.signaling.set_offline(true);

    session.request_offer("v1").await;

    assert!(session.wait_for_state("v1", NegotiationState::Failed).await);
    assert!(session.notifier.has_error(|e| matches!(e, SessionError::Transport(_))));
}
