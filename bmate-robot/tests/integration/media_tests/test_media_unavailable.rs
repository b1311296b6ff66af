use bmate_core::SignalKind;
use bmate_robot::{NegotiationMode, NegotiationState, OfferOptions, SessionError};

use crate::integration::{TOKEN, WAIT_MS, create_test_session, init_tracing};
use crate::utils::{MockMediaDevices, PeerCall, wait_until};

#[tokio::test]
async fn test_missing_front_camera_offers_receive_only() {
    init_tracing();

    let session =
        create_test_session(NegotiationMode::MultiParty, MockMediaDevices::without_camera());

    assert!(
        wait_until(WAIT_MS, || session
            .notifier
            .has_error(|e| *e == SessionError::Media("no video available in device".into())))
        .await
    );

    session.register(TOKEN).await;
    session.request_offer("v1").await;

    assert!(session.wait_for_signals(SignalKind::Offer, 1).await);
    assert_eq!(session.state("v1"), Some(NegotiationState::OfferSent));

    let calls = session.peers.latest("v1").unwrap().calls();
    assert!(!calls.iter().any(|c| matches!(c, PeerCall::AttachStream(_))));
    assert!(calls.contains(&PeerCall::CreateOffer(OfferOptions::default())));
}
