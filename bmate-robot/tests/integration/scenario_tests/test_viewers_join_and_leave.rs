use bmate_core::{PartyId, event_names};
use bmate_robot::NegotiationState;
use serde_json::json;

use crate::integration::{WAIT_MS, init_tracing, registered_session};
use crate::utils::wait_until;

#[tokio::test]
async fn test_viewer_left_keeps_other_viewers() {
    init_tracing();

    let session = registered_session().await;

    session.relay(event_names::VIEWER_ADD, json!([{ "id": "v1" }])).await;
    session.relay(event_names::VIEWER_ADD, json!([{ "id": "v2" }])).await;
    assert!(wait_until(WAIT_MS, || session.directory.len() == 2).await);

    session.relay(event_names::VIEWER_LEFT, json!([{ "id": "v1" }])).await;
    assert!(wait_until(WAIT_MS, || session.directory.len() == 1).await);

    assert_eq!(
        session.directory.snapshot(),
        vec![(PartyId::from("v2"), NegotiationState::Idle)]
    );
}

#[tokio::test]
async fn test_repeated_viewer_add_keeps_one_party() {
    init_tracing();

    let session = registered_session().await;

    session.relay(event_names::VIEWER_ADD, json!([{ "id": "v1" }])).await;
    session.request_offer("v1").await;
    assert!(session.wait_for_state("v1", NegotiationState::OfferSent).await);

    session.relay(event_names::VIEWER_ADD, json!([{ "id": "v1" }])).await;
    session.settle().await;

    assert_eq!(session.directory.len(), 1);
    assert_eq!(session.state("v1"), Some(NegotiationState::OfferSent));
}
