use bmate_core::{MoveInstruction, event_names};
use bmate_robot::{Notice, NegotiationMode, SessionCommand, SessionError};
use serde_json::json;
use std::sync::Arc;

use crate::integration::{WAIT_MS, create_test_session, init_tracing};
use crate::utils::{MockMediaDevices, MockSink, wait_until};

#[tokio::test]
async fn test_misspelled_forward_writes_motor_forward() {
    init_tracing();

    let session =
        create_test_session(NegotiationMode::MultiParty, MockMediaDevices::with_front_camera());
    let sink = MockSink::new();
    session
        .command(SessionCommand::AttachDevice(Arc::new(sink.clone())))
        .await;

    session
        .relay(
            event_names::ROBOT_MOVEMENT,
            json!([{ "moveType": "MOTOR", "direction": "FOWARD" }]),
        )
        .await;

    assert!(wait_until(WAIT_MS, || !sink.written().is_empty()).await);
    session.settle().await;

    assert_eq!(sink.written(), b"F");
    assert!(
        session
            .notifier
            .notices()
            .contains(&Notice::Movement(MoveInstruction::new("MOTOR", "FOWARD")))
    );
}

#[tokio::test]
async fn test_movement_without_device() {
    init_tracing();

    let session =
        create_test_session(NegotiationMode::MultiParty, MockMediaDevices::with_front_camera());
    session
        .relay(
            event_names::ROBOT_MOVEMENT,
            json!([{ "moveType": "MOTOR", "direction": "FOWARD" }]),
        )
        .await;

    assert!(
        wait_until(WAIT_MS, || session
            .notifier
            .has_error(|e| *e == SessionError::NoDevice))
        .await
    );
}

#[tokio::test]
async fn test_detached_device_is_not_written() {
    init_tracing();

    let session =
        create_test_session(NegotiationMode::MultiParty, MockMediaDevices::with_front_camera());
    let sink = MockSink::new();
    session
        .command(SessionCommand::AttachDevice(Arc::new(sink.clone())))
        .await;
    session.command(SessionCommand::DetachDevice).await;

    session
        .relay(
            event_names::ROBOT_MOVEMENT,
            json!({ "moveType": "CAMERA", "direction": "LEFT" }),
        )
        .await;

    assert!(
        wait_until(WAIT_MS, || session
            .notifier
            .has_error(|e| *e == SessionError::NoDevice))
        .await
    );
    assert!(sink.written().is_empty());
}

#[tokio::test]
async fn test_stop_writes_default_command() {
    init_tracing();

    let session =
        create_test_session(NegotiationMode::MultiParty, MockMediaDevices::with_front_camera());
    let sink = MockSink::new();
    session
        .command(SessionCommand::AttachDevice(Arc::new(sink.clone())))
        .await;

    session.relay(event_names::ROBOT_STOP, json!({})).await;

    assert!(wait_until(WAIT_MS, || !sink.written().is_empty()).await);
    assert_eq!(sink.written(), b"S");
}

#[tokio::test]
async fn test_stop_with_custom_command() {
    init_tracing();

    let session =
        create_test_session(NegotiationMode::MultiParty, MockMediaDevices::with_front_camera());
    let sink = MockSink::new();
    session
        .command(SessionCommand::AttachDevice(Arc::new(sink.clone())))
        .await;

    session
        .relay(event_names::ROBOT_STOP, json!([{ "command": "X" }]))
        .await;
    session
        .relay(event_names::ROBOT_STOP, json!([{ "command": "XY" }]))
        .await;

    assert!(
        wait_until(WAIT_MS, || session
            .notifier
            .has_error(|e| matches!(e, SessionError::InvalidInstruction(_))))
        .await
    );
    session.settle().await;
    assert_eq!(sink.written(), b"X");
}

#[tokio::test]
async fn test_unmapped_instruction_is_reported() {
    init_tracing();

    let session =
        create_test_session(NegotiationMode::MultiParty, MockMediaDevices::with_front_camera());
    let sink = MockSink::new();
    session
        .command(SessionCommand::AttachDevice(Arc::new(sink.clone())))
        .await;

    session
        .relay(event_names::ROBOT_MOVEMENT, json!([{ "direction": "LEFT" }]))
        .await;

    assert!(
        wait_until(WAIT_MS, || session
            .notifier
            .has_error(|e| matches!(e, SessionError::InvalidInstruction(_))))
        .await
    );
    session.settle().await;
    assert!(sink.written().is_empty());
}
