use crate::model::movement::MoveInstruction;
use crate::model::party::PartyId;
use crate::model::signaling::{SignalKind, SignalingMessage};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

pub mod event_names {
    pub const CONNECT: &str = "connect";
    pub const ERROR: &str = "error";
    pub const DISCONNECT: &str = "disconnect";

    pub const ROBOT_REGISTER: &str = "robot_register";
    pub const ROBOT_REGISTER_SUCCESS: &str = "robot_register:success";
    pub const ROBOT_REGISTER_ERROR: &str = "robot_register:error";

    pub const ROOM_ACCESS: &str = "get_robot_room_access";
    pub const ROOM_ACCESS_SUCCESS: &str = "get_robot_room_access:success";
    pub const ROOM_ACCESS_ERROR: &str = "get_robot_room_access:error";

    pub const ROBOT_MOVEMENT: &str = "do_robot_movement";
    pub const ROBOT_STOP: &str = "do_robot_stop";

    pub const VIEWER_ADD: &str = "viewer_add";
    pub const VIEWER_LEFT: &str = "viewer_left";

    pub const SIGNALING_MESSAGE: &str = "signaling_message";
    pub const SIGNALING_MESSAGE_LEGACY: &str = "signalingMessage";
}

use event_names::*;

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("unknown signaling message type `{0}`")]
    UnknownSignalType(String),
    #[error("malformed `{event}` payload: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Every event the relay can deliver to the robot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Connected,
    TransportError(String),
    Disconnected(String),
    RegisterSucceeded { token: String },
    RegisterFailed(String),
    Movement(MoveInstruction),
    Stop { command: Option<String> },
    RoomAccessGranted { access_token: String },
    RoomAccessDenied(String),
    ViewerAdded(PartyId),
    ViewerLeft(PartyId),
    Signaling(SignalingMessage),
}

#[derive(Deserialize)]
struct RegisterPayload {
    token: String,
}

#[derive(Deserialize)]
struct RoomAccessPayload {
    #[serde(rename = "accessToken")]
    access_token: String,
}

#[derive(Deserialize, Default)]
struct StopPayload {
    #[serde(default)]
    command: Option<String>,
}

#[derive(Deserialize)]
struct ViewerPayload {
    id: PartyId,
}

impl InboundEvent {
    /// Decodes a named relay event. The legacy transport wraps payloads in a
    /// single-element array, which is unwrapped here.
    pub fn decode(event: &str, payload: Value) -> Result<Self, EventDecodeError> {
        let payload = unwrap_legacy(payload);

        let decoded = match event {
            CONNECT => InboundEvent::Connected,
            ERROR => InboundEvent::TransportError(describe(&payload)),
            DISCONNECT => InboundEvent::Disconnected(describe(&payload)),
            ROBOT_REGISTER_SUCCESS => {
                let p: RegisterPayload = from_payload(event, payload)?;
                InboundEvent::RegisterSucceeded { token: p.token }
            }
            ROBOT_REGISTER_ERROR => InboundEvent::RegisterFailed(describe(&payload)),
            ROBOT_MOVEMENT => InboundEvent::Movement(from_payload(event, payload)?),
            ROBOT_STOP => {
                let p: StopPayload = if payload.is_null() {
                    StopPayload::default()
                } else {
                    from_payload(event, payload)?
                };
                InboundEvent::Stop { command: p.command }
            }
            ROOM_ACCESS_SUCCESS => {
                let p: RoomAccessPayload = from_payload(event, payload)?;
                InboundEvent::RoomAccessGranted {
                    access_token: p.access_token,
                }
            }
            ROOM_ACCESS_ERROR => InboundEvent::RoomAccessDenied(describe(&payload)),
            VIEWER_ADD => {
                let p: ViewerPayload = from_payload(event, payload)?;
                InboundEvent::ViewerAdded(p.id)
            }
            VIEWER_LEFT => {
                let p: ViewerPayload = from_payload(event, payload)?;
                InboundEvent::ViewerLeft(p.id)
            }
            SIGNALING_MESSAGE | SIGNALING_MESSAGE_LEGACY => {
                if let Some(kind) = payload.get("type").and_then(Value::as_str)
                    && kind.parse::<SignalKind>().is_err()
                {
                    return Err(EventDecodeError::UnknownSignalType(kind.to_owned()));
                }
                InboundEvent::Signaling(from_payload(event, payload)?)
            }
            other => return Err(EventDecodeError::UnknownEvent(other.to_owned())),
        };

        Ok(decoded)
    }
}

/// Events the robot emits to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    Register { nick_name: String },
    RoomAccess,
    Signaling(SignalingMessage),
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Register { .. } => ROBOT_REGISTER,
            OutboundEvent::RoomAccess => ROOM_ACCESS,
            OutboundEvent::Signaling(_) => SIGNALING_MESSAGE,
        }
    }

    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            OutboundEvent::Register { nick_name } => Ok(json!({ "nickName": nick_name })),
            OutboundEvent::RoomAccess => Ok(json!({})),
            OutboundEvent::Signaling(msg) => serde_json::to_value(msg),
        }
    }
}

fn unwrap_legacy(payload: Value) -> Value {
    match payload {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}

fn from_payload<T: for<'de> Deserialize<'de>>(
    event: &str,
    payload: Value,
) -> Result<T, EventDecodeError> {
    serde_json::from_value(payload).map_err(|source| EventDecodeError::Malformed {
        event: event.to_owned(),
        source,
    })
}

fn describe(payload: &Value) -> String {
    match payload {
        Value::Null => "unspecified error".to_owned(),
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| payload.to_string()),
        other => other.to_string(),
    }
}
