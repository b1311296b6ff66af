mod event;
mod ice;
mod movement;
mod party;
mod signaling;

pub use event::{EventDecodeError, InboundEvent, OutboundEvent, event_names};
pub use ice::IceServerConfig;
pub use movement::{Command, Direction, InvalidCommand, MoveInstruction, MoveType, translate};
pub use party::PartyId;
pub use signaling::{
    IceCandidate, SdpType, SessionDescription, SignalDecodeError, SignalKind, SignalPayload,
    SignalingMessage,
};
