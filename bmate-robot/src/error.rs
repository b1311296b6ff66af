use crate::negotiation::{NegotiationEvent, NegotiationState};
use bmate_core::PartyId;
use thiserror::Error;

/// Everything that can go wrong inside a robot session. None of these are
/// fatal: each one is turned into a [`crate::Notice`] where it happens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("signaling transport error: {0}")]
    Transport(String),

    #[error("registration failed: {0}")]
    Registration(String),

    #[error("room access request failed: {0}")]
    RoomAccess(String),

    #[error("negotiation with {party} failed: {reason}")]
    Negotiation { party: PartyId, reason: String },

    #[error("`{event}` is not valid for {party} in state `{state}`")]
    IllegalTransition {
        party: PartyId,
        state: NegotiationState,
        event: NegotiationEvent,
    },

    #[error("media unavailable: {0}")]
    Media(String),

    #[error("there is no device connected")]
    NoDevice,

    #[error("hardware write failed: {0}")]
    Hardware(String),

    #[error("received invalid move instructions: {0}")]
    InvalidInstruction(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    pub(crate) fn negotiation(party: &PartyId, err: anyhow::Error) -> Self {
        Self::Negotiation {
            party: party.clone(),
            reason: format!("{err:#}"),
        }
    }
}
