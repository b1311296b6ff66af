use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the negotiation with one remote party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NegotiationState {
    #[default]
    Idle,
    LocalMediaReady,
    OfferSent,
    AnswerSent,
    CandidatesExchanging,
    Connected,
    /// Absorbing; left only by rebuilding the party.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationEvent {
    MediaAttached,
    OfferSent,
    AnswerSent,
    RemoteAnswerApplied,
    IceConnected,
    IceFailed,
    Error,
}

/// `event` has no transition out of `state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub state: NegotiationState,
    pub event: NegotiationEvent,
}

impl NegotiationState {
    pub fn next(self, event: NegotiationEvent) -> Result<NegotiationState, IllegalTransition> {
        use NegotiationEvent as E;
        use NegotiationState as S;

        let next = match (self, event) {
            (S::Failed, _) => None,
            (_, E::Error | E::IceFailed) => Some(S::Failed),

            (S::Idle | S::LocalMediaReady, E::MediaAttached) => Some(S::LocalMediaReady),

            (
                S::Idle | S::LocalMediaReady | S::CandidatesExchanging | S::Connected,
                E::OfferSent,
            ) => Some(S::OfferSent),
            (
                S::Idle | S::LocalMediaReady | S::CandidatesExchanging | S::Connected,
                E::AnswerSent,
            ) => Some(S::AnswerSent),

            (S::OfferSent, E::RemoteAnswerApplied) => Some(S::CandidatesExchanging),

            (
                S::OfferSent | S::AnswerSent | S::CandidatesExchanging | S::Connected,
                E::IceConnected,
            ) => Some(S::Connected),

            _ => None,
        };

        next.ok_or(IllegalTransition { state: self, event })
    }

    /// An offer or answer has been sent and the exchange is not settled yet.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, NegotiationState::OfferSent | NegotiationState::AnswerSent)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationState::Idle => "idle",
            NegotiationState::LocalMediaReady => "local-media-ready",
            NegotiationState::OfferSent => "offer-sent",
            NegotiationState::AnswerSent => "answer-sent",
            NegotiationState::CandidatesExchanging => "candidates-exchanging",
            NegotiationState::Connected => "connected",
            NegotiationState::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl fmt::Display for NegotiationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationEvent::MediaAttached => "media attached",
            NegotiationEvent::OfferSent => "offer sent",
            NegotiationEvent::AnswerSent => "answer sent",
            NegotiationEvent::RemoteAnswerApplied => "remote answer applied",
            NegotiationEvent::IceConnected => "ice connected",
            NegotiationEvent::IceFailed => "ice failed",
            NegotiationEvent::Error => "error",
        };
        f.write_str(name)
    }
}

/// Which side of the offer/answer exchange the robot plays for a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationRole {
    Offerer,
    Answerer,
}

/// `MultiParty` keys negotiations by the sender of each signaling message.
/// `SinglePeer` runs one negotiation with whoever is on the other end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NegotiationMode {
    #[default]
    MultiParty,
    SinglePeer,
}
