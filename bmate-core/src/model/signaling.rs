use crate::model::party::PartyId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// Session description in the browser JSON shape: `{"type": "offer", "sdp": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

/// Candidates arrive either as an object or, from older clients, as a string
/// that may itself hold the JSON-encoded object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CandidateField {
    Object(IceCandidate),
    Line(String),
}

impl From<CandidateField> for IceCandidate {
    fn from(field: CandidateField) -> Self {
        match field {
            CandidateField::Object(candidate) => candidate,
            CandidateField::Line(line) if line.trim().starts_with('{') => {
                serde_json::from_str(&line).unwrap_or_else(|_| IceCandidate::new(line))
            }
            CandidateField::Line(line) => IceCandidate::new(line),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
    RequestOffer,
    ViewerOffer,
    ViewerOfferAnswer,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::Candidate => "candidate",
            SignalKind::RequestOffer => "request_offer",
            SignalKind::ViewerOffer => "viewer_offer",
            SignalKind::ViewerOfferAnswer => "viewer_offer_answer",
        }
    }
}

impl FromStr for SignalKind {
    type Err = SignalDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offer" => Ok(SignalKind::Offer),
            "answer" => Ok(SignalKind::Answer),
            "candidate" => Ok(SignalKind::Candidate),
            "request_offer" | "viewer_request_offer" => Ok(SignalKind::RequestOffer),
            "viewer_offer" => Ok(SignalKind::ViewerOffer),
            "viewer_offer_answer" => Ok(SignalKind::ViewerOfferAnswer),
            other => Err(SignalDecodeError::UnknownType(other.to_owned())),
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalDecodeError {
    #[error("unknown signaling message type `{0}`")]
    UnknownType(String),
    #[error("`{kind}` message is missing `{field}`")]
    MissingField {
        kind: SignalKind,
        field: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalPayload {
    Offer(SessionDescription),
    Answer(SessionDescription),
    Candidate(IceCandidate),
    RequestOffer,
    ViewerOffer(SessionDescription),
    ViewerOfferAnswer(SessionDescription),
}

impl SignalPayload {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalPayload::Offer(_) => SignalKind::Offer,
            SignalPayload::Answer(_) => SignalKind::Answer,
            SignalPayload::Candidate(_) => SignalKind::Candidate,
            SignalPayload::RequestOffer => SignalKind::RequestOffer,
            SignalPayload::ViewerOffer(_) => SignalKind::ViewerOffer,
            SignalPayload::ViewerOfferAnswer(_) => SignalKind::ViewerOfferAnswer,
        }
    }
}

/// A message relayed over the `signaling_message` event.
///
/// Missing `to` addresses the session peer, missing `from` means the sender
/// did not identify itself (single-peer sessions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSignal", into = "RawSignal")]
pub struct SignalingMessage {
    pub from: Option<PartyId>,
    pub to: Option<PartyId>,
    pub payload: SignalPayload,
}

impl SignalingMessage {
    pub fn new(payload: SignalPayload) -> Self {
        Self {
            from: None,
            to: None,
            payload,
        }
    }

    pub fn from_party(mut self, from: impl Into<PartyId>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn to_party(mut self, to: impl Into<PartyId>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn kind(&self) -> SignalKind {
        self.payload.kind()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSignal {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<PartyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<PartyId>,
    #[serde(default, alias = "desc", skip_serializing_if = "Option::is_none")]
    description: Option<SessionDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    candidate: Option<CandidateField>,
}

impl TryFrom<RawSignal> for SignalingMessage {
    type Error = SignalDecodeError;

    fn try_from(raw: RawSignal) -> Result<Self, Self::Error> {
        let kind: SignalKind = raw.kind.parse()?;
        let description = |field: Option<SessionDescription>| {
            field.ok_or(SignalDecodeError::MissingField {
                kind,
                field: "description",
            })
        };

        let payload = match kind {
            SignalKind::Offer => SignalPayload::Offer(description(raw.description)?),
            SignalKind::Answer => SignalPayload::Answer(description(raw.description)?),
            SignalKind::ViewerOffer => SignalPayload::ViewerOffer(description(raw.description)?),
            SignalKind::ViewerOfferAnswer => {
                SignalPayload::ViewerOfferAnswer(description(raw.description)?)
            }
            SignalKind::Candidate => {
                let candidate = raw.candidate.ok_or(SignalDecodeError::MissingField {
                    kind,
                    field: "candidate",
                })?;
                SignalPayload::Candidate(candidate.into())
            }
            SignalKind::RequestOffer => SignalPayload::RequestOffer,
        };

        Ok(Self {
            from: raw.from,
            to: raw.to,
            payload,
        })
    }
}

impl From<SignalingMessage> for RawSignal {
    fn from(msg: SignalingMessage) -> Self {
        let kind = msg.kind().as_str().to_owned();
        let (description, candidate) = match msg.payload {
            SignalPayload::Offer(desc)
            | SignalPayload::Answer(desc)
            | SignalPayload::ViewerOffer(desc)
            | SignalPayload::ViewerOfferAnswer(desc) => (Some(desc), None),
            SignalPayload::Candidate(candidate) => (None, Some(CandidateField::Object(candidate))),
            SignalPayload::RequestOffer => (None, None),
        };

        Self {
            kind,
            from: msg.from,
            to: msg.to,
            description,
            candidate,
        }
    }
}
