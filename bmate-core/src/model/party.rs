use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

const SESSION_PEER: &str = "session";

/// Opaque identity of a remote party as assigned by the relay.
/// Relays hand out numeric ids as well as strings; both decode to the same
/// textual id.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PartyId(#[serde(deserialize_with = "text_or_number")] pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum IdField {
    Text(String),
    Number(u64),
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match IdField::deserialize(deserializer)? {
        IdField::Text(id) => id,
        IdField::Number(id) => id.to_string(),
    })
}

impl PartyId {
    /// The single remote peer of a single-peer session, used when a message
    /// carries no `from`/`to`.
    pub fn session_peer() -> Self {
        Self(SESSION_PEER.to_owned())
    }

    pub fn is_session_peer(&self) -> bool {
        self.0 == SESSION_PEER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PartyId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PartyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
