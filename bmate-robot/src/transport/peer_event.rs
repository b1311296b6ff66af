use bmate_core::{IceCandidate, PartyId};

/// ICE connectivity of a single peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectivity {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

impl IceConnectivity {
    pub fn is_established(&self) -> bool {
        matches!(self, IceConnectivity::Connected | IceConnectivity::Completed)
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, IceConnectivity::Disconnected | IceConnectivity::Failed)
    }
}

/// Events a peer connection reports back to the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEvent {
    pub party: PartyId,
    /// Epoch of the connection that produced the event.
    pub epoch: u64,
    pub kind: PeerEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEventKind {
    /// Local candidate to trickle to the remote party.
    CandidateGathered(IceCandidate),
    Connectivity(IceConnectivity),
}
