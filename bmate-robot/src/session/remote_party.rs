use crate::media::LocalStream;
use crate::negotiation::{NegotiationRole, NegotiationState};
use crate::transport::PeerConnection;
use bmate_core::{IceCandidate, PartyId};
use std::sync::Arc;

/// Candidates kept per party while its remote description is not set yet.
/// Past this, the oldest are dropped.
pub const MAX_PENDING_CANDIDATES: usize = 32;

/// A remote endpoint the robot negotiates with.
pub struct RemoteParty {
    pub id: PartyId,
    /// `None` until the first negotiation starts.
    pub role: Option<NegotiationRole>,
    pub state: NegotiationState,
    pub stream: Option<LocalStream>,
    pub connection: Option<Arc<dyn PeerConnection>>,
    /// Epoch of `connection`; peer events carrying another epoch are stale.
    pub epoch: u64,
    /// `to` of outbound messages for this party.
    pub address: Option<PartyId>,
    pub(crate) pending_candidates: Vec<IceCandidate>,
    pub(crate) remote_description_set: bool,
}

impl RemoteParty {
    pub fn new(id: PartyId) -> Self {
        let address = (!id.is_session_peer()).then(|| id.clone());
        Self {
            id,
            role: None,
            state: NegotiationState::Idle,
            stream: None,
            connection: None,
            epoch: 0,
            address,
            pending_candidates: Vec::new(),
            remote_description_set: false,
        }
    }

    pub fn pending_candidates(&self) -> &[IceCandidate] {
        &self.pending_candidates
    }

    /// Queues a candidate until the remote description is set. Returns the
    /// candidate evicted to stay within [`MAX_PENDING_CANDIDATES`].
    pub(crate) fn buffer_candidate(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        let evicted = (self.pending_candidates.len() >= MAX_PENDING_CANDIDATES)
            .then(|| self.pending_candidates.remove(0));
        self.pending_candidates.push(candidate);
        evicted
    }
}
