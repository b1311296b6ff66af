use crate::media::LocalStream;
use crate::transport::PeerEvent;
use anyhow::Result;
use async_trait::async_trait;
use bmate_core::{IceCandidate, PartyId, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferOptions {
    pub receive_audio: bool,
    pub receive_video: bool,
}

impl Default for OfferOptions {
    fn default() -> Self {
        Self {
            receive_audio: true,
            receive_video: true,
        }
    }
}

/// One peer connection to one remote party.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Adds the tracks of a local stream. Must happen before the offer or
    /// answer that should carry them is created.
    async fn attach_stream(&self, stream: &LocalStream) -> Result<()>;

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Creates peer connections. Every connection reports its [`PeerEvent`]s,
/// stamped with `party` and `epoch`, into `events`.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(
        &self,
        party: &PartyId,
        epoch: u64,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>>;
}
