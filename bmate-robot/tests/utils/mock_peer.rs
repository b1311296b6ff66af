use async_trait::async_trait;
use bmate_core::{IceCandidate, PartyId, SdpType, SessionDescription};
use bmate_robot::{
    IceConnectivity, LocalStream, OfferOptions, PeerConnection, PeerConnector, PeerEvent,
    PeerEventKind,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Capability call recorded by a [`MockPeerConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerCall {
    AttachStream(String),
    CreateOffer(OfferOptions),
    CreateAnswer,
    SetLocal(SdpType),
    SetRemote(SdpType),
    AddCandidate(String),
    Close,
}

/// Step at which a party's connection should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailStep {
    Connect,
    CreateOffer,
    SetRemote,
}

pub struct MockPeerConnection {
    pub party: PartyId,
    pub epoch: u64,
    calls: Mutex<Vec<PeerCall>>,
    closed: AtomicBool,
    failures: Arc<Mutex<HashMap<PartyId, FailStep>>>,
}

impl MockPeerConnection {
    pub fn calls(&self) -> Vec<PeerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: PeerCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn should_fail(&self, step: FailStep) -> bool {
        self.failures.lock().unwrap().get(&self.party) == Some(&step)
    }
}

#[async_trait]
impl PeerConnection for MockPeerConnection {
    async fn attach_stream(&self, stream: &LocalStream) -> anyhow::Result<()> {
        self.record(PeerCall::AttachStream(stream.id.clone()));
        Ok(())
    }

    async fn create_offer(&self, options: OfferOptions) -> anyhow::Result<SessionDescription> {
        self.record(PeerCall::CreateOffer(options));
        if self.should_fail(FailStep::CreateOffer) {
            anyhow::bail!("offer creation failed");
        }
        Ok(SessionDescription::offer(format!(
            "offer-{}-{}",
            self.party, self.epoch
        )))
    }

    async fn create_answer(&self) -> anyhow::Result<SessionDescription> {
        self.record(PeerCall::CreateAnswer);
        Ok(SessionDescription::answer(format!(
            "answer-{}-{}",
            self.party, self.epoch
        )))
    }

    async fn set_local_description(&self, description: SessionDescription) -> anyhow::Result<()> {
        self.record(PeerCall::SetLocal(description.sdp_type));
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> anyhow::Result<()> {
        self.record(PeerCall::SetRemote(description.sdp_type));
        if self.should_fail(FailStep::SetRemote) {
            anyhow::bail!("remote description rejected");
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> anyhow::Result<()> {
        self.record(PeerCall::AddCandidate(candidate.candidate));
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.record(PeerCall::Close);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out [`MockPeerConnection`]s and lets tests play the role of the
/// network by injecting peer events.
#[derive(Clone, Default)]
pub struct MockPeerConnector {
    connections: Arc<Mutex<Vec<Arc<MockPeerConnection>>>>,
    senders: Arc<Mutex<HashMap<(PartyId, u64), mpsc::Sender<PeerEvent>>>>,
    failures: Arc<Mutex<HashMap<PartyId, FailStep>>>,
}

impl MockPeerConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, party: &str, step: FailStep) {
        self.failures
            .lock()
            .unwrap()
            .insert(PartyId::from(party), step);
    }

    pub fn heal(&self, party: &str) {
        self.failures.lock().unwrap().remove(&PartyId::from(party));
    }

    /// Every connection created for `party`, oldest first.
    pub fn connections(&self, party: &str) -> Vec<Arc<MockPeerConnection>> {
        let party = PartyId::from(party);
        self.connections
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.party == party)
            .cloned()
            .collect()
    }

    pub fn latest(&self, party: &str) -> Option<Arc<MockPeerConnection>> {
        self.connections(party).pop()
    }

    pub fn total(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub async fn inject(&self, party: &str, epoch: u64, kind: PeerEventKind) {
        let party = PartyId::from(party);
        let sender = self
            .senders
            .lock()
            .unwrap()
            .get(&(party.clone(), epoch))
            .cloned()
            .expect("no connection with this epoch");

        sender
            .send(PeerEvent { party, epoch, kind })
            .await
            .expect("session stopped");
    }

    /// Reports ICE connectivity on the latest connection of `party`.
    pub async fn connectivity(&self, party: &str, connectivity: IceConnectivity) {
        let epoch = self.latest(party).expect("no connection").epoch;
        self.inject(party, epoch, PeerEventKind::Connectivity(connectivity))
            .await;
    }
}

#[async_trait]
impl PeerConnector for MockPeerConnector {
    async fn connect(
        &self,
        party: &PartyId,
        epoch: u64,
        events: mpsc::Sender<PeerEvent>,
    ) -> anyhow::Result<Arc<dyn PeerConnection>> {
        if self.failures.lock().unwrap().get(party) == Some(&FailStep::Connect) {
            anyhow::bail!("no network");
        }

        let conn = Arc::new(MockPeerConnection {
            party: party.clone(),
            epoch,
            calls: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            failures: self.failures.clone(),
        });

        self.connections.lock().unwrap().push(conn.clone());
        self.senders
            .lock()
            .unwrap()
            .insert((party.clone(), epoch), events);

        Ok(conn)
    }
}
