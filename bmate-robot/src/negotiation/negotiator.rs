use crate::error::SessionError;
use crate::media::{LocalMediaSession, LocalStream, MediaStatus};
use crate::negotiation::{NegotiationEvent, NegotiationMode, NegotiationRole, NegotiationState};
use crate::notify::{Notice, Notifier};
use crate::session::{PartyDirectory, PartyRegistry, RemoteParty};
use crate::signaling::SignalingChannel;
use crate::transport::{
    IceConnectivity, OfferOptions, PeerConnection, PeerConnector, PeerEvent, PeerEventKind,
};
use anyhow::Context;
use bmate_core::{
    IceCandidate, OutboundEvent, PartyId, SessionDescription, SignalPayload, SignalingMessage,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A negotiation request that arrived before local media settled.
#[derive(Debug, Clone)]
enum Deferred {
    Offer {
        party: PartyId,
        address: Option<PartyId>,
    },
    Answer {
        party: PartyId,
        address: Option<PartyId>,
        description: SessionDescription,
        legacy: bool,
    },
}

impl Deferred {
    fn party(&self) -> &PartyId {
        match self {
            Deferred::Offer { party, .. } | Deferred::Answer { party, .. } => party,
        }
    }
}

/// Drives the offer/answer/candidate exchange with every remote party.
///
/// Each party moves through [`NegotiationState`] independently: a failure
/// with one party is reported and leaves the others untouched.
pub struct Negotiator {
    registry: PartyRegistry,
    connector: Arc<dyn PeerConnector>,
    channel: SignalingChannel,
    notifier: Arc<dyn Notifier>,
    peer_tx: mpsc::Sender<PeerEvent>,
    mode: NegotiationMode,
    local_id: Option<PartyId>,
    media: LocalMediaSession,
    deferred: Vec<Deferred>,
}

impl Negotiator {
    pub fn new(
        mode: NegotiationMode,
        connector: Arc<dyn PeerConnector>,
        channel: SignalingChannel,
        notifier: Arc<dyn Notifier>,
        peer_tx: mpsc::Sender<PeerEvent>,
    ) -> Self {
        Self {
            registry: PartyRegistry::new(),
            connector,
            channel,
            notifier,
            peer_tx,
            mode,
            local_id: None,
            media: LocalMediaSession::new(),
            deferred: Vec::new(),
        }
    }

    pub fn registry(&self) -> &PartyRegistry {
        &self.registry
    }

    pub fn directory(&self) -> PartyDirectory {
        self.registry.directory()
    }

    pub fn media_status(&self) -> &MediaStatus {
        self.media.status()
    }

    /// Session token used as `from` of outbound messages. New negotiations
    /// are refused while it is unset.
    pub fn set_local_identity(&mut self, id: Option<PartyId>) {
        self.local_id = id;
    }

    pub fn local_identity(&self) -> Option<&PartyId> {
        self.local_id.as_ref()
    }

    pub fn add_party(&mut self, id: PartyId) {
        self.registry.add_party(id);
    }

    pub async fn remove_party(&mut self, id: &PartyId) {
        let before = self.deferred.len();
        self.deferred.retain(|d| d.party() != id);
        if self.deferred.len() != before {
            info!("Dropping pending negotiation request of {}", id);
        }

        self.discard_party(id).await;
    }

    /// Closes every connection and forgets every party.
    pub async fn reset(&mut self) {
        self.deferred.clear();
        for party in self.registry.clear() {
            close_connection(&party).await;
        }
    }

    pub async fn media_settled(&mut self, result: Result<LocalStream, SessionError>) {
        if let Err(err) = &result {
            self.report(err.clone());
        }
        self.media.settle(result);

        for request in std::mem::take(&mut self.deferred) {
            debug!("Resuming negotiation request of {}", request.party());
            match request {
                Deferred::Offer { party, address } => self.start_offer(party, address).await,
                Deferred::Answer {
                    party,
                    address,
                    description,
                    legacy,
                } => self.start_answer(party, address, description, legacy).await,
            }
        }
    }

    pub async fn handle_signal(&mut self, msg: SignalingMessage) {
        if let (Some(to), Some(local)) = (&msg.to, &self.local_id)
            && to != local
        {
            debug!("Ignoring {} addressed to {}", msg.kind(), to);
            return;
        }

        let (party, address) = match self.mode {
            NegotiationMode::MultiParty => {
                let Some(from) = msg.from else {
                    self.report(SessionError::Protocol(format!(
                        "`{}` message without sender",
                        msg.payload.kind()
                    )));
                    return;
                };
                (from.clone(), Some(from))
            }
            NegotiationMode::SinglePeer => (PartyId::session_peer(), msg.from),
        };

        match msg.payload {
            SignalPayload::RequestOffer => self.request_offer(party, address).await,
            SignalPayload::ViewerOffer(description) => {
                self.accept_offer(party, address, description, false).await
            }
            SignalPayload::Offer(description) => {
                self.accept_offer(party, address, description, true).await
            }
            SignalPayload::Answer(description) | SignalPayload::ViewerOfferAnswer(description) => {
                self.apply_answer(&party, description).await
            }
            SignalPayload::Candidate(candidate) => self.add_candidate(&party, candidate).await,
        }
    }

    pub async fn handle_peer_event(&mut self, event: PeerEvent) {
        let Some(party) = self.registry.find(&event.party) else {
            debug!("Dropping peer event of unknown party {}", event.party);
            return;
        };
        if party.epoch != event.epoch {
            debug!(
                "Dropping stale peer event of {} (epoch {} != {})",
                event.party, event.epoch, party.epoch
            );
            return;
        }

        match event.kind {
            PeerEventKind::CandidateGathered(candidate) => {
                self.emit(&event.party, SignalPayload::Candidate(candidate))
                    .await;
            }
            PeerEventKind::Connectivity(connectivity) => {
                self.on_connectivity(&event.party, connectivity)
            }
        }
    }

    fn on_connectivity(&mut self, id: &PartyId, connectivity: IceConnectivity) {
        let Some(party) = self.registry.find(id) else {
            return;
        };
        if party.state == NegotiationState::Failed {
            debug!("Ignoring {:?} for failed party {}", connectivity, id);
            return;
        }

        if connectivity.is_established() {
            match self.registry.apply(id, NegotiationEvent::IceConnected) {
                Ok(_) => info!("Party {} connected", id),
                Err(err) => self.report(err),
            }
        } else if connectivity.is_lost() {
            if let Err(err) = self.registry.apply(id, NegotiationEvent::IceFailed) {
                self.report(err);
                return;
            }
            self.report(SessionError::Negotiation {
                party: id.clone(),
                reason: format!("ice connectivity {connectivity:?}"),
            });
        }
    }

    async fn request_offer(&mut self, id: PartyId, address: Option<PartyId>) {
        if !self.gate(&id) {
            return;
        }
        if !self.media.is_settled() {
            self.defer(Deferred::Offer { party: id, address });
            return;
        }
        self.start_offer(id, address).await;
    }

    async fn accept_offer(
        &mut self,
        id: PartyId,
        address: Option<PartyId>,
        description: SessionDescription,
        legacy: bool,
    ) {
        if !self.gate(&id) {
            return;
        }
        if !self.media.is_settled() {
            self.defer(Deferred::Answer {
                party: id,
                address,
                description,
                legacy,
            });
            return;
        }
        self.start_answer(id, address, description, legacy).await;
    }

    fn gate(&self, id: &PartyId) -> bool {
        if self.local_id.is_some() {
            return true;
        }
        self.report(SessionError::Registration(format!(
            "not registered, refusing negotiation with {id}"
        )));
        false
    }

    fn defer(&mut self, request: Deferred) {
        debug!("Local media pending, deferring request of {}", request.party());
        self.registry.add_party(request.party().clone());
        self.deferred.retain(|d| d.party() != request.party());
        self.deferred.push(request);
    }

    async fn start_offer(&mut self, id: PartyId, address: Option<PartyId>) {
        let rebuild = self
            .registry
            .find(&id)
            .is_some_and(|p| p.state == NegotiationState::Failed);
        if rebuild {
            info!("Rebuilding failed party {}", id);
            self.discard_party(&id).await;
        }

        if !self.prepare(&id, address, NegotiationRole::Offerer, NegotiationEvent::OfferSent) {
            return;
        }
        if let Err(err) = self.send_offer(&id).await {
            self.fail(&id, err);
        }
    }

    async fn start_answer(
        &mut self,
        id: PartyId,
        address: Option<PartyId>,
        description: SessionDescription,
        legacy: bool,
    ) {
        if !self.prepare(&id, address, NegotiationRole::Answerer, NegotiationEvent::AnswerSent) {
            return;
        }
        if let Err(err) = self.send_answer(&id, description, legacy).await {
            self.fail(&id, err);
        }
    }

    /// Creates the party if needed and checks that `event` may follow its
    /// current state before any work is done.
    fn prepare(
        &mut self,
        id: &PartyId,
        address: Option<PartyId>,
        role: NegotiationRole,
        event: NegotiationEvent,
    ) -> bool {
        let party = self.registry.add_party(id.clone());
        if let Err(illegal) = party.state.next(event) {
            let err = SessionError::IllegalTransition {
                party: id.clone(),
                state: illegal.state,
                event: illegal.event,
            };
            self.report(err);
            return false;
        }

        party.role = Some(role);
        if address.is_some() {
            party.address = address;
        }
        true
    }

    async fn send_offer(&mut self, id: &PartyId) -> Result<(), SessionError> {
        let conn = self.ensure_connection(id).await?;
        self.attach_local_media(id, &conn).await?;

        let offer = conn
            .create_offer(OfferOptions::default())
            .await
            .context("create offer")
            .map_err(|e| SessionError::negotiation(id, e))?;
        conn.set_local_description(offer.clone())
            .await
            .context("set local offer")
            .map_err(|e| SessionError::negotiation(id, e))?;

        self.registry.apply(id, NegotiationEvent::OfferSent)?;
        info!("Sending offer to {}", id);
        self.send_to(id, SignalPayload::Offer(offer)).await
    }

    async fn send_answer(
        &mut self,
        id: &PartyId,
        description: SessionDescription,
        legacy: bool,
    ) -> Result<(), SessionError> {
        let conn = self.ensure_connection(id).await?;
        self.attach_local_media(id, &conn).await?;
        self.set_remote(id, &conn, description).await?;

        let answer = conn
            .create_answer()
            .await
            .context("create answer")
            .map_err(|e| SessionError::negotiation(id, e))?;
        conn.set_local_description(answer.clone())
            .await
            .context("set local answer")
            .map_err(|e| SessionError::negotiation(id, e))?;

        self.registry.apply(id, NegotiationEvent::AnswerSent)?;
        info!("Sending answer to {}", id);
        let payload = if legacy {
            SignalPayload::Answer(answer)
        } else {
            SignalPayload::ViewerOfferAnswer(answer)
        };
        self.send_to(id, payload).await
    }

    async fn apply_answer(&mut self, id: &PartyId, description: SessionDescription) {
        let Some(party) = self.registry.find(id) else {
            debug!("Dropping answer of unknown party {}", id);
            return;
        };
        if let Err(illegal) = party.state.next(NegotiationEvent::RemoteAnswerApplied) {
            self.report(SessionError::IllegalTransition {
                party: id.clone(),
                state: illegal.state,
                event: illegal.event,
            });
            return;
        }
        let Some(conn) = party.connection.clone() else {
            return;
        };

        if let Err(err) = self.finish_offer(id, &conn, description).await {
            self.fail(id, err);
        }
    }

    async fn finish_offer(
        &mut self,
        id: &PartyId,
        conn: &Arc<dyn PeerConnection>,
        description: SessionDescription,
    ) -> Result<(), SessionError> {
        self.set_remote(id, conn, description).await?;
        self.registry.apply(id, NegotiationEvent::RemoteAnswerApplied)?;
        info!("Answer of {} applied", id);
        Ok(())
    }

    async fn add_candidate(&mut self, id: &PartyId, candidate: IceCandidate) {
        let Some(party) = self.registry.find_mut(id) else {
            debug!("Dropping candidate of unknown party {}", id);
            return;
        };

        let conn = match &party.connection {
            Some(conn) if party.remote_description_set => conn.clone(),
            _ => {
                debug!("Buffering candidate of {} until its description is set", id);
                if let Some(evicted) = party.buffer_candidate(candidate) {
                    debug!("Candidate buffer of {} full, dropped {}", id, evicted.candidate);
                }
                return;
            }
        };

        if let Err(e) = conn.add_ice_candidate(candidate).await {
            warn!("Failed to add ICE candidate for {}: {:#}", id, e);
        }
    }

    async fn set_remote(
        &mut self,
        id: &PartyId,
        conn: &Arc<dyn PeerConnection>,
        description: SessionDescription,
    ) -> Result<(), SessionError> {
        conn.set_remote_description(description)
            .await
            .context("set remote description")
            .map_err(|e| SessionError::negotiation(id, e))?;

        let pending = match self.registry.find_mut(id) {
            Some(party) => {
                party.remote_description_set = true;
                std::mem::take(&mut party.pending_candidates)
            }
            None => Vec::new(),
        };

        for candidate in pending {
            if let Err(e) = conn.add_ice_candidate(candidate).await {
                warn!("Failed to add buffered ICE candidate for {}: {:#}", id, e);
            }
        }
        Ok(())
    }

    async fn ensure_connection(
        &mut self,
        id: &PartyId,
    ) -> Result<Arc<dyn PeerConnection>, SessionError> {
        if let Some(conn) = self.registry.find(id).and_then(|p| p.connection.clone()) {
            return Ok(conn);
        }

        let epoch = self.registry.next_epoch();
        let conn = self
            .connector
            .connect(id, epoch, self.peer_tx.clone())
            .await
            .map_err(|e| SessionError::negotiation(id, e))?;

        if let Some(party) = self.registry.find_mut(id) {
            party.connection = Some(conn.clone());
            party.epoch = epoch;
        }
        Ok(conn)
    }

    async fn attach_local_media(
        &mut self,
        id: &PartyId,
        conn: &Arc<dyn PeerConnection>,
    ) -> Result<(), SessionError> {
        let Some(stream) = self.media.stream().cloned() else {
            return Ok(());
        };
        let needed = self.registry.find(id).is_some_and(|p| {
            p.stream.is_none()
                && matches!(
                    p.state,
                    NegotiationState::Idle | NegotiationState::LocalMediaReady
                )
        });
        if !needed {
            return Ok(());
        }

        conn.attach_stream(&stream)
            .await
            .context("attach local stream")
            .map_err(|e| SessionError::negotiation(id, e))?;
        self.registry.apply(id, NegotiationEvent::MediaAttached)?;

        if let Some(party) = self.registry.find_mut(id) {
            party.stream = Some(stream);
        }
        Ok(())
    }

    /// Sends a signaling message to the party, failing its negotiation when
    /// the relay cannot take it.
    async fn emit(&mut self, id: &PartyId, payload: SignalPayload) {
        if let Err(err) = self.send_to(id, payload).await {
            self.fail(id, err);
        }
    }

    async fn send_to(&self, id: &PartyId, payload: SignalPayload) -> Result<(), SessionError> {
        let mut msg = SignalingMessage::new(payload);
        msg.from = self.local_id.clone();
        msg.to = self.registry.find(id).and_then(|p| p.address.clone());

        self.channel.send(OutboundEvent::Signaling(msg)).await
    }

    /// Reports `err`. Unless it is an illegal transition the party moves to
    /// `failed`.
    fn fail(&mut self, id: &PartyId, err: SessionError) {
        let illegal = matches!(err, SessionError::IllegalTransition { .. });
        self.report(err);
        if illegal {
            return;
        }

        let live = self
            .registry
            .find(id)
            .is_some_and(|p| p.state != NegotiationState::Failed);
        if live {
            let _ = self.registry.apply(id, NegotiationEvent::Error);
        }
    }

    async fn discard_party(&mut self, id: &PartyId) {
        if let Some(party) = self.registry.remove_party(id) {
            close_connection(&party).await;
        }
    }

    fn report(&self, err: SessionError) {
        self.notifier.notify(Notice::Error(err));
    }
}

async fn close_connection(party: &RemoteParty) {
    let Some(conn) = &party.connection else {
        return;
    };
    if let Err(e) = conn.close().await {
        warn!("Failed to close connection of {}: {:#}", party.id, e);
    }
}
