use crate::media::LocalStream;
use crate::transport::{
    IceConnectivity, OfferOptions, PeerConnection, PeerConnector, PeerEvent, PeerEventKind,
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bmate_core::{IceCandidate, IceServerConfig, PartyId, SdpType, SessionDescription};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_H264, MIME_TYPE_OPUS, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Outgoing tracks of one local stream. The same tracks are bound to every
/// peer connection the stream is attached to, so writing a sample once
/// reaches all viewers.
#[derive(Clone)]
pub struct LocalTracks {
    pub video: Arc<TrackLocalStaticSample>,
    pub audio: Option<Arc<TrackLocalStaticSample>>,
}

impl LocalTracks {
    fn new(stream: &LocalStream) -> Self {
        let video = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_H264.to_owned(),
                ..Default::default()
            },
            "video".to_owned(),
            stream.id.clone(),
        ));

        let audio = stream.audio.then(|| {
            Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_OPUS.to_owned(),
                    ..Default::default()
                },
                "audio".to_owned(),
                stream.id.clone(),
            ))
        });

        Self { video, audio }
    }
}

/// webrtc-rs backed [`PeerConnector`].
pub struct RtcPeerConnector {
    ice_servers: Vec<RTCIceServer>,
    tracks: Arc<DashMap<String, LocalTracks>>,
}

impl RtcPeerConnector {
    pub fn new(ice_servers: &[IceServerConfig]) -> Self {
        let ice_servers = ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
            })
            .collect();

        Self {
            ice_servers,
            tracks: Arc::new(DashMap::new()),
        }
    }

    /// Tracks created for `stream_id`, for the capture glue to write samples
    /// into. `None` until the stream is attached to a first connection.
    pub fn local_tracks(&self, stream_id: &str) -> Option<LocalTracks> {
        self.tracks.get(stream_id).map(|t| t.clone())
    }
}

#[async_trait]
impl PeerConnector for RtcPeerConnector {
    async fn connect(
        &self,
        party: &PartyId,
        epoch: u64,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: self.ice_servers.clone(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .with_context(|| format!("Failed to create peer connection for {party}"))?,
        );

        let ice_tx = events.clone();
        let uid_ice = party.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let uid = uid_ice.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let event = PeerEvent {
                    party: uid,
                    epoch,
                    kind: PeerEventKind::CandidateGathered(from_rtc_candidate(init)),
                };
                let _ = tx.send(event).await;
            })
        }));

        let state_tx = events;
        let uid_state = party.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |s: RTCIceConnectionState| {
                let tx = state_tx.clone();
                let uid = uid_state.clone();

                Box::pin(async move {
                    info!("ICE connection state changed for {}: {}", uid, s);
                    let Some(connectivity) = to_connectivity(s) else {
                        return;
                    };
                    let event = PeerEvent {
                        party: uid,
                        epoch,
                        kind: PeerEventKind::Connectivity(connectivity),
                    };
                    let _ = tx.send(event).await;
                })
            },
        ));

        Ok(Arc::new(RtcConnection {
            party: party.clone(),
            peer_connection,
            tracks: self.tracks.clone(),
            media_lines: Mutex::new(MediaLines::default()),
        }))
    }
}

#[derive(Default)]
struct MediaLines {
    audio: bool,
    video: bool,
}

struct RtcConnection {
    party: PartyId,
    peer_connection: Arc<RTCPeerConnection>,
    tracks: Arc<DashMap<String, LocalTracks>>,
    media_lines: Mutex<MediaLines>,
}

impl RtcConnection {
    async fn add_track(&self, track: Arc<TrackLocalStaticSample>) -> Result<()> {
        let sender = self
            .peer_connection
            .add_track(track as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        // RTCP has to be drained for the interceptors to work
        tokio::spawn(async move {
            let mut rtcp_buf = vec![0u8; 1500];
            while let Ok((_, _)) = sender.read(&mut rtcp_buf).await {}
        });

        Ok(())
    }

    async fn add_recvonly(&self, kind: RTPCodecType) -> Result<()> {
        self.peer_connection
            .add_transceiver_from_kind(
                kind,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PeerConnection for RtcConnection {
    async fn attach_stream(&self, stream: &LocalStream) -> Result<()> {
        let tracks = self
            .tracks
            .entry(stream.id.clone())
            .or_insert_with(|| LocalTracks::new(stream))
            .clone();

        let mut lines = self.media_lines.lock().await;
        if !lines.video {
            self.add_track(tracks.video).await?;
            lines.video = true;
        }
        if let Some(audio) = tracks.audio
            && !lines.audio
        {
            self.add_track(audio).await?;
            lines.audio = true;
        }

        debug!("Attached stream {} to connection of {}", stream.id, self.party);
        Ok(())
    }

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription> {
        {
            let mut lines = self.media_lines.lock().await;
            if options.receive_video && !lines.video {
                self.add_recvonly(RTPCodecType::Video).await?;
                lines.video = true;
            }
            if options.receive_audio && !lines.audio {
                self.add_recvonly(RTPCodecType::Audio).await?;
                lines.audio = true;
            }
        }

        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc_description(description)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc_description(description)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_m_line_index,
                username_fragment: candidate.username_fragment,
            })
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

fn to_rtc_description(description: SessionDescription) -> Result<RTCSessionDescription> {
    let desc = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(description.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(description.sdp)?,
        SdpType::Rollback => bail!("rollback descriptions are not supported"),
    };
    Ok(desc)
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn to_connectivity(state: RTCIceConnectionState) -> Option<IceConnectivity> {
    let connectivity = match state {
        RTCIceConnectionState::New => IceConnectivity::New,
        RTCIceConnectionState::Checking => IceConnectivity::Checking,
        RTCIceConnectionState::Connected => IceConnectivity::Connected,
        RTCIceConnectionState::Completed => IceConnectivity::Completed,
        RTCIceConnectionState::Disconnected => IceConnectivity::Disconnected,
        RTCIceConnectionState::Failed => IceConnectivity::Failed,
        RTCIceConnectionState::Closed => IceConnectivity::Closed,
        RTCIceConnectionState::Unspecified => return None,
    };
    Some(connectivity)
}
