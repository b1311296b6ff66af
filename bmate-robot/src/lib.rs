pub mod config;
mod error;
pub mod hardware;
pub mod media;
pub mod negotiation;
mod notify;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::{ConfigError, RobotConfig};
pub use error::SessionError;
pub use hardware::{CommandDispatcher, CommandSink, DeviceFileSink};
pub use media::{CaptureSource, LocalStream, MediaCoordinator, MediaDevices};
pub use negotiation::{NegotiationEvent, NegotiationMode, NegotiationState};
pub use notify::{Notice, Notifier, TracingNotifier};
pub use session::{
    MAX_PENDING_CANDIDATES, PartyDirectory, PartyRegistry, RemoteParty, RobotSession,
    SessionCommand, SessionDeps, SessionSettings,
};
pub use signaling::{RelayEvent, SignalingChannel, SignalingTransport, WsTransport};
pub use transport::{
    IceConnectivity, OfferOptions, PeerConnection, PeerConnector, PeerEvent, PeerEventKind,
    RtcPeerConnector,
};
