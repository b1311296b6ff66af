use crate::error::SessionError;
use crate::hardware::CommandDispatcher;
use crate::media::{LocalStream, MediaCoordinator, MediaDevices};
use crate::negotiation::Negotiator;
use crate::notify::{Notice, Notifier};
use crate::session::{PartyDirectory, SessionCommand, SessionSettings};
use crate::signaling::{RelayEvent, SignalingChannel, SignalingTransport};
use crate::transport::{PeerConnector, PeerEvent};
use bmate_core::{Command, EventDecodeError, InboundEvent, OutboundEvent, PartyId, translate};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// External capabilities a session is built from.
pub struct SessionDeps {
    pub transport: Arc<dyn SignalingTransport>,
    pub connector: Arc<dyn PeerConnector>,
    pub devices: Arc<dyn MediaDevices>,
    pub notifier: Arc<dyn Notifier>,
}

/// The robot side of a session: registers with the relay, negotiates with
/// viewers and forwards their move instructions to the hardware.
pub struct RobotSession {
    settings: SessionSettings,
    channel: SignalingChannel,
    negotiator: Negotiator,
    dispatcher: CommandDispatcher,
    media: MediaCoordinator,
    notifier: Arc<dyn Notifier>,
    command_rx: mpsc::Receiver<SessionCommand>,
    inbound_rx: mpsc::Receiver<RelayEvent>,
    peer_rx: mpsc::Receiver<PeerEvent>,
    media_rx: mpsc::Receiver<Result<LocalStream, SessionError>>,
    media_tx: mpsc::Sender<Result<LocalStream, SessionError>>,
    connected_before: bool,
}

impl RobotSession {
    pub fn new(
        settings: SessionSettings,
        deps: SessionDeps,
        command_rx: mpsc::Receiver<SessionCommand>,
        inbound_rx: mpsc::Receiver<RelayEvent>,
    ) -> Self {
        let (peer_tx, peer_rx) = mpsc::channel(256);
        let (media_tx, media_rx) = mpsc::channel(1);
        let channel = SignalingChannel::new(deps.transport);

        let negotiator = Negotiator::new(
            settings.mode,
            deps.connector,
            channel.clone(),
            deps.notifier.clone(),
            peer_tx,
        );

        Self {
            settings,
            channel,
            negotiator,
            dispatcher: CommandDispatcher::new(deps.notifier.clone()),
            media: MediaCoordinator::new(deps.devices),
            notifier: deps.notifier,
            command_rx,
            inbound_rx,
            peer_rx,
            media_rx,
            media_tx,
            connected_before: false,
        }
    }

    pub fn directory(&self) -> PartyDirectory {
        self.negotiator.directory()
    }

    pub async fn run(mut self) {
        info!("Robot session started as {}", self.settings.nick_name);

        let media = self.media.clone();
        let media_tx = self.media_tx.clone();
        tokio::spawn(async move {
            let _ = media_tx.send(media.acquire().await).await;
        });

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Shutdown) | None => {
                            info!("Shutdown requested");
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                    }
                }

                evt = self.inbound_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_relay_event(e).await,
                        None => {
                            warn!("Relay channel closed unexpectedly");
                            break;
                        }
                    }
                }

                Some(evt) = self.peer_rx.recv() => {
                    self.negotiator.handle_peer_event(evt).await;
                }

                Some(result) = self.media_rx.recv() => {
                    self.negotiator.media_settled(result).await;
                }
            }
        }

        self.negotiator.reset().await;
        self.dispatcher.detach();
        info!("Robot session finished");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        debug!("Session command: {:?}", cmd);

        match cmd {
            SessionCommand::RequestRoomAccess => {
                if let Err(err) = self.channel.send(OutboundEvent::RoomAccess).await {
                    self.report(SessionError::RoomAccess(err.to_string()));
                }
            }
            SessionCommand::Register => self.register().await,
            SessionCommand::AttachDevice(sink) => self.dispatcher.attach(sink),
            SessionCommand::DetachDevice => self.dispatcher.detach(),
            SessionCommand::Shutdown => {}
        }
    }

    async fn handle_relay_event(&mut self, event: RelayEvent) {
        match self.channel.decode(event) {
            Ok(inbound) => self.handle_inbound(inbound).await,
            Err(
                err @ (EventDecodeError::UnknownEvent(_) | EventDecodeError::UnknownSignalType(_)),
            ) => {
                debug!("Ignoring relay event: {}", err);
            }
            Err(err) => self.report(SessionError::Protocol(err.to_string())),
        }
    }

    async fn handle_inbound(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Connected => {
                info!("Connected to relay");
                if self.connected_before {
                    info!("Reconnected, dropping stale negotiations");
                    self.negotiator.reset().await;
                }
                self.connected_before = true;
                self.register().await;
            }

            InboundEvent::TransportError(reason) => {
                self.report(SessionError::Transport(reason));
            }

            InboundEvent::Disconnected(reason) => {
                self.negotiator.set_local_identity(None);
                self.report(SessionError::Transport(format!("disconnected: {reason}")));
            }

            InboundEvent::RegisterSucceeded { token } => {
                info!("Registered on relay");
                self.negotiator
                    .set_local_identity(Some(PartyId::from(token.as_str())));
                self.notifier.notify(Notice::Registered { token });
            }

            InboundEvent::RegisterFailed(reason) => {
                self.report(SessionError::Registration(reason));
            }

            InboundEvent::Movement(instruction) => {
                self.notifier.notify(Notice::Movement(instruction.clone()));

                match translate(&instruction) {
                    Some(command) => self.dispatcher.send(command),
                    None => self.report(SessionError::InvalidInstruction(format!(
                        "{}/{}",
                        instruction.move_type.as_deref().unwrap_or("-"),
                        instruction.direction.as_deref().unwrap_or("-"),
                    ))),
                }
            }

            InboundEvent::Stop { command } => match Command::stop(command.as_deref()) {
                Ok(command) => self.dispatcher.send(command),
                Err(err) => self.report(SessionError::InvalidInstruction(err.to_string())),
            },

            InboundEvent::RoomAccessGranted { access_token } => {
                let url = self.settings.access_url(&access_token);
                self.notifier.notify(Notice::AccessUrl(url));
            }

            InboundEvent::RoomAccessDenied(reason) => {
                self.report(SessionError::RoomAccess(reason));
            }

            InboundEvent::ViewerAdded(id) => self.negotiator.add_party(id),

            InboundEvent::ViewerLeft(id) => self.negotiator.remove_party(&id).await,

            InboundEvent::Signaling(msg) => self.negotiator.handle_signal(msg).await,
        }
    }

    async fn register(&mut self) {
        self.negotiator.set_local_identity(None);

        let event = OutboundEvent::Register {
            nick_name: self.settings.nick_name.clone(),
        };
        if let Err(err) = self.channel.send(event).await {
            self.report(SessionError::Registration(err.to_string()));
        }
    }

    fn report(&self, err: SessionError) {
        self.notifier.notify(Notice::Error(err));
    }
}
