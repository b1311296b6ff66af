use crate::signaling::{RelayEvent, SignalingTransport};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

/// Wire frame of the relay, both directions.
#[derive(Debug, Serialize, Deserialize)]
struct RelayFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

enum PumpEnd {
    Lost(String),
    Stopped,
}

/// WebSocket connection to the relay, re-established after every loss.
///
/// Inbound frames are forwarded as [`RelayEvent`]s, preceded by a synthetic
/// `connect` when the socket opens and followed by `disconnect` when it
/// closes. Emitting while the socket is down fails.
pub struct WsTransport {
    out_tx: mpsc::UnboundedSender<Message>,
    connected: Arc<AtomicBool>,
}

impl WsTransport {
    pub fn spawn(
        url: String,
        reconnect_delay: Duration,
        inbound: mpsc::Sender<RelayEvent>,
    ) -> (Self, JoinHandle<()>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        let handle = tokio::spawn(supervise(
            url,
            reconnect_delay,
            inbound,
            out_rx,
            connected.clone(),
        ));

        (Self { out_tx, connected }, handle)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalingTransport for WsTransport {
    async fn emit(&self, event: &str, payload: Value) -> anyhow::Result<()> {
        if !self.is_connected() {
            bail!("not connected to relay");
        }

        let frame = serde_json::to_string(&RelayFrame {
            event: event.to_owned(),
            data: payload,
        })?;

        self.out_tx
            .send(Message::Text(frame.into()))
            .map_err(|_| anyhow!("relay transport stopped"))?;
        Ok(())
    }
}

async fn supervise(
    url: String,
    reconnect_delay: Duration,
    inbound: mpsc::Sender<RelayEvent>,
    mut out_rx: mpsc::UnboundedReceiver<Message>,
    connected: Arc<AtomicBool>,
) {
    info!("Relay transport started for {}", url);

    loop {
        let event = match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!("Connected to relay at {}", url);

                // frames queued for a previous connection are stale
                while out_rx.try_recv().is_ok() {}
                connected.store(true, Ordering::SeqCst);

                if inbound.send(RelayEvent::connect()).await.is_err() {
                    break;
                }

                let end = pump(socket, &mut out_rx, &inbound).await;
                connected.store(false, Ordering::SeqCst);

                match end {
                    PumpEnd::Lost(reason) => {
                        warn!("Relay connection lost: {}", reason);
                        RelayEvent::disconnect(reason)
                    }
                    PumpEnd::Stopped => break,
                }
            }
            Err(e) => {
                warn!("Failed to connect to relay at {}: {}", url, e);
                RelayEvent::error(e.to_string())
            }
        };

        if inbound.send(event).await.is_err() {
            break;
        }
        tokio::time::sleep(reconnect_delay).await;
    }

    info!("Relay transport stopped");
}

async fn pump(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    out_rx: &mut mpsc::UnboundedReceiver<Message>,
    inbound: &mpsc::Sender<RelayEvent>,
) -> PumpEnd {
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            out = out_rx.recv() => {
                let Some(msg) = out else {
                    let _ = sender.close().await;
                    return PumpEnd::Stopped;
                };
                if let Err(e) = sender.send(msg).await {
                    return PumpEnd::Lost(e.to_string());
                }
            }

            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<RelayFrame>(text.as_str()) {
                        Ok(frame) => {
                            debug!("Relay event received: {}", frame.event);
                            let event = RelayEvent::new(frame.event, frame.data);
                            if inbound.send(event).await.is_err() {
                                let _ = sender.close().await;
                                return PumpEnd::Stopped;
                            }
                        }
                        Err(e) => warn!("Invalid relay frame: {:?}", e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return PumpEnd::Lost("closed by relay".into());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return PumpEnd::Lost(e.to_string()),
            }
        }
    }
}
