use crate::error::SessionError;
use async_trait::async_trait;
use bmate_core::{EventDecodeError, InboundEvent, OutboundEvent, event_names};
use serde_json::Value;
use std::sync::Arc;

/// A named event with its JSON payload, as carried by the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayEvent {
    pub name: String,
    pub payload: Value,
}

impl RelayEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    pub fn connect() -> Self {
        Self::new(event_names::CONNECT, Value::Null)
    }

    pub fn disconnect(reason: impl Into<String>) -> Self {
        Self::new(event_names::DISCONNECT, Value::String(reason.into()))
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::new(event_names::ERROR, Value::String(reason.into()))
    }
}

/// Emit side of the relay connection. Inbound events are delivered to the
/// session as [`RelayEvent`]s by whoever owns the connection.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn emit(&self, event: &str, payload: Value) -> anyhow::Result<()>;
}

/// Typed face of the relay: decodes inbound events and encodes outbound ones.
#[derive(Clone)]
pub struct SignalingChannel {
    transport: Arc<dyn SignalingTransport>,
}

impl SignalingChannel {
    pub fn new(transport: Arc<dyn SignalingTransport>) -> Self {
        Self { transport }
    }

    pub async fn send(&self, event: OutboundEvent) -> Result<(), SessionError> {
        let payload = event
            .payload()
            .map_err(|e| SessionError::Protocol(format!("cannot encode `{}`: {e}", event.name())))?;

        self.transport
            .emit(event.name(), payload)
            .await
            .map_err(|e| SessionError::Transport(format!("{e:#}")))
    }

    pub fn decode(&self, event: RelayEvent) -> Result<InboundEvent, EventDecodeError> {
        InboundEvent::decode(&event.name, event.payload)
    }
}
