use async_trait::async_trait;
use bmate_core::{SignalKind, SignalingMessage, event_names};
use bmate_robot::SignalingTransport;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Relay stand-in that records everything the session emits.
#[derive(Clone, Default)]
pub struct MockSignaling {
    sent: Arc<Mutex<Vec<(String, Value)>>>,
    offline: Arc<AtomicBool>,
}

impl MockSignaling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.sent().iter().filter(|(name, _)| name == event).count()
    }

    /// Decoded `signaling_message` emissions, in order.
    pub fn signals(&self) -> Vec<SignalingMessage> {
        self.sent()
            .into_iter()
            .filter(|(name, _)| name == event_names::SIGNALING_MESSAGE)
            .map(|(_, payload)| serde_json::from_value(payload).unwrap())
            .collect()
    }

    pub fn signals_of(&self, kind: SignalKind) -> Vec<SignalingMessage> {
        self.signals()
            .into_iter()
            .filter(|msg| msg.kind() == kind)
            .collect()
    }
}

#[async_trait]
impl SignalingTransport for MockSignaling {
    async fn emit(&self, event: &str, payload: Value) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            anyhow::bail!("not connected to relay");
        }
        self.sent.lock().unwrap().push((event.to_owned(), payload));
        Ok(())
    }
}
