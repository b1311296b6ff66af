use crate::error::SessionError;
use crate::media::{CaptureSource, LocalStream, MediaConstraints, MediaDevices};
use std::sync::Arc;
use tracing::info;

/// Picks the front camera and opens a combined audio+video stream.
#[derive(Clone)]
pub struct MediaCoordinator {
    devices: Arc<dyn MediaDevices>,
}

impl MediaCoordinator {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self { devices }
    }

    pub async fn acquire(&self) -> Result<LocalStream, SessionError> {
        let sources = self
            .devices
            .sources()
            .await
            .map_err(|e| SessionError::Media(format!("failed to list capture sources: {e:#}")))?;

        let source = front_facing_video(&sources)
            .ok_or_else(|| SessionError::Media("no video available in device".into()))?;

        let constraints = MediaConstraints {
            audio: true,
            video_source: source.id.clone(),
        };

        let stream = self
            .devices
            .open(&constraints)
            .await
            .map_err(|e| SessionError::Media(format!("failed to open {}: {e:#}", source.id)))?;

        info!("Local media ready: stream {} from {}", stream.id, source.id);
        Ok(stream)
    }
}

/// First front-facing video source, in device order.
pub fn front_facing_video(sources: &[CaptureSource]) -> Option<&CaptureSource> {
    sources.iter().find(|s| s.is_front_video())
}
