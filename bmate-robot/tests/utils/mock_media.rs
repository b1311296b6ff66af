use async_trait::async_trait;
use bmate_robot::media::{
    CaptureSource, Facing, LocalStream, MediaConstraints, MediaDevices, SourceKind,
};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Capture devices stand-in. A gated instance holds `open` until
/// [`MockMediaDevices::release`] is called.
#[derive(Clone)]
pub struct MockMediaDevices {
    sources: Vec<CaptureSource>,
    gate: Option<Arc<Semaphore>>,
}

impl MockMediaDevices {
    pub fn with_front_camera() -> Self {
        Self {
            sources: vec![
                CaptureSource {
                    id: "rear".into(),
                    kind: SourceKind::Video,
                    facing: Some(Facing::Back),
                    label: None,
                },
                CaptureSource {
                    id: "front".into(),
                    kind: SourceKind::Video,
                    facing: Some(Facing::Front),
                    label: None,
                },
                CaptureSource {
                    id: "mic".into(),
                    kind: SourceKind::Audio,
                    facing: None,
                    label: None,
                },
            ],
            gate: None,
        }
    }

    pub fn without_camera() -> Self {
        Self {
            sources: vec![CaptureSource {
                id: "mic".into(),
                kind: SourceKind::Audio,
                facing: None,
                label: None,
            }],
            gate: None,
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }
}

#[async_trait]
impl MediaDevices for MockMediaDevices {
    async fn sources(&self) -> anyhow::Result<Vec<CaptureSource>> {
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        Ok(self.sources.clone())
    }

    async fn open(&self, constraints: &MediaConstraints) -> anyhow::Result<LocalStream> {
        Ok(LocalStream {
            id: "local-stream".into(),
            video_source: constraints.video_source.clone(),
            audio: constraints.audio,
        })
    }
}
