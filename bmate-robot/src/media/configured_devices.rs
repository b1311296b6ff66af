use crate::media::{CaptureSource, LocalStream, MediaConstraints, MediaDevices, SourceKind};
use anyhow::bail;
use async_trait::async_trait;
use uuid::Uuid;

/// Media devices described by configuration instead of probed from the
/// platform. Frames for the opened stream are supplied by the capture glue.
pub struct ConfiguredMediaDevices {
    sources: Vec<CaptureSource>,
}

impl ConfiguredMediaDevices {
    pub fn new(sources: Vec<CaptureSource>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl MediaDevices for ConfiguredMediaDevices {
    async fn sources(&self) -> anyhow::Result<Vec<CaptureSource>> {
        Ok(self.sources.clone())
    }

    async fn open(&self, constraints: &MediaConstraints) -> anyhow::Result<LocalStream> {
        let Some(source) = self
            .sources
            .iter()
            .find(|s| s.id == constraints.video_source)
        else {
            bail!("unknown capture source `{}`", constraints.video_source);
        };
        if source.kind != SourceKind::Video {
            bail!("capture source `{}` is not a camera", source.id);
        }

        let has_microphone = self.sources.iter().any(|s| s.kind == SourceKind::Audio);

        Ok(LocalStream {
            id: Uuid::new_v4().to_string(),
            video_source: source.id.clone(),
            audio: constraints.audio && has_microphone,
        })
    }
}
