use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Front,
    Back,
}

/// A capture source as reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSource {
    pub id: String,
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing: Option<Facing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CaptureSource {
    pub fn is_front_video(&self) -> bool {
        self.kind == SourceKind::Video && self.facing == Some(Facing::Front)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video_source: String,
}

/// Handle to an acquired local audio/video stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStream {
    pub id: String,
    pub video_source: String,
    pub audio: bool,
}

/// Camera/microphone access of the host platform.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn sources(&self) -> anyhow::Result<Vec<CaptureSource>>;

    async fn open(&self, constraints: &MediaConstraints) -> anyhow::Result<LocalStream>;
}
