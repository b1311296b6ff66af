use crate::media::{CaptureSource, Facing, SourceKind};
use crate::negotiation::NegotiationMode;
use bmate_core::IceServerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAddress {
    #[serde(alias = "ipAddress")]
    pub address: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebRtcConfig {
    #[serde(default)]
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for WebRtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Serial device the motor controller is attached to.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub sources: Vec<CaptureSource>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                CaptureSource {
                    id: "front-camera".into(),
                    kind: SourceKind::Video,
                    facing: Some(Facing::Front),
                    label: None,
                },
                CaptureSource {
                    id: "microphone".into(),
                    kind: SourceKind::Audio,
                    facing: None,
                    label: None,
                },
            ],
        }
    }
}

/// Application configuration, read from the same JSON document the mobile
/// client used (`bconfig/configs.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RobotConfig {
    pub use_secure_server: bool,
    pub socket_server: ServerAddress,
    pub web_app: ServerAddress,
    #[serde(rename = "webRTC")]
    pub web_rtc: WebRtcConfig,
    pub nick_name: String,
    pub mode: NegotiationMode,
    pub device: DeviceConfig,
    pub media: MediaConfig,
    pub reconnect_delay_ms: u64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            use_secure_server: false,
            socket_server: ServerAddress {
                address: "127.0.0.1".into(),
                port: 8989,
                path: Some("/socket".into()),
            },
            web_app: ServerAddress {
                address: "127.0.0.1".into(),
                port: 3000,
                path: None,
            },
            web_rtc: WebRtcConfig::default(),
            nick_name: "BmateRobot".into(),
            mode: NegotiationMode::MultiParty,
            device: DeviceConfig::default(),
            media: MediaConfig::default(),
            reconnect_delay_ms: 2000,
        }
    }
}

impl RobotConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn signaling_url(&self) -> String {
        let scheme = if self.use_secure_server { "wss" } else { "ws" };
        let server = &self.socket_server;
        format!(
            "{}://{}:{}{}",
            scheme,
            server.address,
            server.port,
            server.path.as_deref().unwrap_or("")
        )
    }

    /// Base of the viewer web app, without a trailing slash.
    pub fn web_app_base(&self) -> String {
        let scheme = if self.use_secure_server { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.web_app.address, self.web_app.port)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
