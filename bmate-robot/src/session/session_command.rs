use crate::config::RobotConfig;
use crate::hardware::CommandSink;
use crate::negotiation::NegotiationMode;
use std::fmt;
use std::sync::Arc;

/// Commands the local operator sends to a running session.
pub enum SessionCommand {
    /// Ask the relay for a room access token to share with viewers.
    RequestRoomAccess,

    /// Retry registration with the relay.
    Register,

    /// The motor controller became available.
    AttachDevice(Arc<dyn CommandSink>),

    /// The motor controller went away.
    DetachDevice,

    Shutdown,
}

impl fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionCommand::RequestRoomAccess => f.write_str("RequestRoomAccess"),
            SessionCommand::Register => f.write_str("Register"),
            SessionCommand::AttachDevice(_) => f.write_str("AttachDevice"),
            SessionCommand::DetachDevice => f.write_str("DetachDevice"),
            SessionCommand::Shutdown => f.write_str("Shutdown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub nick_name: String,
    pub mode: NegotiationMode,
    /// `scheme://host:port` of the viewer web app.
    pub web_app_base: String,
}

impl SessionSettings {
    pub fn from_config(config: &RobotConfig) -> Self {
        Self {
            nick_name: config.nick_name.clone(),
            mode: config.mode,
            web_app_base: config.web_app_base(),
        }
    }

    pub fn access_url(&self, access_token: &str) -> String {
        format!("{}/stage/#join/{}", self.web_app_base, access_token)
    }
}
