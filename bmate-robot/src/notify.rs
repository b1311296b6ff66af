use crate::error::SessionError;
use bmate_core::MoveInstruction;
use tracing::{error, info, warn};

/// User-facing notifications produced by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Registered { token: String },
    /// Link to share with a viewer, `scheme://host:port/stage/#join/{token}`.
    AccessUrl(String),
    /// Latest move instruction, kept for display only.
    Movement(MoveInstruction),
    Error(SessionError),
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Registered { token } => info!("Registered on relay with token {}", token),
            Notice::AccessUrl(url) => info!("Room access granted: {}", url),
            Notice::Movement(instruction) => info!("Move instruction: {:?}", instruction),
            Notice::Error(err @ (SessionError::NoDevice | SessionError::InvalidInstruction(_))) => {
                warn!("{}", err)
            }
            Notice::Error(err) => error!("{}", err),
        }
    }
}
