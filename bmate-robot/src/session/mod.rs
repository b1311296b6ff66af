mod party_registry;
mod remote_party;
mod robot_session;
mod session_command;

pub use party_registry::*;
pub use remote_party::*;
pub use robot_session::*;
pub use session_command::*;
