mod signaling_channel;
mod ws_transport;

pub use signaling_channel::*;
pub use ws_transport::*;
