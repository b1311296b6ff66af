mod configured_devices;
mod local_media;
mod media_coordinator;
mod media_devices;

pub use configured_devices::*;
pub use local_media::*;
pub use media_coordinator::*;
pub use media_devices::*;
