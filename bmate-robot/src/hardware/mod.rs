mod command_dispatcher;
mod device_sink;

pub use command_dispatcher::*;
pub use device_sink::*;
