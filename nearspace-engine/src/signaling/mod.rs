mod relay_client;
mod relay_event;
mod relay_pump;
mod signaling_output;

pub use relay_client::*;
pub use relay_event::*;
pub use relay_pump::*;
pub use signaling_output::*;
