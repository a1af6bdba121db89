mod orchestrator_handle;
mod peer_session;
mod remote_streams;
mod session_command;
mod session_orchestrator;
mod session_worker;

pub use orchestrator_handle::*;
pub use peer_session::*;
pub use remote_streams::*;
pub use session_command::*;
pub use session_orchestrator::*;
pub use session_worker::*;
