mod config;
mod error;

pub mod media;
pub mod proximity;
pub mod session;
pub mod signaling;
pub mod spatial;
pub mod transport;

pub use config::*;
pub use error::*;
pub use media::*;
pub use proximity::*;
pub use session::*;
pub use signaling::*;
pub use spatial::*;
pub use transport::*;
