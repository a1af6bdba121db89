
pub use mock_signaling::*;
pub use mock_transport::*;
