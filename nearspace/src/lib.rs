pub use nearspace_core::model::ParticipantId;

pub mod model {
    pub use nearspace_core::model::*;
}

#[cfg(feature = "engine")]
pub mod engine {
    pub use nearspace_engine::*;
}
