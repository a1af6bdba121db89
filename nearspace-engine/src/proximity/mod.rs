mod participant_store;
mod proximity_engine;
mod visibility;

pub use participant_store::*;
pub use proximity_engine::*;
pub use visibility::*;
