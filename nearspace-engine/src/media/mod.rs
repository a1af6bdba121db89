mod local_track;
mod media_source_manager;

pub use local_track::*;
pub use media_source_manager::*;
