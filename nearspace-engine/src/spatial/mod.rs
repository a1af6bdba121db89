mod position_reporter;
mod spatial_model;
mod wall_geometry;

pub use position_reporter::*;
pub use spatial_model::*;
pub use wall_geometry::*;
