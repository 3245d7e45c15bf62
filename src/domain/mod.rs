// Domain layer: records and ports. Nothing here knows how rows are stored.

pub mod model;
pub mod ports;
