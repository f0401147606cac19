// Domain layer: table model, run settings and ports. No I/O here.

pub mod model;
pub mod ports;
pub mod settings;
