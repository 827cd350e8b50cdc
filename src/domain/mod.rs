// Domain layer: instruction model and the ports the session talks through.

pub mod model;
pub mod ports;
