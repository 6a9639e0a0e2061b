// Domain layer: listing/profile models and the ports every source and storage backend implements.

pub mod model;
pub mod ports;
