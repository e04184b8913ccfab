mod cluster;
mod release;

pub use cluster::*;
pub use release::*;
