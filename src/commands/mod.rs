mod cluster;
mod util;

pub use cluster::Cluster;
