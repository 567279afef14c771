pub mod algo;
pub mod error;
pub mod ops;
pub mod pipeline;

#[cfg(feature = "plugin")]
pub mod commands;

pub use error::{Error, Result};
pub use pipeline::{ClusterPoint, ClusteringRequest, ClusteringResponse, PipelineConfig, Topic};

#[cfg(feature = "plugin")]
use nu_plugin::{Plugin, PluginCommand};

#[cfg(feature = "plugin")]
pub struct TopicMapPlugin;

#[cfg(feature = "plugin")]
impl Plugin for TopicMapPlugin {
    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").into()
    }

    fn commands(&self) -> Vec<Box<dyn PluginCommand<Plugin = Self>>> {
        vec![Box::new(commands::Cluster)]
    }
}
