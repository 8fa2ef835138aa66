pub mod capabilities;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod subcommands;
pub mod utils;

pub use capabilities::Capabilities;
pub use error::{DataError, Result};
pub use pipeline::{run_pipeline, PipelineOutput};
