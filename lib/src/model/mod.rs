pub mod adam;
pub mod metrics;
pub mod network;
pub mod training;
pub mod types;

pub use metrics::EvaluationReport;
pub use network::Network;
pub use training::{fit, TrainedModel};
pub use types::*;
