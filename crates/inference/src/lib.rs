pub mod backend;
pub mod config;
pub mod error;
pub mod labels;
pub mod pipeline;

pub mod processing {
    pub mod post;
    pub mod pre;
}

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, RawDetectionOutput, replay::ReplayBackend};
pub use config::{BackendKind, InferenceConfig};
pub use error::{LabelError, PipelineError};
pub use labels::LabelTable;
pub use pipeline::{DetectionPipeline, DetectionSnapshot, PassResult, PendingInference};
pub use processing::post::{BoundingBox, Detection, PostProcessor};
pub use processing::pre::PreProcessor;
