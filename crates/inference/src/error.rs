use capture::CaptureError;
use imaging::ImagingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No frame available for inference")]
    NoFrameAvailable,

    #[error("Frame capture failed: {0}")]
    Capture(CaptureError),

    #[error("Preprocessing failed: {0}")]
    Imaging(#[from] ImagingError),

    #[error("An inference pass is already in flight")]
    Busy,

    #[error("Detection session has ended")]
    SessionEnded,

    #[error("Result discarded: session ended while inference was running")]
    Discarded,

    #[error("No async runtime available to run inference")]
    NoRuntime,

    #[error("Inference failed: {0}")]
    InferenceFailure(String),
}

impl From<CaptureError> for PipelineError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::NoFrameAvailable => PipelineError::NoFrameAvailable,
            other => PipelineError::Capture(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Class id {0} has no entry in the label table")]
    UnknownLabel(i64),

    #[error("Failed to read label file: {0}")]
    Io(#[from] std::io::Error),
}
