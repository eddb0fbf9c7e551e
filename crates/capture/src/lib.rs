pub mod adapter;
pub mod config;
pub mod error;
pub mod pacing;
pub mod source;

pub use adapter::FrameCapture;
pub use config::CaptureConfig;
pub use error::CaptureError;
pub use pacing::TickPacing;
pub use source::ImageSequenceSource;
