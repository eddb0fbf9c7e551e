use crate::processing::post::DEFAULT_CONFIDENCE_THRESHOLD;
use common::{env_opt, env_or};
use imaging::{DEFAULT_IMAGE_MEAN, DEFAULT_IMAGE_STD, Normalization};
use std::path::PathBuf;
use std::str::FromStr;

pub use common::Environment;

pub const DEFAULT_INPUT_SIZE: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Ort,
    Replay,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ort" | "onnx" => Ok(BackendKind::Ort),
            "replay" => Ok(BackendKind::Replay),
            other => anyhow::bail!("Unknown backend '{other}', expected 'ort' or 'replay'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub environment: Environment,
    pub backend: BackendKind,
    pub model_path: String,
    pub replay_path: String,
    pub labels_path: PathBuf,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub image_mean: f32,
    pub image_std: f32,
    pub snapshot_dir: Option<PathBuf>,
    pub otel_endpoint: Option<String>,
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let backend = match std::env::var("BACKEND") {
            Ok(value) if !value.trim().is_empty() => value.trim().parse()?,
            _ => BackendKind::Replay,
        };

        let config = Self {
            environment,
            backend,
            model_path: env_or("MODEL_PATH", "models/ssd_mobilenet.onnx".to_string()),
            replay_path: env_or("REPLAY_PATH", "models/replay.json".to_string()),
            labels_path: env_or("LABELS_PATH", PathBuf::from("models/labels.txt")),
            input_size: env_or("INPUT_SIZE", DEFAULT_INPUT_SIZE),
            confidence_threshold: env_or("CONFIDENCE_THRESHOLD", DEFAULT_CONFIDENCE_THRESHOLD),
            image_mean: env_or("IMAGE_MEAN", DEFAULT_IMAGE_MEAN),
            image_std: env_or("IMAGE_STD", DEFAULT_IMAGE_STD),
            snapshot_dir: env_opt("SNAPSHOT_DIR"),
            otel_endpoint: env_opt("OTEL_ENDPOINT"),
        };

        if config.input_size == 0 {
            anyhow::bail!("INPUT_SIZE must be positive");
        }
        config.normalization()?;

        Ok(config)
    }

    pub fn normalization(&self) -> anyhow::Result<Normalization> {
        Ok(Normalization::new(self.image_mean, self.image_std)?)
    }

    /// Create default configuration for testing
    #[cfg(test)]
    pub fn test_default() -> Self {
        Self {
            environment: Environment::Development,
            backend: BackendKind::Replay,
            model_path: "/models/model.onnx".to_string(),
            replay_path: "/models/replay.json".to_string(),
            labels_path: PathBuf::from("/models/labels.txt"),
            input_size: DEFAULT_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            image_mean: DEFAULT_IMAGE_MEAN,
            image_std: DEFAULT_IMAGE_STD,
            snapshot_dir: None,
            otel_endpoint: None,
        }
    }
}
