use crate::nutrition::DEFAULT_FOOD;
use capture::CaptureConfig;
use common::{env_opt, env_or};
use inference::InferenceConfig;
use std::path::PathBuf;

pub const DEFAULT_TRIGGER_EVERY_TICKS: u64 = 30;

/// Settings for the `food-lens` loop, on top of the capture and inference
/// configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub inference: InferenceConfig,
    pub trigger_every_ticks: u64,
    pub max_ticks: Option<u64>,
    pub default_food: String,
    pub nutrition_table_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let trigger_every_ticks = env_or("TRIGGER_EVERY_TICKS", DEFAULT_TRIGGER_EVERY_TICKS);
        if trigger_every_ticks == 0 {
            anyhow::bail!("TRIGGER_EVERY_TICKS must be at least 1");
        }

        Ok(Self {
            capture: CaptureConfig::from_env()?,
            inference: InferenceConfig::from_env()?,
            trigger_every_ticks,
            max_ticks: env_opt("MAX_TICKS"),
            default_food: env_or("DEFAULT_FOOD", DEFAULT_FOOD.to_string()),
            nutrition_table_path: env_opt("NUTRITION_TABLE_PATH"),
        })
    }
}
