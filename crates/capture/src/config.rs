use common::env_or;

pub use common::Environment;

pub const DEFAULT_FRAMES_GLOB: &str = "frames/*.png";
pub const DEFAULT_TARGET_FPS: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub environment: Environment,
    pub frames_glob: String,
    pub target_fps: f64,
}

impl CaptureConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();
        let frames_glob = env_or("FRAMES_GLOB", DEFAULT_FRAMES_GLOB.to_string());
        let target_fps = env_or("TARGET_FPS", DEFAULT_TARGET_FPS);

        if !(target_fps.is_finite() && target_fps > 0.0) {
            anyhow::bail!("TARGET_FPS must be positive, got {target_fps}");
        }

        Ok(Self {
            environment,
            frames_glob,
            target_fps,
        })
    }

    #[cfg(test)]
    pub fn test_default() -> Self {
        Self {
            environment: Environment::Development,
            frames_glob: DEFAULT_FRAMES_GLOB.to_string(),
            target_fps: DEFAULT_TARGET_FPS,
        }
    }
}
