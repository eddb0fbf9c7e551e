use anyhow::Context;
use capture::{ImageSequenceSource, TickPacing};
use common::{TelemetryGuard, setup_logging};
use inference::{
    BackendKind, DetectionPipeline, InferenceBackend, LabelTable, PostProcessor, PreProcessor,
    ReplayBackend,
};
use panel::{AppConfig, FoodLens, NutritionTable};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    let _telemetry = match &config.inference.otel_endpoint {
        Some(endpoint) => Some(
            TelemetryGuard::init("food-lens", endpoint, config.inference.environment)
                .context("Failed to initialize telemetry")?,
        ),
        None => {
            setup_logging(config.inference.environment);
            None
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    tracing::info!(
        backend = ?config.inference.backend,
        frames = %config.capture.frames_glob,
        target_fps = config.capture.target_fps,
        trigger_every_ticks = config.trigger_every_ticks,
        "Starting food-lens"
    );

    match config.inference.backend {
        BackendKind::Replay => {
            let backend = ReplayBackend::load_model(&config.inference.replay_path)
                .context("Failed to load replay fixtures")?;
            run(config, backend, &shutdown).await
        }
        BackendKind::Ort => run_ort(config, &shutdown).await,
    }
}

#[cfg(feature = "ort-backend")]
async fn run_ort(config: AppConfig, shutdown: &AtomicBool) -> anyhow::Result<()> {
    let backend = inference::backend::ort::OrtBackend::load_model(&config.inference.model_path)
        .context("Failed to load ONNX model")?;
    run(config, backend, shutdown).await
}

#[cfg(not(feature = "ort-backend"))]
async fn run_ort(_config: AppConfig, _shutdown: &AtomicBool) -> anyhow::Result<()> {
    anyhow::bail!("BACKEND=ort requires building with the `ort-backend` feature")
}

async fn run<B: InferenceBackend + 'static>(
    config: AppConfig,
    backend: B,
    shutdown: &AtomicBool,
) -> anyhow::Result<()> {
    let labels = LabelTable::load(&config.inference.labels_path).with_context(|| {
        format!(
            "Failed to load labels from {}",
            config.inference.labels_path.display()
        )
    })?;

    let nutrition = match &config.nutrition_table_path {
        Some(path) => NutritionTable::load(path, &config.default_food)?,
        None => NutritionTable::builtin().with_default(&config.default_food)?,
    };

    let mut preprocessor = PreProcessor::new(
        config.inference.input_size,
        config.inference.normalization()?,
    );
    if let Some(dir) = &config.inference.snapshot_dir {
        preprocessor = preprocessor.with_snapshot_dir(dir);
    }

    let pipeline = DetectionPipeline::new(
        backend,
        preprocessor,
        PostProcessor::new(config.inference.confidence_threshold),
        labels,
    );

    let source = ImageSequenceSource::from_glob(&config.capture.frames_glob)
        .context("No frames to replay")?;

    let mut lens = FoodLens::new(source, pipeline, nutrition, config.trigger_every_ticks);
    let mut pacing = TickPacing::new(config.capture.target_fps);
    let mut last = Instant::now();

    while !shutdown.load(Ordering::Relaxed) {
        if config.max_ticks.is_some_and(|max| lens.ticks() >= max) {
            tracing::info!(ticks = lens.ticks(), "Tick limit reached");
            break;
        }

        tokio::time::sleep(pacing.time_until_next(Instant::now())).await;

        let now = Instant::now();
        lens.tick(now - last);
        last = now;
    }

    let state = lens.state().clone();
    lens.shutdown().await;

    if state.shown {
        tracing::info!(title = %state.title, facts = %state.facts_text, "Final panel");
    } else {
        tracing::info!("No food detected");
    }
    Ok(())
}
