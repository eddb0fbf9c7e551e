use crate::{
    frame_rate::FrameRateMeter,
    nutrition::NutritionTable,
    overlay::{BoxOverlay, OverlayStyle, overlays},
    presentation::PresentationState,
};
use capture::{FrameCapture, ImageSequenceSource};
use inference::{
    DetectionPipeline, DetectionSnapshot, InferenceBackend, PendingInference, PipelineError,
};
use std::sync::Arc;
use std::time::Duration;

/// The per-frame loop of the demo: feeds frames, fires periodic triggers in
/// place of user taps, and folds finished passes into the panel state.
pub struct FoodLens<B> {
    capture: FrameCapture,
    source: ImageSequenceSource,
    pipeline: DetectionPipeline<B>,
    nutrition: NutritionTable,
    state: PresentationState,
    meter: FrameRateMeter,
    style: OverlayStyle,
    pending: Option<PendingInference>,
    collected: Arc<DetectionSnapshot>,
    trigger_every_ticks: u64,
    ticks: u64,
}

impl<B: InferenceBackend + 'static> FoodLens<B> {
    pub fn new(
        source: ImageSequenceSource,
        pipeline: DetectionPipeline<B>,
        nutrition: NutritionTable,
        trigger_every_ticks: u64,
    ) -> Self {
        Self {
            capture: FrameCapture::new(),
            source,
            pipeline,
            nutrition,
            state: PresentationState::new(),
            meter: FrameRateMeter::default(),
            style: OverlayStyle::default(),
            pending: None,
            collected: Arc::default(),
            trigger_every_ticks: trigger_every_ticks.max(1),
            ticks: 0,
        }
    }

    /// Advance one frame that took `delta`. Returns true if the panel
    /// changed. Never waits on inference.
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.ticks += 1;

        if let Err(e) = self.source.deliver(&mut self.capture) {
            tracing::warn!(error = %e, "Frame rejected");
        }

        if self.meter.tick(delta) {
            tracing::info!(
                fps = self.meter.fps(),
                frame_time_ms = self.meter.frame_time_ms(),
                frames = self.capture.frames_received(),
                "Frame rate"
            );
        }

        let changed = self.poll();

        if self.ticks.is_multiple_of(self.trigger_every_ticks) {
            self.trigger();
        }

        changed
    }

    /// Request a detection pass, as a tap would.
    pub fn trigger(&mut self) {
        if self.pending.is_some() {
            tracing::trace!("Result of previous pass not collected yet");
            return;
        }

        match self.pipeline.trigger(&self.capture) {
            Ok(pending) => self.pending = Some(pending),
            Err(PipelineError::Busy) => tracing::debug!("Trigger ignored while busy"),
            Err(PipelineError::NoFrameAvailable) => tracing::debug!("Trigger before first frame"),
            Err(e) => tracing::warn!(error = %e, "Trigger failed"),
        }
    }

    fn poll(&mut self) -> bool {
        let Some(result) = self.pending.as_mut().and_then(PendingInference::try_result) else {
            return false;
        };
        self.pending = None;

        match result {
            Ok(snapshot) => {
                let changed = self.state.apply(&snapshot, &self.nutrition);
                if changed {
                    tracing::info!(
                        title = %self.state.title,
                        detections = snapshot.detections.len(),
                        latency_ms = snapshot.latency.as_millis() as u64,
                        "Nutrition panel updated"
                    );
                }
                self.collected = snapshot;
                for overlay in self.overlays() {
                    tracing::debug!(caption = %overlay.caption, rect = ?overlay.rect, "Box outline");
                }
                changed
            }
            Err(e) => {
                tracing::warn!(error = %e, "Detection pass failed, panel unchanged");
                false
            }
        }
    }

    /// Outlines for the last collected pass, sized to the current frame.
    pub fn overlays(&self) -> Vec<BoxOverlay> {
        let (width, height) = self.capture.dimensions().unwrap_or((0, 0));
        overlays(&self.collected, width as f32, height as f32, &self.style)
    }

    pub fn state(&self) -> &PresentationState {
        &self.state
    }

    /// Frame time and fps over the last completed window.
    pub fn frame_rate(&self) -> &FrameRateMeter {
        &self.meter
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    /// End the detection session and let an in-flight pass resolve.
    pub async fn shutdown(mut self) {
        self.pipeline.end_session();
        if let Some(pending) = self.pending.take() {
            match pending.wait().await {
                Err(PipelineError::Discarded) | Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "In-flight pass failed during shutdown"),
            }
        }
        tracing::info!(ticks = self.ticks, "Session stopped");
    }
}
