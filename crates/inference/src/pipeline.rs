use crate::{
    backend::InferenceBackend,
    error::PipelineError,
    labels::LabelTable,
    processing::{
        post::{Detection, PostProcessor},
        pre::PreProcessor,
    },
};
use capture::FrameCapture;
use imaging::PixelFrame;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch};

/// One published detection result. Replaced whole, never edited in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSnapshot {
    /// 0 for the initial empty snapshot, then 1, 2, ... per published pass.
    pub sequence: u64,
    pub detections: Vec<Detection>,
    pub latency: Duration,
}

impl DetectionSnapshot {
    /// The detection the consumer presents: first in emission order.
    pub fn primary(&self) -> Option<&Detection> {
        self.detections.first()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

pub type PassResult = Result<Arc<DetectionSnapshot>, PipelineError>;

struct PipelineMetrics {
    duration: Histogram<f64>,
    passes: Counter<u64>,
    rejected: Counter<u64>,
    failures: Counter<u64>,
    detections: Counter<u64>,
}

fn init_metrics(meter_name: &'static str) -> PipelineMetrics {
    let meter = global::meter(meter_name);
    let latency_buckets = [
        0.005, 0.01, 0.02, 0.03, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0,
    ];

    PipelineMetrics {
        duration: meter
            .f64_histogram("inference_duration_seconds")
            .with_description("Time for one pass (preprocess + infer + decode)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build(),
        passes: meter
            .u64_counter("inference_passes_total")
            .with_description("Total published inference passes")
            .build(),
        rejected: meter
            .u64_counter("inference_triggers_rejected_total")
            .with_description("Triggers rejected because a pass was in flight")
            .build(),
        failures: meter
            .u64_counter("inference_failures_total")
            .with_description("Passes that failed in preprocessing, inference or decode")
            .build(),
        detections: meter
            .u64_counter("inference_detections_total")
            .with_description("Total detections published")
            .build(),
    }
}

struct Shared<B> {
    backend: Mutex<B>,
    preprocessor: PreProcessor,
    postprocessor: PostProcessor,
    labels: LabelTable,
    publisher: watch::Sender<Arc<DetectionSnapshot>>,
    /// Written only under the publisher's lock, see `publish`.
    session_open: AtomicBool,
    metrics: PipelineMetrics,
}

impl<B: InferenceBackend> Shared<B> {
    fn run_pass(&self, frame: &PixelFrame) -> PassResult {
        let start = Instant::now();

        let tensor = self.preprocessor.prepare(frame)?;

        let raw = {
            let _s = tracing::info_span!("model_inference").entered();
            let mut backend = self.backend.lock().unwrap_or_else(|poisoned| {
                tracing::warn!("Previous pass panicked inside the backend, reusing it");
                self.backend.clear_poison();
                PoisonError::into_inner(poisoned)
            });
            backend
                .infer(&tensor)
                .map_err(|e| PipelineError::InferenceFailure(format!("{e:#}")))?
        };

        let detections = self.postprocessor.decode(&raw, &self.labels)?;
        let snapshot = self.publish(detections, start.elapsed())?;

        self.metrics
            .duration
            .record(snapshot.latency.as_secs_f64(), &[]);
        self.metrics.passes.add(1, &[]);
        self.metrics
            .detections
            .add(snapshot.detections.len() as u64, &[]);

        Ok(snapshot)
    }

    /// Replace the published snapshot unless the session has ended.
    ///
    /// The session flag is read under the channel's write lock and
    /// `close_session` flips it under the same lock, so a result can never
    /// be published after `close_session` returns.
    fn publish(&self, detections: Vec<Detection>, latency: Duration) -> PassResult {
        let mut published = None;
        self.publisher.send_if_modified(|current| {
            if !self.session_open.load(Ordering::Acquire) {
                return false;
            }
            let snapshot = Arc::new(DetectionSnapshot {
                sequence: current.sequence + 1,
                detections,
                latency,
            });
            *current = Arc::clone(&snapshot);
            published = Some(snapshot);
            true
        });
        published.ok_or(PipelineError::Discarded)
    }

    /// Returns true if this call closed the session.
    fn close_session(&self) -> bool {
        let mut closed = false;
        self.publisher.send_if_modified(|_| {
            closed = self.session_open.swap(false, Ordering::AcqRel);
            false
        });
        closed
    }
}

/// Clears the in-flight flag when the pass ends, including by panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a running pass, polled from the frame tick.
#[must_use = "dropping the handle does not cancel the pass, but its result is lost"]
pub struct PendingInference {
    rx: oneshot::Receiver<PassResult>,
}

impl PendingInference {
    /// Non-blocking: `None` while the pass is still running. Yields the
    /// result once; drop the handle afterwards.
    pub fn try_result(&mut self) -> Option<PassResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(worker_lost())),
        }
    }

    pub async fn wait(self) -> PassResult {
        self.rx.await.unwrap_or_else(|_| Err(worker_lost()))
    }
}

fn worker_lost() -> PipelineError {
    PipelineError::InferenceFailure("Inference worker terminated without a result".to_string())
}

/// Capture trigger to published detection list.
///
/// At most one pass runs at a time. Each pass runs preprocessing, the
/// backend and decoding on a tokio blocking worker; the caller only takes a
/// shared snapshot of the current frame. Results are published through a
/// `watch` channel so readers always see a complete list.
pub struct DetectionPipeline<B> {
    shared: Arc<Shared<B>>,
    in_flight: Arc<AtomicBool>,
    updates: watch::Receiver<Arc<DetectionSnapshot>>,
}

impl<B: InferenceBackend + 'static> DetectionPipeline<B> {
    pub fn new(
        backend: B,
        preprocessor: PreProcessor,
        postprocessor: PostProcessor,
        labels: LabelTable,
    ) -> Self {
        let (publisher, updates) = watch::channel(Arc::new(DetectionSnapshot::default()));

        let shared = Shared {
            backend: Mutex::new(backend),
            preprocessor,
            postprocessor,
            labels,
            publisher,
            session_open: AtomicBool::new(true),
            metrics: init_metrics("inference"),
        };

        Self {
            shared: Arc::new(shared),
            in_flight: Arc::new(AtomicBool::new(false)),
            updates,
        }
    }

    /// Start a pass on the latest captured frame.
    ///
    /// Must be called from within a tokio runtime. Never blocks on the model.
    pub fn trigger(&self, capture: &FrameCapture) -> Result<PendingInference, PipelineError> {
        if !self.shared.session_open.load(Ordering::Acquire) {
            return Err(PipelineError::SessionEnded);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.shared.metrics.rejected.add(1, &[]);
            tracing::debug!("Trigger ignored, inference already in flight");
            return Err(PipelineError::Busy);
        }
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        let frame = capture.current_frame()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;

        let (tx, rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let span = tracing::info_span!(
            "inference_pass",
            width = frame.width(),
            height = frame.height()
        );

        runtime.spawn_blocking(move || {
            let _enter = span.enter();

            let result = shared.run_pass(&frame);
            drop(frame);

            match &result {
                Ok(snapshot) => tracing::debug!(
                    sequence = snapshot.sequence,
                    detections = snapshot.detections.len(),
                    latency_ms = snapshot.latency.as_millis() as u64,
                    "Detections published"
                ),
                Err(PipelineError::Discarded) => {
                    tracing::info!("Session ended during inference, result discarded")
                }
                Err(e) => {
                    shared.metrics.failures.add(1, &[]);
                    tracing::error!(error = %e, "Inference pass failed");
                }
            }

            // Release before reporting so a caller reacting to the result can
            // trigger again immediately.
            drop(guard);
            let _ = tx.send(result);
        });

        Ok(PendingInference { rx })
    }

    /// Latest published snapshot. Never blocks.
    pub fn latest(&self) -> Arc<DetectionSnapshot> {
        Arc::clone(&self.updates.borrow())
    }

    /// Receiver that is notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DetectionSnapshot>> {
        self.updates.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Close the session: later triggers fail and a pass still running is
    /// discarded when it resolves.
    pub fn end_session(&self) {
        if self.shared.close_session() {
            tracing::info!(busy = self.is_busy(), "Detection session ended");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RawDetectionOutput;
    use crate::backend::replay::ReplayBackend;
    use imaging::{ImageTensor, Normalization, PixelFormat};
    use ndarray::{Array1, Array2, Array3};
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    fn labels() -> LabelTable {
        LabelTable::parse("???\npizza\nbanana\ndonut\n")
    }

    fn output(scores: &[f32], classes: &[f32]) -> RawDetectionOutput {
        let n = scores.len();
        RawDetectionOutput {
            boxes: Array3::from_elem((1, n, 4), 0.25),
            scores: Array2::from_shape_vec((1, n), scores.to_vec()).unwrap(),
            classes: Array2::from_shape_vec((1, n), classes.to_vec()).unwrap(),
            num_detections: Array1::from_vec(vec![n as f32]),
        }
    }

    fn pipeline<B: InferenceBackend + 'static>(backend: B) -> DetectionPipeline<B> {
        DetectionPipeline::new(
            backend,
            PreProcessor::new(16, Normalization::default()),
            PostProcessor::default(),
            labels(),
        )
    }

    fn capture_with_frame() -> FrameCapture {
        let mut capture = FrameCapture::new();
        let buffer = vec![128u8; 40 * 30 * 4];
        capture
            .on_frame_available(PixelFormat::Rgba8, 40, 30, &buffer, buffer.len())
            .unwrap();
        capture
    }

    /// Blocks in `infer` until the test releases it, counting concurrency.
    struct GatedBackend {
        gate: mpsc::Receiver<()>,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    impl InferenceBackend for GatedBackend {
        fn load_model(_path: &str) -> anyhow::Result<Self> {
            anyhow::bail!("not loadable")
        }

        fn infer(&mut self, _tensor: &ImageTensor) -> anyhow::Result<RawDetectionOutput> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);

            let released = self.gate.recv();
            self.active.fetch_sub(1, Ordering::SeqCst);
            released?;
            Ok(output(&[0.9], &[1.0]))
        }
    }

    struct Gate {
        release: mpsc::Sender<()>,
        max_active: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    fn gated() -> (GatedBackend, Gate) {
        let (release, gate) = mpsc::channel();
        let max_active = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = GatedBackend {
            gate,
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::clone(&max_active),
            calls: Arc::clone(&calls),
        };
        (
            backend,
            Gate {
                release,
                max_active,
                calls,
            },
        )
    }

    /// Succeeds on the first call, fails afterwards.
    struct FlakyBackend {
        calls: usize,
    }

    impl InferenceBackend for FlakyBackend {
        fn load_model(_path: &str) -> anyhow::Result<Self> {
            Ok(Self { calls: 0 })
        }

        fn infer(&mut self, _tensor: &ImageTensor) -> anyhow::Result<RawDetectionOutput> {
            self.calls += 1;
            if self.calls > 1 {
                anyhow::bail!("native session error");
            }
            Ok(output(&[0.9, 0.3, 0.5], &[1.0, 2.0, 3.0]))
        }
    }

    /// Panics on the first call, succeeds afterwards.
    struct PanickingBackend {
        calls: usize,
    }

    impl InferenceBackend for PanickingBackend {
        fn load_model(_path: &str) -> anyhow::Result<Self> {
            Ok(Self { calls: 0 })
        }

        fn infer(&mut self, _tensor: &ImageTensor) -> anyhow::Result<RawDetectionOutput> {
            self.calls += 1;
            if self.calls == 1 {
                panic!("backend crashed");
            }
            Ok(output(&[0.8], &[2.0]))
        }
    }

    // ===== Publishing =====

    #[tokio::test]
    async fn test_pass_publishes_snapshot() {
        let backend =
            ReplayBackend::from_outputs(vec![output(&[0.9, 0.3, 0.5], &[1.0, 2.0, 3.0])]).unwrap();
        let pipeline = pipeline(backend);
        let capture = capture_with_frame();

        assert_eq!(pipeline.latest().sequence, 0);
        assert!(pipeline.latest().is_empty());

        let snapshot = pipeline.trigger(&capture).unwrap().wait().await.unwrap();

        assert_eq!(snapshot.sequence, 1);
        let labels: Vec<&str> = snapshot.detections.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["pizza", "donut"]);
        assert_eq!(snapshot.primary().unwrap().label, "pizza");
        assert_eq!(pipeline.latest(), snapshot);
        assert!(!pipeline.is_busy());
    }

    #[tokio::test]
    async fn test_empty_output_publishes_empty_snapshot() {
        let backend = ReplayBackend::from_outputs(vec![RawDetectionOutput::empty()]).unwrap();
        let pipeline = pipeline(backend);

        let snapshot = pipeline
            .trigger(&capture_with_frame())
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(snapshot.sequence, 1, "Empty result is still published");
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_each_pass() {
        let backend = ReplayBackend::from_outputs(vec![output(&[0.8], &[2.0])]).unwrap();
        let pipeline = pipeline(backend);
        let capture = capture_with_frame();
        let mut updates = pipeline.subscribe();

        for expected in 1..=3 {
            pipeline.trigger(&capture).unwrap().wait().await.unwrap();
            updates.changed().await.unwrap();
            assert_eq!(updates.borrow_and_update().sequence, expected);
        }
    }

    // ===== Single-flight =====

    #[tokio::test]
    async fn test_trigger_while_in_flight_is_busy() {
        let (backend, gate) = gated();
        let pipeline = pipeline(backend);
        let capture = capture_with_frame();

        let mut pending = pipeline.trigger(&capture).unwrap();
        assert!(pipeline.is_busy());
        assert!(matches!(pipeline.trigger(&capture), Err(PipelineError::Busy)));
        assert!(matches!(pipeline.trigger(&capture), Err(PipelineError::Busy)));
        assert!(pending.try_result().is_none(), "Pass is still gated");

        gate.release.send(()).unwrap();
        let snapshot = pending.wait().await.unwrap();
        assert_eq!(snapshot.sequence, 1);

        // Free again once the pass resolved
        let pending = pipeline.trigger(&capture).unwrap();
        gate.release.send(()).unwrap();
        pending.wait().await.unwrap();

        assert_eq!(gate.calls.load(Ordering::SeqCst), 2);
        assert_eq!(gate.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_try_result_polls_without_blocking() {
        let (backend, gate) = gated();
        let pipeline = pipeline(backend);
        let mut pending = pipeline.trigger(&capture_with_frame()).unwrap();

        assert!(pending.try_result().is_none());
        gate.release.send(()).unwrap();

        let result = loop {
            if let Some(result) = pending.try_result() {
                break result;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        };
        assert_eq!(result.unwrap().detections.len(), 1);
    }

    // ===== Failures =====

    #[tokio::test]
    async fn test_no_frame_is_reported_and_releases_flight() {
        let backend = ReplayBackend::from_outputs(vec![RawDetectionOutput::empty()]).unwrap();
        let pipeline = pipeline(backend);
        let empty = FrameCapture::new();

        assert!(matches!(
            pipeline.trigger(&empty),
            Err(PipelineError::NoFrameAvailable)
        ));
        assert!(!pipeline.is_busy());
        assert!(pipeline.trigger(&capture_with_frame()).is_ok());
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_previous_snapshot() {
        let pipeline = pipeline(FlakyBackend { calls: 0 });
        let capture = capture_with_frame();

        let first = pipeline.trigger(&capture).unwrap().wait().await.unwrap();
        let second = pipeline.trigger(&capture).unwrap().wait().await;

        match second {
            Err(PipelineError::InferenceFailure(msg)) => {
                assert!(msg.contains("native session error"), "Got: {msg}")
            }
            other => panic!("Expected InferenceFailure, got {other:?}"),
        }
        assert_eq!(pipeline.latest(), first, "Failed pass must not publish");
        assert!(!pipeline.is_busy());
    }

    #[tokio::test]
    async fn test_worker_panic_is_failure_and_releases_flight() {
        let pipeline = pipeline(PanickingBackend { calls: 0 });
        let capture = capture_with_frame();

        let result = pipeline.trigger(&capture).unwrap().wait().await;
        assert!(matches!(result, Err(PipelineError::InferenceFailure(_))));
        assert!(!pipeline.is_busy());
        assert_eq!(pipeline.latest().sequence, 0);
    }

    #[tokio::test]
    async fn test_passes_recover_after_backend_panic() {
        let pipeline = pipeline(PanickingBackend { calls: 0 });
        let capture = capture_with_frame();

        assert!(pipeline.trigger(&capture).unwrap().wait().await.is_err());

        for expected in 1..=3 {
            let snapshot = pipeline
                .trigger(&capture)
                .unwrap()
                .wait()
                .await
                .expect("Backend stays usable after a panicked pass");
            assert_eq!(snapshot.sequence, expected);
            assert_eq!(snapshot.primary().unwrap().label, "banana");
        }
        assert_eq!(pipeline.latest().sequence, 3);
    }

    #[test]
    fn test_trigger_outside_runtime_is_error() {
        let backend = ReplayBackend::from_outputs(vec![RawDetectionOutput::empty()]).unwrap();
        let pipeline = pipeline(backend);

        assert!(matches!(
            pipeline.trigger(&capture_with_frame()),
            Err(PipelineError::NoRuntime)
        ));
        assert!(!pipeline.is_busy());
    }

    // ===== Session end =====

    #[tokio::test]
    async fn test_result_after_session_end_is_discarded() {
        let (backend, gate) = gated();
        let pipeline = pipeline(backend);
        let capture = capture_with_frame();

        let pending = pipeline.trigger(&capture).unwrap();
        pipeline.end_session();
        gate.release.send(()).unwrap();

        assert!(matches!(pending.wait().await, Err(PipelineError::Discarded)));
        assert_eq!(pipeline.latest().sequence, 0, "Late result is not published");
        assert!(matches!(
            pipeline.trigger(&capture),
            Err(PipelineError::SessionEnded)
        ));
    }

    #[tokio::test]
    async fn test_publish_after_close_is_discarded() {
        let backend = ReplayBackend::from_outputs(vec![output(&[0.9], &[1.0])]).unwrap();
        let pipeline = pipeline(backend);
        let capture = capture_with_frame();
        let first = pipeline.trigger(&capture).unwrap().wait().await.unwrap();
        let mut updates = pipeline.subscribe();
        updates.borrow_and_update();

        // A pass that decoded before the close but publishes after it
        assert!(pipeline.shared.close_session());
        let late = pipeline
            .shared
            .publish(first.detections.clone(), Duration::from_millis(5));

        assert!(matches!(late, Err(PipelineError::Discarded)));
        assert_eq!(pipeline.latest(), first);
        assert!(!updates.has_changed().unwrap(), "Subscribers are not woken");
        assert!(!pipeline.shared.close_session(), "Already closed");
    }
}
