use super::{InferenceBackend, RawDetectionOutput};
use anyhow::Context;
use imaging::ImageTensor;
use ndarray::{Array1, Array2, Array3};
use serde::Deserialize;

/// One recorded engine output, in the nested-list layout the engine emits.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFixture {
    pub boxes: Vec<Vec<[f32; 4]>>,
    pub scores: Vec<Vec<f32>>,
    pub classes: Vec<Vec<f32>>,
    pub num_detections: Vec<f32>,
}

impl ReplayFixture {
    pub fn into_output(self) -> anyhow::Result<RawDetectionOutput> {
        let batch = self.boxes.len();
        let candidates = self.boxes.first().map_or(0, Vec::len);

        let boxes: Vec<f32> = self.boxes.into_iter().flatten().flatten().collect();
        let scores: Vec<f32> = self.scores.into_iter().flatten().collect();
        let classes: Vec<f32> = self.classes.into_iter().flatten().collect();

        Ok(RawDetectionOutput {
            boxes: Array3::from_shape_vec((batch, candidates, 4), boxes)
                .context("Ragged detection_boxes in fixture")?,
            scores: Array2::from_shape_vec((batch, candidates), scores)
                .context("detection_scores does not match detection_boxes")?,
            classes: Array2::from_shape_vec((batch, candidates), classes)
                .context("detection_classes does not match detection_boxes")?,
            num_detections: Array1::from_vec(self.num_detections),
        })
    }
}

/// Serves recorded outputs in rotation instead of running a model.
pub struct ReplayBackend {
    outputs: Vec<RawDetectionOutput>,
    cursor: usize,
}

impl ReplayBackend {
    pub fn from_outputs(outputs: Vec<RawDetectionOutput>) -> anyhow::Result<Self> {
        anyhow::ensure!(!outputs.is_empty(), "Replay backend needs at least one output");
        Ok(Self { outputs, cursor: 0 })
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let fixtures: Vec<ReplayFixture> =
            serde_json::from_str(json).context("Invalid replay fixture JSON")?;
        let outputs = fixtures
            .into_iter()
            .map(ReplayFixture::into_output)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Self::from_outputs(outputs)
    }
}

impl InferenceBackend for ReplayBackend {
    fn load_model(path: &str) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay fixtures from {path}"))?;
        let backend = Self::from_json(&json)?;
        tracing::info!(path, outputs = backend.outputs.len(), "Replay backend loaded");
        Ok(backend)
    }

    fn infer(&mut self, tensor: &ImageTensor) -> anyhow::Result<RawDetectionOutput> {
        tracing::trace!(shape = ?tensor.shape(), cursor = self.cursor, "Replaying output");
        let output = self.outputs[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.outputs.len();
        Ok(output)
    }
}
