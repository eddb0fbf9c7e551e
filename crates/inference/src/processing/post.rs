use crate::backend::RawDetectionOutput;
use crate::error::PipelineError;
use crate::labels::{LabelTable, UNKNOWN_LABEL};
use serde::Serialize;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;

/// Normalized box in model coordinates, all values in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub ymin: f32,
    pub xmin: f32,
    pub ymax: f32,
    pub xmax: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct PostProcessor {
    pub confidence_threshold: f32,
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    /// Decode raw engine output into detections, keeping emission order.
    ///
    /// Each batch is walked up to its reported detection count. Candidates
    /// under the threshold are skipped before their box is read, and the
    /// background class is dropped. Class ids missing from `labels` decode
    /// as `"unknown"`.
    #[tracing::instrument(skip_all, level = "debug")]
    pub fn decode(
        &self,
        raw: &RawDetectionOutput,
        labels: &LabelTable,
    ) -> Result<Vec<Detection>, PipelineError> {
        let (batches, candidates) = raw.scores.dim();
        check_shapes(raw, batches, candidates)?;

        let mut detections = Vec::new();

        for b in 0..batches {
            let count = detection_count(raw.num_detections[b], candidates)?;

            for i in 0..count {
                let score = raw.scores[[b, i]];
                if score.is_nan() || score < self.confidence_threshold {
                    continue;
                }

                let label = match labels.resolve(raw.classes[[b, i]]) {
                    Ok(Some(label)) => label.to_string(),
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, batch = b, candidate = i, "Unknown class id");
                        UNKNOWN_LABEL.to_string()
                    }
                };

                let bbox = BoundingBox {
                    ymin: raw.boxes[[b, i, 0]],
                    xmin: raw.boxes[[b, i, 1]],
                    ymax: raw.boxes[[b, i, 2]],
                    xmax: raw.boxes[[b, i, 3]],
                };

                detections.push(Detection { bbox, label, score });
            }
        }

        tracing::debug!(
            batches,
            candidates,
            kept = detections.len(),
            "Decoded detections"
        );
        Ok(detections)
    }
}

fn check_shapes(
    raw: &RawDetectionOutput,
    batches: usize,
    candidates: usize,
) -> Result<(), PipelineError> {
    if raw.boxes.dim() != (batches, candidates, 4)
        || raw.classes.dim() != (batches, candidates)
        || raw.num_detections.len() != batches
    {
        return Err(PipelineError::InferenceFailure(format!(
            "Mismatched output shapes: boxes {:?}, scores {:?}, classes {:?}, num_detections {:?}",
            raw.boxes.shape(),
            raw.scores.shape(),
            raw.classes.shape(),
            raw.num_detections.shape()
        )));
    }
    Ok(())
}

fn detection_count(value: f32, candidates: usize) -> Result<usize, PipelineError> {
    if !value.is_finite() || value < 0.0 || value.round() as usize > candidates {
        return Err(PipelineError::InferenceFailure(format!(
            "Detection count {value} exceeds {candidates} candidates"
        )));
    }
    Ok(value.round() as usize)
}
