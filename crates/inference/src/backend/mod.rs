use imaging::ImageTensor;
use ndarray::{Array1, Array2, Array3};

#[cfg(feature = "ort-backend")]
pub mod ort;

pub mod replay;

/// A model runner. Not required to be reentrant: the pipeline never calls
/// `infer` concurrently on the same backend.
pub trait InferenceBackend: Send {
    fn load_model(path: &str) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn infer(&mut self, tensor: &ImageTensor) -> anyhow::Result<RawDetectionOutput>;
}

/// Raw SSD-style output tensors, exactly as the engine emits them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetectionOutput {
    pub boxes: Array3<f32>,          // [batch, candidate, 4] ymin, xmin, ymax, xmax (normalized)
    pub scores: Array2<f32>,         // [batch, candidate]
    pub classes: Array2<f32>,        // [batch, candidate] float-encoded class ids
    pub num_detections: Array1<f32>, // [batch]
}

impl RawDetectionOutput {
    /// Output of a pass that found nothing.
    pub fn empty() -> Self {
        Self {
            boxes: Array3::zeros((1, 0, 4)),
            scores: Array2::zeros((1, 0)),
            classes: Array2::zeros((1, 0)),
            num_detections: Array1::zeros(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.num_detections.len()
    }
}
