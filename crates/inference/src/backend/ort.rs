use super::{InferenceBackend, RawDetectionOutput};
use imaging::ImageTensor;
use ndarray::{Ix1, Ix2, Ix3};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

const INPUT_NAME: &str = "image_tensor";
const INTRA_THREADS: usize = 4;

/// ONNX Runtime session for an exported SSD MobileNet detector.
///
/// Input `image_tensor` is u8 `[1, width, height, 3]`; outputs are
/// `detection_boxes`, `detection_scores`, `detection_classes` and
/// `num_detections`.
pub struct OrtBackend {
    session: Session,
}

impl InferenceBackend for OrtBackend {
    fn load_model(path: &str) -> anyhow::Result<Self> {
        // Idempotent
        let _ = ort::init().commit();

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(INTRA_THREADS)?
            .commit_from_file(path)?;

        tracing::info!(path, "Model loaded with ONNX Runtime CPU execution provider");
        Ok(Self { session })
    }

    fn infer(&mut self, tensor: &ImageTensor) -> anyhow::Result<RawDetectionOutput> {
        let outputs = self.session.run(ort::inputs![
            INPUT_NAME => TensorRef::from_array_view(tensor.view())?
        ])?;

        let boxes = outputs["detection_boxes"]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix3>()?
            .to_owned();
        let scores = outputs["detection_scores"]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix2>()?
            .to_owned();
        let classes = outputs["detection_classes"]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix2>()?
            .to_owned();
        let num_detections = outputs["num_detections"]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix1>()?
            .to_owned();

        Ok(RawDetectionOutput {
            boxes,
            scores,
            classes,
            num_detections,
        })
    }
}
