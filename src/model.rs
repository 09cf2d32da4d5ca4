use std::path::{Path, PathBuf};

use ndarray::prelude::*;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    errors::{Result, SegError},
    traits::SegmentationModel,
};

/// An ONNX segmentation model, loaded once and reused for every request.
pub struct Model {
    path: PathBuf,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl Model {
    pub fn load(model_path: &Path, device_id: i32, num_threads: usize) -> Result<Self> {
        let load_error = |e: ort::Error| SegError::ModelLoad {
            path: model_path.to_path_buf(),
            source: Box::new(e),
        };

        if !model_path.is_file() {
            return Err(SegError::ModelLoad {
                path: model_path.to_path_buf(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "model file does not exist",
                )),
            });
        }

        let session = SessionBuilder::new()
            .map_err(load_error)?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(load_error)?
            .with_intra_threads(num_threads.max(1))
            .map_err(load_error)?
            .with_memory_pattern(true)
            .map_err(load_error)?
            .commit_from_file(model_path)
            .map_err(load_error)?;

        let invalid = |what: &str| SegError::ModelLoad {
            path: model_path.to_path_buf(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("model declares no {what}"),
            )),
        };
        let input_name = session
            .inputs
            .first()
            .ok_or_else(|| invalid("inputs"))?
            .name
            .clone();
        let output_name = session
            .outputs
            .first()
            .ok_or_else(|| invalid("outputs"))?
            .name
            .clone();

        info!(
            path = %model_path.display(),
            input = %input_name,
            output = %output_name,
            "loaded segmentation model"
        );

        Ok(Self {
            path: model_path.to_path_buf(),
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SegmentationModel for Model {
    fn infer(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let input = input.as_standard_layout();
        let tensor = TensorRef::from_array_view(&input).map_err(|e| SegError::Inference {
            operation: "input tensor creation".to_string(),
            source: Box::new(e),
        })?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| SegError::Inference {
                operation: "session run".to_string(),
                source: Box::new(e),
            })?;

        let scores = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(|e| SegError::Inference {
                operation: format!("output extraction ({})", self.output_name),
                source: Box::new(e),
            })?;
        debug!(shape = ?scores.shape(), "model output");

        let actual = format!("{:?}", scores.shape());
        scores
            .into_dimensionality::<Ix4>()
            .map(|scores| scores.to_owned())
            .map_err(|_| SegError::ShapeMismatch {
                expected: "(batch, classes, height, width)".to_string(),
                actual,
            })
    }
}
