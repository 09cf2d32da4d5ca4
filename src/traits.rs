use crate::errors::Result;
use ndarray::prelude::*;
use std::sync::Arc;

/// A loaded segmentation model, treated as a black box.
///
/// Implementations map a normalized `(1, 3, H, W)` image tensor to a `(1, C, H', W')`
/// tensor of per-class scores. The pipeline only depends on this trait, so the ONNX
/// runtime can be swapped for an in-process model in tests.
pub trait SegmentationModel: Send + Sync {
    /// Runs one forward pass.
    fn infer(&self, input: ArrayView4<f32>) -> Result<Array4<f32>>;
}

impl<M: SegmentationModel + ?Sized> SegmentationModel for Arc<M> {
    fn infer(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        (**self).infer(input)
    }
}

impl<M: SegmentationModel + ?Sized> SegmentationModel for Box<M> {
    fn infer(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        (**self).infer(input)
    }
}
