use crate::errors::{Result, SegError};
use crate::traits::SegmentationModel;
use ndarray::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    /// One class wins everywhere.
    Uniform { winner: usize },
    /// Class scores are the normalized R, G and B input channels.
    ByChannel,
    Failing,
}

/// In-process stand-in for an ONNX model, for tests and dry runs.
#[derive(Debug, Clone)]
pub struct MockSegmentationModel {
    classes: usize,
    behavior: Behavior,
    output_size: Option<(usize, usize)>,
    batch: usize,
}

impl MockSegmentationModel {
    /// `classes` score planes where `winner` scores 1 and every other class 0.
    pub const fn uniform(classes: usize, winner: usize) -> Self {
        Self {
            classes,
            behavior: Behavior::Uniform { winner },
            output_size: None,
            batch: 1,
        }
    }

    /// Three classes: whichever of red, green or blue dominates a pixel.
    pub const fn by_channel() -> Self {
        Self {
            classes: 3,
            behavior: Behavior::ByChannel,
            output_size: None,
            batch: 1,
        }
    }

    /// Fails every inference.
    pub const fn failing() -> Self {
        Self {
            classes: 1,
            behavior: Behavior::Failing,
            output_size: None,
            batch: 1,
        }
    }

    /// Emits scores at `width x height` instead of the input size.
    pub const fn with_output_size(mut self, width: usize, height: usize) -> Self {
        self.output_size = Some((width, height));
        self
    }

    pub const fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }
}

impl SegmentationModel for MockSegmentationModel {
    fn infer(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (_, _, in_height, in_width) = input.dim();
        let (width, height) = self.output_size.unwrap_or((in_width, in_height));

        match self.behavior {
            Behavior::Uniform { winner } => {
                let mut scores = Array4::<f32>::zeros((self.batch, self.classes, height, width));
                if winner < self.classes {
                    scores.slice_mut(s![.., winner, .., ..]).fill(1.0);
                }
                Ok(scores)
            }
            Behavior::ByChannel => {
                if (width, height) != (in_width, in_height) {
                    return Err(SegError::ShapeMismatch {
                        expected: format!("{in_width}x{in_height}"),
                        actual: format!("{width}x{height}"),
                    });
                }
                let mut scores = Array4::<f32>::zeros((self.batch, 3, height, width));
                for mut item in scores.outer_iter_mut() {
                    item.assign(&input.index_axis(Axis(0), 0));
                }
                Ok(scores)
            }
            Behavior::Failing => Err(SegError::Inference {
                operation: "mock forward pass".to_string(),
                source: Box::new(std::io::Error::other("mock model always fails")),
            }),
        }
    }
}
