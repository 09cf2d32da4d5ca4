use image::{imageops::FilterType, DynamicImage, RgbImage, RgbaImage};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    errors::Result,
    mask::synthesize_tensor,
    palette::Palette,
    resize::resize_to_fit,
    tensor::to_input_tensor,
    traits::SegmentationModel,
};

/// Display box of the demo screen.
pub const DEFAULT_DISPLAY_SIZE: u32 = 300;

/// How the pipeline sizes and colors its results.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub filter: FilterType,
    pub palette: Palette,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_DISPLAY_SIZE,
            max_height: DEFAULT_DISPLAY_SIZE,
            filter: FilterType::Triangle,
            palette: Palette::default(),
        }
    }
}

/// The two images a run produces, both at the display size.
#[derive(Debug, Clone)]
pub struct SegmentationOutput {
    pub original: RgbImage,
    pub mask: RgbaImage,
}

/// Resize, infer and colorize, one image at a time.
///
/// The pipeline owns its model handle for its whole life. Runs are serialized: a second
/// caller waits until the current run has produced both images.
pub struct SegmentationPipeline<M: SegmentationModel> {
    model: M,
    settings: PipelineSettings,
    in_flight: Mutex<()>,
}

impl<M: SegmentationModel> SegmentationPipeline<M> {
    pub fn new(model: M, settings: PipelineSettings) -> Self {
        Self {
            model,
            settings,
            in_flight: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Scales `image` into the display box.
    pub fn prepare(&self, image: &DynamicImage) -> Result<RgbImage> {
        resize_to_fit(
            &image.to_rgb8(),
            self.settings.max_width,
            self.settings.max_height,
            self.settings.filter,
        )
    }

    /// Runs the model on a display-size image and returns the mask at the same size.
    pub fn segment(&self, display: &RgbImage) -> Result<RgbaImage> {
        let (width, height) = display.dimensions();
        let input = to_input_tensor(display);
        let scores = self.model.infer(input.view())?;
        debug!(shape = ?scores.shape(), "scores ready");

        synthesize_tensor(
            scores.view(),
            width,
            height,
            &self.settings.palette,
            self.settings.filter,
        )
    }

    /// Full run. `on_original` sees the display image as soon as it exists, before
    /// inference starts.
    pub fn run<F>(&self, image: &DynamicImage, on_original: F) -> Result<SegmentationOutput>
    where
        F: FnOnce(&RgbImage),
    {
        let _guard = self.in_flight.lock();

        let original = self.prepare(image)?;
        on_original(&original);
        let mask = self.segment(&original)?;

        Ok(SegmentationOutput { original, mask })
    }
}
