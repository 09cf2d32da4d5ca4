pub mod config;
pub mod errors;
pub mod mask;
pub mod mocks;
pub mod model;
pub mod palette;
pub mod pipeline;
pub mod presenter;
pub mod resize;
pub mod tensor;
pub mod traits;
pub mod worker;

use image::ImageFormat;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub use config::Config;
pub use errors::{Result, SegError};
pub use model::Model;
pub use palette::Palette;
pub use pipeline::{PipelineSettings, SegmentationOutput, SegmentationPipeline};
pub use presenter::{Layout, Presenter};
pub use traits::*;
pub use worker::{PipelineEvent, PipelineWorker, SegmentationRequest};

/// Outcome of processing every input image.
#[derive(Debug, Default, Clone)]
pub struct Summary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Feeds every input image through the segmentation worker and saves the results.
pub struct ImageProcessor<M: SegmentationModel> {
    model: M,
    config: Config,
}

impl<M: SegmentationModel + 'static> ImageProcessor<M> {
    pub const fn new(model: M, config: Config) -> Self {
        Self { model, config }
    }

    pub fn process(self) -> Result<Summary> {
        let Self { model, config } = self;

        if !config.input.exists() {
            return Err(SegError::FileSystem {
                path: config.input.clone(),
                operation: "input lookup".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input path does not exist",
                ),
            });
        }

        let image_files = collect_image_files(&config.input);
        if image_files.is_empty() {
            warn!(input = %config.input.display(), "no image files found");
            return Ok(Summary::default());
        }
        info!(count = image_files.len(), "segmenting images");

        let mut presenter = Presenter::new(&config.format, config.layout)?;
        let worker = PipelineWorker::spawn(SegmentationPipeline::new(
            model,
            config.pipeline_settings(),
        ))?;

        for (id, path) in (0u64..).zip(&image_files) {
            presenter.track(id, output_stem(&config.input, path, &config.output_dir));
            worker.submit(SegmentationRequest::from_path(id, path))?;
        }

        let pb = ProgressBar::new(image_files.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .map_err(anyhow::Error::from)?
            .progress_chars("#>-"),
        );

        let mut summary = Summary::default();
        let mut remaining = image_files.len();
        while remaining > 0 {
            let event = worker.next_event()?;
            if event.is_terminal() {
                remaining -= 1;
                pb.inc(1);
            }
            summary.written.extend(presenter.present(event)?);
        }
        pb.finish_and_clear();
        worker.shutdown()?;

        summary.failed = presenter
            .failures()
            .iter()
            .map(|(id, message)| (image_files[*id as usize].clone(), message.clone()))
            .collect();

        info!(
            written = summary.written.len(),
            failed = summary.failed.len(),
            "segmentation finished"
        );
        Ok(summary)
    }
}

impl ImageProcessor<Model> {
    pub fn with_onnx_model(config: Config) -> Result<Self> {
        let model = Model::load(&config.model_path, config.device_id, config.num_threads)?;
        Ok(Self::new(model, config))
    }
}

/// Every decodable image under `input`, which may also be a single file.
pub fn collect_image_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| ImageFormat::from_path(e.path()).is_ok_and(|f| f.reading_enabled()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Output path (without extension) for `file`, mirroring its place under `input_root`.
pub fn output_stem(input_root: &Path, file: &Path, output_dir: &Path) -> PathBuf {
    let relative = file
        .strip_prefix(input_root)
        .ok()
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| file.file_name().map(Path::new))
        .unwrap_or(file);
    output_dir.join(relative).with_extension("")
}
