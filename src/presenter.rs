use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use image::{imageops, DynamicImage, ImageFormat, RgbImage, RgbaImage};
use tracing::{debug, error, info, warn};

use crate::errors::{Result, SegError};
use crate::worker::PipelineEvent;

/// How the original and the mask end up on disk.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// One image: original on the left, mask on the right.
    #[default]
    SideBySide,
    /// One image: mask blended over the original.
    Overlay,
    /// Two images: `<name>_original` and `<name>_mask`.
    Separate,
}

/// Collects pipeline events and writes each request's result once both images exist.
pub struct Presenter {
    format: ImageFormat,
    extension: String,
    layout: Layout,
    targets: HashMap<u64, PathBuf>,
    claimed: HashSet<PathBuf>,
    originals: HashMap<u64, RgbImage>,
    failures: Vec<(u64, String)>,
}

impl Presenter {
    pub fn new(extension: &str, layout: Layout) -> Result<Self> {
        let format = ImageFormat::from_extension(extension).ok_or_else(|| {
            SegError::validation("format", format!("`{extension}` is not an image format"))
        })?;
        Ok(Self {
            format,
            extension: extension.to_string(),
            layout,
            targets: HashMap::new(),
            claimed: HashSet::new(),
            originals: HashMap::new(),
            failures: Vec::new(),
        })
    }

    /// Registers where the result of request `id` goes. `stem` is the output path
    /// without extension.
    ///
    /// A stem already claimed by another request (`cat.png` next to `cat.jpg`) gets a
    /// `_2`, `_3`, ... suffix. Returns the stem actually used.
    pub fn track(&mut self, id: u64, stem: PathBuf) -> PathBuf {
        let mut unique = stem.clone();
        let mut n = 2;
        while self.claimed.contains(&unique) {
            let mut name = stem.file_name().unwrap_or_default().to_os_string();
            name.push(format!("_{n}"));
            unique = stem.with_file_name(name);
            n += 1;
        }
        if unique != stem {
            warn!(
                id,
                requested = %stem.display(),
                used = %unique.display(),
                "output name already taken"
            );
        }
        self.claimed.insert(unique.clone());
        self.targets.insert(id, unique.clone());
        unique
    }

    /// Requests that ended in failure, with their error chains.
    pub fn failures(&self) -> &[(u64, String)] {
        &self.failures
    }

    /// Handles one event and returns the files it wrote.
    pub fn present(&mut self, event: PipelineEvent) -> Result<Vec<PathBuf>> {
        match event {
            PipelineEvent::Original { id, image } => {
                debug!(id, width = image.width(), height = image.height(), "original ready");
                self.originals.insert(id, image);
                Ok(Vec::new())
            }
            PipelineEvent::Mask { id, mask } => {
                let original = self.originals.remove(&id).ok_or_else(|| {
                    SegError::precondition(format!(
                        "mask for request {id} arrived before its original"
                    ))
                })?;
                let stem = self.targets.remove(&id).ok_or_else(|| {
                    SegError::precondition(format!("request {id} was never tracked"))
                })?;
                match self.write(&stem, original, mask) {
                    Ok(written) => {
                        for path in &written {
                            info!(id, path = %path.display(), "saved segmentation result");
                        }
                        Ok(written)
                    }
                    Err(error) => {
                        self.record_failure(id, Some(stem), error);
                        Ok(Vec::new())
                    }
                }
            }
            PipelineEvent::Failed { id, error } => {
                self.originals.remove(&id);
                let stem = self.targets.remove(&id);
                self.record_failure(id, stem, error);
                Ok(Vec::new())
            }
        }
    }

    fn record_failure(&mut self, id: u64, stem: Option<PathBuf>, error: SegError) {
        let output = stem
            .map(|stem| stem.display().to_string())
            .unwrap_or_default();
        let message = format!("{:#}", anyhow::Error::from(error));
        error!(id, %output, "{message}");
        self.failures.push((id, message));
    }

    fn write(&self, stem: &Path, original: RgbImage, mask: RgbaImage) -> Result<Vec<PathBuf>> {
        match self.layout {
            Layout::SideBySide => {
                let path = self.output_path(stem, "");
                save_atomically(side_by_side(&original, &mask), &path, self.format)?;
                Ok(vec![path])
            }
            Layout::Overlay => {
                let path = self.output_path(stem, "");
                save_atomically(overlay(original, &mask), &path, self.format)?;
                Ok(vec![path])
            }
            Layout::Separate => {
                let original_path = self.output_path(stem, "_original");
                let mask_path = self.output_path(stem, "_mask");
                save_atomically(
                    DynamicImage::ImageRgb8(original),
                    &original_path,
                    self.format,
                )?;
                if let Err(e) =
                    save_atomically(DynamicImage::ImageRgba8(mask), &mask_path, self.format)
                {
                    // Both files or neither.
                    let _ = fs::remove_file(&original_path);
                    return Err(e);
                }
                Ok(vec![original_path, mask_path])
            }
        }
    }

    fn output_path(&self, stem: &Path, suffix: &str) -> PathBuf {
        let mut name = stem.file_name().unwrap_or_default().to_os_string();
        name.push(suffix);
        name.push(".");
        name.push(&self.extension);
        stem.with_file_name(name)
    }
}

/// Original on the left, mask on the right, top aligned.
pub fn side_by_side(original: &RgbImage, mask: &RgbaImage) -> DynamicImage {
    let width = original.width() + mask.width();
    let height = original.height().max(mask.height());
    let mut canvas = RgbaImage::new(width, height);
    let original = DynamicImage::ImageRgb8(original.clone()).to_rgba8();
    imageops::replace(&mut canvas, &original, 0, 0);
    imageops::replace(&mut canvas, mask, i64::from(original.width()), 0);
    DynamicImage::ImageRgba8(canvas)
}

/// The mask alpha-blended over the original.
pub fn overlay(original: RgbImage, mask: &RgbaImage) -> DynamicImage {
    let mut canvas = DynamicImage::ImageRgb8(original).to_rgba8();
    imageops::overlay(&mut canvas, mask, 0, 0);
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

/// Writes to `<name>.<ext>.tmp` first and renames, so a result is either complete or absent.
fn save_atomically(image: DynamicImage, path: &Path, format: ImageFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SegError::FileSystem {
            path: parent.to_path_buf(),
            operation: "output directory creation".to_string(),
            source: e,
        })?;
    }

    let image = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };

    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let temp_path = path.with_file_name(format!("{file_name}.tmp"));
    let saved = image
        .save_with_format(&temp_path, format)
        .map_err(|e| SegError::ImageProcessing {
            path: temp_path.display().to_string(),
            operation: "image save".to_string(),
            source: Box::new(e),
        })
        .and_then(|()| {
            fs::rename(&temp_path, path).map_err(|e| SegError::FileSystem {
                path: path.to_path_buf(),
                operation: "rename into place".to_string(),
                source: e,
            })
        });
    if saved.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    saved
}
