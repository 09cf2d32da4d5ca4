//! Turning per-class scores into a colored mask image.

use image::{imageops, imageops::FilterType, RgbaImage};
use ndarray::prelude::*;
use rayon::prelude::*;
use tracing::debug;

use crate::{
    errors::{Result, SegError},
    palette::Palette,
};

fn check_shape(len: usize, classes: usize, height: usize, width: usize) -> Result<()> {
    if classes == 0 || height == 0 || width == 0 {
        return Err(SegError::precondition(format!(
            "score shape must be non-empty, got {classes}x{height}x{width}"
        )));
    }
    let expected = classes
        .checked_mul(height)
        .and_then(|n| n.checked_mul(width))
        .ok_or_else(|| {
            SegError::precondition(format!(
                "score shape {classes}x{height}x{width} overflows"
            ))
        })?;
    if len != expected {
        return Err(SegError::precondition(format!(
            "score buffer has {len} values, expected {expected} ({classes}x{height}x{width})"
        )));
    }
    Ok(())
}

/// Index of the highest score at every position of a `(classes, height, width)` buffer,
/// in row-major order.
///
/// The first class reaching the maximum wins. NaN never compares greater, so a position
/// whose scores are all NaN resolves to class 0.
pub fn argmax_classes(
    scores: &[f32],
    classes: usize,
    height: usize,
    width: usize,
) -> Result<Vec<usize>> {
    check_shape(scores.len(), classes, height, width)?;
    let plane = height * width;

    let indices = (0..plane)
        .map(|position| {
            let mut max_index = 0;
            let mut max_score = f32::NEG_INFINITY;
            for class in 0..classes {
                let score = scores[class * plane + position];
                if score > max_score {
                    max_score = score;
                    max_index = class;
                }
            }
            max_index
        })
        .collect();

    Ok(indices)
}

/// Paints a row-major class map with `palette`.
pub fn colorize(
    classes: &[usize],
    width: u32,
    height: u32,
    palette: &Palette,
) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(SegError::precondition(format!(
            "class map must be non-empty, got {width}x{height}"
        )));
    }
    let row_len = width as usize;
    if classes.len() != row_len * height as usize {
        return Err(SegError::precondition(format!(
            "class map has {} entries, expected {}x{}",
            classes.len(),
            width,
            height
        )));
    }

    let mut buffer = vec![0u8; classes.len() * 4];
    buffer
        .par_chunks_mut(row_len * 4)
        .zip(classes.par_chunks(row_len))
        .for_each(|(row, row_classes)| {
            for (pixel, &class) in row.chunks_exact_mut(4).zip(row_classes) {
                pixel.copy_from_slice(&palette.color_for(class as i64).0);
            }
        });

    RgbaImage::from_raw(width, height, buffer).ok_or_else(|| {
        SegError::precondition(format!("mask buffer does not fit {width}x{height}"))
    })
}

/// Builds the colored mask for a flat `(classes, height, width)` score buffer and scales
/// it to `target_width x target_height`.
#[allow(clippy::too_many_arguments)]
pub fn synthesize(
    scores: &[f32],
    classes: usize,
    height: usize,
    width: usize,
    target_width: u32,
    target_height: u32,
    palette: &Palette,
    filter: FilterType,
) -> Result<RgbaImage> {
    if target_width == 0 || target_height == 0 {
        return Err(SegError::validation(
            "mask target",
            format!("has an empty dimension ({target_width}x{target_height})"),
        ));
    }
    let mask_width = u32::try_from(width)
        .map_err(|_| SegError::precondition(format!("mask width {width} too large")))?;
    let mask_height = u32::try_from(height)
        .map_err(|_| SegError::precondition(format!("mask height {height} too large")))?;

    let class_map = argmax_classes(scores, classes, height, width)?;
    let mask = colorize(&class_map, mask_width, mask_height, palette)?;
    debug!(
        classes,
        mask_width, mask_height, target_width, target_height, "synthesized mask"
    );

    if (mask_width, mask_height) == (target_width, target_height) {
        return Ok(mask);
    }
    Ok(imageops::resize(&mask, target_width, target_height, filter))
}

/// [`synthesize`] for a `(1, classes, height, width)` model output.
pub fn synthesize_tensor(
    scores: ArrayView4<f32>,
    target_width: u32,
    target_height: u32,
    palette: &Palette,
    filter: FilterType,
) -> Result<RgbaImage> {
    let (batch, classes, height, width) = scores.dim();
    if batch != 1 {
        return Err(SegError::ShapeMismatch {
            expected: "(1, classes, height, width)".to_string(),
            actual: format!("{:?}", scores.shape()),
        });
    }

    let scores = scores.as_standard_layout();
    let flat = scores.as_slice().ok_or_else(|| {
        SegError::precondition("score tensor is not contiguous after relayout")
    })?;
    synthesize(
        flat,
        classes,
        height,
        width,
        target_width,
        target_height,
        palette,
        filter,
    )
}
