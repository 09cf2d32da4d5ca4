use image::{imageops, imageops::FilterType, GenericImageView, ImageBuffer, Pixel};
use tracing::debug;

use crate::errors::{Result, SegError};

/// Computes the size an image of `width x height` takes inside a `max_width x max_height` box.
///
/// A box wider than it is tall keeps `max_height` and derives the width from the image ratio;
/// any other box, square ones included, keeps `max_width` and derives the height. The derived
/// side is rounded and never drops below one pixel.
pub fn fit_dimensions(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
) -> Result<(u32, u32)> {
    if width == 0 || height == 0 {
        return Err(SegError::validation(
            "image",
            format!("has an empty dimension ({width}x{height})"),
        ));
    }
    if max_width == 0 || max_height == 0 {
        return Err(SegError::validation(
            "bounding box",
            format!("has an empty dimension ({max_width}x{max_height})"),
        ));
    }

    let ratio_bitmap = width as f32 / height as f32;
    let ratio_max = max_width as f32 / max_height as f32;

    let (final_width, final_height) = if ratio_max > 1.0 {
        let width = (max_height as f32 * ratio_bitmap).round() as u32;
        (width.max(1), max_height)
    } else {
        let height = (max_width as f32 / ratio_bitmap).round() as u32;
        (max_width, height.max(1))
    };

    Ok((final_width, final_height))
}

/// Scales `image` into the `max_width x max_height` box following [`fit_dimensions`].
pub fn resize_to_fit<I>(
    image: &I,
    max_width: u32,
    max_height: u32,
    filter: FilterType,
) -> Result<ImageBuffer<I::Pixel, Vec<<I::Pixel as Pixel>::Subpixel>>>
where
    I: GenericImageView,
    I::Pixel: 'static,
    <I::Pixel as Pixel>::Subpixel: 'static,
{
    let (width, height) = image.dimensions();
    let (new_width, new_height) = fit_dimensions(width, height, max_width, max_height)?;
    debug!(width, height, new_width, new_height, "resizing image to fit box");
    Ok(imageops::resize(image, new_width, new_height, filter))
}
