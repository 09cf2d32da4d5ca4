use image::RgbImage;
use ndarray::prelude::*;
use nshare::AsNdarray3;

/// Per-channel RGB mean of the ImageNet training set, on values scaled to `[0, 1]`.
pub const NORM_MEAN_RGB: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel RGB standard deviation of the ImageNet training set.
pub const NORM_STD_RGB: [f32; 3] = [0.229, 0.224, 0.225];

/// Builds the `(1, 3, H, W)` model input from an RGB image.
///
/// Each channel is scaled to `[0, 1]` and then normalized with
/// [`NORM_MEAN_RGB`] and [`NORM_STD_RGB`].
pub fn to_input_tensor(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let view = image.as_ndarray3();
    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

    for (channel, (mean, std)) in NORM_MEAN_RGB.iter().zip(NORM_STD_RGB).enumerate() {
        let normalized = view
            .index_axis(Axis(0), channel)
            .mapv(|v| (f32::from(v) / 255.0 - mean) / std);
        tensor.slice_mut(s![0, channel, .., ..]).assign(&normalized);
    }

    tensor
}
