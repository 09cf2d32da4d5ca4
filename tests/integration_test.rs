use image::{GenericImageView, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use semseg_rs::config::Interpolation;
use semseg_rs::mocks::MockSegmentationModel;
use semseg_rs::palette::color_for;
use semseg_rs::{Config, ImageProcessor, Layout};

fn test_config(input: PathBuf, output_dir: PathBuf, layout: Layout) -> Config {
    Config {
        input,
        output_dir,
        model_path: "dummy.onnx".into(),
        format: "png".to_string(),
        device_id: 0,
        num_threads: 1,
        max_width: 300,
        max_height: 300,
        filter: Interpolation::Triangle,
        layout,
        verbose: false,
    }
}

fn write_image(path: &Path, width: u32, height: u32, color: Rgb<u8>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(width, height, color).save(path).unwrap();
}

#[test]
fn side_by_side_result_for_single_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("test.png");
    let output_dir = temp_dir.path().join("output");
    write_image(&input, 400, 200, Rgb([200, 10, 10]));

    let processor = ImageProcessor::new(
        MockSegmentationModel::uniform(21, 0),
        test_config(input, output_dir.clone(), Layout::SideBySide),
    );
    let summary = processor.process().unwrap();

    let result_path = output_dir.join("test.png");
    assert_eq!(summary.written, vec![result_path.clone()]);
    assert!(summary.failed.is_empty());

    let result = image::open(&result_path).unwrap();
    // 400x200 fits the 300x300 box as 300x150; the mask sits to its right.
    assert_eq!(result.dimensions(), (600, 150));
    assert_eq!(result.get_pixel(450, 75), color_for(0));
    assert_eq!(result.get_pixel(10, 10).0[3], 255);
}

#[test]
fn directory_layout_is_mirrored_and_failures_are_reported() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    write_image(&input_dir.join("a.png"), 20, 20, Rgb([0, 0, 255]));
    write_image(&input_dir.join("nested/b.png"), 30, 10, Rgb([0, 255, 0]));
    // Right extension, undecodable content.
    fs::write(input_dir.join("broken.png"), b"not a png").unwrap();

    let processor = ImageProcessor::new(
        MockSegmentationModel::by_channel(),
        test_config(input_dir.clone(), output_dir.clone(), Layout::Separate),
    );
    let summary = processor.process().unwrap();

    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, input_dir.join("broken.png"));
    assert_eq!(summary.written.len(), 4);

    let mask_a = image::open(output_dir.join("a_mask.png")).unwrap();
    assert_eq!(mask_a.dimensions(), (300, 300));
    // Blue dominates, class 2 of the channel mock.
    assert_eq!(mask_a.get_pixel(150, 150), color_for(2));

    let original_b = image::open(output_dir.join("nested/b_original.png")).unwrap();
    assert_eq!(original_b.dimensions(), (300, 100));
    let mask_b = image::open(output_dir.join("nested/b_mask.png")).unwrap();
    assert_eq!(mask_b.get_pixel(0, 0), color_for(1));

    assert!(!output_dir.join("broken_mask.png").exists());
}

#[test]
fn overlay_layout_writes_one_opaque_image() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("in/photo.png");
    let output_dir = temp_dir.path().join("out");
    write_image(&input, 10, 10, Rgb([0, 0, 0]));

    let mut config = test_config(input, output_dir.clone(), Layout::Overlay);
    config.format = "jpg".to_string();
    let processor = ImageProcessor::new(MockSegmentationModel::uniform(2, 1), config);
    let summary = processor.process().unwrap();

    assert_eq!(summary.written, vec![output_dir.join("photo.jpg")]);
    let result = image::open(output_dir.join("photo.jpg")).unwrap();
    assert_eq!(result.dimensions(), (300, 300));
}

#[test]
fn missing_input_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let processor = ImageProcessor::new(
        MockSegmentationModel::uniform(2, 0),
        test_config(
            temp_dir.path().join("nope"),
            temp_dir.path().join("out"),
            Layout::SideBySide,
        ),
    );
    assert!(processor.process().is_err());
}

#[test]
fn empty_directory_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().join("input");
    fs::create_dir_all(&input_dir).unwrap();

    let processor = ImageProcessor::new(
        MockSegmentationModel::uniform(2, 0),
        test_config(input_dir, temp_dir.path().join("out"), Layout::SideBySide),
    );
    let summary = processor.process().unwrap();
    assert!(summary.written.is_empty());
    assert!(summary.failed.is_empty());
}

#[test]
fn missing_model_file_is_a_model_load_error() {
    let err = semseg_rs::Model::load(Path::new("definitely/missing.onnx"), 0, 1)
        .err()
        .unwrap();
    assert!(matches!(err, semseg_rs::SegError::ModelLoad { .. }));
}

#[test]
fn unwritable_result_fails_only_that_file() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    write_image(&input_dir.join("a.png"), 20, 20, Rgb([0, 0, 255]));
    write_image(&input_dir.join("b.png"), 20, 20, Rgb([0, 255, 0]));
    // A non-empty directory where a.png's result should go.
    fs::create_dir_all(output_dir.join("a.png/occupied")).unwrap();

    let processor = ImageProcessor::new(
        MockSegmentationModel::uniform(2, 1),
        test_config(input_dir.clone(), output_dir.clone(), Layout::SideBySide),
    );
    let summary = processor.process().unwrap();

    assert_eq!(summary.written, vec![output_dir.join("b.png")]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, input_dir.join("a.png"));
    assert!(image::open(output_dir.join("b.png")).is_ok());
    assert!(!output_dir.join("a.png.tmp").exists());
}

#[test]
fn same_stem_with_different_extensions_keeps_both_results() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    write_image(&input_dir.join("cat.jpg"), 20, 20, Rgb([255, 0, 0]));
    write_image(&input_dir.join("cat.png"), 20, 20, Rgb([0, 0, 255]));

    let processor = ImageProcessor::new(
        MockSegmentationModel::by_channel(),
        test_config(input_dir, output_dir.clone(), Layout::SideBySide),
    );
    let summary = processor.process().unwrap();

    assert!(summary.failed.is_empty());
    // Inputs are visited in sorted order, so cat.jpg claims the plain name.
    assert_eq!(
        summary.written,
        vec![output_dir.join("cat.png"), output_dir.join("cat_2.png")]
    );
    let first = image::open(output_dir.join("cat.png")).unwrap();
    let second = image::open(output_dir.join("cat_2.png")).unwrap();
    assert_eq!(first.get_pixel(450, 150), color_for(0));
    assert_eq!(second.get_pixel(450, 150), color_for(2));
}
