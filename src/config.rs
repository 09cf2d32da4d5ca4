use clap::{Parser, ValueEnum};
use image::{imageops::FilterType, ImageFormat};
use std::path::PathBuf;
use std::thread;

use crate::palette::Palette;
use crate::pipeline::{PipelineSettings, DEFAULT_DISPLAY_SIZE};
use crate::presenter::Layout;

/// Resampling filter for resizing and mask upscaling.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<Interpolation> for FilterType {
    fn from(value: Interpolation) -> Self {
        match value {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Triangle => FilterType::Triangle,
            Interpolation::CatmullRom => FilterType::CatmullRom,
            Interpolation::Gaussian => FilterType::Gaussian,
            Interpolation::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Image file or directory of images.
    pub input: PathBuf,

    #[arg(default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(short, long)]
    pub model_path: PathBuf,

    #[arg(short, long, default_value = "png", value_parser = check_format)]
    pub format: String,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    #[arg(long, default_value_t = default_threads())]
    pub num_threads: usize,

    /// Width of the display box the input is scaled into.
    #[arg(long, default_value_t = DEFAULT_DISPLAY_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_width: u32,

    /// Height of the display box the input is scaled into.
    #[arg(long, default_value_t = DEFAULT_DISPLAY_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_height: u32,

    #[arg(long, value_enum, default_value_t = Interpolation::default())]
    pub filter: Interpolation,

    #[arg(long, value_enum, default_value_t = Layout::default())]
    pub layout: Layout,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_width: self.max_width,
            max_height: self.max_height,
            filter: self.filter.into(),
            palette: Palette::default(),
        }
    }
}

fn default_threads() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

fn check_format(s: &str) -> Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.writing_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(s.to_string())
}
