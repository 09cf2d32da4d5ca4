//! Class colors for segmentation masks.

use image::Rgba;

use crate::errors::{Result, SegError};

/// Default class colors as `0xAARRGGBB`. Every entry is half transparent so the
/// mask can be laid over the source image.
pub const DEFAULT_ARGB: [u32; 21] = [
    0x8080_8080, // gray
    0x8000_0000, // black
    0x80FF_0000, // red
    0x8000_FF00, // green
    0x8000_00FF, // blue
    0x80FF_FF00, // yellow
    0x80FF_00FF, // magenta
    0x8000_FFFF, // cyan
    0x80FF_8000, // orange
    0x8000_8000, // olive
    0x8000_0080, // purple
    0x8080_0080, // maroon
    0x80FF_8080, // light red
    0x8080_FF80, // light green
    0x8080_80FF, // light blue
    0x80FF_0080, // pink
    0x80FF_FFFF, // white
    0x8080_8000, // dark yellow
    0x8000_8080, // dark magenta
    0x8080_00FF, // light purple
    0x80FF_80FF, // light magenta
];

/// Unpacks an `0xAARRGGBB` word into an RGBA pixel.
pub const fn argb_to_rgba(argb: u32) -> Rgba<u8> {
    Rgba([
        (argb >> 16) as u8,
        (argb >> 8) as u8,
        argb as u8,
        (argb >> 24) as u8,
    ])
}

/// An ordered, non-empty list of class colors.
///
/// Class indices past the end wrap around, so index `len` shares the color of index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgba<u8>>,
}

impl Palette {
    pub fn new(colors: Vec<Rgba<u8>>) -> Result<Self> {
        if colors.is_empty() {
            return Err(SegError::validation("palette", "must contain at least one color"));
        }
        Ok(Self { colors })
    }

    pub fn from_argb(colors: &[u32]) -> Result<Self> {
        Self::new(colors.iter().copied().map(argb_to_rgba).collect())
    }

    pub fn color_for(&self, class_index: i64) -> Rgba<u8> {
        let len = self.colors.len() as i64;
        self.colors[class_index.rem_euclid(len) as usize]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    // Never true, the constructor rejects empty palettes.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgba<u8>] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_ARGB.iter().copied().map(argb_to_rgba).collect(),
        }
    }
}

/// Color of `class_index` in the default palette.
pub fn color_for(class_index: i64) -> Rgba<u8> {
    let len = DEFAULT_ARGB.len() as i64;
    argb_to_rgba(DEFAULT_ARGB[class_index.rem_euclid(len) as usize])
}
