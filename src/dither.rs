//! 1-bit conversion of continuous-tone rasters.
//!
//! All four strategies reduce an RGBA raster to a [`Bitmap`] of identical
//! dimensions. Each computes the same per-pixel luminance
//! (`0.299 R + 0.587 G + 0.114 B`) before applying its decision rule, and
//! all are pure functions of the input, so golden-output tests are stable.
//!
//! The error diffusion variants (Floyd-Steinberg, Atkinson) spread the
//! quantization error over a flat luminance buffer with linear index
//! arithmetic: a right-edge neighbor wraps into the start of the next row
//! instead of being clamped. That matches the device output this crate was
//! calibrated against and is kept as-is.

use crate::error::Error;
use crate::surface::Bitmap;

/// An RGBA source raster, 4 bytes per pixel, row major.
#[derive(Debug, Clone)]
pub struct RgbaImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbaImage {
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, Error> {
        if data.len() != (width * height * 4) as usize {
            return Err(Error::BufferSize {
                width,
                height,
                got: data.len(),
            });
        }
        Ok(RgbaImage {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn luminance_at(&self, pixel: usize) -> f32 {
        let i = pixel * 4;
        self.data[i] as f32 * 0.299
            + self.data[i + 1] as f32 * 0.587
            + self.data[i + 2] as f32 * 0.114
    }

    /// Luminance plane rounded into bytes, the working buffer for the
    /// error diffusion strategies.
    fn luminance_plane(&self) -> Vec<u8> {
        (0..(self.width * self.height) as usize)
            .map(|p| clamp(self.luminance_at(p).round() as i32))
            .collect()
    }
}

/// Dithering strategy. The threshold-carrying variants compare against the
/// given cutoff; the error diffusion variants quantize against a fixed
/// midpoint of 129.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dither {
    Threshold(u8),
    Bayer(u8),
    FloydSteinberg,
    Atkinson,
}

impl Dither {
    /// Convert `image` to 1-bit monochrome. Alpha is not consulted and the
    /// output carries no partial coverage: a pixel is either inked or not.
    pub fn apply(self, image: &RgbaImage) -> Bitmap {
        match self {
            Dither::Threshold(cutoff) => threshold(image, cutoff),
            Dither::Bayer(cutoff) => bayer(image, cutoff),
            Dither::FloydSteinberg => floyd_steinberg(image),
            Dither::Atkinson => atkinson(image),
        }
    }
}

pub fn threshold(image: &RgbaImage, cutoff: u8) -> Bitmap {
    let mut out = Bitmap::new(image.width, image.height);
    for y in 0..image.height {
        for x in 0..image.width {
            let lum = image.luminance_at((y * image.width + x) as usize);
            out.set(x, y, lum < cutoff as f32);
        }
    }
    out
}

const BAYER_MAP: [[i32; 4]; 4] = [
    [15, 135, 45, 165],
    [195, 75, 225, 105],
    [60, 180, 30, 150],
    [240, 120, 210, 90],
];

pub fn bayer(image: &RgbaImage, cutoff: u8) -> Bitmap {
    let mut out = Bitmap::new(image.width, image.height);
    for y in 0..image.height {
        for x in 0..image.width {
            let lum = image.luminance_at((y * image.width + x) as usize);
            let level = ((lum + BAYER_MAP[(x % 4) as usize][(y % 4) as usize] as f32) / 2.0)
                .floor() as i32;
            out.set(x, y, level < cutoff as i32);
        }
    }
    out
}

pub fn floyd_steinberg(image: &RgbaImage) -> Bitmap {
    let width = image.width as usize;
    let mut luma = image.luminance_plane();
    let mut out = Bitmap::new(image.width, image.height);

    for p in 0..luma.len() {
        let dark = luma[p] < 129;
        out.set((p % width) as u32, (p / width) as u32, dark);

        let quantized: i32 = if dark { 255 } else { 0 };
        let error = (luma[p] as i32 - quantized).div_euclid(16);
        diffuse(&mut luma, p + 1, error * 7);
        diffuse(&mut luma, p + width - 1, error * 3);
        diffuse(&mut luma, p + width, error * 5);
        diffuse(&mut luma, p + width + 1, error);
    }
    out
}

pub fn atkinson(image: &RgbaImage) -> Bitmap {
    let width = image.width as usize;
    let mut luma = image.luminance_plane();
    let mut out = Bitmap::new(image.width, image.height);

    for p in 0..luma.len() {
        let dark = luma[p] < 129;
        out.set((p % width) as u32, (p / width) as u32, dark);

        let quantized: i32 = if dark { 255 } else { 0 };
        let error = (luma[p] as i32 - quantized).div_euclid(8);
        diffuse(&mut luma, p + 1, error);
        diffuse(&mut luma, p + 2, error);
        diffuse(&mut luma, p + width - 1, error);
        diffuse(&mut luma, p + width, error);
        diffuse(&mut luma, p + width + 1, error);
        diffuse(&mut luma, p + 2 * width, error);
    }
    out
}

/// Saturating error write; targets past the end of the plane are dropped.
fn diffuse(luma: &mut [u8], index: usize, error: i32) {
    if let Some(v) = luma.get_mut(index) {
        *v = clamp(*v as i32 + error);
    }
}

fn clamp(v: i32) -> u8 {
    v.max(0).min(255) as u8
}
