//! Pixel buffers shared by the layout, dithering and encoding stages.
//!
//! [`Bitmap`] is the 1-bit monochrome raster every stage ultimately speaks:
//! one boolean "ink" value per pixel. [`Canvas`] wraps a `Bitmap` that is
//! still being painted; the final document height is only known after
//! layout, so the canvas is created oversized and trimmed once by
//! [`Canvas::finish`].

/// A 1-bit monochrome raster. `true` means ink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    ink: Vec<bool>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Bitmap {
            width,
            height,
            ink: vec![false; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Ink state at `(x, y)`. Out of bounds reads are blank, which lets
    /// the encoder sample past the bottom of an image whose height is not
    /// a multiple of the column strip height.
    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x < self.width && y < self.height {
            self.ink[(y * self.width + x) as usize]
        } else {
            false
        }
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        if x < self.width && y < self.height {
            self.ink[(y * self.width + x) as usize] = on;
        }
    }

    pub(crate) fn from_raw(width: u32, height: u32, ink: Vec<bool>) -> Self {
        debug_assert_eq!(ink.len(), (width * height) as usize);
        Bitmap { width, height, ink }
    }
}

/// A mutable drawing surface owned by one in-progress render.
///
/// Created with a reserve height well beyond any plausible document, painted
/// by the layout engine, then cut down to the discovered extent. There is no
/// implicit resizing: [`Canvas::finish`] is the single late-bound height
/// adjustment.
#[derive(Debug)]
pub struct Canvas {
    bitmap: Bitmap,
}

impl Canvas {
    pub fn new(width: u32, reserve_height: u32) -> Self {
        Canvas {
            bitmap: Bitmap::new(width, reserve_height),
        }
    }

    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    /// Fill a rectangle with ink. Parts outside the surface are clipped.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32) {
        for dy in 0..h as i32 {
            for dx in 0..w as i32 {
                let (px, py) = (x + dx, y + dy);
                if px >= 0 && py >= 0 {
                    self.bitmap.set(px as u32, py as u32, true);
                }
            }
        }
    }

    /// OR a prerendered bitmap (logo, pre-dithered artwork) into the surface.
    pub fn blit(&mut self, source: &Bitmap, x: i32, y: i32) {
        for sy in 0..source.height() {
            for sx in 0..source.width() {
                if source.pixel(sx, sy) {
                    let (px, py) = (x + sx as i32, y + sy as i32);
                    if px >= 0 && py >= 0 {
                        self.bitmap.set(px as u32, py as u32, true);
                    }
                }
            }
        }
    }

    /// Trim (or pad) the surface to its final height and hand over the
    /// finished raster. Rows beyond the reserve come out blank.
    pub fn finish(self, height: u32) -> Bitmap {
        let width = self.bitmap.width;
        let mut ink = self.bitmap.ink;
        ink.resize((width * height) as usize, false);
        Bitmap::from_raw(width, height, ink)
    }
}
