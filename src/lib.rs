//! DANFE NFC-e Receipt Rasterizer
//!
//! This crate renders the Brazilian consumer fiscal receipt (DANFE NFC-e)
//! into a 1-bit raster and serializes it into an ESC/POS byte stream for
//! thermal printers:
//!
//! - [`Font`] loads BDF bitmap fonts and resolves codepoints to glyphs.
//! - [`TextPainter`] wraps, aligns and blits text onto a [`Canvas`].
//! - [`Dither`] reduces RGBA rasters (logos, artwork) to monochrome.
//! - [`Encoder`] packs a [`Bitmap`] and printer commands into bytes.
//! - [`receipt::render`] lays out a whole [`Document`].
//!
//! The physical transport (USB, serial, Bluetooth) is out of scope: the
//! encoder's output is an opaque byte buffer for whatever sink the caller
//! prefers.
//!
//! # Example
//!
//! ```rust
//! use nfce_pos::{Bitmap, CutKind, Encoder, ImageMode};
//!
//! let label = Bitmap::new(8, 8);
//! let mut encoder = Encoder::new(ImageMode::Raster);
//! let bytes = encoder
//!     .image(&label)
//!     .unwrap()
//!     .newline()
//!     .cut(CutKind::Partial)
//!     .encode();
//! assert!(!bytes.is_empty());
//! ```

mod dither;
mod encoder;
mod error;
mod font;
mod layout;
pub mod receipt;
mod surface;

pub use crate::{
    dither::{atkinson, bayer, floyd_steinberg, threshold, Dither, RgbaImage},
    encoder::{CutKind, Encoder, ImageMode},
    error::Error,
    font::{Font, FontPair, Glyph},
    layout::{draw_qr, Align, Extent, LayoutBox, QrMatrix, QrScale, TextPainter},
    receipt::{Document, RenderConfig},
    surface::{Bitmap, Canvas},
};
