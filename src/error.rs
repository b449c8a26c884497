//! Error types for receipt rasterization and encoding.
//!
//! All failures here are contract violations surfaced immediately to the
//! caller. Nothing is retried internally and there is no degraded output
//! mode: a render either completes or aborts.

use thiserror::Error;

/// Main error type for the rasterization and encoding pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Font source is unparseable or incomplete.
    ///
    /// Raised during `Font::load` when a required global property
    /// (`SIZE`, `FONTBOUNDINGBOX`, `PIXEL_SIZE`) is absent or a glyph
    /// block ends before all of its required fields were seen.
    #[error("malformed font source: {0}")]
    MalformedFont(String),

    /// A codepoint resolved to no glyph and the font has no default char.
    #[error("no glyph for codepoint {0} and no DEFAULT_CHAR fallback")]
    FontResolution(u32),

    /// Tabular layout was given inconsistent row/column shapes.
    #[error("table shape mismatch: {0}")]
    ColumnMismatch(String),

    /// Image dimensions are not byte aligned.
    ///
    /// Both transfer modes pack 8 pixels per byte, so `image()` rejects
    /// anything whose width or height is not a multiple of 8. The caller
    /// must pad or crop beforehand.
    #[error("image dimensions must be multiples of 8, got {width}x{height}")]
    Dimension { width: u32, height: u32 },

    /// An RGBA pixel buffer does not match its declared dimensions.
    #[error("pixel buffer length {got} does not match {width}x{height} RGBA")]
    BufferSize { width: u32, height: u32, got: usize },
}
