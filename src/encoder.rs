//! ESC/POS byte stream assembly.
//!
//! The encoder accumulates command fragments in a two-stage buffer:
//! fragments are queued first and only become part of the final output
//! on `flush`. [`Encoder::encode`] concatenates everything into one
//! immutable buffer and resets the instance, so one encoder can serve
//! successive documents.

use log::debug;

use crate::error::Error;
use crate::surface::Bitmap;

/// ESC/POS image packing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    /// `ESC *`: vertical strips of 24 pixel rows, 3 bytes per column.
    Column,
    /// `GS v 0`: the whole image row major, 8 horizontal pixels per byte.
    Raster,
}

/// Paper cut flavor for the `GS V` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutKind {
    Full,
    Partial,
}

/// One pending command fragment: a single opcode byte or a raw chunk.
#[derive(Debug)]
enum Fragment {
    Op(u8),
    Data(Vec<u8>),
}

impl Fragment {
    fn len(&self) -> usize {
        match self {
            Fragment::Op(_) => 1,
            Fragment::Data(data) => data.len(),
        }
    }
}

/// Command stream builder for ESC/POS thermal printers.
#[derive(Debug)]
pub struct Encoder {
    mode: ImageMode,
    buffer: Vec<Fragment>,
    queued: Vec<Fragment>,
    cursor: usize,
}

impl Encoder {
    pub fn new(mode: ImageMode) -> Self {
        Encoder {
            mode,
            buffer: Vec::new(),
            queued: Vec::new(),
            cursor: 0,
        }
    }

    fn queue_ops(&mut self, ops: &[u8]) {
        for &op in ops {
            self.queued.push(Fragment::Op(op));
        }
    }

    fn queue_data(&mut self, data: Vec<u8>) {
        self.queued.push(Fragment::Data(data));
    }

    /// Commit queued fragments to the output buffer and rewind the line
    /// cursor.
    fn flush(&mut self) {
        self.buffer.append(&mut self.queued);
        self.cursor = 0;
    }

    /// Line feed plus carriage return.
    pub fn newline(&mut self) -> &mut Self {
        self.flush();
        self.queue_ops(&[0x0A, 0x0D]);
        self
    }

    /// Queue a monochrome image in the encoder's transfer mode.
    ///
    /// Fails with [`Error::Dimension`] (queueing nothing) unless both
    /// dimensions are multiples of 8. A pending print line is closed with
    /// an implicit newline first, so the image never shares a line.
    pub fn image(&mut self, bitmap: &Bitmap) -> Result<&mut Self, Error> {
        let width = bitmap.width();
        let height = bitmap.height();
        if width % 8 != 0 || height % 8 != 0 {
            return Err(Error::Dimension { width, height });
        }
        if self.cursor != 0 {
            self.newline();
        }

        debug!("queueing {}x{} image in {:?} mode", width, height, self.mode);

        match self.mode {
            ImageMode::Column => self.queue_columns(bitmap),
            ImageMode::Raster => self.queue_raster(bitmap),
        }
        self.flush();
        Ok(self)
    }

    /// `ESC *` column mode: 24-row strips, one byte per 8-row sub-band,
    /// each strip framed with its pixel width in little-endian 16-bit form.
    fn queue_columns(&mut self, bitmap: &Bitmap) {
        let width = bitmap.width();
        let height = bitmap.height();

        // ESC 3: line spacing 24 dots so strips butt together.
        self.queue_ops(&[0x1B, 0x33, 0x24]);

        let strips = (height + 23) / 24;
        for strip in 0..strips {
            let mut bytes = vec![0u8; (width * 3) as usize];
            for x in 0..width {
                for band in 0..3u32 {
                    for bit in 0..8u32 {
                        let y = strip * 24 + bit + 8 * band;
                        if bitmap.pixel(x, y) {
                            bytes[(x * 3 + band) as usize] |= 1 << (7 - bit);
                        }
                    }
                }
            }
            self.queue_ops(&[
                0x1B,
                0x2A,
                0x21,
                (width & 0xFF) as u8,
                ((width >> 8) & 0xFF) as u8,
            ]);
            self.queue_data(bytes);
            self.queue_ops(&[0x0A]);
        }

        // ESC 2: restore default line spacing.
        self.queue_ops(&[0x1B, 0x32]);
    }

    /// `GS v 0` raster mode: single header with byte width and height in
    /// little-endian 16-bit fields, then the full image 8 pixels per byte,
    /// most significant bit leftmost.
    fn queue_raster(&mut self, bitmap: &Bitmap) {
        let width = bitmap.width();
        let height = bitmap.height();
        let row_bytes = width / 8;

        let mut data = vec![0u8; (row_bytes * height) as usize];
        for y in 0..height {
            for xb in 0..row_bytes {
                for bit in 0..8u32 {
                    if bitmap.pixel(xb * 8 + bit, y) {
                        data[(y * row_bytes + xb) as usize] |= 1 << (7 - bit);
                    }
                }
            }
        }
        self.queue_ops(&[
            0x1D,
            0x76,
            0x30,
            0x00,
            (row_bytes & 0xFF) as u8,
            ((row_bytes >> 8) & 0xFF) as u8,
            (height & 0xFF) as u8,
            ((height >> 8) & 0xFF) as u8,
        ]);
        self.queue_data(data);
    }

    /// `GS V`: cut the paper, full or partial.
    pub fn cut(&mut self, kind: CutKind) -> &mut Self {
        let flag = match kind {
            CutKind::Full => 0x00,
            CutKind::Partial => 0x01,
        };
        self.queue_ops(&[0x1D, 0x56, flag]);
        self
    }

    /// Flush and concatenate every queued fragment, in order, into one
    /// buffer. The encoder is reset afterwards and can be reused.
    pub fn encode(&mut self) -> Vec<u8> {
        self.flush();
        let length: usize = self.buffer.iter().map(Fragment::len).sum();
        let mut out = Vec::with_capacity(length);
        for fragment in self.buffer.drain(..) {
            match fragment {
                Fragment::Op(op) => out.push(op),
                Fragment::Data(data) => out.extend_from_slice(&data),
            }
        }
        self.queued.clear();
        self.cursor = 0;
        debug!("encoded {} bytes", out.len());
        out
    }
}
