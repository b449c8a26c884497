//! Text layout over a [`Canvas`].
//!
//! Word wrapping follows the classic canvas recipe: words are accumulated
//! greedily into a candidate line (with a trailing space re-appended),
//! remeasured, and the line is flushed once the next word would overflow.
//! A single word wider than the box is never split; field values that
//! legitimately exceed their nominal column just overflow.
//!
//! Besides plain wrapped writes, the painter offers dual-column rows
//! (label left, value right), N-column tables with a bold header row, and
//! QR module painting via the external [`QrMatrix`] provider.

use crate::error::Error;
use crate::font::{Font, FontPair, Glyph};
use crate::surface::Canvas;

/// Horizontal alignment inside a layout box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// One immutable per-call layout request.
#[derive(Debug, Clone, Copy)]
pub struct LayoutBox {
    pub x: i32,
    pub y: i32,
    pub max_width: i32,
    pub align: Align,
}

/// Measured text extents: the sum of every character's advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub width: i32,
    pub height: i32,
}

/// Dark/light module matrix produced by an external QR symbol generator.
pub trait QrMatrix {
    fn module_count(&self) -> u32;
    fn is_dark(&self, row: u32, col: u32) -> bool;
}

/// Target physical width of the QR symbol as a fraction of the paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrScale {
    P,
    M,
    G,
}

impl QrScale {
    pub fn fraction(self) -> f32 {
        match self {
            QrScale::P => 0.4,
            QrScale::M => 0.6,
            QrScale::G => 0.8,
        }
    }
}

/// Text painter for one font pair, line advance and pixel scale.
///
/// `scale` is an integer zoom (1 or 2): advances are multiplied by it and
/// every glyph pixel is blitted as a `scale x scale` block.
#[derive(Debug, Clone, Copy)]
pub struct TextPainter<'f> {
    fonts: &'f FontPair,
    line_height: i32,
    scale: i32,
}

impl<'f> TextPainter<'f> {
    pub fn new(fonts: &'f FontPair, line_height: u32, scale: u32) -> Self {
        TextPainter {
            fonts,
            line_height: line_height as i32,
            scale: scale as i32,
        }
    }

    /// Vertical advance of one text line.
    pub fn line_advance(&self) -> i32 {
        self.line_height * self.scale
    }

    /// Sum of the advances of every character in `text`.
    pub fn measure(&self, font: &Font, text: &str) -> Result<Extent, Error> {
        let mut extent = Extent { width: 0, height: 0 };
        for c in text.chars() {
            let glyph = font.glyph(c as u32)?;
            extent.width += glyph.advance_x * self.scale;
            extent.height += glyph.advance_y * self.scale;
        }
        Ok(extent)
    }

    /// Word-wrapped, aligned text write.
    ///
    /// Returns the Y coordinate immediately below the last drawn line, so
    /// callers can stack successive writes.
    pub fn draw(
        &self,
        canvas: &mut Canvas,
        text: &str,
        bounds: LayoutBox,
        bold: bool,
    ) -> Result<i32, Error> {
        let font = self.fonts.face(bold);
        let mut line = String::new();
        let mut y = bounds.y + self.line_advance();

        for (n, word) in text.split(' ').enumerate() {
            let candidate = format!("{}{} ", line, word);
            let width = self.measure(font, &candidate)?.width;
            if width > bounds.max_width && n > 0 {
                self.flush_line(canvas, font, &line, &bounds, y)?;
                line = format!("{} ", word);
                y += self.line_advance();
            } else {
                line = candidate;
            }
        }
        self.flush_line(canvas, font, &line, &bounds, y)?;
        Ok(y)
    }

    /// Dual-column row: left-aligned label, right-aligned value sharing the
    /// remaining width. Returns the lower of the two column bottoms.
    pub fn draw_pair(
        &self,
        canvas: &mut Canvas,
        left: &str,
        right: &str,
        x: i32,
        y: i32,
        width: i32,
        ratio: f32,
        bold: (bool, bool),
    ) -> Result<i32, Error> {
        let left_width = (width as f32 * ratio).floor() as i32;
        let left_y = self.draw(
            canvas,
            left,
            LayoutBox {
                x,
                y,
                max_width: left_width,
                align: Align::Left,
            },
            bold.0,
        )?;
        let right_y = self.draw(
            canvas,
            right,
            LayoutBox {
                x: x + left_width,
                y,
                max_width: width - left_width,
                align: Align::Right,
            },
            bold.1,
        )?;
        Ok(left_y.max(right_y))
    }

    /// Tabular write: each row's cells share a starting Y, the row bottom is
    /// the maximum across its cells, and rows stack. The first row is the
    /// header and is rendered bold.
    ///
    /// Fails with [`Error::ColumnMismatch`] if the alignment list or any
    /// row's cell count differs from the column width list.
    pub fn draw_table(
        &self,
        canvas: &mut Canvas,
        x: i32,
        y: i32,
        widths: &[i32],
        aligns: &[Align],
        rows: &[Vec<String>],
    ) -> Result<i32, Error> {
        if aligns.len() != widths.len() {
            return Err(Error::ColumnMismatch(format!(
                "{} alignments for {} columns",
                aligns.len(),
                widths.len()
            )));
        }
        let mut bottom = y;
        let mut bold = true;
        for row in rows {
            if row.len() != widths.len() {
                return Err(Error::ColumnMismatch(format!(
                    "row has {} cells, expected {}",
                    row.len(),
                    widths.len()
                )));
            }
            let row_y = bottom;
            let mut cell_x = x;
            for (i, cell) in row.iter().enumerate() {
                let cell_bottom = self.draw(
                    canvas,
                    cell,
                    LayoutBox {
                        x: cell_x,
                        y: row_y,
                        max_width: widths[i],
                        align: aligns[i],
                    },
                    bold,
                )?;
                bottom = bottom.max(cell_bottom);
                cell_x += widths[i];
            }
            bold = false;
        }
        Ok(bottom)
    }

    fn flush_line(
        &self,
        canvas: &mut Canvas,
        font: &Font,
        line: &str,
        bounds: &LayoutBox,
        y: i32,
    ) -> Result<(), Error> {
        let width = self.measure(font, line)?.width;
        let free = bounds.max_width - width;
        let x = match bounds.align {
            Align::Left => bounds.x,
            Align::Center => bounds.x + free / 2,
            Align::Right => bounds.x + free,
        };
        self.write_line(canvas, font, line, x, y)
    }

    fn write_line(
        &self,
        canvas: &mut Canvas,
        font: &Font,
        line: &str,
        x: i32,
        y: i32,
    ) -> Result<(), Error> {
        let mut pen = (x, y);
        for c in line.chars() {
            let glyph = font.glyph(c as u32)?;
            pen = self.draw_glyph(canvas, glyph, pen.0, pen.1);
        }
        Ok(())
    }

    /// Blit one glyph with its bitmap origin placed relative to the pen
    /// baseline. Row bits are read from the declared bit width down to bit
    /// zero, most significant bit leftmost.
    fn draw_glyph(&self, canvas: &mut Canvas, glyph: &Glyph, x: i32, y: i32) -> (i32, i32) {
        let ox = x + (glyph.bb_xoff - 1) * self.scale;
        let oy = y - (glyph.bb_yoff + glyph.bb_height as i32 - 1) * self.scale;
        for (row_index, row) in glyph.rows.iter().enumerate() {
            let mut col = 0;
            for bit in (0..=glyph.row_bits).rev() {
                if bit < 64 && (row >> bit) & 1 == 1 {
                    canvas.fill_rect(
                        ox + col * self.scale,
                        oy + row_index as i32 * self.scale,
                        self.scale as u32,
                        self.scale as u32,
                    );
                }
                col += 1;
            }
        }
        (
            x + glyph.advance_x * self.scale,
            y + glyph.advance_y * self.scale,
        )
    }
}

/// Paint one filled square per dark QR module, sized so the symbol fills
/// `scale.fraction()` of `width`, horizontally centered with a vertical
/// margin of at least a tenth of the symbol. Returns the Y below the block.
pub fn draw_qr(
    canvas: &mut Canvas,
    qr: &dyn QrMatrix,
    y: i32,
    width: i32,
    scale: QrScale,
) -> i32 {
    let modules = qr.module_count() as i32;
    if modules == 0 {
        return y;
    }
    let dot = ((width as f32 * scale.fraction()) / modules as f32).floor() as i32;
    let margin_v = ((dot * modules) as f32 / 10.0).ceil() as i32;
    let margin_h = (width - dot * modules) / 2;

    for r in 0..modules {
        for c in 0..modules {
            if qr.is_dark(r as u32, c as u32) {
                canvas.fill_rect(
                    c * dot + margin_h,
                    r * dot + margin_v + y,
                    dot as u32,
                    dot as u32,
                );
            }
        }
    }
    y + modules * dot + margin_v * 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Font;

    /// Fixed-advance test font: every printable ASCII glyph is 5px wide,
    /// the space is 2px, so a two-letter word measures 10px and a word
    /// boundary adds 2px.
    fn fixture() -> FontPair {
        let mut source = String::from(
            "STARTFONT 2.1\nFONT fixture\nSIZE 8 75 75\nFONTBOUNDINGBOX 5 6 0 -1\n\
             STARTPROPERTIES 2\nPIXEL_SIZE 8\nDEFAULT_CHAR 32\nENDPROPERTIES\nCHARS 95\n",
        );
        for cp in 32u32..127 {
            let advance = if cp == 32 { 2 } else { 5 };
            source.push_str(&format!(
                "STARTCHAR U+{:04X}\nENCODING {}\nSWIDTH 500 0\nDWIDTH {} 0\nBBX 4 6 0 -1\n\
                 BITMAP\n60\n90\n90\n90\n60\n00\nENDCHAR\n",
                cp, cp, advance
            ));
        }
        source.push_str("ENDFONT\n");
        FontPair::single(Font::load(&source).unwrap())
    }

    fn painter(fonts: &FontPair) -> TextPainter {
        TextPainter::new(fonts, 8, 1)
    }

    #[test]
    fn measure_sums_advances() {
        let fonts = fixture();
        let p = painter(&fonts);
        let e = p.measure(fonts.face(false), "aa b").unwrap();
        assert_eq!(e.width, 5 + 5 + 2 + 5);
        assert_eq!(e.height, 0);
    }

    #[test]
    fn short_text_is_one_line() {
        let fonts = fixture();
        let p = painter(&fonts);
        let mut canvas = Canvas::new(100, 100);
        let bounds = LayoutBox {
            x: 0,
            y: 16,
            max_width: 100,
            align: Align::Left,
        };
        let y = p.draw(&mut canvas, "ab", bounds, false).unwrap();
        assert_eq!(y, 16 + 8);
    }

    #[test]
    fn wraps_at_most_two_words_per_line() {
        // "aa bb " measures 24 <= 25, appending "cc" overflows: two lines.
        let fonts = fixture();
        let p = painter(&fonts);
        let mut canvas = Canvas::new(100, 100);
        let bounds = LayoutBox {
            x: 0,
            y: 0,
            max_width: 25,
            align: Align::Left,
        };
        let y = p.draw(&mut canvas, "aa bb cc", bounds, false).unwrap();
        assert_eq!(y, 2 * 8);
    }

    #[test]
    fn oversized_word_is_never_split() {
        let fonts = fixture();
        let p = painter(&fonts);
        let mut canvas = Canvas::new(100, 100);
        let bounds = LayoutBox {
            x: 0,
            y: 0,
            max_width: 10,
            align: Align::Left,
        };
        // First word measures 25 > 10 but still lands on the first line;
        // only the following word wraps.
        let y = p.draw(&mut canvas, "aaaaa bb", bounds, false).unwrap();
        assert_eq!(y, 2 * 8);
    }

    #[test]
    fn scale_doubles_advances() {
        let fonts = fixture();
        let p = TextPainter::new(&fonts, 8, 2);
        let e = p.measure(fonts.face(false), "ab").unwrap();
        assert_eq!(e.width, 20);
        assert_eq!(p.line_advance(), 16);
    }

    #[test]
    fn table_shape_is_checked() {
        let fonts = fixture();
        let p = painter(&fonts);
        let mut canvas = Canvas::new(100, 100);

        let bad_aligns = p.draw_table(
            &mut canvas,
            0,
            0,
            &[50, 50],
            &[Align::Left],
            &[vec!["a".into(), "b".into()]],
        );
        assert!(matches!(bad_aligns, Err(Error::ColumnMismatch(_))));

        let bad_row = p.draw_table(
            &mut canvas,
            0,
            0,
            &[50, 50],
            &[Align::Left, Align::Right],
            &[vec!["a".into()]],
        );
        assert!(matches!(bad_row, Err(Error::ColumnMismatch(_))));
    }

    #[test]
    fn table_rows_stack_below_header() {
        let fonts = fixture();
        let p = painter(&fonts);
        let mut canvas = Canvas::new(100, 100);
        let rows = vec![
            vec!["h".to_string(), "h".to_string()],
            vec!["a".to_string(), "b".to_string()],
        ];
        let bottom = p
            .draw_table(&mut canvas, 0, 0, &[50, 50], &[Align::Left, Align::Right], &rows)
            .unwrap();
        assert_eq!(bottom, 2 * 8);
    }

    struct Checker;

    impl QrMatrix for Checker {
        fn module_count(&self) -> u32 {
            4
        }
        fn is_dark(&self, row: u32, col: u32) -> bool {
            (row + col) % 2 == 0
        }
    }

    #[test]
    fn qr_block_advances_by_symbol_and_margins() {
        let mut canvas = Canvas::new(100, 200);
        // dot = floor(100 * 0.4 / 4) = 10, margin_v = ceil(40 / 10) = 4.
        let y = draw_qr(&mut canvas, &Checker, 0, 100, QrScale::P);
        assert_eq!(y, 4 * 10 + 2 * 4);
        let bitmap = canvas.finish(64);
        // Top-left module is dark and centered with margin_h = 30.
        assert!(bitmap.pixel(30, 4));
        assert!(!bitmap.pixel(41, 4));
    }
}
