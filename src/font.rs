//! BDF bitmap font loading.
//!
//! Receipt layout uses fixed bitmap fonts (Terminus, Cozette and friends)
//! shipped as BDF text. The parser is a single pass, line oriented state
//! machine: top level directives set font-wide metadata or open a
//! properties/glyph block; inside a glyph block metadata directives are
//! consumed until `BITMAP`, after which every line is one hex row until
//! `ENDCHAR`. Unknown top level directives are ignored so newer BDF files
//! keep loading.

use std::collections::HashMap;

use log::{debug, info};

use crate::error::Error;

/// A single character's bitmap and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub encoding: u32,
    /// `BBX` width, height and offsets relative to the baseline.
    pub bb_width: u32,
    pub bb_height: u32,
    pub bb_xoff: i32,
    pub bb_yoff: i32,
    /// `DWIDTH` pen advance after drawing this glyph.
    pub advance_x: i32,
    pub advance_y: i32,
    /// One entry per bitmap row, top to bottom. Bits are read from
    /// `row_bits - 1` down to 0, most significant bit leftmost.
    pub rows: Vec<u64>,
    /// Declared bit width of each row: hex digit count times four.
    pub row_bits: u32,
}

/// Value of a `STARTPROPERTIES` entry: quoted strings stay text,
/// anything else is stored as a number.
#[derive(Debug, Clone, PartialEq)]
enum Property {
    Text(String),
    Number(i64),
}

/// A parsed BDF font. Immutable after load and safe to share between
/// concurrent renders.
#[derive(Debug, Clone)]
pub struct Font {
    name: String,
    /// `PIXEL_SIZE` property, used by the layout engine as line advance.
    size: u32,
    default_char: Option<u32>,
    glyphs: HashMap<u32, Glyph>,
}

/// Regular and emphasized faces of the same family, so callers can switch
/// to bold for headers without carrying two font handles around.
#[derive(Debug, Clone)]
pub struct FontPair {
    pub regular: Font,
    pub bold: Font,
}

#[derive(Default)]
struct GlyphBuilder {
    encoding: Option<i64>,
    advance: Option<(i32, i32)>,
    bbx: Option<(u32, u32, i32, i32)>,
    /// `Some` once the `BITMAP` marker was seen.
    rows: Option<Vec<u64>>,
    row_bits: u32,
}

impl GlyphBuilder {
    fn build(self) -> Result<Glyph, Error> {
        let encoding = self
            .encoding
            .ok_or_else(|| Error::MalformedFont("glyph without ENCODING".into()))?;
        let (advance_x, advance_y) = self
            .advance
            .ok_or_else(|| Error::MalformedFont(format!("glyph {} without DWIDTH", encoding)))?;
        let (bb_width, bb_height, bb_xoff, bb_yoff) = self
            .bbx
            .ok_or_else(|| Error::MalformedFont(format!("glyph {} without BBX", encoding)))?;
        let rows = self
            .rows
            .ok_or_else(|| Error::MalformedFont(format!("glyph {} without BITMAP", encoding)))?;
        if rows.len() != bb_height as usize {
            return Err(Error::MalformedFont(format!(
                "glyph {}: {} bitmap rows for BBX height {}",
                encoding,
                rows.len(),
                bb_height
            )));
        }
        Ok(Glyph {
            encoding: encoding as u32,
            bb_width,
            bb_height,
            bb_xoff,
            bb_yoff,
            advance_x,
            advance_y,
            rows,
            row_bits: self.row_bits,
        })
    }
}

fn number(field: &str, value: Option<&str>) -> Result<i64, Error> {
    value
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| Error::MalformedFont(format!("bad {} directive", field)))
}

impl Font {
    /// Parse a BDF font source.
    ///
    /// Fails with [`Error::MalformedFont`] if the global `SIZE`,
    /// `FONTBOUNDINGBOX` or `PIXEL_SIZE` entries are absent, or if a glyph
    /// block is missing a required field before its `ENDCHAR`.
    pub fn load(source: &str) -> Result<Self, Error> {
        let mut name = String::new();
        let mut size_seen = false;
        let mut bbox_seen = false;
        let mut properties: HashMap<String, Property> = HashMap::new();
        let mut in_properties = false;
        let mut glyph: Option<GlyphBuilder> = None;
        let mut glyphs: HashMap<u32, Glyph> = HashMap::new();

        for line in source.lines() {
            let line = line.trim_end();
            let mut parts = line.split(' ');
            let directive = parts.next().unwrap_or("");

            if glyph.is_some() {
                if line == "ENDCHAR" {
                    let g = glyph.take().unwrap().build()?;
                    glyphs.insert(g.encoding, g);
                    continue;
                }
                let current = glyph.as_mut().unwrap();
                if let Some(rows) = current.rows.as_mut() {
                    // Hex bitmap row; bit width follows from the digit count.
                    let bits = line.len() as u32 * 4;
                    let row = u64::from_str_radix(line, 16)
                        .map_err(|_| Error::MalformedFont(format!("bad bitmap row {:?}", line)))?;
                    current.row_bits = bits;
                    rows.push(row);
                } else {
                    match directive {
                        "ENCODING" => current.encoding = Some(number("ENCODING", parts.next())?),
                        "DWIDTH" => {
                            let x = number("DWIDTH", parts.next())?;
                            let y = number("DWIDTH", parts.next())?;
                            current.advance = Some((x as i32, y as i32));
                        }
                        "BBX" => {
                            let w = number("BBX", parts.next())?;
                            let h = number("BBX", parts.next())?;
                            let x = number("BBX", parts.next())?;
                            let y = number("BBX", parts.next())?;
                            current.bbx = Some((w as u32, h as u32, x as i32, y as i32));
                        }
                        "BITMAP" => current.rows = Some(Vec::new()),
                        // SWIDTH, ATTRIBUTES and friends are irrelevant here.
                        _ => {}
                    }
                }
            } else if in_properties {
                if line == "ENDPROPERTIES" {
                    in_properties = false;
                } else if let Some((key, value)) = split_property(line) {
                    properties.insert(key.to_string(), value);
                }
            } else {
                match directive {
                    "FONT" => name = parts.next().unwrap_or("").to_string(),
                    "SIZE" => size_seen = true,
                    "FONTBOUNDINGBOX" => bbox_seen = true,
                    "STARTPROPERTIES" => in_properties = true,
                    "STARTCHAR" => glyph = Some(GlyphBuilder::default()),
                    // COMMENT, CHARS, STARTFONT, ENDFONT, anything newer:
                    // ignored for forward compatibility.
                    _ => debug!("ignoring directive {:?}", directive),
                }
            }
        }

        if !size_seen {
            return Err(Error::MalformedFont("missing SIZE".into()));
        }
        if !bbox_seen {
            return Err(Error::MalformedFont("missing FONTBOUNDINGBOX".into()));
        }
        let size = match properties.get("PIXEL_SIZE") {
            Some(Property::Number(n)) if *n > 0 => *n as u32,
            _ => return Err(Error::MalformedFont("missing PIXEL_SIZE property".into())),
        };
        let default_char = match properties.get("DEFAULT_CHAR") {
            Some(Property::Number(n)) => Some(*n as u32),
            _ => None,
        };

        info!("loaded font {:?}: {} glyphs, size {}", name, glyphs.len(), size);

        Ok(Font {
            name,
            size,
            default_char,
            glyphs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pixel size of the font, the natural line advance.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Resolve a codepoint to its glyph, falling back to the font's
    /// `DEFAULT_CHAR`. Fails with [`Error::FontResolution`] if neither
    /// exists.
    pub fn glyph(&self, codepoint: u32) -> Result<&Glyph, Error> {
        self.glyphs
            .get(&codepoint)
            .or_else(|| {
                self.default_char
                    .and_then(|fallback| self.glyphs.get(&fallback))
            })
            .ok_or(Error::FontResolution(codepoint))
    }
}

impl FontPair {
    /// Use a single face for both weights.
    pub fn single(font: Font) -> Self {
        FontPair {
            bold: font.clone(),
            regular: font,
        }
    }

    pub fn face(&self, bold: bool) -> &Font {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }
}

fn split_property(line: &str) -> Option<(&str, Property)> {
    let mut parts = line.splitn(2, ' ');
    let key = parts.next()?;
    let raw = parts.next()?;
    let value = if raw.starts_with('"') {
        Property::Text(raw.trim_matches('"').to_string())
    } else {
        match raw.parse() {
            Ok(n) => Property::Number(n),
            Err(_) => Property::Text(raw.to_string()),
        }
    };
    Some((key, value))
}
