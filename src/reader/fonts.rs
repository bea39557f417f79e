//! Font metrics and glyph decoding for content stream interpretation.

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use super::pdf::resolve;

/// Fallback glyph width in 1/1000 text space units (half an em).
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// The parts of a font dictionary needed to position glyphs.
#[derive(Debug, Clone)]
pub(crate) struct FontInfo<'a> {
    /// The font dictionary, used for encoding lookups
    pub dict: Option<&'a Dictionary>,
    /// Composite (Type0) fonts use two-byte codes
    pub two_byte: bool,
    /// Code of the first entry in `widths`
    first_char: u32,
    /// Glyph widths in 1/1000 text space units
    widths: Vec<f32>,
    /// Width for codes outside `widths`
    default_width: f32,
}

impl<'a> FontInfo<'a> {
    /// Font used when `Tf` names a font that cannot be resolved.
    pub fn fallback() -> Self {
        Self {
            dict: None,
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            default_width: DEFAULT_GLYPH_WIDTH,
        }
    }

    /// Read widths and code size from a font dictionary.
    pub fn from_dict(doc: &'a LopdfDocument, dict: &'a Dictionary) -> Self {
        let subtype = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| name_of(resolve(doc, o)));

        if subtype == Some(b"Type0".as_slice()) {
            return Self {
                dict: Some(dict),
                two_byte: true,
                first_char: 0,
                widths: Vec::new(),
                default_width: descendant_default_width(doc, dict),
            };
        }

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| get_number(resolve(doc, o)))
            .unwrap_or(0.0)
            .max(0.0) as u32;

        let widths = match dict.get(b"Widths").ok().map(|o| resolve(doc, o)) {
            Some(Object::Array(arr)) => arr
                .iter()
                .map(|w| get_number(resolve(doc, w)).unwrap_or(DEFAULT_GLYPH_WIDTH))
                .collect(),
            _ => Vec::new(),
        };

        let default_width = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| match resolve(doc, o) {
                Object::Dictionary(d) => d.get(b"MissingWidth").ok(),
                _ => None,
            })
            .and_then(|o| get_number(resolve(doc, o)))
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_GLYPH_WIDTH);

        Self {
            dict: Some(dict),
            two_byte: false,
            first_char,
            widths,
            default_width,
        }
    }

    /// Number of bytes per character code.
    pub fn code_len(&self) -> usize {
        if self.two_byte {
            2
        } else {
            1
        }
    }

    /// Width of a glyph in 1/1000 text space units.
    pub fn glyph_width(&self, code: u32) -> f32 {
        code.checked_sub(self.first_char)
            .and_then(|idx| self.widths.get(idx as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }
}

/// `DW` of the first descendant font of a Type0 font.
fn descendant_default_width(doc: &LopdfDocument, dict: &Dictionary) -> f32 {
    let descendant = match dict.get(b"DescendantFonts").ok().map(|o| resolve(doc, o)) {
        Some(Object::Array(arr)) => arr.first().map(|o| resolve(doc, o)),
        _ => None,
    };
    match descendant {
        Some(Object::Dictionary(d)) => d
            .get(b"DW")
            .ok()
            .and_then(|o| get_number(resolve(doc, o)))
            .unwrap_or(1000.0),
        _ => 1000.0,
    }
}

/// Simple text decoding fallback when no encoding is available.
pub(crate) fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Extract a number from a PDF object.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Extract a name from a PDF object.
pub(crate) fn name_of(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::Name(n) => Some(n.as_slice()),
        _ => None,
    }
}
