//! Content stream interpretation.
//!
//! Walks the operators of a page content stream while tracking the
//! graphics state, and produces word tokens (from text show operators) and
//! image placements (from `Do`). Boxes are in PDF user space, y growing up;
//! the caller converts them to page coordinates.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::fonts::{decode_text_simple, get_number, name_of, FontInfo};
use super::pdf::{dict_of, resolve, stream_content};
use crate::error::{Error, Result};
use crate::model::{Asset, AssetId, Rect, Token};

/// Nested Form XObjects deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 8;

/// `TJ` adjustments larger than this (in 1/1000 em) separate words.
const TJ_WORD_BREAK: f32 = 200.0;

/// A pen jump larger than this fraction of the font size separates words.
const GAP_WORD_BREAK: f32 = 0.25;

/// Approximate ascender and descender as fractions of the font size.
const ASCENT: f32 = 0.8;
const DESCENT: f32 = 0.2;

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix::new(
            self.a * other.a + self.b * other.c,
            self.a * other.b + self.b * other.d,
            self.c * other.a + self.d * other.c,
            self.c * other.b + self.d * other.d,
            self.e * other.a + self.f * other.c + other.e,
            self.e * other.b + self.f * other.d + other.f,
        )
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Operands in `cm` order.
    pub fn to_array(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Bounding box of a rectangle after transformation.
    pub fn transform_rect(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> Rect {
        let corners = [
            self.apply(x0, y0),
            self.apply(x1, y0),
            self.apply(x0, y1),
            self.apply(x1, y1),
        ];
        corners.iter().skip(1).fold(
            Rect::new(corners[0].0, corners[0].1, corners[0].0, corners[0].1),
            |r, &(x, y)| Rect::new(r.x0.min(x), r.y0.min(y), r.x1.max(x), r.y1.max(y)),
        )
    }

    /// Length of the transformed unit vertical vector.
    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let n: Vec<f32> = operands[..6].iter().filter_map(get_number).collect();
        (n.len() == 6).then(|| Matrix::new(n[0], n[1], n[2], n[3], n[4], n[5]))
    }
}

/// Text state parameters (part of the graphics state).
#[derive(Debug, Clone)]
struct TextState<'a> {
    font: FontInfo<'a>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState<'_> {
    fn default() -> Self {
        Self {
            font: FontInfo::fallback(),
            size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState<'a> {
    ctm: Matrix,
    text: TextState<'a>,
}

/// Accumulates glyphs into a word until a break.
#[derive(Debug, Default)]
struct WordBuilder {
    text: String,
    bbox: Option<Rect>,
    /// End point of the previous glyph, in user space
    pen: Option<(f32, f32)>,
}

impl WordBuilder {
    fn push_glyph(
        &mut self,
        out: &mut Vec<Token>,
        text: &str,
        bbox: Rect,
        origin: (f32, f32),
        end: (f32, f32),
        em: f32,
    ) {
        if let Some((px, py)) = self.pen {
            let gap = ((origin.0 - px).powi(2) + (origin.1 - py).powi(2)).sqrt();
            if gap > em * GAP_WORD_BREAK {
                self.flush(out);
            }
        }

        for c in text.chars() {
            if c.is_whitespace() {
                self.flush(out);
            } else {
                self.text.push(c);
                self.bbox = Some(match self.bbox {
                    Some(current) => current.union(&bbox),
                    None => bbox,
                });
            }
        }
        self.pen = Some(end);
    }

    fn flush(&mut self, out: &mut Vec<Token>) {
        if let Some(bbox) = self.bbox.take() {
            if !self.text.is_empty() {
                out.push(Token::new(std::mem::take(&mut self.text), bbox));
            }
        }
        self.text.clear();
    }

    /// End the current word and forget the pen position.
    fn hard_break(&mut self, out: &mut Vec<Token>) {
        self.flush(out);
        self.pen = None;
    }
}

/// Interprets the content of one page.
pub(crate) struct ContentInterpreter<'a> {
    doc: &'a LopdfDocument,
    tokens: Vec<Token>,
    assets: Vec<Asset>,
    word: WordBuilder,
}

impl<'a> ContentInterpreter<'a> {
    pub fn new(doc: &'a LopdfDocument) -> Self {
        Self {
            doc,
            tokens: Vec::new(),
            assets: Vec::new(),
            word: WordBuilder::default(),
        }
    }

    /// Interpret a page content stream with its resources.
    pub fn run(
        mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
    ) -> Result<(Vec<Token>, Vec<Asset>)> {
        let state = GraphicsState {
            ctm: Matrix::IDENTITY,
            text: TextState::default(),
        };
        self.interpret(content, resources, state, 0)?;
        self.word.hard_break(&mut self.tokens);
        Ok((self.tokens, self.assets))
    }

    fn interpret(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        initial: GraphicsState<'a>,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(content).map_err(|e| Error::PdfParse(e.to_string()))?;

        let fonts = resources
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|o| dict_of(self.doc, o));
        let mut font_cache: HashMap<Vec<u8>, FontInfo<'a>> = HashMap::new();

        let mut gs = initial;
        let mut stack: Vec<GraphicsState<'a>> = Vec::new();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;

        for op in &content.operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        gs.ctm = m.then(&gs.ctm);
                    }
                }
                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "ET" => self.word.hard_break(&mut self.tokens),
                "Tf" => {
                    if let (Some(name), Some(size)) = (
                        operands.first().and_then(name_of),
                        operands.get(1).and_then(get_number),
                    ) {
                        let doc = self.doc;
                        gs.text.font = font_cache
                            .entry(name.to_vec())
                            .or_insert_with(|| {
                                fonts
                                    .and_then(|f| f.get(name).ok())
                                    .and_then(|o| dict_of(doc, o))
                                    .map(|d| FontInfo::from_dict(doc, d))
                                    .unwrap_or_else(|| {
                                        log::debug!(
                                            "font /{} not found in resources",
                                            String::from_utf8_lossy(name)
                                        );
                                        FontInfo::fallback()
                                    })
                            })
                            .clone();
                        gs.text.size = size;
                    }
                }
                "Tc" => set_number(operands, &mut gs.text.char_spacing),
                "Tw" => set_number(operands, &mut gs.text.word_spacing),
                "TL" => set_number(operands, &mut gs.text.leading),
                "Ts" => set_number(operands, &mut gs.text.rise),
                "Tz" => {
                    if let Some(scale) = operands.first().and_then(get_number) {
                        gs.text.horizontal_scale = scale / 100.0;
                    }
                }
                "Td" | "TD" => {
                    if let (Some(tx), Some(ty)) = (
                        operands.first().and_then(get_number),
                        operands.get(1).and_then(get_number),
                    ) {
                        if op.operator == "TD" {
                            gs.text.leading = -ty;
                        }
                        tlm = Matrix::translation(tx, ty).then(&tlm);
                        tm = tlm;
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        tlm = m;
                        tm = m;
                    }
                }
                "T*" => {
                    tlm = Matrix::translation(0.0, -gs.text.leading).then(&tlm);
                    tm = tlm;
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_string(&gs, &mut tm, bytes);
                    }
                }
                "'" | "\"" => {
                    if op.operator == "\"" {
                        set_number(operands, &mut gs.text.word_spacing);
                        if let Some(ac) = operands.get(1).and_then(get_number) {
                            gs.text.char_spacing = ac;
                        }
                    }
                    tlm = Matrix::translation(0.0, -gs.text.leading).then(&tlm);
                    tm = tlm;
                    let text_idx = if op.operator == "\"" { 2 } else { 0 };
                    if let Some(Object::String(bytes, _)) = operands.get(text_idx) {
                        self.show_string(&gs, &mut tm, bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show_string(&gs, &mut tm, bytes),
                                other => {
                                    if let Some(adjust) = get_number(other) {
                                        let tx = -adjust / 1000.0
                                            * gs.text.size
                                            * gs.text.horizontal_scale;
                                        tm = Matrix::translation(tx, 0.0).then(&tm);
                                        if -adjust > TJ_WORD_BREAK {
                                            self.word.flush(&mut self.tokens);
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                "Do" => {
                    self.word.hard_break(&mut self.tokens);
                    if let Some(name) = operands.first().and_then(name_of) {
                        self.draw_xobject(name, resources, &gs, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Position each glyph of a shown string and feed it to the word builder.
    fn show_string(&mut self, gs: &GraphicsState<'a>, tm: &mut Matrix, bytes: &[u8]) {
        let text = &gs.text;
        let font = &text.font;
        let encoding = font.dict.and_then(|d| d.get_font_encoding(self.doc).ok());

        for code_bytes in bytes.chunks(font.code_len()) {
            let code = code_bytes
                .iter()
                .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
            let decoded = match &encoding {
                Some(enc) => LopdfDocument::decode_text(enc, code_bytes)
                    .unwrap_or_else(|_| decode_text_simple(code_bytes)),
                None => decode_text_simple(code_bytes),
            };

            let glyph_width = font.glyph_width(code) / 1000.0 * text.size * text.horizontal_scale;
            let word_spacing = if code_bytes.len() == 1 && code == 32 {
                text.word_spacing
            } else {
                0.0
            };
            let advance =
                glyph_width + (text.char_spacing + word_spacing) * text.horizontal_scale;

            // text space -> user space
            let trm = tm.then(&gs.ctm);
            let bbox = trm.transform_rect(
                0.0,
                text.rise - DESCENT * text.size,
                glyph_width,
                text.rise + ASCENT * text.size,
            );
            let origin = trm.apply(0.0, text.rise);
            let end = trm.apply(advance, text.rise);
            let em = text.size * trm.vertical_scale();

            self.word
                .push_glyph(&mut self.tokens, &decoded, bbox, origin, end, em);

            *tm = Matrix::translation(advance, 0.0).then(tm);
        }
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        gs: &GraphicsState<'a>,
        depth: usize,
    ) -> Result<()> {
        let doc = self.doc;
        let Some(entry) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|o| dict_of(doc, o))
            .and_then(|x| x.get(name).ok())
        else {
            log::debug!("XObject /{} not found", String::from_utf8_lossy(name));
            return Ok(());
        };

        let object_id: Option<ObjectId> = match entry {
            Object::Reference(id) => Some(*id),
            _ => None,
        };
        let Object::Stream(stream) = resolve(doc, entry) else {
            return Ok(());
        };

        match stream.dict.get(b"Subtype").ok().and_then(name_of) {
            Some(b"Image") => {
                let identity = match object_id {
                    Some((num, _)) => AssetId::new(num.to_string()),
                    None => AssetId::new(String::from_utf8_lossy(name).to_string()),
                };
                let bbox = gs.ctm.transform_rect(0.0, 0.0, 1.0, 1.0);
                self.assets.push(Asset::new(identity, bbox));
            }
            Some(b"Form") => {
                if depth >= MAX_FORM_DEPTH {
                    log::warn!("Form XObject nesting exceeds {} levels", MAX_FORM_DEPTH);
                    return Ok(());
                }
                let matrix = match stream.dict.get(b"Matrix").ok().map(|o| resolve(doc, o)) {
                    Some(Object::Array(values)) => {
                        Matrix::from_operands(values).unwrap_or(Matrix::IDENTITY)
                    }
                    _ => Matrix::IDENTITY,
                };
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| dict_of(doc, o))
                    .or(resources);
                let content = stream_content(stream)?;
                let state = GraphicsState {
                    ctm: matrix.then(&gs.ctm),
                    text: gs.text.clone(),
                };
                self.interpret(&content, form_resources, state, depth + 1)?;
                self.word.hard_break(&mut self.tokens);
            }
            _ => {}
        }

        Ok(())
    }
}

fn set_number(operands: &[Object], target: &mut f32) {
    if let Some(value) = operands.first().and_then(get_number) {
        *target = value;
    }
}
