//! PDF output canvas backed by lopdf.
//!
//! Source pages are imported as Form XObjects (one per source page, reused
//! when a page is placed again) whose BBox is the CropBox and whose Matrix
//! applies `/Rotate`. They are drawn with a uniform scaling `cm`. Highlights
//! use an ExtGState for fill opacity. Content streams are Flate-compressed
//! unless compression is turned off.

use std::collections::HashMap;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use super::{Canvas, PageHandle, Revision};
use crate::error::{Error, Result};
use crate::model::{Color, PageSize, Point, Rect};
use crate::reader::PdfSource;

/// A page under construction.
#[derive(Debug)]
struct CanvasPage {
    size: PageSize,
    operations: Vec<Operation>,
    xobjects: Dictionary,
    ext_gstates: Dictionary,
}

/// Writes the combined document as PDF.
#[derive(Debug)]
pub struct PdfCanvas {
    doc: LopdfDocument,
    pages_id: ObjectId,
    pages: Vec<CanvasPage>,
    /// Source object id to output object id, per revision
    imported: HashMap<(Revision, ObjectId), ObjectId>,
    /// Form XObject per placed source page
    forms: HashMap<(Revision, usize), ObjectId>,
    /// ExtGState per opacity in thousandths
    ext_gstates: HashMap<u32, ObjectId>,
    compress: bool,
}

impl Default for PdfCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfCanvas {
    /// Create an empty canvas.
    pub fn new() -> Self {
        let mut doc = LopdfDocument::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            pages: Vec::new(),
            imported: HashMap::new(),
            forms: HashMap::new(),
            ext_gstates: HashMap::new(),
            compress: true,
        }
    }

    /// Enable or disable Flate compression of content streams.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    fn page_mut(&mut self, target: PageHandle) -> Result<&mut CanvasPage> {
        let count = self.pages.len();
        self.pages
            .get_mut(target.0)
            .ok_or_else(|| Error::Render(format!("no page {} (have {})", target.0, count)))
    }

    fn stream(&self, mut dict: Dictionary, content: Vec<u8>) -> Result<Stream> {
        if !self.compress {
            return Ok(Stream::new(dict, content));
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&content)?;
        let compressed = encoder.finish()?;
        dict.set("Filter", "FlateDecode");
        Ok(Stream::new(dict, compressed))
    }

    /// Deep-copy an object from a source document. `Parent` links are not
    /// followed so that importing a page's resources does not drag in the
    /// whole source page tree.
    fn import_object(&mut self, revision: Revision, source: &LopdfDocument, obj: &Object) -> Object {
        match obj {
            Object::Reference(id) => Object::Reference(self.import_reference(revision, source, *id)),
            Object::Dictionary(dict) => Object::Dictionary(self.import_dict(revision, source, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.import_object(revision, source, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.import_dict(revision, source, &stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn import_dict(&mut self, revision: Revision, source: &LopdfDocument, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            copy.set(key.clone(), self.import_object(revision, source, value));
        }
        copy
    }

    fn import_reference(&mut self, revision: Revision, source: &LopdfDocument, id: ObjectId) -> ObjectId {
        if let Some(existing) = self.imported.get(&(revision, id)) {
            return *existing;
        }
        // reserve first so that cycles resolve to the new id
        let new_id = self.doc.new_object_id();
        self.imported.insert((revision, id), new_id);

        let copy = match source.get_object(id) {
            Ok(obj) => self.import_object(revision, source, obj),
            Err(_) => {
                log::warn!("dangling reference {} {} R in source document", id.0, id.1);
                Object::Null
            }
        };
        self.doc.objects.insert(new_id, copy);
        new_id
    }

    /// Form XObject wrapping a source page.
    fn source_form(&mut self, revision: Revision, source: &PdfSource, page_index: usize) -> Result<ObjectId> {
        if let Some(id) = self.forms.get(&(revision, page_index)) {
            return Ok(*id);
        }

        let geometry = source.geometry(page_index)?;
        let content = source.content_stream(page_index)?;
        let resources = match source.page_resources(page_index)? {
            Some(res) => self.import_object(revision, source.raw(), res),
            None => Object::Dictionary(Dictionary::new()),
        };

        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => rect_array(&geometry.crop),
            "Matrix" => reals(&geometry.display_matrix().to_array()),
            "Resources" => resources,
        };
        let stream = self.stream(dict, content)?;
        let id = self.doc.add_object(stream);
        self.forms.insert((revision, page_index), id);
        Ok(id)
    }

    /// ExtGState with the given fill opacity, as `(resource name, id)`.
    fn ext_gstate(&mut self, opacity: f32) -> (String, ObjectId) {
        let key = (opacity.clamp(0.0, 1.0) * 1000.0).round() as u32;
        let id = match self.ext_gstates.get(&key) {
            Some(id) => *id,
            None => {
                let id = self.doc.add_object(dictionary! {
                    "Type" => "ExtGState",
                    "ca" => Object::Real(opacity),
                    "CA" => Object::Real(opacity),
                });
                self.ext_gstates.insert(key, id);
                id
            }
        };
        (format!("GS{}", key), id)
    }
}

impl Canvas<PdfSource> for PdfCanvas {
    fn new_page(&mut self, size: PageSize) -> Result<PageHandle> {
        if size.width <= 0.0 || size.height <= 0.0 {
            return Err(Error::Render(format!(
                "invalid page size {}x{}",
                size.width, size.height
            )));
        }
        self.pages.push(CanvasPage {
            size,
            operations: Vec::new(),
            xobjects: Dictionary::new(),
            ext_gstates: Dictionary::new(),
        });
        Ok(PageHandle(self.pages.len() - 1))
    }

    fn place_source_page(
        &mut self,
        target: PageHandle,
        dest: Rect,
        revision: Revision,
        source: &PdfSource,
        page_index: usize,
    ) -> Result<()> {
        let size = source.geometry(page_index)?.size();
        if size.width <= 0.0 || size.height <= 0.0 {
            return Err(Error::Render(format!(
                "page {} has an empty visible area",
                page_index + 1
            )));
        }
        let form_id = self.source_form(revision, source, page_index)?;
        let name = format!("Fm{}", form_id.0);

        let page = self.page_mut(target)?;
        // one scale for both axes, centered in `dest`
        let scale = (dest.width() / size.width).min(dest.height() / size.height);
        let left = dest.x0 + (dest.width() - size.width * scale) / 2.0;
        let top = dest.y0 + (dest.height() - size.height * scale) / 2.0;
        let bottom = page.size.height - top - size.height * scale;

        page.xobjects.set(name.as_bytes().to_vec(), Object::Reference(form_id));
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("cm", reals(&[scale, 0.0, 0.0, scale, left, bottom])),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_rect(&mut self, target: PageHandle, rect: Rect, fill: Color, opacity: f32) -> Result<()> {
        let (gs_name, gs_id) = self.ext_gstate(opacity);
        let page = self.page_mut(target)?;
        let rect = rect.normalized();

        page.ext_gstates.set(gs_name.as_bytes().to_vec(), Object::Reference(gs_id));
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gs_name.into_bytes())]),
            Operation::new("rg", reals(&[fill.r, fill.g, fill.b])),
            Operation::new(
                "re",
                reals(&[
                    rect.x0,
                    page.size.height - rect.y1,
                    rect.width(),
                    rect.height(),
                ]),
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_line(
        &mut self,
        target: PageHandle,
        from: Point,
        to: Point,
        stroke: Color,
        width: f32,
    ) -> Result<()> {
        let page = self.page_mut(target)?;
        let height = page.size.height;
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("RG", reals(&[stroke.r, stroke.g, stroke.b])),
            Operation::new("w", reals(&[width])),
            Operation::new("m", reals(&[from.x, height - from.y])),
            Operation::new("l", reals(&[to.x, height - to.y])),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        let pages = std::mem::take(&mut self.pages);
        let mut kids = Vec::with_capacity(pages.len());

        for page in pages {
            let content = Content {
                operations: page.operations,
            }
            .encode()
            .map_err(|e| Error::Render(e.to_string()))?;
            let content_id = self.doc.add_object(self.stream(Dictionary::new(), content)?);

            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "MediaBox" => rect_array(&Rect::from_size(page.size.width, page.size.height)),
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => page.xobjects,
                    "ExtGState" => page.ext_gstates,
                },
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(count),
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| Error::Render(e.to_string()))?;
        log::debug!("wrote {} bytes of PDF", out.len());
        Ok(out)
    }
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().map(|v| Object::Real(*v)).collect()
}

fn rect_array(rect: &Rect) -> Vec<Object> {
    reals(&[rect.x0, rect.y0, rect.x1, rect.y1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{DocumentReader, PdfReader, SourceDocument};

    /// One Letter page showing `text` at (72, 700) in user space.
    fn source_pdf(text: &str) -> PdfSource {
        sized_source_pdf(text, 612.0, 792.0, (72, 700))
    }

    /// One page of the given size showing `text` at `at` in user space.
    fn sized_source_pdf(text: &str, width: f32, height: f32, at: (i64, i64)) -> PdfSource {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(10)]),
                Operation::new("Td", vec![Object::Integer(at.0), Object::Integer(at.1)]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => rect_array(&Rect::from_size(width, height)),
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        PdfReader.load(&bytes).unwrap()
    }

    #[test]
    fn test_placed_pages_keep_their_text() {
        let old = source_pdf("before");
        let new = source_pdf("after");
        let mut canvas = PdfCanvas::new();

        let page = canvas.new_page(PageSize::new(1224.0, 792.0)).unwrap();
        canvas
            .place_source_page(page, Rect::new(0.0, 0.0, 612.0, 792.0), Revision::Old, &old, 0)
            .unwrap();
        canvas
            .place_source_page(page, Rect::new(612.0, 0.0, 1224.0, 792.0), Revision::New, &new, 0)
            .unwrap();
        canvas
            .draw_line(page, Point::new(612.0, 0.0), Point::new(612.0, 792.0), Color::BLACK, 1.0)
            .unwrap();
        canvas
            .draw_rect(page, Rect::new(72.0, 84.0, 100.0, 94.0), Color::RED, 0.3)
            .unwrap();
        let bytes = canvas.finish().unwrap();

        let output = PdfReader.load(&bytes).unwrap();
        assert_eq!(output.page_count(), 1);
        assert_eq!(output.page_rect(0).unwrap(), PageSize::new(1224.0, 792.0));

        let tokens = output.tokens(0).unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["before", "after"]);
        assert!((tokens[0].bbox.x0 - 72.0).abs() < 0.01);
        assert!((tokens[1].bbox.x0 - 684.0).abs() < 0.01);
        assert!((tokens[1].bbox.y0 - 84.0).abs() < 0.01);
    }

    #[test]
    fn test_landscape_page_keeps_its_aspect_ratio() {
        let source = sized_source_pdf("wide", 842.0, 595.0, (72, 500));
        let mut canvas = PdfCanvas::new().with_compression(false);
        let page = canvas.new_page(PageSize::new(1224.0, 792.0)).unwrap();
        canvas
            .place_source_page(page, Rect::new(612.0, 0.0, 1224.0, 792.0), Revision::New, &source, 0)
            .unwrap();

        let scale = 612.0 / 842.0;
        let placed = &canvas.pages[0].operations[1];
        assert_eq!(placed.operator, "cm");
        let cm: Vec<f32> = placed
            .operands
            .iter()
            .map(|o| match o {
                Object::Real(v) => *v,
                other => panic!("unexpected operand {:?}", other),
            })
            .collect();
        assert_eq!(cm[0], cm[3]);
        assert!((cm[0] - scale).abs() < 1e-4);
        assert!((cm[4] - 612.0).abs() < 0.01);
        // 595 * scale = 432.48 tall, centered vertically in 792
        assert!((cm[5] - (792.0 - 595.0 * scale) / 2.0).abs() < 0.01);

        let output = PdfReader.load(&canvas.finish().unwrap()).unwrap();
        let tokens = output.tokens(0).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!((tokens[0].bbox.x0 - (612.0 + 72.0 * scale)).abs() < 0.01);
        assert!((tokens[0].bbox.height() - 10.0 * scale).abs() < 0.01);
    }

    #[test]
    fn test_forms_are_shared_between_placements() {
        let source = source_pdf("same");
        let mut canvas = PdfCanvas::new().with_compression(false);
        for _ in 0..3 {
            let page = canvas.new_page(PageSize::letter()).unwrap();
            canvas
                .place_source_page(page, Rect::from_size(612.0, 792.0), Revision::New, &source, 0)
                .unwrap();
        }
        assert_eq!(canvas.forms.len(), 1);
        // the font dictionary is imported once
        assert_eq!(canvas.imported.len(), 1);

        let output = PdfReader.load(&canvas.finish().unwrap()).unwrap();
        assert_eq!(output.page_count(), 3);
    }

    #[test]
    fn test_opacity_states_are_reused() {
        let mut canvas = PdfCanvas::new();
        let page = canvas.new_page(PageSize::letter()).unwrap();
        for _ in 0..4 {
            canvas.draw_rect(page, Rect::new(0.0, 0.0, 5.0, 5.0), Color::GREEN, 0.3).unwrap();
        }
        canvas.draw_rect(page, Rect::new(0.0, 0.0, 5.0, 5.0), Color::BLUE, 0.5).unwrap();
        assert_eq!(canvas.ext_gstates.len(), 2);
    }

    #[test]
    fn test_empty_document_is_valid() {
        let bytes = PdfCanvas::new().finish().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
    }

    #[test]
    fn test_rejects_degenerate_page() {
        let mut canvas = PdfCanvas::new();
        assert!(matches!(
            canvas.new_page(PageSize::new(0.0, 792.0)),
            Err(Error::Render(_))
        ));
    }
}
