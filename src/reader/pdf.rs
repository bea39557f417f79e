//! PDF reader backed by lopdf.

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};
use unicode_normalization::UnicodeNormalization;

use super::fonts::get_number;
use super::interpreter::{ContentInterpreter, Matrix};
use super::{DocumentReader, SourceDocument};
use crate::detect::detect_format;
use crate::error::{Error, Result};
use crate::model::{Asset, PageSize, Rect, Token};

/// Parent chain depth limit for inherited page attributes.
const MAX_INHERIT_DEPTH: usize = 32;

/// Loads PDF documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReader;

impl PdfReader {
    /// Create a new reader.
    pub fn new() -> Self {
        Self
    }
}

impl DocumentReader for PdfReader {
    type Document = PdfSource;

    fn load(&self, data: &[u8]) -> Result<PdfSource> {
        PdfSource::from_bytes(data)
    }
}

/// A parsed PDF document.
///
/// Holds the lopdf document and the page objects in page order.
#[derive(Debug)]
pub struct PdfSource {
    doc: LopdfDocument,
    pages: Vec<ObjectId>,
}

impl PdfSource {
    /// Parse a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let format = detect_format(data)?;
        log::debug!("loading PDF {}", format.version);

        let doc = LopdfDocument::load_mem(data)?;

        if doc.is_encrypted() {
            log::warn!("document is encrypted; content may not be extractable");
        }

        let pages = doc.get_pages().into_values().collect();
        Ok(Self { doc, pages })
    }

    /// The underlying lopdf document.
    pub(crate) fn raw(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Object id of the page at `index`.
    pub(crate) fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))
    }

    /// Visible area and orientation of a page.
    ///
    /// The CropBox (clipped to the MediaBox) falls back to the MediaBox,
    /// which falls back to US Letter. Both boxes and `/Rotate` are inherited
    /// from the page tree.
    pub(crate) fn geometry(&self, index: usize) -> Result<PageGeometry> {
        let page = self.page_dict(index)?;
        let media_box = self.page_box(page, b"MediaBox").unwrap_or_else(|| {
            let letter = PageSize::letter();
            Rect::from_size(letter.width, letter.height)
        });
        let crop = self
            .page_box(page, b"CropBox")
            .and_then(|crop| crop.intersection(&media_box))
            .unwrap_or(media_box);

        let rotate = inherited(&self.doc, page, b"Rotate")
            .and_then(|o| match resolve(&self.doc, o) {
                Object::Integer(r) => Some(r.rem_euclid(360)),
                _ => None,
            })
            .unwrap_or(0);
        let rotation = match rotate {
            0 | 90 | 180 | 270 => rotate as u16,
            other => {
                log::warn!("page {}: ignoring /Rotate {}", index + 1, other);
                0
            }
        };

        Ok(PageGeometry { crop, rotation })
    }

    /// A page box entry in user space, normalized.
    fn page_box(&self, page: &Dictionary, key: &[u8]) -> Option<Rect> {
        inherited(&self.doc, page, key).and_then(|o| match resolve(&self.doc, o) {
            Object::Array(values) if values.len() >= 4 => {
                let n: Vec<f32> = values[..4]
                    .iter()
                    .filter_map(|v| get_number(resolve(&self.doc, v)))
                    .collect();
                (n.len() == 4).then(|| Rect::new(n[0], n[1], n[2], n[3]).normalized())
            }
            _ => None,
        })
    }

    /// The (possibly inherited) Resources entry of a page.
    pub(crate) fn page_resources(&self, index: usize) -> Result<Option<&Object>> {
        Ok(inherited(&self.doc, self.page_dict(index)?, b"Resources"))
    }

    /// Decoded content of a page, all content streams concatenated.
    pub(crate) fn content_stream(&self, index: usize) -> Result<Vec<u8>> {
        self.page_content(self.page_dict(index)?)
    }

    fn page_dict(&self, index: usize) -> Result<&Dictionary> {
        let id = self.page_id(index)?;
        self.doc
            .get_dictionary(id)
            .map_err(|e| Error::PdfParse(format!("page {}: {}", index + 1, e)))
    }

    /// Concatenated content streams of a page.
    fn page_content(&self, page: &Dictionary) -> Result<Vec<u8>> {
        let contents = match page.get(b"Contents") {
            Ok(obj) => resolve(&self.doc, obj),
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Stream(stream) => stream_content(stream),
            Object::Array(parts) => {
                let mut content = Vec::new();
                for part in parts {
                    if let Object::Stream(stream) = resolve(&self.doc, part) {
                        content.extend_from_slice(&stream_content(stream)?);
                        content.push(b'\n');
                    }
                }
                Ok(content)
            }
            _ => Err(Error::PdfParse("invalid page content stream".to_string())),
        }
    }

    /// Interpret a page and convert its boxes to top-left coordinates of
    /// the displayed page. Anything entirely outside the visible area is
    /// dropped.
    fn interpret_page(&self, index: usize) -> Result<(Vec<Token>, Vec<Asset>)> {
        let page = self.page_dict(index)?;
        let geometry = self.geometry(index)?;
        let resources = inherited(&self.doc, page, b"Resources").and_then(|o| dict_of(&self.doc, o));

        let content = self.page_content(page).map_err(|e| Error::PageExtract {
            page: index,
            reason: e.to_string(),
        })?;
        let (tokens, assets) = ContentInterpreter::new(&self.doc)
            .run(&content, resources)
            .map_err(|e| Error::PageExtract {
                page: index,
                reason: e.to_string(),
            })?;

        let size = geometry.size();
        let visible = Rect::from_size(size.width, size.height);

        let tokens = tokens
            .into_iter()
            .map(|t| Token::new(t.text.nfc().collect::<String>(), geometry.to_page(t.bbox)))
            .filter(|t| t.bbox.intersects(&visible))
            .collect();
        let assets = assets
            .into_iter()
            .map(|a| Asset::new(a.id, geometry.to_page(a.bbox)))
            .filter(|a| a.bbox.intersects(&visible))
            .collect();
        Ok((tokens, assets))
    }
}

/// Visible area of a page and how it is turned for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PageGeometry {
    /// CropBox in user space
    pub crop: Rect,
    /// Clockwise rotation in degrees: 0, 90, 180 or 270
    pub rotation: u16,
}

impl PageGeometry {
    /// Size of the page as displayed.
    pub fn size(&self) -> PageSize {
        let (width, height) = (self.crop.width(), self.crop.height());
        match self.rotation {
            90 | 270 => PageSize::new(height, width),
            _ => PageSize::new(width, height),
        }
    }

    /// Maps user space onto the displayed page, origin at its bottom-left.
    pub fn display_matrix(&self) -> Matrix {
        let Rect { x0, y0, x1, y1 } = self.crop;
        match self.rotation {
            90 => Matrix::new(0.0, -1.0, 1.0, 0.0, -y0, x1),
            180 => Matrix::new(-1.0, 0.0, 0.0, -1.0, x1, y1),
            270 => Matrix::new(0.0, 1.0, -1.0, 0.0, y1, -x0),
            _ => Matrix::new(1.0, 0.0, 0.0, 1.0, -x0, -y0),
        }
    }

    /// A user space box in top-left coordinates of the displayed page.
    pub fn to_page(&self, rect: Rect) -> Rect {
        let height = self.size().height;
        let r = self
            .display_matrix()
            .transform_rect(rect.x0, rect.y0, rect.x1, rect.y1);
        Rect::new(r.x0, height - r.y1, r.x1, height - r.y0)
    }
}

impl SourceDocument for PdfSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_rect(&self, index: usize) -> Result<PageSize> {
        Ok(self.geometry(index)?.size())
    }

    fn tokens(&self, index: usize) -> Result<Vec<Token>> {
        Ok(self.interpret_page(index)?.0)
    }

    fn assets(&self, index: usize) -> Result<Vec<Asset>> {
        Ok(self.interpret_page(index)?.1)
    }

    fn content(&self, index: usize) -> Result<(Vec<Token>, Vec<Asset>)> {
        self.interpret_page(index)
    }
}

/// Follow a reference to the object it points to. Dangling references and
/// direct objects are returned unchanged.
pub(crate) fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Object {
    let mut current = obj;
    // reference chains are short; the bound guards against cycles
    for _ in 0..MAX_INHERIT_DEPTH {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => current = target,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

/// Resolve an object to a dictionary, looking through stream dictionaries.
pub(crate) fn dict_of<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Stream bytes, decompressed when the stream declares a filter.
pub(crate) fn stream_content(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .map_err(|e| Error::PdfParse(format!("cannot decode stream: {}", e)))
    } else {
        Ok(stream.content.clone())
    }
}

/// Look up a page attribute, walking up the page tree through `Parent`.
pub(crate) fn inherited<'a>(
    doc: &'a LopdfDocument,
    page: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        node = node.get(b"Parent").ok().and_then(|p| dict_of(doc, p))?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::dictionary;

    /// Build a one-page PDF whose page content is `ops`.
    fn build_pdf(ops: Vec<Operation>, media_box: [i64; 4], with_image: bool) -> Vec<u8> {
        build_page(ops, media_box, with_image, Dictionary::new())
    }

    /// Like `build_pdf`, with extra entries in the page dictionary.
    fn build_page(ops: Vec<Operation>, media_box: [i64; 4], with_image: bool, extra: Dictionary) -> Vec<u8> {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut xobjects = Dictionary::new();
        if with_image {
            let image = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => Object::Integer(1),
                    "Height" => Object::Integer(1),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => Object::Integer(8),
                },
                vec![0x80],
            );
            let image_id = doc.add_object(image);
            xobjects.set("Im1", Object::Reference(image_id));
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => xobjects,
        });
        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        for (key, value) in extra.iter() {
            page.set(key.clone(), value.clone());
        }
        let page_id = doc.add_object(page);
        // MediaBox and Resources are inherited from the page tree root
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
            "Resources" => resources_id,
            "MediaBox" => media_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn text_ops(text: &str, x: i64, y: i64) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), Object::Integer(10)]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]
    }

    #[test]
    fn test_load_and_page_size() {
        let data = build_pdf(text_ops("Hello", 72, 700), [0, 0, 595, 842], false);
        let source = PdfReader.load(&data).unwrap();
        assert_eq!(source.page_count(), 1);
        assert_eq!(source.page_rect(0).unwrap(), PageSize::new(595.0, 842.0));
        assert!(matches!(source.page_rect(1), Err(Error::PageOutOfRange(1, 1))));
    }

    #[test]
    fn test_tokens_in_top_left_coordinates() {
        let data = build_pdf(text_ops("Hello world", 72, 700), [0, 0, 612, 792], false);
        let source = PdfReader.load(&data).unwrap();
        let tokens = source.tokens(0).unwrap();

        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "world"]);
        // baseline 700 with an 8pt ascent -> top at 792 - 708
        assert_eq!(tokens[0].bbox.x0, 72.0);
        assert_eq!(tokens[0].bbox.y0, 84.0);
        assert_eq!(tokens[0].bbox.y1, 94.0);
    }

    #[test]
    fn test_media_box_offset() {
        let data = build_pdf(text_ops("Hi", 110, 120), [100, 100, 300, 400], false);
        let source = PdfReader.load(&data).unwrap();
        assert_eq!(source.page_rect(0).unwrap(), PageSize::new(200.0, 300.0));
        let tokens = source.tokens(0).unwrap();
        assert_eq!(tokens[0].bbox.x0, 10.0);
        assert_eq!(tokens[0].bbox.y1, 300.0 - 18.0);
    }

    #[test]
    fn test_image_assets() {
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                [100, 0, 0, 50, 20, 30].into_iter().map(Object::Integer).collect(),
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ];
        let data = build_pdf(ops, [0, 0, 612, 792], true);
        let source = PdfReader.load(&data).unwrap();
        let assets = source.assets(0).unwrap();

        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].bbox, Rect::new(20.0, 712.0, 120.0, 762.0));
        assert!(source.tokens(0).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_pdf() {
        let err = PdfReader.load(b"hello world").unwrap_err();
        assert!(matches!(err, Error::UnknownFormat));
    }

    #[test]
    fn test_rejects_truncated_pdf() {
        let err = PdfReader.load(b"%PDF-1.4\n1 0 obj\n<<").unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_rotation_maps_corners() {
        let crop = Rect::new(10.0, 20.0, 210.0, 120.0);
        // a 10x10 box at the bottom-left corner of the crop area
        let corner = Rect::new(10.0, 20.0, 20.0, 30.0);
        let at = |rotation| PageGeometry { crop, rotation }.to_page(corner);

        assert_eq!(PageGeometry { crop, rotation: 0 }.size(), PageSize::new(200.0, 100.0));
        assert_eq!(PageGeometry { crop, rotation: 90 }.size(), PageSize::new(100.0, 200.0));
        assert_eq!(at(0), Rect::new(0.0, 90.0, 10.0, 100.0));
        assert_eq!(at(90), Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(at(180), Rect::new(190.0, 0.0, 200.0, 10.0));
        assert_eq!(at(270), Rect::new(90.0, 190.0, 100.0, 200.0));
    }

    #[test]
    fn test_crop_box_and_rotate() {
        let mut extra = Dictionary::new();
        extra.set(
            "CropBox",
            [0, 0, 300, 400].into_iter().map(Object::Integer).collect::<Vec<_>>(),
        );
        extra.set("Rotate", Object::Integer(-270));
        let mut ops = text_ops("corner", 50, 350);
        ops.extend(text_ops("hidden", 500, 700));
        let data = build_page(ops, [0, 0, 612, 792], false, extra);
        let source = PdfReader.load(&data).unwrap();

        let geometry = source.geometry(0).unwrap();
        assert_eq!(geometry.rotation, 90);
        assert_eq!(geometry.crop, Rect::new(0.0, 0.0, 300.0, 400.0));
        assert_eq!(source.page_rect(0).unwrap(), PageSize::new(400.0, 300.0));

        // text outside the CropBox is not extracted
        let tokens = source.tokens(0).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "corner");
        // the baseline runs downward from the top edge once turned
        assert!((tokens[0].bbox.x0 - 348.0).abs() < 0.01);
        assert!((tokens[0].bbox.x1 - 358.0).abs() < 0.01);
        assert!((tokens[0].bbox.y0 - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_crop_box_outside_media_box_is_ignored() {
        let mut extra = Dictionary::new();
        extra.set(
            "CropBox",
            [700, 900, 800, 1000].into_iter().map(Object::Integer).collect::<Vec<_>>(),
        );
        extra.set("Rotate", Object::Integer(45));
        let data = build_page(text_ops("Hi", 72, 700), [0, 0, 612, 792], false, extra);
        let source = PdfReader.load(&data).unwrap();

        let geometry = source.geometry(0).unwrap();
        assert_eq!(geometry.crop, Rect::from_size(612.0, 792.0));
        assert_eq!(geometry.rotation, 0);
        assert_eq!(source.tokens(0).unwrap().len(), 1);
    }

    #[test]
    fn test_content_matches_tokens_and_assets() {
        let mut ops = text_ops("Hello", 72, 700);
        ops.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                [100, 0, 0, 50, 20, 30].into_iter().map(Object::Integer).collect(),
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ]);
        let data = build_pdf(ops, [0, 0, 612, 792], true);
        let source = PdfReader.load(&data).unwrap();

        let (tokens, assets) = source.content(0).unwrap();
        assert_eq!(tokens, source.tokens(0).unwrap());
        assert_eq!(assets, source.assets(0).unwrap());
        assert_eq!(assets.len(), 1);
    }
}
