//! In-memory documents with pre-extracted content.

use serde::{Deserialize, Serialize};

use super::{DocumentReader, SourceDocument};
use crate::error::{Error, Result};
use crate::model::{Asset, PageSize, Rect, Token};

/// A page whose tokens and assets are already known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryPage {
    /// Page width in points
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Word tokens in reading order
    #[serde(default)]
    pub tokens: Vec<Token>,

    /// Placed images
    #[serde(default)]
    pub assets: Vec<Asset>,

    /// Simulates a page whose content cannot be extracted
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unreadable: bool,
}

impl MemoryPage {
    /// Create an empty page with the given dimensions.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            tokens: Vec::new(),
            assets: Vec::new(),
            unreadable: false,
        }
    }

    /// Create an empty US Letter page.
    pub fn letter() -> Self {
        let size = PageSize::letter();
        Self::new(size.width, size.height)
    }

    /// Lay out whitespace-separated words left to right on one line
    /// starting at `(x, y)`, using a fixed advance per character.
    pub fn with_words(mut self, text: &str, x: f32, y: f32) -> Self {
        const CHAR_WIDTH: f32 = 6.0;
        const LINE_HEIGHT: f32 = 12.0;

        let mut pen = x;
        for word in text.split_whitespace() {
            let width = word.chars().count() as f32 * CHAR_WIDTH;
            self.tokens.push(Token::new(
                word,
                Rect::new(pen, y, pen + width, y + LINE_HEIGHT),
            ));
            pen += width + CHAR_WIDTH;
        }
        self
    }

    /// Add a token.
    pub fn with_token(mut self, token: Token) -> Self {
        self.tokens.push(token);
        self
    }

    /// Add an image asset.
    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.assets.push(asset);
        self
    }

    /// Mark the page content as unreadable.
    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }
}

/// A document held entirely in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDocument {
    /// Pages in order
    pub pages: Vec<MemoryPage>,
}

impl MemoryDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page.
    pub fn with_page(mut self, page: MemoryPage) -> Self {
        self.pages.push(page);
        self
    }

    /// Append a page.
    pub fn add_page(&mut self, page: MemoryPage) {
        self.pages.push(page);
    }

    fn page(&self, index: usize) -> Result<&MemoryPage> {
        self.pages
            .get(index)
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))
    }

    fn readable_page(&self, index: usize) -> Result<&MemoryPage> {
        let page = self.page(index)?;
        if page.unreadable {
            return Err(Error::PageExtract {
                page: index,
                reason: "page content is unreadable".to_string(),
            });
        }
        Ok(page)
    }
}

impl SourceDocument for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_rect(&self, index: usize) -> Result<PageSize> {
        let page = self.page(index)?;
        Ok(PageSize::new(page.width, page.height))
    }

    fn tokens(&self, index: usize) -> Result<Vec<Token>> {
        Ok(self.readable_page(index)?.tokens.clone())
    }

    fn assets(&self, index: usize) -> Result<Vec<Asset>> {
        Ok(self.readable_page(index)?.assets.clone())
    }
}

/// Loads a [`MemoryDocument`] from its JSON form.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryReader;

impl DocumentReader for MemoryReader {
    type Document = MemoryDocument;

    fn load(&self, data: &[u8]) -> Result<MemoryDocument> {
        serde_json::from_slice(data)
            .map_err(|e| Error::PdfParse(format!("invalid document JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_words_layout() {
        let page = MemoryPage::letter().with_words("The quick fox", 72.0, 100.0);
        assert_eq!(page.tokens.len(), 3);
        assert_eq!(page.tokens[0].bbox, Rect::new(72.0, 100.0, 90.0, 112.0));
        assert_eq!(page.tokens[1].text, "quick");
        assert_eq!(page.tokens[1].bbox.x0, 96.0);
    }

    #[test]
    fn test_unreadable_page_fails_extraction() {
        let doc = MemoryDocument::new().with_page(MemoryPage::letter().unreadable());
        assert!(matches!(doc.tokens(0), Err(Error::PageExtract { page: 0, .. })));
        assert!(doc.page_rect(0).is_ok());
    }

    #[test]
    fn test_page_out_of_range() {
        let doc = MemoryDocument::new();
        assert!(matches!(doc.page_rect(3), Err(Error::PageOutOfRange(3, 0))));
    }

    #[test]
    fn test_reader_loads_json() {
        let json = br#"{
            "pages": [
                {
                    "width": 595.0,
                    "height": 842.0,
                    "tokens": [{"text": "Hello", "bbox": {"x0": 1.0, "y0": 2.0, "x1": 3.0, "y1": 4.0}}],
                    "assets": [{"id": "img1", "bbox": {"x0": 0.0, "y0": 0.0, "x1": 10.0, "y1": 10.0}}]
                }
            ]
        }"#;
        let doc = MemoryReader.load(json).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_rect(0).unwrap(), PageSize::new(595.0, 842.0));
        assert_eq!(doc.tokens(0).unwrap()[0].text, "Hello");
        assert_eq!(doc.assets(0).unwrap()[0].id.as_str(), "img1");
    }

    #[test]
    fn test_reader_rejects_garbage() {
        let err = MemoryReader.load(b"not json").unwrap_err();
        assert!(err.is_input_error());
    }
}
