//! Display-list canvas.

use serde::{Deserialize, Serialize};

use super::{Canvas, PageHandle, Revision};
use crate::error::{Error, Result};
use crate::model::{Color, PageSize, Point, Rect};
use crate::reader::SourceDocument;

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CanvasOp {
    PlaceSource {
        dest: Rect,
        revision: Revision,
        page: usize,
    },
    Rect {
        rect: Rect,
        color: Color,
        opacity: f32,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f32,
    },
}

/// A page of the display list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedPage {
    pub width: f32,
    pub height: f32,
    pub ops: Vec<CanvasOp>,
}

impl RecordedPage {
    /// Filled rectangles of the given color.
    pub fn rects_of(&self, color: Color) -> Vec<Rect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                CanvasOp::Rect { rect, color: c, .. } if *c == color => Some(*rect),
                _ => None,
            })
            .collect()
    }

    /// Number of stroked lines.
    pub fn line_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, CanvasOp::Line { .. }))
            .count()
    }

    /// Source placements as `(revision, page, dest)`.
    pub fn placements(&self) -> Vec<(Revision, usize, Rect)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                CanvasOp::PlaceSource { dest, revision, page } => Some((*revision, *page, *dest)),
                _ => None,
            })
            .collect()
    }
}

/// Canvas that records operations instead of rendering them.
///
/// Useful for tests and for callers that draw with their own renderer.
/// [`Canvas::finish`] produces the display list as JSON; read it back with
/// [`RecordingCanvas::parse`].
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    pages: Vec<RecordedPage>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages recorded so far.
    pub fn pages(&self) -> &[RecordedPage] {
        &self.pages
    }

    /// Parse the JSON produced by `finish`.
    pub fn parse(data: &[u8]) -> Result<Vec<RecordedPage>> {
        serde_json::from_slice(data).map_err(|e| Error::Other(format!("invalid display list: {}", e)))
    }

    fn page_mut(&mut self, target: PageHandle) -> Result<&mut RecordedPage> {
        let count = self.pages.len();
        self.pages
            .get_mut(target.0)
            .ok_or_else(|| Error::Render(format!("no page {} (have {})", target.0, count)))
    }
}

impl<D: SourceDocument + ?Sized> Canvas<D> for RecordingCanvas {
    fn new_page(&mut self, size: PageSize) -> Result<PageHandle> {
        self.pages.push(RecordedPage {
            width: size.width,
            height: size.height,
            ops: Vec::new(),
        });
        Ok(PageHandle(self.pages.len() - 1))
    }

    fn place_source_page(
        &mut self,
        target: PageHandle,
        dest: Rect,
        revision: Revision,
        source: &D,
        page_index: usize,
    ) -> Result<()> {
        if page_index >= source.page_count() {
            return Err(Error::PageOutOfRange(page_index, source.page_count()));
        }
        self.page_mut(target)?.ops.push(CanvasOp::PlaceSource {
            dest,
            revision,
            page: page_index,
        });
        Ok(())
    }

    fn draw_rect(&mut self, target: PageHandle, rect: Rect, fill: Color, opacity: f32) -> Result<()> {
        self.page_mut(target)?.ops.push(CanvasOp::Rect {
            rect,
            color: fill,
            opacity,
        });
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
        self.page_mut(target)?.ops.push(CanvasOp::Line {
            from,
            to,
            color: stroke,
            width,
        });
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.pages).map_err(|e| Error::Render(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{MemoryDocument, MemoryPage};

    #[test]
    fn test_records_and_round_trips() {
        let source = MemoryDocument::new().with_page(MemoryPage::letter());
        let mut canvas = RecordingCanvas::new();
        let page = Canvas::<MemoryDocument>::new_page(&mut canvas, PageSize::new(1224.0, 792.0)).unwrap();
        canvas
            .place_source_page(page, Rect::new(0.0, 0.0, 612.0, 792.0), Revision::Old, &source, 0)
            .unwrap();
        Canvas::<MemoryDocument>::draw_rect(&mut canvas, page, Rect::new(1.0, 1.0, 2.0, 2.0), Color::RED, 0.3)
            .unwrap();

        let bytes = Canvas::<MemoryDocument>::finish(canvas).unwrap();
        let pages = RecordingCanvas::parse(&bytes).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].width, 1224.0);
        assert_eq!(pages[0].placements().len(), 1);
        assert_eq!(pages[0].rects_of(Color::RED).len(), 1);
    }

    #[test]
    fn test_rejects_unknown_source_page() {
        let source = MemoryDocument::new();
        let mut canvas = RecordingCanvas::new();
        let page = Canvas::<MemoryDocument>::new_page(&mut canvas, PageSize::letter()).unwrap();
        let err = canvas
            .place_source_page(page, Rect::from_size(612.0, 792.0), Revision::New, &source, 0)
            .unwrap_err();
        assert!(matches!(err, Error::PageOutOfRange(0, 0)));
    }
}
