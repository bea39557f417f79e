//! Output canvases.
//!
//! A [`Canvas`] receives the drawing commands of the combined document:
//! new pages, source pages placed into a destination rectangle, filled
//! rectangles and lines. Coordinates are top-left, y growing down.
//!
//! - [`PdfCanvas`] writes a PDF with lopdf.
//! - [`RecordingCanvas`] keeps a display list and serializes it to JSON.

mod pdf;
mod recording;

pub use pdf::PdfCanvas;
pub use recording::{CanvasOp, RecordedPage, RecordingCanvas};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Color, PageSize, Point, Rect};
use crate::reader::SourceDocument;

/// Which side of the comparison a source page comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Revision {
    Old,
    New,
}

/// Handle to a page created with [`Canvas::new_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHandle(pub(crate) usize);

/// Drawing surface for the combined output document.
pub trait Canvas<D: SourceDocument + ?Sized> {
    /// Append a blank page.
    fn new_page(&mut self, size: PageSize) -> Result<PageHandle>;

    /// Draw page `page_index` of `source` scaled into `dest`.
    fn place_source_page(
        &mut self,
        target: PageHandle,
        dest: Rect,
        revision: Revision,
        source: &D,
        page_index: usize,
    ) -> Result<()>;

    /// Fill a rectangle with a translucent color.
    fn draw_rect(&mut self, target: PageHandle, rect: Rect, fill: Color, opacity: f32) -> Result<()>;

    /// Stroke a straight line.
    fn draw_line(
        &mut self,
        target: PageHandle,
        from: Point,
        to: Point,
        stroke: Color,
        width: f32,
    ) -> Result<()>;

    /// Serialize the document.
    fn finish(self) -> Result<Vec<u8>>
    where
        Self: Sized;
}
