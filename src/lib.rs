//! # diffpdf
//!
//! Visual comparison of two revisions of a PDF document.
//!
//! Pages of the old and new revision are paired by index, their words are
//! aligned with a longest-matching-block diff, and the result is written as
//! a combined PDF where inserted text is tinted green, deleted text red and
//! pages that only exist in the new revision blue. Embedded images are
//! compared by identity.
//!
//! ## Quick Start
//!
//! ```no_run
//! use diffpdf::{compare_files, DiffOptions, LayoutMode};
//!
//! fn main() -> diffpdf::Result<()> {
//!     let options = DiffOptions::new().with_layout(LayoutMode::SideBySide);
//!     let output = compare_files("contract_v1.pdf", "contract_v2.pdf", &options)?;
//!
//!     std::fs::write(diffpdf::DEFAULT_OUTPUT_NAME, &output.document)?;
//!     println!("{} pages changed", output.report.totals.changed_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Layouts
//!
//! - **side-by-side**: each output page is twice as wide, old revision on
//!   the left, new revision on the right, a black separator in between.
//! - **single** (default): the new revision at native size with insertions
//!   and added images highlighted.
//!
//! ## Extending
//!
//! The engine only talks to the [`SourceDocument`] and [`Canvas`] traits.
//! [`MemoryDocument`] and [`RecordingCanvas`] make it possible to run a
//! comparison without any PDF at all.

pub mod align;
pub mod canvas;
pub mod compose;
pub mod detect;
pub mod diff;
pub mod error;
pub mod extract;
pub mod model;
pub mod options;
pub mod pair;
pub mod reader;
pub mod report;

// Re-export commonly used types
pub use align::{align, align_tokens, align_with, AlignOptions, EditOp, EditScript, OpTag};
pub use canvas::{Canvas, PdfCanvas, RecordingCanvas, Revision};
pub use compose::{Compositor, DrawCommand, PagePlan};
pub use detect::{detect_format, is_pdf, PdfFormat};
pub use diff::{compare, compare_pdf, load_pair, ComparisonContext, DiffOutput};
pub use error::{Error, Result};
pub use extract::PageContent;
pub use model::{
    Asset, AssetId, AssetSet, Color, Highlight, HighlightKind, HighlightStyle, LayoutMode,
    PageSize, Point, Rect, Token,
};
pub use options::{resolve_layout, CancelToken, DiffOptions, ProgressEvent};
pub use pair::{pair_pages, PagePair};
pub use reader::{
    DocumentReader, MemoryDocument, MemoryPage, MemoryReader, PdfReader, PdfSource,
    SourceDocument,
};
pub use report::{DiffReport, DiffTotals, JsonFormat, PageStatus, PageSummary};

use std::path::Path;
use std::time::Duration;

/// File name suggested for the combined document.
pub const DEFAULT_OUTPUT_NAME: &str = "diff_output.pdf";

/// MIME type of the combined document.
pub const OUTPUT_MIME_TYPE: &str = "application/pdf";

/// Compare two PDF files.
///
/// # Example
///
/// ```no_run
/// use diffpdf::{compare_files, DiffOptions};
///
/// let output = compare_files("old.pdf", "new.pdf", &DiffOptions::default()).unwrap();
/// std::fs::write("diff_output.pdf", output.document).unwrap();
/// ```
pub fn compare_files<P: AsRef<Path>, Q: AsRef<Path>>(
    old: P,
    new: Q,
    options: &DiffOptions,
) -> Result<DiffOutput> {
    let old = std::fs::read(old)?;
    let new = std::fs::read(new)?;
    compare_pdf(Some(old.as_slice()), Some(new.as_slice()), options)
}

/// Compare two PDFs given as bytes with default options.
pub fn compare_bytes(old: &[u8], new: &[u8]) -> Result<DiffOutput> {
    compare_pdf(Some(old), Some(new), &DiffOptions::default())
}

/// Builder for running comparisons.
///
/// # Example
///
/// ```no_run
/// use diffpdf::DiffPdf;
///
/// let output = DiffPdf::new()
///     .with_view("side-by-side")?
///     .sequential()
///     .compare_files("old.pdf", "new.pdf")?;
/// println!("{}", output.report.to_json(diffpdf::JsonFormat::Pretty)?);
/// # Ok::<(), diffpdf::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiffPdf {
    options: DiffOptions,
}

impl DiffPdf {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use side-by-side layout.
    pub fn side_by_side(mut self) -> Self {
        self.options = self.options.with_layout(LayoutMode::SideBySide);
        self
    }

    /// Select the layout by name.
    pub fn with_view(mut self, view: &str) -> Result<Self> {
        self.options = self.options.with_view(view)?;
        Ok(self)
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    /// Set the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.options = self.options.with_threads(threads);
        self
    }

    /// Abort after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_timeout(timeout);
        self
    }

    /// Set the highlight style.
    pub fn with_style(mut self, style: HighlightStyle) -> Self {
        self.options = self.options.with_style(style);
        self
    }

    /// The options that will be used.
    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// Compare two PDF files.
    pub fn compare_files<P: AsRef<Path>, Q: AsRef<Path>>(&self, old: P, new: Q) -> Result<DiffOutput> {
        compare_files(old, new, &self.options)
    }

    /// Compare two PDFs given as bytes.
    pub fn compare_bytes(&self, old: &[u8], new: &[u8]) -> Result<DiffOutput> {
        compare_pdf(Some(old), Some(new), &self.options)
    }

    /// Compare two already loaded documents of any kind.
    pub fn compare_documents<D, C>(&self, old: &D, new: &D, canvas: C) -> Result<DiffOutput>
    where
        D: SourceDocument + ?Sized,
        C: Canvas<D>,
    {
        compare(old, new, canvas, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diffpdf_builder() {
        let builder = DiffPdf::new()
            .side_by_side()
            .sequential()
            .with_threads(2)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(builder.options().layout, LayoutMode::SideBySide);
        assert!(!builder.options().parallel);
        assert_eq!(builder.options().threads, 2);
    }

    #[test]
    fn test_builder_rejects_unknown_view() {
        let err = DiffPdf::new().with_view("overlay").unwrap_err();
        assert!(matches!(err, Error::InvalidLayoutMode(_)));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_output_constants() {
        assert_eq!(DEFAULT_OUTPUT_NAME, "diff_output.pdf");
        assert_eq!(OUTPUT_MIME_TYPE, "application/pdf");
    }

    #[test]
    fn test_compare_bytes_empty_data() {
        let result = compare_bytes(&[], b"%PDF-1.4");
        assert!(matches!(result, Err(Error::MissingInput(_))));
    }

    #[test]
    fn test_compare_bytes_unknown_magic() {
        let data = [0xFF, 0xFE, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05];
        let result = compare_bytes(&data, &data);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_compare_files_missing_path() {
        let result = compare_files("/nonexistent/old.pdf", "/nonexistent/new.pdf", &DiffOptions::new());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_compare_in_memory_documents() {
        let old = MemoryDocument::new().with_page(MemoryPage::letter().with_words("The quick fox", 72.0, 72.0));
        let new = MemoryDocument::new().with_page(MemoryPage::letter().with_words("The slow fox", 72.0, 72.0));
        let output = DiffPdf::new()
            .side_by_side()
            .compare_documents(&old, &new, RecordingCanvas::new())
            .unwrap();
        assert_eq!(output.report.totals.replaced_tokens, 1);
    }
}
