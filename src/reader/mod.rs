//! Document readers.
//!
//! A reader turns input bytes into a [`SourceDocument`]: an immutable,
//! thread-safe view of a paginated document that yields page geometry,
//! word tokens and image assets on demand. The comparison engine only talks
//! to this trait, so any document library can sit behind it.
//!
//! Two readers ship with the crate:
//! - [`PdfReader`] parses PDF with lopdf and interprets page content streams.
//! - [`MemoryReader`] loads a [`MemoryDocument`] from JSON, which is handy
//!   for tests and for callers that already have extracted content.

mod fonts;
mod interpreter;
mod memory;
mod pdf;

pub use memory::{MemoryDocument, MemoryPage, MemoryReader};
pub use pdf::{PdfReader, PdfSource};

use crate::error::Result;
use crate::model::{Asset, PageSize, Token};

/// Read-only access to one loaded revision.
///
/// Implementations must be `Sync`: pages are processed concurrently and
/// every method takes `&self`.
pub trait SourceDocument: Sync {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Width and height of the page at `index` (zero-based).
    fn page_rect(&self, index: usize) -> Result<PageSize>;

    /// Word tokens in extraction order, boxes in top-left page coordinates.
    fn tokens(&self, index: usize) -> Result<Vec<Token>>;

    /// Images placed on the page. Identities may repeat.
    fn assets(&self, index: usize) -> Result<Vec<Asset>>;

    /// Tokens and assets of a page in one call.
    ///
    /// Readers that decode a page once for both should override this.
    fn content(&self, index: usize) -> Result<(Vec<Token>, Vec<Asset>)> {
        Ok((self.tokens(index)?, self.assets(index)?))
    }
}

/// Parses input bytes into a [`SourceDocument`].
pub trait DocumentReader {
    type Document: SourceDocument;

    /// Load a document, failing with an input error if the bytes are not a
    /// valid document for this reader.
    fn load(&self, data: &[u8]) -> Result<Self::Document>;
}
