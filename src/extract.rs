//! Token and asset extraction.
//!
//! A thin wrapper over [`SourceDocument::content`] that never fails: a page
//! whose content cannot be read contributes an empty token sequence and
//! asset set, and the failure is logged instead of aborting the comparison.

use crate::model::{AssetSet, Token};
use crate::reader::SourceDocument;

/// Extracted content of one page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// Word tokens in extraction order
    pub tokens: Vec<Token>,

    /// Images keyed by identity. When an identity repeats, the last box
    /// wins and the first position is kept.
    pub assets: AssetSet,

    /// True if the page could not be read and was left empty
    pub degraded: bool,
}

impl PageContent {
    /// Extract tokens and assets of a page, reading its content once.
    pub fn extract<D: SourceDocument + ?Sized>(doc: &D, index: usize) -> Self {
        match doc.content(index) {
            Ok((tokens, assets)) => Self {
                tokens,
                assets: AssetSet::from_iter(assets),
                degraded: false,
            },
            Err(e) => {
                log::warn!("Failed to extract page {}: {}", index + 1, e);
                Self {
                    degraded: true,
                    ..Self::default()
                }
            }
        }
    }
}
