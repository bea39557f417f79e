//! Positional page pairing.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::PageSize;
use crate::reader::SourceDocument;

/// One output page: the old and new page at the same index, when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePair {
    /// Zero-based output page index
    pub index: usize,

    /// Page index in the old revision
    pub old: Option<usize>,

    /// Page index in the new revision
    pub new: Option<usize>,
}

impl PagePair {
    /// The page exists only in the new revision.
    pub fn is_added(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    /// The page exists only in the old revision.
    pub fn is_removed(&self) -> bool {
        self.old.is_some() && self.new.is_none()
    }

    /// Both revisions have the page.
    pub fn is_compared(&self) -> bool {
        self.old.is_some() && self.new.is_some()
    }

    /// Geometry of the output page: the old page's size if present, else the
    /// new page's.
    pub fn geometry<A, B>(&self, old: &A, new: &B) -> Result<Option<PageSize>>
    where
        A: SourceDocument + ?Sized,
        B: SourceDocument + ?Sized,
    {
        match (self.old, self.new) {
            (Some(i), _) => old.page_rect(i).map(Some),
            (None, Some(j)) => new.page_rect(j).map(Some),
            (None, None) => Ok(None),
        }
    }
}

/// Pair pages by index for documents with `old_pages` and `new_pages`
/// pages. Produces `max(old_pages, new_pages)` pairs.
pub fn pair_pages(old_pages: usize, new_pages: usize) -> Vec<PagePair> {
    (0..old_pages.max(new_pages))
        .map(|index| PagePair {
            index,
            old: (index < old_pages).then_some(index),
            new: (index < new_pages).then_some(index),
        })
        .filter(|pair| pair.old.is_some() || pair.new.is_some())
        .collect()
}
