//! Token sequence alignment.
//!
//! [`align`] computes an [`EditScript`] between two sequences: an ordered
//! list of equal/insert/delete/replace operations that covers both inputs
//! exactly once. Matching is exact equality on the elements; tokens are
//! compared by text only.
//!
//! # Example
//!
//! ```
//! use diffpdf::align::{align, EditOp};
//!
//! let script = align(&["The", "quick", "fox"], &["The", "slow", "fox"]);
//! assert_eq!(
//!     script.ops(),
//!     &[
//!         EditOp::equal(0, 1, 0, 1),
//!         EditOp::replace(1, 2, 1, 2),
//!         EditOp::equal(2, 3, 2, 3),
//!     ]
//! );
//! ```

mod matcher;

pub use matcher::MatchingBlock;

use std::hash::Hash;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::model::Token;
use matcher::SequenceMatcher;

/// Kind of an edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpTag {
    /// Both ranges hold equal elements
    Equal,
    /// Elements only in `b`
    Insert,
    /// Elements only in `a`
    Delete,
    /// A gap on both sides: `a[i1..i2]` was replaced by `b[j1..j2]`
    Replace,
}

/// One operation covering `a[i1..i2]` and `b[j1..j2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOp {
    pub tag: OpTag,
    pub i1: usize,
    pub i2: usize,
    pub j1: usize,
    pub j2: usize,
}

impl EditOp {
    pub fn new(tag: OpTag, i1: usize, i2: usize, j1: usize, j2: usize) -> Self {
        Self { tag, i1, i2, j1, j2 }
    }

    pub fn equal(i1: usize, i2: usize, j1: usize, j2: usize) -> Self {
        Self::new(OpTag::Equal, i1, i2, j1, j2)
    }

    pub fn insert(i1: usize, i2: usize, j1: usize, j2: usize) -> Self {
        Self::new(OpTag::Insert, i1, i2, j1, j2)
    }

    pub fn delete(i1: usize, i2: usize, j1: usize, j2: usize) -> Self {
        Self::new(OpTag::Delete, i1, i2, j1, j2)
    }

    pub fn replace(i1: usize, i2: usize, j1: usize, j2: usize) -> Self {
        Self::new(OpTag::Replace, i1, i2, j1, j2)
    }

    /// Range of the old sequence covered by this operation.
    pub fn a_range(&self) -> Range<usize> {
        self.i1..self.i2
    }

    /// Range of the new sequence covered by this operation.
    pub fn b_range(&self) -> Range<usize> {
        self.j1..self.j2
    }

    /// Whether the old-side elements of this operation are gone in `b`.
    pub fn removes(&self) -> bool {
        matches!(self.tag, OpTag::Delete | OpTag::Replace)
    }

    /// Whether the new-side elements of this operation are new in `b`.
    pub fn adds(&self) -> bool {
        matches!(self.tag, OpTag::Insert | OpTag::Replace)
    }
}

/// Ordered, gapless, non-overlapping cover of two sequences.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditScript {
    ops: Vec<EditOp>,
}

impl EditScript {
    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EditOp> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// True when every operation is `equal`.
    pub fn is_unchanged(&self) -> bool {
        self.ops.iter().all(|op| op.tag == OpTag::Equal)
    }

    /// Number of elements on each side covered by operations of `tag`,
    /// as `(old_count, new_count)`.
    pub fn count(&self, tag: OpTag) -> (usize, usize) {
        self.ops
            .iter()
            .filter(|op| op.tag == tag)
            .fold((0, 0), |(a, b), op| (a + op.i2 - op.i1, b + op.j2 - op.j1))
    }

    /// Similarity in `0.0..=1.0`: twice the matched elements over the
    /// total element count. Two empty sequences are identical.
    pub fn similarity(&self) -> f64 {
        let (len_a, len_b) = self
            .ops
            .last()
            .map(|op| (op.i2, op.j2))
            .unwrap_or((0, 0));
        let total = len_a + len_b;
        if total == 0 {
            return 1.0;
        }
        let (matched, _) = self.count(OpTag::Equal);
        2.0 * matched as f64 / total as f64
    }

    /// Check that the operations cover `0..len_a` and `0..len_b` in order
    /// with no gaps or overlaps.
    pub fn covers(&self, len_a: usize, len_b: usize) -> bool {
        let (mut i, mut j) = (0, 0);
        for op in &self.ops {
            if op.i1 != i || op.j1 != j || op.i2 < op.i1 || op.j2 < op.j1 {
                return false;
            }
            i = op.i2;
            j = op.j2;
        }
        i == len_a && j == len_b
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a EditOp;
    type IntoIter = std::slice::Iter<'a, EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

/// Alignment tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignOptions {
    /// Skip elements that occur in more than 1% of a long `b` sequence
    /// (at least 200 elements) when seeding matches.
    pub autojunk: bool,
}

impl AlignOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_autojunk(mut self, autojunk: bool) -> Self {
        self.autojunk = autojunk;
        self
    }
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self { autojunk: true }
    }
}

/// Align two sequences with default options.
pub fn align<T: Eq + Hash>(a: &[T], b: &[T]) -> EditScript {
    align_with(a, b, &AlignOptions::default())
}

/// Align two sequences.
pub fn align_with<T: Eq + Hash>(a: &[T], b: &[T], options: &AlignOptions) -> EditScript {
    if a.is_empty() && b.is_empty() {
        return EditScript {
            ops: vec![EditOp::equal(0, 0, 0, 0)],
        };
    }

    let blocks = SequenceMatcher::new(a, b, options.autojunk).matching_blocks();

    let mut ops = Vec::with_capacity(blocks.len() * 2);
    let (mut i, mut j) = (0, 0);
    for block in blocks {
        let tag = match (i < block.a_start, j < block.b_start) {
            (true, true) => Some(OpTag::Replace),
            (true, false) => Some(OpTag::Delete),
            (false, true) => Some(OpTag::Insert),
            (false, false) => None,
        };
        if let Some(tag) = tag {
            ops.push(EditOp::new(tag, i, block.a_start, j, block.b_start));
        }
        i = block.a_start + block.size;
        j = block.b_start + block.size;
        if block.size > 0 {
            ops.push(EditOp::equal(block.a_start, i, block.b_start, j));
        }
    }

    let script = EditScript { ops };
    debug_assert!(script.covers(a.len(), b.len()));
    script
}

/// Align two token sequences by their text.
pub fn align_tokens(a: &[Token], b: &[Token], options: &AlignOptions) -> EditScript {
    let a: Vec<&str> = a.iter().map(|t| t.text.as_str()).collect();
    let b: Vec<&str> = b.iter().map(|t| t.text.as_str()).collect();
    align_with(&a, &b, options)
}
