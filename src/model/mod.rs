//! Geometric content model shared by readers, the aligner and the canvas.
//!
//! The model is format-agnostic: a reader turns a page into [`Token`]s and
//! an [`AssetSet`], and the compositor turns differences between them into
//! [`Highlight`]s positioned for a [`LayoutMode`].

mod content;
mod geometry;
mod highlight;

pub use content::{Asset, AssetId, AssetSet, Token};
pub use geometry::{Color, PageSize, Point, Rect};
pub use highlight::{Highlight, HighlightKind, HighlightStyle, LayoutMode};
