//! Highlight regions, their styling and the output layout mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Color, Rect};
use crate::error::Error;

/// How the two revisions are arranged on an output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// Old revision on the left, new revision on the right, double width.
    SideBySide,
    /// Only the new revision, native width, with changes overlaid.
    #[default]
    Single,
}

impl LayoutMode {
    /// Output width multiplier relative to the source page width.
    pub fn width_factor(&self) -> f32 {
        match self {
            LayoutMode::SideBySide => 2.0,
            LayoutMode::Single => 1.0,
        }
    }

    /// Horizontal offset applied to new-revision content.
    pub fn new_revision_offset(&self, page_width: f32) -> f32 {
        match self {
            LayoutMode::SideBySide => page_width,
            LayoutMode::Single => 0.0,
        }
    }

    /// Whether the old revision has a region of its own on the canvas.
    pub fn shows_old_revision(&self) -> bool {
        matches!(self, LayoutMode::SideBySide)
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutMode::SideBySide => f.write_str("side-by-side"),
            LayoutMode::Single => f.write_str("single"),
        }
    }
}

impl FromStr for LayoutMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "side-by-side" => Ok(LayoutMode::SideBySide),
            "single" => Ok(LayoutMode::Single),
            _ => Err(Error::InvalidLayoutMode(s.to_string())),
        }
    }
}

/// Why a region is highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    /// Text only present in the new revision
    Insertion,
    /// Text only present in the old revision
    Deletion,
    /// Image only present in the new revision
    AddedAsset,
    /// Image only present in the old revision
    RemovedAsset,
    /// Page with no counterpart in the old revision
    AddedPage,
}

/// A filled, semi-transparent rectangle on an output page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub rect: Rect,
    pub color: Color,
    pub opacity: f32,
    pub kind: HighlightKind,
}

/// Colors and opacity used for highlights and the separator line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightStyle {
    /// Fill for inserted text and added images
    pub insertion: Color,
    /// Fill for deleted text and removed images
    pub deletion: Color,
    /// Fill for wholly added pages
    pub added_page: Color,
    /// Fill opacity for every highlight
    pub opacity: f32,
    /// Stroke color of the side-by-side separator
    pub separator: Color,
    /// Stroke width of the side-by-side separator
    pub separator_width: f32,
}

impl HighlightStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_insertion(mut self, color: Color) -> Self {
        self.insertion = color;
        self
    }

    pub fn with_deletion(mut self, color: Color) -> Self {
        self.deletion = color;
        self
    }

    pub fn with_added_page(mut self, color: Color) -> Self {
        self.added_page = color;
        self
    }

    /// Set the fill opacity, clamped to `0.0..=1.0`.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Build a highlight of the given kind with this style's color.
    pub fn highlight(&self, kind: HighlightKind, rect: Rect) -> Highlight {
        let color = match kind {
            HighlightKind::Insertion | HighlightKind::AddedAsset => self.insertion,
            HighlightKind::Deletion | HighlightKind::RemovedAsset => self.deletion,
            HighlightKind::AddedPage => self.added_page,
        };
        Highlight {
            rect,
            color,
            opacity: self.opacity,
            kind,
        }
    }
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            insertion: Color::GREEN,
            deletion: Color::RED,
            added_page: Color::BLUE,
            opacity: 0.3,
            separator: Color::BLACK,
            separator_width: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_mode_parse() {
        assert_eq!(
            "side-by-side".parse::<LayoutMode>().unwrap(),
            LayoutMode::SideBySide
        );
        assert_eq!(" Single ".parse::<LayoutMode>().unwrap(), LayoutMode::Single);
        assert!(matches!(
            "overlay".parse::<LayoutMode>(),
            Err(Error::InvalidLayoutMode(_))
        ));
        assert_eq!(LayoutMode::default(), LayoutMode::Single);
    }

    #[test]
    fn test_layout_mode_display_round_trips() {
        for mode in [LayoutMode::SideBySide, LayoutMode::Single] {
            assert_eq!(mode.to_string().parse::<LayoutMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_layout_mode_geometry() {
        assert_eq!(LayoutMode::SideBySide.width_factor(), 2.0);
        assert_eq!(LayoutMode::Single.new_revision_offset(612.0), 0.0);
        assert_eq!(LayoutMode::SideBySide.new_revision_offset(612.0), 612.0);
    }

    #[test]
    fn test_style_colors_by_kind() {
        let style = HighlightStyle::default();
        let rect = Rect::default();
        assert_eq!(style.highlight(HighlightKind::Deletion, rect).color, Color::RED);
        assert_eq!(style.highlight(HighlightKind::AddedAsset, rect).color, Color::GREEN);
        assert_eq!(style.highlight(HighlightKind::AddedPage, rect).color, Color::BLUE);
        assert_eq!(style.highlight(HighlightKind::Insertion, rect).opacity, 0.3);
    }

    #[test]
    fn test_style_opacity_clamped() {
        assert_eq!(HighlightStyle::new().with_opacity(4.0).opacity, 1.0);
    }
}
