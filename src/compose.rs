//! Highlight composition.
//!
//! Turns one [`PagePair`] into a [`PagePlan`]: the output page size and the
//! ordered drawing commands for it. Planning reads the source documents but
//! never touches the canvas, so plans for different pages can be computed
//! concurrently and applied afterwards in page order.
//!
//! Drawing order on a page:
//! 1. source page placements (old, then new)
//! 2. the midline separator (side-by-side only)
//! 3. highlights: per edit operation the deletion boxes then the insertion
//!    boxes, then removed images, then added images

use crate::align::{align_tokens, AlignOptions, OpTag};
use crate::canvas::{Canvas, Revision};
use crate::error::Result;
use crate::extract::PageContent;
use crate::model::{
    Color, Highlight, HighlightKind, HighlightStyle, LayoutMode, PageSize, Point, Rect,
};
use crate::options::DiffOptions;
use crate::pair::PagePair;
use crate::reader::SourceDocument;
use crate::report::{PageStatus, PageSummary};

/// One drawing command of a page plan.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Draw a source page into `dest`
    PlaceSource {
        revision: Revision,
        page: usize,
        dest: Rect,
    },
    /// Stroke a line
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f32,
    },
    /// Fill a highlight region
    Highlight(Highlight),
}

/// Everything needed to draw one output page.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    /// Output page size
    pub size: PageSize,

    /// Commands in drawing order
    pub commands: Vec<DrawCommand>,

    /// Change statistics
    pub summary: PageSummary,
}

impl PagePlan {
    /// Highlight regions in drawing order.
    pub fn highlights(&self) -> impl Iterator<Item = &Highlight> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Highlight(h) => Some(h),
            _ => None,
        })
    }

    /// Highlights of one kind.
    pub fn highlights_of(&self, kind: HighlightKind) -> Vec<Rect> {
        self.highlights()
            .filter(|h| h.kind == kind)
            .map(|h| h.rect)
            .collect()
    }

    /// Whether a separator line is drawn.
    pub fn has_separator(&self) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c, DrawCommand::Line { .. }))
    }

    /// Draw the plan as a new page of `canvas`.
    pub fn apply<D, C>(&self, canvas: &mut C, old: &D, new: &D) -> Result<()>
    where
        D: SourceDocument + ?Sized,
        C: Canvas<D>,
    {
        let page = canvas.new_page(self.size)?;
        for command in &self.commands {
            match command {
                DrawCommand::PlaceSource {
                    revision,
                    page: index,
                    dest,
                } => {
                    let source = match revision {
                        Revision::Old => old,
                        Revision::New => new,
                    };
                    canvas.place_source_page(page, *dest, *revision, source, *index)?;
                }
                DrawCommand::Line {
                    from,
                    to,
                    color,
                    width,
                } => canvas.draw_line(page, *from, *to, *color, *width)?,
                DrawCommand::Highlight(h) => canvas.draw_rect(page, h.rect, h.color, h.opacity)?,
            }
        }
        Ok(())
    }
}

/// Computes page plans for one layout and style.
#[derive(Debug, Clone, Copy)]
pub struct Compositor<'a> {
    layout: LayoutMode,
    style: &'a HighlightStyle,
    align: &'a AlignOptions,
}

impl<'a> Compositor<'a> {
    pub fn new(layout: LayoutMode, style: &'a HighlightStyle, align: &'a AlignOptions) -> Self {
        Self {
            layout,
            style,
            align,
        }
    }

    pub fn from_options(options: &'a DiffOptions) -> Self {
        Self::new(options.layout, &options.style, &options.align)
    }

    /// Plan a page pair, extracting content from the documents as needed.
    ///
    /// Returns `None` for a pair with neither page.
    pub fn compose<D: SourceDocument + ?Sized>(
        &self,
        pair: &PagePair,
        old: &D,
        new: &D,
    ) -> Result<Option<PagePlan>> {
        let Some(geometry) = pair.geometry(old, new)? else {
            return Ok(None);
        };

        // wholly added pages are not diffed
        let (old_content, new_content) = if pair.is_compared() {
            (
                pair.old.map(|i| PageContent::extract(old, i)),
                pair.new.map(|j| PageContent::extract(new, j)),
            )
        } else {
            (None, None)
        };

        Ok(Some(self.compose_contents(
            pair,
            geometry,
            old_content.as_ref(),
            new_content.as_ref(),
        )))
    }

    /// Plan a page pair from already extracted content.
    ///
    /// `geometry` is the source page size for the pair. Content is only
    /// diffed when both sides are given.
    pub fn compose_contents(
        &self,
        pair: &PagePair,
        geometry: PageSize,
        old: Option<&PageContent>,
        new: Option<&PageContent>,
    ) -> PagePlan {
        let width = geometry.width;
        let height = geometry.height;
        let offset = self.layout.new_revision_offset(width);
        let old_region = Rect::from_size(width, height);
        let new_region = old_region.shifted_x(offset);
        let side_by_side = self.layout.shows_old_revision();

        let status = match (pair.old, pair.new) {
            (None, Some(_)) => PageStatus::Added,
            (Some(_), None) => PageStatus::Removed,
            _ => PageStatus::Compared,
        };
        let mut summary = PageSummary::new(pair.index, status);
        let mut commands = Vec::new();

        if side_by_side {
            if let Some(i) = pair.old {
                commands.push(DrawCommand::PlaceSource {
                    revision: Revision::Old,
                    page: i,
                    dest: old_region,
                });
            }
        }
        if let Some(j) = pair.new {
            commands.push(DrawCommand::PlaceSource {
                revision: Revision::New,
                page: j,
                dest: new_region,
            });
        }

        if side_by_side {
            commands.push(DrawCommand::Line {
                from: Point::new(width, 0.0),
                to: Point::new(width, height),
                color: self.style.separator,
                width: self.style.separator_width,
            });
        }

        let mut highlight = |kind: HighlightKind, rect: Rect| {
            commands.push(DrawCommand::Highlight(self.style.highlight(kind, rect)));
        };

        match (pair.old, pair.new, old, new) {
            (None, Some(_), _, _) => {
                highlight(HighlightKind::AddedPage, new_region);
            }
            (Some(_), Some(_), Some(a), Some(b)) => {
                summary.degraded = a.degraded || b.degraded;

                let script = align_tokens(&a.tokens, &b.tokens, self.align);
                for op in &script {
                    if op.removes() && side_by_side {
                        for token in &a.tokens[op.a_range()] {
                            highlight(HighlightKind::Deletion, token.bbox);
                        }
                    }
                    if op.adds() {
                        for token in &b.tokens[op.b_range()] {
                            highlight(HighlightKind::Insertion, token.bbox.shifted_x(offset));
                        }
                    }
                }
                summary.deleted_tokens = script.count(OpTag::Delete).0;
                summary.inserted_tokens = script.count(OpTag::Insert).1;
                summary.replaced_tokens = script.count(OpTag::Replace).1;

                for (_, rect) in a.assets.missing_from(&b.assets) {
                    summary.removed_assets += 1;
                    if side_by_side {
                        highlight(HighlightKind::RemovedAsset, *rect);
                    }
                }
                for (_, rect) in b.assets.missing_from(&a.assets) {
                    summary.added_assets += 1;
                    highlight(HighlightKind::AddedAsset, rect.shifted_x(offset));
                }
            }
            _ => {}
        }

        summary.highlights = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Highlight(_)))
            .count();

        PagePlan {
            size: PageSize::new(width * self.layout.width_factor(), height),
            commands,
            summary,
        }
    }
}
