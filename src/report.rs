//! Comparison report with per-page change statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::LayoutMode;

/// How a page took part in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Both revisions have the page
    Compared,
    /// Only the new revision has the page
    Added,
    /// Only the old revision has the page
    Removed,
}

/// Changes found on one output page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    /// Zero-based output page index
    pub index: usize,

    pub status: PageStatus,

    /// New-revision tokens in insert operations
    pub inserted_tokens: usize,

    /// Old-revision tokens in delete operations
    pub deleted_tokens: usize,

    /// New-revision tokens in replace operations
    pub replaced_tokens: usize,

    /// Images only in the new revision
    pub added_assets: usize,

    /// Images only in the old revision
    pub removed_assets: usize,

    /// Number of highlight regions drawn
    pub highlights: usize,

    /// Token or asset extraction failed on either side
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl PageSummary {
    /// Summary of a page with no changes counted yet.
    pub fn new(index: usize, status: PageStatus) -> Self {
        Self {
            index,
            status,
            inserted_tokens: 0,
            deleted_tokens: 0,
            replaced_tokens: 0,
            added_assets: 0,
            removed_assets: 0,
            highlights: 0,
            degraded: false,
        }
    }

    /// Whether anything differs on this page.
    pub fn has_changes(&self) -> bool {
        self.status != PageStatus::Compared
            || self.inserted_tokens > 0
            || self.deleted_tokens > 0
            || self.replaced_tokens > 0
            || self.added_assets > 0
            || self.removed_assets > 0
    }
}

/// Totals over all pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffTotals {
    pub pages: usize,
    pub changed_pages: usize,
    pub added_pages: usize,
    pub removed_pages: usize,
    pub inserted_tokens: usize,
    pub deleted_tokens: usize,
    pub replaced_tokens: usize,
    pub added_assets: usize,
    pub removed_assets: usize,
    pub degraded_pages: usize,
}

/// Report of one comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffReport {
    /// Layout of the combined document
    pub layout: LayoutMode,

    /// Page count of the old revision
    pub old_pages: usize,

    /// Page count of the new revision
    pub new_pages: usize,

    /// Per output page, in order
    pub pages: Vec<PageSummary>,

    pub totals: DiffTotals,

    /// When the comparison finished
    pub generated_at: DateTime<Utc>,
}

impl DiffReport {
    /// Build a report from page summaries, computing totals.
    pub fn new(layout: LayoutMode, old_pages: usize, new_pages: usize, pages: Vec<PageSummary>) -> Self {
        let mut totals = DiffTotals {
            pages: pages.len(),
            ..Default::default()
        };
        for page in &pages {
            match page.status {
                PageStatus::Added => totals.added_pages += 1,
                PageStatus::Removed => totals.removed_pages += 1,
                PageStatus::Compared => {}
            }
            if page.has_changes() {
                totals.changed_pages += 1;
            }
            if page.degraded {
                totals.degraded_pages += 1;
            }
            totals.inserted_tokens += page.inserted_tokens;
            totals.deleted_tokens += page.deleted_tokens;
            totals.replaced_tokens += page.replaced_tokens;
            totals.added_assets += page.added_assets;
            totals.removed_assets += page.removed_assets;
        }

        Self {
            layout,
            old_pages,
            new_pages,
            pages,
            totals,
            generated_at: Utc::now(),
        }
    }

    /// True when no page has any difference.
    pub fn is_identical(&self) -> bool {
        self.totals.changed_pages == 0
    }

    /// Serialize to JSON.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        let result = match format {
            JsonFormat::Pretty => serde_json::to_string_pretty(self),
            JsonFormat::Compact => serde_json::to_string(self),
        };

        result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
    }
}

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}
