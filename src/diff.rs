//! Comparison driver.
//!
//! Loads both revisions, pairs their pages, plans every output page
//! (concurrently unless disabled) and renders the plans in page order.

use std::time::Instant;

use rayon::prelude::*;

use crate::canvas::{Canvas, PdfCanvas};
use crate::compose::{Compositor, PagePlan};
use crate::error::{Error, Result};
use crate::model::LayoutMode;
use crate::options::{DiffOptions, ProgressEvent};
use crate::pair::{pair_pages, PagePair};
use crate::reader::{DocumentReader, PdfReader, SourceDocument};
use crate::report::DiffReport;

/// Result of a comparison.
#[derive(Debug, Clone)]
pub struct DiffOutput {
    /// Serialized combined document
    pub document: Vec<u8>,

    /// Per-page change report
    pub report: DiffReport,
}

/// State of one comparison request.
pub struct ComparisonContext<'a, D: SourceDocument + ?Sized> {
    old: &'a D,
    new: &'a D,
    options: &'a DiffOptions,
    started: Instant,
}

impl<'a, D: SourceDocument + ?Sized> ComparisonContext<'a, D> {
    pub fn new(old: &'a D, new: &'a D, options: &'a DiffOptions) -> Self {
        Self {
            old,
            new,
            options,
            started: Instant::now(),
        }
    }

    pub fn layout(&self) -> LayoutMode {
        self.options.layout
    }

    /// Fail if the request was cancelled or ran out of time.
    pub fn check(&self) -> Result<()> {
        if self.options.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(timeout) = self.options.timeout {
            if self.started.elapsed() >= timeout {
                return Err(Error::Timeout(timeout));
            }
        }
        Ok(())
    }

    fn plan_page(&self, pair: &PagePair) -> Result<Option<PagePlan>> {
        self.check()?;
        let plan = Compositor::from_options(self.options).compose(pair, self.old, self.new)?;
        if let Some(plan) = &plan {
            log::debug!(
                "Page {}: {:?}, {} highlights",
                pair.index + 1,
                plan.summary.status,
                plan.summary.highlights
            );
        }
        self.options.emit(ProgressEvent::PageDone { index: pair.index });
        Ok(plan)
    }

    /// Plan all pairs, keeping pairing order.
    pub fn plan_pages(&self, pairs: &[PagePair]) -> Result<Vec<PagePlan>> {
        let plans: Vec<Option<PagePlan>> = if self.options.parallel && pairs.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.threads)
                .build()
                .map_err(|e| Error::Other(format!("cannot start worker pool: {}", e)))?;
            pool.install(|| {
                pairs
                    .par_iter()
                    .map(|pair| self.plan_page(pair))
                    .collect::<Result<Vec<_>>>()
            })?
        } else {
            pairs
                .iter()
                .map(|pair| self.plan_page(pair))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(plans.into_iter().flatten().collect())
    }

    /// Run the comparison and render into `canvas`.
    pub fn run<C: Canvas<D>>(&self, mut canvas: C) -> Result<DiffOutput> {
        let pairs = pair_pages(self.old.page_count(), self.new.page_count());
        log::info!(
            "Comparing {} vs {} pages ({} layout)",
            self.old.page_count(),
            self.new.page_count(),
            self.layout()
        );
        self.options.emit(ProgressEvent::Started { pages: pairs.len() });

        let plans = self.plan_pages(&pairs)?;

        self.check()?;
        self.options.emit(ProgressEvent::Rendering);
        for plan in &plans {
            plan.apply(&mut canvas, self.old, self.new)?;
        }
        let document = canvas.finish()?;

        let report = DiffReport::new(
            self.layout(),
            self.old.page_count(),
            self.new.page_count(),
            plans.into_iter().map(|p| p.summary).collect(),
        );
        log::info!(
            "Comparison done in {:?}: {} of {} pages changed",
            self.started.elapsed(),
            report.totals.changed_pages,
            report.totals.pages
        );
        self.options.emit(ProgressEvent::Finished);

        Ok(DiffOutput { document, report })
    }
}

/// Compare two loaded documents, drawing into `canvas`.
pub fn compare<D, C>(old: &D, new: &D, canvas: C, options: &DiffOptions) -> Result<DiffOutput>
where
    D: SourceDocument + ?Sized,
    C: Canvas<D>,
{
    ComparisonContext::new(old, new, options).run(canvas)
}

/// Load both revisions with `reader`.
///
/// A revision that is absent or empty is a [`Error::MissingInput`].
pub fn load_pair<R: DocumentReader>(
    reader: &R,
    old: Option<&[u8]>,
    new: Option<&[u8]>,
) -> Result<(R::Document, R::Document)> {
    let old = old
        .filter(|data| !data.is_empty())
        .ok_or_else(|| Error::MissingInput("old document".to_string()))?;
    let new = new
        .filter(|data| !data.is_empty())
        .ok_or_else(|| Error::MissingInput("new document".to_string()))?;

    Ok((reader.load(old)?, reader.load(new)?))
}

/// Compare two PDF files given as bytes and produce the combined PDF.
pub fn compare_pdf(old: Option<&[u8]>, new: Option<&[u8]>, options: &DiffOptions) -> Result<DiffOutput> {
    let (old, new) = load_pair(&PdfReader, old, new)?;
    compare(&old, &new, PdfCanvas::new(), options)
}
