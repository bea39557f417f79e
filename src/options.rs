//! Comparison options and request control.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::align::AlignOptions;
use crate::error::Result;
use crate::model::{HighlightStyle, LayoutMode};

/// Options for one comparison.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Layout of the combined document
    pub layout: LayoutMode,

    /// Whether pages are processed in parallel
    pub parallel: bool,

    /// Worker threads for parallel processing (0 = available cores)
    pub threads: usize,

    /// Give up after this long
    pub timeout: Option<Duration>,

    /// Cancellation flag shared with the caller
    pub cancel: CancelToken,

    /// Receives progress events
    pub progress: Option<Sender<ProgressEvent>>,

    /// Highlight colors and opacity
    pub style: HighlightStyle,

    /// Sequence alignment settings
    pub align: AlignOptions,
}

impl DiffOptions {
    /// Create new diff options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the layout mode.
    pub fn with_layout(mut self, layout: LayoutMode) -> Self {
        self.layout = layout;
        self
    }

    /// Set the layout mode from its name (`"side-by-side"` or `"single"`).
    pub fn with_view(mut self, view: &str) -> Result<Self> {
        self.layout = view.parse()?;
        Ok(self)
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Abort the comparison after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a cancellation token controlled by the caller.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Send progress events to a channel.
    pub fn with_progress(mut self, sender: Sender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Set the highlight style.
    pub fn with_style(mut self, style: HighlightStyle) -> Self {
        self.style = style;
        self
    }

    /// Set the alignment options.
    pub fn with_align(mut self, align: AlignOptions) -> Self {
        self.align = align;
        self
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.progress {
            // a dropped receiver only means nobody is watching
            let _ = sender.send(event);
        }
    }
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            layout: LayoutMode::default(),
            parallel: true,
            threads: 0,
            timeout: None,
            cancel: CancelToken::new(),
            progress: None,
            style: HighlightStyle::default(),
            align: AlignOptions::default(),
        }
    }
}

/// Resolve an optional layout selector; absent means the default layout.
pub fn resolve_layout(selector: Option<&str>) -> Result<LayoutMode> {
    match selector {
        Some(s) => s.parse(),
        None => Ok(LayoutMode::default()),
    }
}

/// Shared flag to stop a running comparison.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress of a running comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Comparison started with this many output pages
    Started { pages: usize },
    /// An output page was planned
    PageDone { index: usize },
    /// All pages planned; writing the output document
    Rendering,
    /// Output written
    Finished,
}
