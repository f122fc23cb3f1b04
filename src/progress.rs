//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through the selected pages.
//! Callers can forward events to a channel, a job-status row, or a terminal
//! progress bar without the library knowing how the host application
//! communicates.

use std::sync::Arc;

/// Called by the pipeline as it processes each selected page.
///
/// Implementations must be `Send + Sync` — pages are extracted concurrently,
/// so `on_page_start`, `on_page_complete`, and `on_page_error` may be called
/// from different tasks at once. Protect shared mutable state accordingly
/// (`Mutex`, atomics). All methods have default no-op implementations so
/// callers only override what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after page selection, before any extraction call.
    ///
    /// # Arguments
    /// * `selected_pages` — number of pages that will be extracted
    fn on_run_start(&self, selected_pages: usize) {
        let _ = selected_pages;
    }

    /// Called just before the extraction request is sent for a page.
    fn on_page_start(&self, page_num: usize, selected_pages: usize) {
        let _ = (page_num, selected_pages);
    }

    /// Called when a page extracts successfully.
    ///
    /// # Arguments
    /// * `line_items` — number of line items the page produced
    fn on_page_complete(&self, page_num: usize, selected_pages: usize, line_items: usize) {
        let _ = (page_num, selected_pages, line_items);
    }

    /// Called when a page fails (fast precondition failure, fatal service
    /// error, or retries exhausted).
    fn on_page_error(&self, page_num: usize, selected_pages: usize, error: &str) {
        let _ = (page_num, selected_pages, error);
    }

    /// Called once after all selected pages have been attempted.
    fn on_run_complete(&self, selected_pages: usize, success_count: usize) {
        let _ = (selected_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
