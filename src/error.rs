//! Error types for the finstmt library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`PipelineError`] — **Fatal**: the run cannot produce a consolidated
//!   statement at all (no input pages, provider not configured, every
//!   selected page failed). Returned as `Err(PipelineError)` from the
//!   top-level entry points.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (missing image,
//!   transient API error that exhausted its retries) but other pages are
//!   fine. Stored inside [`crate::output::ExtractionResult`] so callers can
//!   inspect partial success rather than losing the whole run to one bad
//!   page.
//!
//! * [`ExtractError`] — **Service-level**: what one call to the vision
//!   extraction service reported. [`ExtractError::is_retryable`] drives the
//!   retry loop; only the rate-limit class is retried.
//!
//! A page whose text is too short to score is *not* an error anywhere in
//! this taxonomy — the classifier marks it `classified = false` and moves
//! on. Likewise a failed arithmetic identity during consolidation is a
//! [`crate::output::ValidationCheck`] record, never an `Err`.

use thiserror::Error;

/// All fatal errors returned by the finstmt library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::ExtractionResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The caller supplied an empty page list.
    #[error("no pages were provided to the pipeline")]
    NoPages,

    /// Zero selected pages produced a successful extraction.
    ///
    /// This is the only condition that terminates a run without a
    /// consolidated statement. `attempted = 0` means no page even
    /// classified as a financial statement.
    #[error("extraction exhausted: all {attempted} selected pages failed.\nFirst error: {first_error}")]
    PipelineExhausted {
        attempted: usize,
        first_error: String,
    },

    /// The configured extraction provider is not initialised (missing API
    /// key etc.).
    #[error("extraction provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::output::ExtractionResult::error`] when a page fails.
/// The overall run continues unless ALL selected pages fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The renderer supplied no image for this page; extraction needs one.
    /// Never retried.
    #[error("page {page}: no rendered image available")]
    MissingImage { page: usize },

    /// Page text is below the extraction minimum. Never retried.
    #[error("page {page}: text too short to extract ({len} chars, minimum {min})")]
    TextTooShort { page: usize, len: usize, min: usize },

    /// The extraction service returned a non-retryable error
    /// (malformed or empty response, API rejection).
    #[error("page {page}: extraction failed after {retries} retries: {detail}")]
    ExtractFailed {
        page: usize,
        retries: u8,
        detail: String,
    },

    /// Rate-limit retries were exhausted; escalated to a page failure.
    #[error("page {page}: rate limited, gave up after {retries} retries: {detail}")]
    Exhausted {
        page: usize,
        retries: u8,
        detail: String,
    },
}

/// What a single call to the vision extraction service reported.
///
/// The orchestrator's only obligation toward the service is correct
/// classification: [`ExtractError::RateLimited`] is transient and retried
/// with backoff; everything else is fatal for the page and recorded
/// immediately.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// HTTP 429 / "too many requests" class. Check `retry_after_secs` for a
    /// server-specified delay, or use exponential backoff if `None`.
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The service answered with no content at all.
    #[error("extraction service returned an empty response")]
    EmptyResponse,

    /// The response could not be parsed into a statement tree.
    #[error("malformed extraction response: {detail}")]
    MalformedResponse { detail: String },

    /// Any other API failure (auth, bad request, content filter).
    #[error("extraction API error: {message}")]
    Api { message: String },
}

impl ExtractError {
    /// Whether the retry loop should try this call again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractError::RateLimited { .. })
    }
}
