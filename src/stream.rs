//! Streaming extraction API: emit per-page results as they complete.
//!
//! Unlike the eager [`crate::run::extract_statements`], which returns only
//! after every selected page finishes, [`extract_stream`] yields each
//! [`ExtractionResult`] as its extraction completes — useful for progress
//! UIs and incremental persistence. Results arrive in completion order;
//! sort by `page_num` if order matters. Consolidation is left to the
//! caller via [`crate::pipeline::consolidate::Consolidator`].

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::output::ExtractionResult;
use crate::pipeline::{classify, extract};
use crate::provider;
use crate::statement::Page;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-page extraction results.
pub type ExtractionStream = Pin<Box<dyn Stream<Item = ExtractionResult> + Send>>;

/// Classify, select, and extract — yielding results as pages finish.
///
/// # Returns
/// - `Ok(ExtractionStream)` — a stream of [`ExtractionResult`]s, failures
///   included (check `result.error`)
/// - `Err(PipelineError)` — fatal setup error (no pages, nothing
///   classified, provider not configured)
pub async fn extract_stream(
    pages: Vec<Page>,
    config: &PipelineConfig,
) -> Result<ExtractionStream, PipelineError> {
    if pages.is_empty() {
        return Err(PipelineError::NoPages);
    }
    info!("Starting streaming extraction: {} pages", pages.len());

    let ranked = classify::rank_pages_bounded(pages, config).await;
    let selected: Vec<_> = ranked
        .into_iter()
        .filter(|r| r.score.classified)
        .take(config.top_k)
        .collect();
    if selected.is_empty() {
        return Err(PipelineError::PipelineExhausted {
            attempted: 0,
            first_error: "no pages classified as financial statements".into(),
        });
    }

    let extractor = provider::resolve_extractor(config)?;
    let concurrency = config.concurrency;
    let config = config.clone();

    let s = stream::iter(selected.into_iter().map(move |ranked_page| {
        let extractor = Arc::clone(&extractor);
        let config = config.clone();
        async move { extract::extract_page(&extractor, &ranked_page, &config).await }
    }))
    .buffer_unordered(concurrency);

    Ok(Box::pin(s))
}
