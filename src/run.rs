//! Eager (full-run) pipeline entry point.
//!
//! This module provides the simpler API: classify, extract every selected
//! page, wait for all of them, consolidate, and return. Use
//! [`crate::stream::extract_stream`] instead when you want per-page results
//! as they complete.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::output::{PipelineOutput, RunStats};
use crate::pipeline::classify::{self, ClassificationScore, RankedPage};
use crate::pipeline::consolidate::Consolidator;
use crate::pipeline::extract;
use crate::provider;
use crate::statement::Page;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Run the full pipeline over a rendered document.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `pages`  — The document's pages, in order, from the external renderer
/// * `config` — Pipeline configuration
///
/// # Returns
/// `Ok(PipelineOutput)` as soon as at least one selected page extracted
/// successfully — check `output.results` for the per-page failure manifest.
///
/// # Errors
/// Returns `Err(PipelineError)` only for run-fatal conditions:
/// - Empty page list
/// - Extraction provider not configured
/// - Every selected page failed ([`PipelineError::PipelineExhausted`])
pub async fn extract_statements(
    pages: Vec<Page>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    let total_start = Instant::now();
    if pages.is_empty() {
        return Err(PipelineError::NoPages);
    }
    let total_pages = pages.len();
    info!("Starting extraction run: {} pages", total_pages);

    // ── Stage 1: classify & rank ─────────────────────────────────────────
    let classify_start = Instant::now();
    let ranked = classify::rank_pages_bounded(pages, config).await;
    let classify_duration_ms = classify_start.elapsed().as_millis() as u64;

    let rankings: Vec<ClassificationScore> = ranked.iter().map(|r| r.score.clone()).collect();
    let classified_pages = rankings.iter().filter(|s| s.classified).count();
    info!(
        "Classified {}/{} pages in {}ms",
        classified_pages, total_pages, classify_duration_ms
    );

    // ── Stage 2: select the top-K classified pages ───────────────────────
    let selected: Vec<RankedPage> = ranked
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
    debug!("Selected {} pages for extraction", selected.len());

    let extractor = provider::resolve_extractor(config)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(selected.len());
    }

    // ── Stage 3: extract with bounded concurrency ────────────────────────
    let extract_start = Instant::now();
    let selected_count = selected.len();
    let mut results: Vec<_> = stream::iter(selected.iter().map(|ranked_page| {
        let extractor = Arc::clone(&extractor);
        let config = config.clone();
        async move {
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_start(ranked_page.page.page_num, selected_count);
            }
            let result = extract::extract_page(&extractor, ranked_page, &config).await;
            if let Some(ref cb) = config.progress_callback {
                match &result.error {
                    None => {
                        let line_items = result
                            .statement
                            .as_ref()
                            .map(|s| s.line_items.values().map(|f| f.len()).sum())
                            .unwrap_or(0);
                        cb.on_page_complete(result.page_num, selected_count, line_items);
                    }
                    Some(e) => cb.on_page_error(result.page_num, selected_count, &e.to_string()),
                }
            }
            result
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    // Results arrive in completion order; re-sort by page number so
    // consolidation is independent of scheduling.
    results.sort_by_key(|r| r.page_num);

    let extracted_pages = results.iter().filter(|r| r.success()).count();
    let failed_pages = results.len() - extracted_pages;

    if extracted_pages == 0 {
        let first_error = results
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(PipelineError::PipelineExhausted {
            attempted: results.len(),
            first_error,
        });
    }

    // ── Stage 4: consolidate ─────────────────────────────────────────────
    let statement = Consolidator::new().consolidate(&results);

    let stats = RunStats {
        total_pages,
        classified_pages,
        selected_pages: selected_count,
        extracted_pages,
        failed_pages,
        classify_duration_ms,
        extract_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Run complete: {}/{} pages extracted, {} line item categories, {}ms total",
        extracted_pages,
        selected_count,
        statement.line_items.len(),
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(selected_count, extracted_pages);
    }

    Ok(PipelineOutput {
        statement,
        results,
        rankings,
        stats,
    })
}
