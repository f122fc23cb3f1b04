//! Per-page extraction task: preconditions, the service call, and
//! rate-limit retry with backoff.
//!
//! ## Retry Strategy
//!
//! Rate-limit errors are transient and frequent under concurrent load.
//! The n-th retry waits `base × 2ⁿ` plus up to one second of uniform
//! jitter, capped at the configured ceiling; with the 1 s default base the
//! wait sequence is ~1 s → ~2 s → ~4 s. The jitter keeps N workers that
//! were rate-limited together from retrying in lockstep. Sleeps are local
//! to the task — siblings keep running through them.
//!
//! Every other failure class (missing image, short text, malformed or
//! empty response, API rejection) is fatal for the page and recorded
//! immediately, without aborting sibling tasks.

use crate::config::PipelineConfig;
use crate::error::PageError;
use crate::output::ExtractionResult;
use crate::pipeline::classify::RankedPage;
use crate::provider::{ExtractionRequest, StatementExtractor};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Extract a single selected page.
///
/// Always returns an `ExtractionResult` — never propagates an error upward,
/// so one bad page cannot abort the batch. Callers check `result.error` to
/// decide whether the page contributed.
pub(crate) async fn extract_page(
    extractor: &Arc<dyn StatementExtractor>,
    ranked: &RankedPage,
    config: &PipelineConfig,
) -> ExtractionResult {
    let start = Instant::now();
    let page_num = ranked.page.page_num;
    let statement_type = ranked.score.statement_type;

    // Preconditions fail fast, non-retryable.
    let Some(ref image) = ranked.page.image else {
        return failed(
            page_num,
            statement_type,
            0,
            start,
            PageError::MissingImage { page: page_num },
        );
    };
    let text_len = ranked.page.text.trim().len();
    if text_len < config.min_text_len {
        return failed(
            page_num,
            statement_type,
            0,
            start,
            PageError::TextTooShort {
                page: page_num,
                len: text_len,
                min: config.min_text_len,
            },
        );
    }

    let request = ExtractionRequest {
        page_num,
        image: image.0.clone(),
        statement_hint: statement_type,
        raw_text: ranked.page.text.clone(),
    };

    let mut last_err = String::new();

    for attempt in 0..config.max_retries {
        if attempt > 0 {
            let delay = backoff_delay(
                attempt - 1,
                config.retry_base_delay_ms,
                config.retry_max_delay_ms,
            );
            warn!(
                "Page {}: rate limited, retry {}/{} after {:?}",
                page_num,
                attempt,
                config.max_retries.saturating_sub(1),
                delay
            );
            sleep(delay).await;
        }

        match extractor.extract(&request).await {
            Ok(statement) => {
                let duration = start.elapsed();
                debug!(
                    "Page {}: extracted {} as {} in {:?}",
                    page_num,
                    statement
                        .line_items
                        .values()
                        .map(|fields| fields.len())
                        .sum::<usize>(),
                    statement.statement_type,
                    duration
                );
                return ExtractionResult {
                    page_num,
                    statement_type,
                    statement: Some(statement),
                    retries: attempt as u8,
                    duration_ms: duration.as_millis() as u64,
                    error: None,
                };
            }
            Err(e) if e.is_retryable() => {
                warn!("Page {}: attempt {} rate limited — {}", page_num, attempt + 1, e);
                last_err = e.to_string();
            }
            Err(e) => {
                warn!("Page {}: fatal extraction error — {}", page_num, e);
                return failed(
                    page_num,
                    statement_type,
                    attempt as u8,
                    start,
                    PageError::ExtractFailed {
                        page: page_num,
                        retries: attempt as u8,
                        detail: e.to_string(),
                    },
                );
            }
        }
    }

    // Rate-limit retries exhausted: escalate to a page failure.
    let retries = config.max_retries.saturating_sub(1) as u8;
    failed(
        page_num,
        statement_type,
        retries,
        start,
        PageError::Exhausted {
            page: page_num,
            retries,
            detail: last_err,
        },
    )
}

fn failed(
    page_num: usize,
    statement_type: crate::statement::StatementType,
    retries: u8,
    start: Instant,
    error: PageError,
) -> ExtractionResult {
    ExtractionResult {
        page_num,
        statement_type,
        statement: None,
        retries,
        duration_ms: start.elapsed().as_millis() as u64,
        error: Some(error),
    }
}

/// Delay before the n-th retry (0-indexed): `min(base × 2ⁿ + jitter, max)`
/// with jitter uniform in `[0, 1)` seconds.
pub(crate) fn backoff_delay(retry: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exp = base_ms.saturating_mul(2u64.saturating_pow(retry)) as f64;
    let jitter = rand::rng().random_range(0.0..1.0) * 1_000.0;
    Duration::from_millis((exp + jitter).min(max_ms as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_within_jitter_bounds() {
        for retry in 0..6 {
            let floor = Duration::from_millis(1_000 * 2u64.pow(retry));
            let ceiling = floor + Duration::from_millis(1_000);
            for _ in 0..20 {
                let d = backoff_delay(retry, 1_000, 60_000);
                assert!(d >= floor, "retry {retry}: {d:?} below {floor:?}");
                assert!(d <= ceiling, "retry {retry}: {d:?} above {ceiling:?}");
            }
        }
    }

    #[test]
    fn backoff_is_non_decreasing_and_capped() {
        // With base 1 s the jitter (≤ 1 s) can never push delay n above the
        // floor of delay n+1, so sampled sequences are non-decreasing.
        let mut prev = Duration::ZERO;
        for retry in 0..12 {
            let d = backoff_delay(retry, 1_000, 60_000);
            assert!(d >= prev, "retry {retry}: {d:?} < {prev:?}");
            assert!(d <= Duration::from_secs(60));
            prev = Duration::from_millis(1_000 * 2u64.saturating_pow(retry).min(60));
        }
        assert_eq!(backoff_delay(30, 1_000, 60_000), Duration::from_secs(60));
    }
}
