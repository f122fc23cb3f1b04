//! Page classification: score each page against per-statement-type pattern
//! sets plus a numeric-density heuristic, then rank.
//!
//! Scoring is a pure function of the page text — no I/O, no state — so the
//! same page always produces the same score. Three pattern tiers contribute
//! with fixed weights (title phrases 5, statement vocabulary 2, generic
//! financial cues 1) and the density of "financial-looking" numeric tokens
//! adds a bucketed bonus or penalty. A page classifies when its best type
//! scores at least [`CLASSIFY_THRESHOLD`].
//!
//! Nothing in this stage is fatal: a page that cannot be scored is simply
//! unclassified.

use crate::config::PipelineConfig;
use crate::statement::{Page, StatementType};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Minimum non-whitespace characters a page needs to be scored at all.
pub const MIN_SCORABLE_CHARS: usize = 20;

/// A page classifies when its best type score reaches this.
pub const CLASSIFY_THRESHOLD: f64 = 3.0;

const TITLE_WEIGHT: f64 = 5.0;
const LINE_ITEM_WEIGHT: f64 = 2.0;
const SUPPORT_WEIGHT: f64 = 1.0;

// ── Results ──────────────────────────────────────────────────────────────

/// The classifier's verdict for one page: the winning statement type, its
/// score, and the page's numeric density. Derived purely from `Page::text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationScore {
    pub page_num: usize,
    pub statement_type: StatementType,
    pub score: f64,
    pub number_density_pct: f64,
    pub classified: bool,
}

/// A page paired with its winning score. Orders score-descending; ties keep
/// original page order (the ranking sort is stable).
#[derive(Debug, Clone)]
pub struct RankedPage {
    pub page: Page,
    pub score: ClassificationScore,
}

// ── Pattern tables ───────────────────────────────────────────────────────
//
// Matching is presence-based on normalised text (lowercased, apostrophes
// stripped): each pattern present contributes its tier weight once.

fn title_patterns(ty: StatementType) -> &'static [&'static str] {
    match ty {
        StatementType::BalanceSheet => &[
            "balance sheet",
            "statement of financial position",
            "statements of financial position",
            "statement of financial condition",
        ],
        StatementType::IncomeStatement => &[
            "income statement",
            "statement of income",
            "statements of income",
            "statement of operations",
            "statements of operations",
            "profit and loss",
            "statement of comprehensive income",
        ],
        StatementType::CashFlow => &[
            "statement of cash flows",
            "statements of cash flows",
            "cash flow statement",
        ],
        StatementType::Equity => &[
            "statement of changes in equity",
            "statements of changes in equity",
            "statement of stockholders equity",
            "statement of shareholders equity",
            "changes in equity",
        ],
    }
}

fn line_item_patterns(ty: StatementType) -> &'static [&'static str] {
    match ty {
        StatementType::BalanceSheet => &[
            "total assets",
            "current assets",
            "total liabilities",
            "current liabilities",
            "accounts receivable",
            "accounts payable",
            "retained earnings",
            "shareholders equity",
            "stockholders equity",
            "property, plant and equipment",
            "intangible assets",
        ],
        StatementType::IncomeStatement => &[
            "revenue",
            "net sales",
            "cost of goods sold",
            "cost of sales",
            "gross profit",
            "operating expenses",
            "operating income",
            "net income",
            "income tax expense",
            "earnings per share",
        ],
        StatementType::CashFlow => &[
            "operating activities",
            "investing activities",
            "financing activities",
            "net increase in cash",
            "net decrease in cash",
            "cash and cash equivalents",
            "depreciation and amortization",
            "capital expenditures",
        ],
        StatementType::Equity => &[
            "common stock",
            "share capital",
            "treasury stock",
            "additional paid-in capital",
            "dividends declared",
            "dividends paid",
            "comprehensive income",
            "beginning balance",
            "ending balance",
        ],
    }
}

/// Generic financial-document cues, shared across all types.
const SUPPORTING_INDICATORS: &[&str] = &[
    "audited",
    "consolidated",
    "for the year ended",
    "for the years ended",
    "fiscal year",
    "in thousands",
    "in millions",
    "notes to the financial statements",
    "annual report",
    "dollars",
];

// ── Number density ───────────────────────────────────────────────────────

/// "Financial-looking" numeric tokens: currency-prefixed amounts,
/// parenthesized negatives, comma-grouped numbers, percentages, and bare
/// numbers of 4+ digits. Alternative order matters — more specific shapes
/// first so `$1,234` is one token, not two.
static RE_FINANCIAL_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        [$€£¥]\s?\d[\d,]*(?:\.\d+)?        # currency-prefixed amount
      | \(\s?\d[\d,]*(?:\.\d+)?\s?\)       # parenthesized negative
      | \d{1,3}(?:,\d{3})+(?:\.\d+)?       # comma-grouped number
      | \d+(?:\.\d+)?\s?%                  # percentage
      | \d{4,}(?:\.\d+)?                   # bare number, 4+ digits
    ",
    )
    .unwrap()
});

/// Percentage of words on the page that are distinct financial-looking
/// numeric tokens.
pub(crate) fn number_density_pct(text: &str) -> f64 {
    let word_count = text.split_whitespace().count();
    if word_count == 0 {
        return 0.0;
    }
    let unique: HashSet<&str> = RE_FINANCIAL_NUMBER
        .find_iter(text)
        .map(|m| m.as_str())
        .collect();
    unique.len() as f64 / word_count as f64 * 100.0
}

/// Map a density percentage to its score contribution via fixed buckets.
pub(crate) fn density_score(pct: f64) -> f64 {
    if pct >= 30.0 {
        6.0
    } else if pct >= 20.0 {
        4.0
    } else if pct >= 15.0 {
        2.5
    } else if pct >= 10.0 {
        1.5
    } else if pct >= 7.0 {
        0.5
    } else if pct >= 5.0 {
        0.0
    } else if pct >= 3.0 {
        -1.0
    } else {
        -3.0
    }
}

// ── Scoring ──────────────────────────────────────────────────────────────

fn pattern_score(norm: &str, patterns: &[&str], weight: f64) -> f64 {
    patterns.iter().filter(|p| norm.contains(*p)).count() as f64 * weight
}

/// Normalise for pattern matching: lowercase, apostrophes stripped so
/// "Shareholders' Equity" matches "shareholders equity".
fn normalise(text: &str) -> String {
    text.to_lowercase().replace(['\'', '\u{2019}'], "")
}

/// Score one page. Pure and deterministic; never fails.
pub fn score_page(page: &Page) -> ClassificationScore {
    let trimmed_len = page.text.chars().filter(|c| !c.is_whitespace()).count();
    if trimmed_len < MIN_SCORABLE_CHARS {
        return ClassificationScore {
            page_num: page.page_num,
            statement_type: StatementType::ALL[0],
            score: 0.0,
            number_density_pct: 0.0,
            classified: false,
        };
    }

    let norm = normalise(&page.text);
    let support = pattern_score(&norm, SUPPORTING_INDICATORS, SUPPORT_WEIGHT);
    let density_pct = number_density_pct(&page.text);
    let density = density_score(density_pct);

    // Strictly-greater comparison: ties resolve to the earliest variant in
    // StatementType::ALL.
    let mut best_type = StatementType::ALL[0];
    let mut best_score = f64::NEG_INFINITY;
    for ty in StatementType::ALL {
        let score = pattern_score(&norm, title_patterns(ty), TITLE_WEIGHT)
            + pattern_score(&norm, line_item_patterns(ty), LINE_ITEM_WEIGHT)
            + support
            + density;
        if score > best_score {
            best_score = score;
            best_type = ty;
        }
    }

    ClassificationScore {
        page_num: page.page_num,
        statement_type: best_type,
        score: best_score,
        number_density_pct: density_pct,
        classified: best_score >= CLASSIFY_THRESHOLD,
    }
}

/// Score every page, preserving input order.
pub fn classify_pages(pages: &[Page]) -> Vec<ClassificationScore> {
    pages.iter().map(score_page).collect()
}

fn sort_ranked(ranked: &mut [RankedPage]) {
    // Stable sort: equal scores keep original page order.
    ranked.sort_by(|a, b| {
        b.score
            .score
            .partial_cmp(&a.score.score)
            .unwrap_or(Ordering::Equal)
    });
}

/// Score and rank pages: score descending, ties in original page order.
pub fn rank_pages(pages: Vec<Page>) -> Vec<RankedPage> {
    let mut ranked: Vec<RankedPage> = pages
        .into_iter()
        .map(|page| {
            let score = score_page(&page);
            RankedPage { page, score }
        })
        .collect();
    sort_ranked(&mut ranked);
    ranked
}

/// Rank pages, fanning scoring out over the blocking pool when the page
/// count warrants it. Scoring is CPU-bound, so large documents score on
/// `spawn_blocking` workers with bounded concurrency; the result is
/// identical to [`rank_pages`] either way.
pub(crate) async fn rank_pages_bounded(
    pages: Vec<Page>,
    config: &PipelineConfig,
) -> Vec<RankedPage> {
    if pages.len() < config.parallel_classify_threshold {
        return rank_pages(pages);
    }

    let shared = Arc::new(pages);
    let scored: Vec<(usize, ClassificationScore)> = stream::iter((0..shared.len()).map(|idx| {
        let pages = Arc::clone(&shared);
        async move {
            tokio::task::spawn_blocking(move || (idx, score_page(&pages[idx])))
                .await
                .ok()
        }
    }))
    .buffer_unordered(config.classify_concurrency)
    .filter_map(|res| async move { res })
    .collect()
    .await;

    let mut slots: Vec<Option<ClassificationScore>> = vec![None; shared.len()];
    for (idx, score) in scored {
        slots[idx] = Some(score);
    }

    let pages = Arc::try_unwrap(shared).unwrap_or_else(|arc| (*arc).clone());
    let mut ranked: Vec<RankedPage> = pages
        .into_iter()
        .zip(slots)
        .map(|(page, slot)| {
            // A worker that died (panicked task) falls back to inline scoring.
            let score = slot.unwrap_or_else(|| score_page(&page));
            RankedPage { page, score }
        })
        .collect();
    sort_ranked(&mut ranked);
    ranked
}
