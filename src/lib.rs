//! # finstmt
//!
//! Extract consolidated financial statements from scanned documents using
//! Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Scanned filings mix narrative pages with the handful of pages that
//! actually carry the statements. Sending every page to a vision model is
//! slow and expensive, and per-page extractions disagree with each other.
//! This crate scores each page with a deterministic classifier, extracts
//! only the top-ranked statement pages through a rate-limit-aware
//! orchestrator, and consolidates the per-page results into one validated
//! statement — duplicates removed, conflicts resolved by confidence, and
//! the statement of equity folded into the balance sheet.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Page[]  (from the external renderer: page number, text layer, image)
//!  │
//!  ├─ 1. Classify    score pages per statement type, rank by score
//!  ├─ 2. Select      take the top-K classified pages
//!  ├─ 3. Extract     concurrent VLM calls with rate-limit retry/backoff
//!  ├─ 4. Collect     gather as completed, re-sort by page number
//!  └─ 5. Consolidate merge, deduplicate, validate, equity merge
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use finstmt::{extract_statements, Page, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Pages come from your renderer; provider auto-detected from
//!     // OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY.
//!     let pages: Vec<Page> = todo!("render the document");
//!     let config = PipelineConfig::default();
//!     let output = extract_statements(pages, &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&output.statement)?);
//!     eprintln!(
//!         "{}/{} pages extracted",
//!         output.stats.extracted_pages, output.stats.selected_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! A page failure never aborts the batch: each selected page yields an
//! [`ExtractionResult`] carrying either its statement or a [`PageError`],
//! and the run fails only when *zero* pages succeed
//! ([`PipelineError::PipelineExhausted`]). Arithmetic identities that fail
//! to reconcile are recorded in the consolidated statement's
//! `validation` list, never raised.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod run;
pub mod statement;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{ExtractError, PageError, PipelineError};
pub use output::{
    ConsolidatedStatement, ConsolidationInfo, ExtractionResult, PipelineOutput, RunStats,
    ValidationCheck, ValidationIdentity,
};
pub use pipeline::classify::{classify_pages, rank_pages, ClassificationScore, RankedPage};
pub use pipeline::consolidate::Consolidator;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback};
pub use provider::{ExtractionRequest, StatementExtractor, VisionExtractor};
pub use run::extract_statements;
pub use statement::{ExtractedStatement, LineItem, LineItemTree, Page, PageImage, StatementType};
pub use stream::{extract_stream, ExtractionStream};
