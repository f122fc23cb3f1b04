//! Output types: per-page extraction results, the consolidated statement,
//! and run statistics.
//!
//! A run's partial failures are never discarded: every attempted page gets
//! an [`ExtractionResult`] whether it succeeded or not, and the full list is
//! returned alongside the consolidated statement so callers can report the
//! failure manifest.

use crate::error::PageError;
use crate::statement::{ExtractedStatement, LineItemTree, StatementType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of attempting extraction for a single page.
///
/// `statement` is populated on success, `error` on failure — never both.
/// A result always traces back to a ranked page that was selected for
/// extraction; `page_num` is that page's number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub page_num: usize,
    /// The classifier's winning type for this page (the extraction hint).
    pub statement_type: StatementType,
    pub statement: Option<ExtractedStatement>,
    /// Retries actually performed before this outcome.
    pub retries: u8,
    pub duration_ms: u64,
    pub error: Option<PageError>,
}

impl ExtractionResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

// ── Validation ───────────────────────────────────────────────────────────

/// The cross-statement arithmetic identities consolidation checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIdentity {
    /// Assets == Liabilities + Equity.
    BalanceSheetEquation,
    /// Revenue − Expenses ≈ Net income.
    IncomeStatementTotals,
    /// Operating + Investing + Financing ≈ Net change in cash.
    CashFlowTotals,
    /// Net income agrees between income statement and cash flow.
    NetIncomeConsistency,
}

impl ValidationIdentity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationIdentity::BalanceSheetEquation => "balance_sheet_equation",
            ValidationIdentity::IncomeStatementTotals => "income_statement_totals",
            ValidationIdentity::CashFlowTotals => "cash_flow_totals",
            ValidationIdentity::NetIncomeConsistency => "net_income_consistency",
        }
    }
}

/// Outcome of one identity check. A failed check is informational — it
/// never aborts the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub identity: ValidationIdentity,
    pub passed: bool,
    pub detail: String,
}

// ── Consolidated statement ───────────────────────────────────────────────

/// Bookkeeping for one consolidation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidationInfo {
    /// Pages whose extraction contributed, ascending.
    pub source_pages: Vec<usize>,
    /// Same-key entries dropped because their value matched a kept entry.
    pub duplicates_removed: usize,
    /// Same-key entries with differing values resolved by confidence.
    pub conflicts_resolved: usize,
    /// One entry per checked identity; unresolvable identities are skipped.
    pub validation: Vec<ValidationCheck>,
    pub notes: Vec<String>,
}

/// The pipeline's terminal output: one merged statement per run.
///
/// `years_detected` and `base_year` are always present (possibly empty) —
/// the downstream report exporter relies on them for its year-mapping
/// header row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedStatement {
    pub line_items: LineItemTree,
    pub summary_metrics: BTreeMap<String, f64>,
    /// Year labels across all source pages, first-seen order.
    pub years_detected: Vec<String>,
    /// Primary column's year label, or empty when no page reported one.
    pub base_year: String,
    pub info: ConsolidationInfo,
}

impl ConsolidatedStatement {
    /// Year labels for the exporter's header row, capped at 4 columns.
    pub fn year_columns(&self) -> &[String] {
        let n = self.years_detected.len().min(4);
        &self.years_detected[..n]
    }
}

// ── Run statistics & output ──────────────────────────────────────────────

/// Aggregate statistics for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages handed to the classifier.
    pub total_pages: usize,
    /// Pages that scored at or above the classification threshold.
    pub classified_pages: usize,
    /// Pages selected for extraction (top-K of the ranking).
    pub selected_pages: usize,
    /// Selected pages that extracted successfully.
    pub extracted_pages: usize,
    /// Selected pages that failed extraction.
    pub failed_pages: usize,
    pub classify_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a run produced: the consolidated statement, every per-page
/// result (the failure manifest lives here), the full ranking, and stats.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub statement: ConsolidatedStatement,
    /// All attempted extractions, sorted by page number.
    pub results: Vec<ExtractionResult>,
    /// Classification scores for every input page, ranking order.
    pub rankings: Vec<crate::pipeline::classify::ClassificationScore>,
    pub stats: RunStats,
}

impl PipelineOutput {
    /// The failed extractions, for post-run reporting.
    pub fn failures(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.results.iter().filter(|r| !r.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consolidated_with_years(years: &[&str]) -> ConsolidatedStatement {
        ConsolidatedStatement {
            line_items: LineItemTree::new(),
            summary_metrics: BTreeMap::new(),
            years_detected: years.iter().map(|s| s.to_string()).collect(),
            base_year: years.first().unwrap_or(&"").to_string(),
            info: ConsolidationInfo::default(),
        }
    }

    #[test]
    fn year_columns_caps_at_four() {
        let s = consolidated_with_years(&["2024", "2023", "2022", "2021", "2020", "2019"]);
        assert_eq!(s.year_columns(), ["2024", "2023", "2022", "2021"]);
    }

    #[test]
    fn year_columns_handles_empty() {
        let s = consolidated_with_years(&[]);
        assert!(s.year_columns().is_empty());
        assert_eq!(s.base_year, "");
    }

    #[test]
    fn validation_identity_names() {
        assert_eq!(
            ValidationIdentity::BalanceSheetEquation.as_str(),
            "balance_sheet_equation"
        );
        assert_eq!(
            ValidationIdentity::NetIncomeConsistency.as_str(),
            "net_income_consistency"
        );
    }
}
