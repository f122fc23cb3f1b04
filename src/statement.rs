//! Core data model: pages, statement types, and extracted figures.
//!
//! Everything downstream of the classifier speaks in these types. The line
//! item tree is `category → field → LineItem`, held in `BTreeMap`s so that
//! merging and serialisation are deterministic — consolidation must produce
//! byte-identical output for identical inputs regardless of task scheduling.

use edgequake_llm::ImageData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Pages ────────────────────────────────────────────────────────────────

/// Opaque handle to a rendered page image.
///
/// The external Document Renderer produces one per page; the pipeline never
/// looks inside it, it only forwards it to the vision extraction service.
#[derive(Clone)]
pub struct PageImage(pub ImageData);

impl fmt::Debug for PageImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PageImage(..)")
    }
}

/// One page of a rendered document, as supplied by the external renderer.
///
/// `page_num` is 1-indexed. `text` is the renderer's raw text layer (OCR or
/// embedded); it drives classification. `image` drives extraction — a page
/// without one can still be classified but will fail extraction fast.
#[derive(Debug, Clone)]
pub struct Page {
    pub page_num: usize,
    pub text: String,
    pub image: Option<PageImage>,
}

impl Page {
    pub fn new(page_num: usize, text: impl Into<String>, image: Option<ImageData>) -> Self {
        Self {
            page_num,
            text: text.into(),
            image: image.map(PageImage),
        }
    }
}

// ── Statement types ──────────────────────────────────────────────────────

/// The four statement types a page can classify as.
///
/// Declaration order doubles as the tie-break order when two types score
/// equally on a page (an implementation-defined choice, not a semantic
/// priority).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
    Equity,
}

impl StatementType {
    /// All variants, in declaration (= tie-break) order.
    pub const ALL: [StatementType; 4] = [
        StatementType::BalanceSheet,
        StatementType::IncomeStatement,
        StatementType::CashFlow,
        StatementType::Equity,
    ];

    /// Stable snake_case identifier, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementType::BalanceSheet => "balance_sheet",
            StatementType::IncomeStatement => "income_statement",
            StatementType::CashFlow => "cash_flow",
            StatementType::Equity => "equity",
        }
    }

    /// Human-readable name, used in prompts and log lines.
    pub fn display_name(&self) -> &'static str {
        match self {
            StatementType::BalanceSheet => "Balance Sheet",
            StatementType::IncomeStatement => "Income Statement",
            StatementType::CashFlow => "Cash Flow Statement",
            StatementType::Equity => "Statement of Equity",
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ── Line items ───────────────────────────────────────────────────────────

/// One extracted figure with its comparative-year values.
///
/// `value` is the base-year (most recent) column. `years` holds the older
/// comparative columns keyed `year_1`, `year_2`, … in increasing age.
/// `confidence` is the service-supplied `[0, 1]` score used for conflict
/// resolution; `source` records provenance when a value was written by a
/// cross-statement merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub years: BTreeMap<String, f64>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl LineItem {
    pub fn new(value: f64, confidence: f64) -> Self {
        Self {
            value: Some(value),
            years: BTreeMap::new(),
            confidence,
            source: None,
        }
    }

    /// Comparative-year value under key `year_N`.
    pub fn with_year(mut self, key: impl Into<String>, value: f64) -> Self {
        self.years.insert(key.into(), value);
        self
    }

    /// How many columns this item populates (base year + comparatives).
    /// The completeness tie-break in consolidation compares this.
    pub fn populated_columns(&self) -> usize {
        usize::from(self.value.is_some()) + self.years.len()
    }
}

/// `category → field → LineItem`. Categories follow the extraction prompt's
/// canonical names ("assets", "liabilities", "equity", "revenue", …).
pub type LineItemTree = BTreeMap<String, BTreeMap<String, LineItem>>;

// ── Extracted statements ─────────────────────────────────────────────────

/// The vision extraction service's parsed response for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedStatement {
    pub statement_type: StatementType,
    /// Page-level confidence in `[0, 1]`, service-supplied.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub line_items: LineItemTree,
    /// Headline figures (totals) keyed by canonical metric name.
    #[serde(default)]
    pub summary_metrics: BTreeMap<String, f64>,
    /// Year labels seen on the page, most recent first.
    #[serde(default)]
    pub years_detected: Vec<String>,
    /// The primary (most recent) column's year label, if the page shows one.
    #[serde(default)]
    pub base_year: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl ExtractedStatement {
    pub fn new(statement_type: StatementType) -> Self {
        Self {
            statement_type,
            confidence: 0.0,
            line_items: LineItemTree::new(),
            summary_metrics: BTreeMap::new(),
            years_detected: Vec::new(),
            base_year: None,
            notes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_type_tie_break_order() {
        assert_eq!(StatementType::ALL[0], StatementType::BalanceSheet);
        assert_eq!(StatementType::ALL[3], StatementType::Equity);
    }

    #[test]
    fn statement_type_serde_is_snake_case() {
        let json = serde_json::to_string(&StatementType::BalanceSheet).unwrap();
        assert_eq!(json, "\"balance_sheet\"");
        let back: StatementType = serde_json::from_str("\"cash_flow\"").unwrap();
        assert_eq!(back, StatementType::CashFlow);
    }

    #[test]
    fn populated_columns_counts_base_and_comparatives() {
        let item = LineItem::new(100.0, 0.9)
            .with_year("year_1", 90.0)
            .with_year("year_2", 80.0);
        assert_eq!(item.populated_columns(), 3);

        let sparse = LineItem {
            value: None,
            years: BTreeMap::new(),
            confidence: 0.5,
            source: None,
        };
        assert_eq!(sparse.populated_columns(), 0);
    }

    #[test]
    fn line_item_missing_fields_default() {
        let item: LineItem = serde_json::from_str(r#"{"value": 42.0}"#).unwrap();
        assert_eq!(item.value, Some(42.0));
        assert!(item.years.is_empty());
        assert_eq!(item.confidence, 0.0);
    }
}
