//! System prompts for VLM-based financial statement extraction.
//!
//! Centralising every prompt here keeps the retry and parsing logic in
//! [`crate::provider`] free of prompt text, and lets unit tests inspect
//! prompts without spinning up a real VLM.

use crate::statement::StatementType;

/// Default system prompt for extracting structured data from a statement
/// page image. The response contract here must stay in sync with the wire
/// struct in [`crate::provider`].
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"You are an expert financial analyst. Your task is to read a scanned page of a financial statement and extract its figures as JSON.

Follow these rules precisely:

1. STRUCTURE
   - Respond with a single JSON object and nothing else
   - Top-level keys: "statement_type", "confidence", "line_items",
     "summary_metrics", "years_detected", "base_year", "notes"
   - "statement_type" is one of: "balance_sheet", "income_statement",
     "cash_flow", "equity"
   - "line_items" maps category -> field -> {"value", "confidence", "years"}

2. CATEGORIES
   - Balance sheet: "assets", "liabilities", "equity"
   - Income statement: "revenue", "expenses", "other"
   - Cash flow: "operating_activities", "investing_activities",
     "financing_activities"
   - Statement of equity: "equity"
   - Field names are snake_case, e.g. "accounts_receivable", "gross_profit"

3. VALUES
   - "value" is the most recent (primary) column as a plain number
   - "years" holds older comparative columns keyed "year_1", "year_2", ...
     in increasing age
   - Amounts in parentheses are negative
   - Strip currency symbols and thousands separators
   - Do NOT rescale: if the page says "in thousands", report the printed number

4. SUMMARY METRICS
   - Put statement totals in "summary_metrics" using these names when they
     appear: "total_assets", "total_liabilities", "total_equity",
     "total_revenue", "total_expenses", "net_income",
     "net_cash_from_operating", "net_cash_from_investing",
     "net_cash_from_financing", "net_change_in_cash"

5. CONFIDENCE
   - Per-item and page-level "confidence" are numbers in [0, 1]
   - Lower the confidence for smudged, truncated, or ambiguous figures

6. YEARS
   - "years_detected" lists the column year labels, most recent first
   - "base_year" is the most recent column's label

7. OUTPUT FORMAT
   - Output ONLY the JSON object
   - Do NOT wrap it in ```json fences
   - Do NOT add commentary"#;

/// Build the user-turn text for one page: the classifier's type hint plus
/// the renderer's raw text layer as cross-reference material.
///
/// The image carries the authoritative content; the text layer helps the
/// model resolve figures the scan renders poorly.
pub fn page_context(hint: StatementType, raw_text: &str) -> String {
    format!(
        "This page was classified as a {}. Extract its figures per the rules.\n\
         Raw text layer of the page for cross-reference:\n\"\"\"\n{}\n\"\"\"",
        hint, raw_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_all_statement_types() {
        for ty in StatementType::ALL {
            assert!(
                DEFAULT_EXTRACTION_PROMPT.contains(ty.as_str()),
                "prompt missing {}",
                ty.as_str()
            );
        }
    }

    #[test]
    fn page_context_includes_hint_and_text() {
        let ctx = page_context(StatementType::BalanceSheet, "Total assets 1,000");
        assert!(ctx.contains("Balance Sheet"));
        assert!(ctx.contains("Total assets 1,000"));
    }
}
