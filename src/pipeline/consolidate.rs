//! Consolidation: merge per-page extractions into one validated statement.
//!
//! Three ordered passes, each deterministic:
//!
//! 1. **Per-type merge** — successful extractions are grouped by statement
//!    type and merged key-by-key. A `(category, field)` pair seen again is
//!    either a duplicate (same value, dropped and counted) or a conflict
//!    (resolved by strictly higher confidence; equal confidence falls back
//!    to whichever instance populates more year columns).
//! 2. **Equity merge** — a statement-of-equity extraction folds into the
//!    balance sheet's equity section through a fixed field-alias table,
//!    with movement/flow fields excluded so only ending balances land on
//!    the balance sheet.
//! 3. **Validation** — cross-statement arithmetic identities are checked on
//!    the merged per-type views and recorded; a failed identity is
//!    informational, never fatal.
//!
//! The retained-value invariant holds throughout: for any key seen in more
//! than one source, the kept entry's confidence is at least every discarded
//! entry's confidence.

use crate::output::{
    ConsolidatedStatement, ConsolidationInfo, ExtractionResult, ValidationCheck,
    ValidationIdentity,
};
use crate::statement::{ExtractedStatement, LineItem, LineItemTree, StatementType};
use std::collections::BTreeMap;
use tracing::debug;

/// Provenance tag written on balance-sheet equity entries that came from a
/// statement of equity.
pub const EQUITY_SOURCE_TAG: &str = "Statement of Equity";

/// Equity-statement field names that are movements or flows rather than
/// ending balances. These never enter the balance sheet's equity section.
const MOVEMENT_FIELDS: &[&str] = &[
    "dividends_paid",
    "dividend_payments",
    "cash_dividends",
    "stock_issuance",
    "share_issuance",
    "stock_repurchase",
    "beginning_balance",
    "ending_balance",
    "net_income_for_period",
    "comprehensive_income",
    "foreign_currency_translation",
];

/// Merges `ExtractionResult`s into one [`ConsolidatedStatement`].
#[derive(Debug, Default)]
pub struct Consolidator;

impl Consolidator {
    pub fn new() -> Self {
        Self
    }

    /// Merge the successful results of a run. Failed results are ignored
    /// here — the caller keeps them in its failure manifest.
    ///
    /// The input is expected sorted by page number (the orchestrator
    /// guarantees it); consolidation re-sorts defensively so its output is
    /// a pure function of the result set.
    pub fn consolidate(&self, results: &[ExtractionResult]) -> ConsolidatedStatement {
        let mut successes: Vec<(usize, &ExtractedStatement)> = results
            .iter()
            .filter_map(|r| r.statement.as_ref().map(|s| (r.page_num, s)))
            .collect();
        successes.sort_by_key(|(page, _)| *page);

        let mut counters = MergeCounters::default();
        let mut notes = Vec::new();

        // Pass 1: merge per statement type.
        let mut views: BTreeMap<StatementType, TypeView> = BTreeMap::new();
        for (_, stmt) in &successes {
            let view = views.entry(stmt.statement_type).or_default();
            view.confidence = view.confidence.max(stmt.confidence);
            merge_tree(&mut view.tree, &stmt.line_items, &mut counters);
            for (key, value) in &stmt.summary_metrics {
                view.summary.entry(key.clone()).or_insert(*value);
            }
        }

        // Pass 2: fold the statement of equity into the balance sheet.
        if let Some(equity_view) = views.remove(&StatementType::Equity) {
            if let Some(bs_view) = views.get_mut(&StatementType::BalanceSheet) {
                let fields = flatten_fields(&equity_view.tree);
                let section = bs_view.tree.entry("equity".to_string()).or_default();
                let (applied, excluded) = merge_equity_section(section, &fields);
                debug!(
                    "equity merge: {} fields applied, {} movement fields excluded",
                    applied, excluded
                );
                notes.push(format!(
                    "merged {applied} equity-statement fields into the balance sheet \
                     equity section ({excluded} movement fields excluded)"
                ));
            } else {
                notes.push(
                    "no balance sheet extracted; statement of equity kept standalone".to_string(),
                );
                views.insert(StatementType::Equity, equity_view);
            }
        }

        // Pass 3: validate on the merged per-type views.
        let validation = run_validations(&views);

        // Final tree: views merged in declaration order, so on a summary
        // key collision (e.g. net_income from both income statement and
        // cash flow) the earlier statement type wins.
        let mut line_items = LineItemTree::new();
        let mut summary_metrics = BTreeMap::new();
        for ty in StatementType::ALL {
            if let Some(view) = views.get(&ty) {
                merge_tree(&mut line_items, &view.tree, &mut counters);
                for (key, value) in &view.summary {
                    summary_metrics.entry(key.clone()).or_insert(*value);
                }
            }
        }

        let (years_detected, base_year) = collect_years(&successes);
        let source_pages: Vec<usize> = successes.iter().map(|(page, _)| *page).collect();

        ConsolidatedStatement {
            line_items,
            summary_metrics,
            years_detected,
            base_year,
            info: ConsolidationInfo {
                source_pages,
                duplicates_removed: counters.duplicates,
                conflicts_resolved: counters.conflicts,
                validation,
                notes,
            },
        }
    }
}

// ── Key-level merge ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MergeCounters {
    duplicates: usize,
    conflicts: usize,
}

/// One statement type's merged view across its source pages.
#[derive(Debug, Default)]
struct TypeView {
    tree: LineItemTree,
    summary: BTreeMap<String, f64>,
    confidence: f64,
}

fn same_value(a: &LineItem, b: &LineItem) -> bool {
    match (a.value, b.value) {
        (Some(x), Some(y)) => (x - y).abs() < 1e-9,
        (None, None) => true,
        _ => false,
    }
}

fn merge_tree(dst: &mut LineItemTree, src: &LineItemTree, counters: &mut MergeCounters) {
    for (category, fields) in src {
        let dst_fields = dst.entry(category.clone()).or_default();
        for (field, incoming) in fields {
            merge_item(dst_fields, field, incoming, counters);
        }
    }
}

fn merge_item(
    dst: &mut BTreeMap<String, LineItem>,
    field: &str,
    incoming: &LineItem,
    counters: &mut MergeCounters,
) {
    let Some(existing) = dst.get_mut(field) else {
        dst.insert(field.to_string(), incoming.clone());
        return;
    };

    if same_value(existing, incoming) {
        // Duplicate. Keep one instance; its confidence must still dominate
        // the discarded one's.
        if incoming.confidence > existing.confidence {
            *existing = incoming.clone();
        }
        counters.duplicates += 1;
    } else if incoming.confidence > existing.confidence {
        *existing = incoming.clone();
        counters.conflicts += 1;
    } else if incoming.confidence < existing.confidence {
        counters.conflicts += 1;
    } else {
        // Equal confidence: last-resort completeness tie-break.
        if incoming.populated_columns() > existing.populated_columns() {
            *existing = incoming.clone();
        }
        counters.conflicts += 1;
    }
}

// ── Equity-into-balance-sheet merge ──────────────────────────────────────

/// Map an equity-statement field name onto its balance-sheet counterpart.
/// Unmapped names pass through unchanged.
fn equity_field_alias(name: &str) -> &str {
    match name {
        "capital_stock" | "common_stock" => "share_capital",
        "total_shareholders_equity" | "total_stockholders_equity" => "total_equity",
        "treasury_shares" => "treasury_stock",
        other => other,
    }
}

/// Whether a field names a movement/flow rather than an ending balance.
fn is_movement_field(name: &str) -> bool {
    MOVEMENT_FIELDS.contains(&name)
        || name.starts_with("beginning_")
        || name.starts_with("change_")
        || name.starts_with("movement_")
        || name.contains("_during_")
}

/// Collapse an equity statement's categories into one field map, resolving
/// in-statement duplicates by confidence.
fn flatten_fields(tree: &LineItemTree) -> BTreeMap<String, LineItem> {
    let mut fields: BTreeMap<String, LineItem> = BTreeMap::new();
    let mut counters = MergeCounters::default();
    for category_fields in tree.values() {
        for (field, item) in category_fields {
            merge_item(&mut fields, field, item, &mut counters);
        }
    }
    fields
}

/// Fold equity-statement fields into the balance sheet's equity section.
///
/// A field is written only when the section lacks it or the equity
/// statement's confidence is strictly higher; written entries carry
/// [`EQUITY_SOURCE_TAG`] for provenance. Returns `(applied, excluded)`.
fn merge_equity_section(
    section: &mut BTreeMap<String, LineItem>,
    fields: &BTreeMap<String, LineItem>,
) -> (usize, usize) {
    let mut applied = 0;
    let mut excluded = 0;

    for (name, item) in fields {
        // Exclusion applies to both spellings so an alias can never smuggle
        // a movement field in.
        let mapped = equity_field_alias(name);
        if is_movement_field(name) || is_movement_field(mapped) {
            excluded += 1;
            continue;
        }

        match section.get(mapped) {
            Some(existing) if existing.confidence >= item.confidence => {}
            _ => {
                let mut written = item.clone();
                written.source = Some(EQUITY_SOURCE_TAG.to_string());
                section.insert(mapped.to_string(), written);
                applied += 1;
            }
        }
    }

    (applied, excluded)
}

// ── Validation ───────────────────────────────────────────────────────────

/// Relative tolerance for the arithmetic identities: 0.5 % of the larger
/// magnitude, floored at 1.0 to absorb rounding on small statements.
fn approx_eq(a: f64, b: f64) -> bool {
    let tol = (a.abs().max(b.abs()) * 0.005).max(1.0);
    (a - b).abs() <= tol
}

/// Look a metric up by its candidate names: summary metrics first, then any
/// line item field with a base-year value.
fn find_metric(view: &TypeView, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(value) = view.summary.get(*key) {
            return Some(*value);
        }
    }
    for key in keys {
        for fields in view.tree.values() {
            if let Some(item) = fields.get(*key) {
                if let Some(value) = item.value {
                    return Some(value);
                }
            }
        }
    }
    None
}

fn check(identity: ValidationIdentity, passed: bool, detail: String) -> ValidationCheck {
    ValidationCheck {
        identity,
        passed,
        detail,
    }
}

/// Run every identity whose inputs resolve. Unresolvable identities are
/// skipped — "one entry per checked identity".
fn run_validations(views: &BTreeMap<StatementType, TypeView>) -> Vec<ValidationCheck> {
    let mut checks = Vec::new();
    let balance = views.get(&StatementType::BalanceSheet);
    let income = views.get(&StatementType::IncomeStatement);
    let cash = views.get(&StatementType::CashFlow);

    if let Some(view) = balance {
        let assets = find_metric(view, &["total_assets"]);
        let liabilities = find_metric(view, &["total_liabilities"]);
        let equity = find_metric(
            view,
            &[
                "total_equity",
                "total_shareholders_equity",
                "total_stockholders_equity",
            ],
        );
        if let (Some(a), Some(l), Some(e)) = (assets, liabilities, equity) {
            checks.push(check(
                ValidationIdentity::BalanceSheetEquation,
                approx_eq(a, l + e),
                format!("assets {a} vs liabilities + equity {}", l + e),
            ));
        }
    }

    let income_net = income.and_then(|view| find_metric(view, &["net_income", "net_profit"]));

    if let Some(view) = income {
        let revenue = find_metric(view, &["total_revenue", "revenue", "net_sales"]);
        let expenses = find_metric(view, &["total_expenses"]);
        if let (Some(r), Some(x), Some(n)) = (revenue, expenses, income_net) {
            checks.push(check(
                ValidationIdentity::IncomeStatementTotals,
                approx_eq(r - x, n),
                format!("revenue − expenses {} vs net income {n}", r - x),
            ));
        }
    }

    let cash_net = cash.and_then(|view| find_metric(view, &["net_income", "net_profit"]));

    if let Some(view) = cash {
        let operating = find_metric(view, &["net_cash_from_operating", "net_cash_from_operating_activities"]);
        let investing = find_metric(view, &["net_cash_from_investing", "net_cash_from_investing_activities"]);
        let financing = find_metric(view, &["net_cash_from_financing", "net_cash_from_financing_activities"]);
        let change = find_metric(view, &["net_change_in_cash", "net_increase_in_cash"]);
        if let (Some(o), Some(i), Some(f), Some(c)) = (operating, investing, financing, change) {
            checks.push(check(
                ValidationIdentity::CashFlowTotals,
                approx_eq(o + i + f, c),
                format!("activity sum {} vs net change in cash {c}", o + i + f),
            ));
        }
    }

    if let (Some(from_income), Some(from_cash)) = (income_net, cash_net) {
        checks.push(check(
            ValidationIdentity::NetIncomeConsistency,
            approx_eq(from_income, from_cash),
            format!("income statement {from_income} vs cash flow {from_cash}"),
        ));
    }

    checks
}

// ── Years ────────────────────────────────────────────────────────────────

/// Union of year labels in first-seen page order, and the base year from
/// the highest-confidence source that reports one (first on ties).
fn collect_years(successes: &[(usize, &ExtractedStatement)]) -> (Vec<String>, String) {
    let mut years: Vec<String> = Vec::new();
    for (_, stmt) in successes {
        for year in &stmt.years_detected {
            if !years.contains(year) {
                years.push(year.clone());
            }
        }
    }

    let mut best: Option<(f64, &str)> = None;
    for (_, stmt) in successes {
        if let Some(ref base) = stmt.base_year {
            if best.is_none_or(|(conf, _)| stmt.confidence > conf) {
                best = Some((stmt.confidence, base.as_str()));
            }
        }
    }

    (years, best.map(|(_, b)| b.to_string()).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(value: f64, confidence: f64) -> LineItem {
        LineItem::new(value, confidence)
    }

    fn stmt_with(
        ty: StatementType,
        confidence: f64,
        entries: &[(&str, &str, LineItem)],
    ) -> ExtractedStatement {
        let mut stmt = ExtractedStatement::new(ty);
        stmt.confidence = confidence;
        for (category, field, line_item) in entries {
            stmt.line_items
                .entry(category.to_string())
                .or_default()
                .insert(field.to_string(), line_item.clone());
        }
        stmt
    }

    fn result(page_num: usize, stmt: ExtractedStatement) -> ExtractionResult {
        ExtractionResult {
            page_num,
            statement_type: stmt.statement_type,
            statement: Some(stmt),
            retries: 0,
            duration_ms: 0,
            error: None,
        }
    }

    // ── Conflict resolution ──────────────────────────────────────────────

    #[test]
    fn higher_confidence_wins_conflicts() {
        let a = stmt_with(
            StatementType::BalanceSheet,
            0.9,
            &[("assets", "total_assets", item(1000.0, 0.7))],
        );
        let b = stmt_with(
            StatementType::BalanceSheet,
            0.9,
            &[("assets", "total_assets", item(1100.0, 0.9))],
        );

        let merged = Consolidator::new().consolidate(&[result(1, a), result(2, b)]);
        assert_eq!(merged.line_items["assets"]["total_assets"].value, Some(1100.0));
        assert_eq!(merged.info.conflicts_resolved, 1);
        assert_eq!(merged.info.duplicates_removed, 0);
    }

    #[test]
    fn higher_confidence_wins_regardless_of_page_order() {
        let a = stmt_with(
            StatementType::BalanceSheet,
            0.9,
            &[("assets", "total_assets", item(1100.0, 0.9))],
        );
        let b = stmt_with(
            StatementType::BalanceSheet,
            0.9,
            &[("assets", "total_assets", item(1000.0, 0.7))],
        );

        let merged = Consolidator::new().consolidate(&[result(1, a), result(2, b)]);
        assert_eq!(merged.line_items["assets"]["total_assets"].value, Some(1100.0));
        assert_eq!(merged.line_items["assets"]["total_assets"].confidence, 0.9);
    }

    #[test]
    fn identical_values_deduplicate() {
        let a = stmt_with(
            StatementType::BalanceSheet,
            0.9,
            &[("assets", "cash", item(500.0, 0.8))],
        );
        let b = stmt_with(
            StatementType::BalanceSheet,
            0.9,
            &[("assets", "cash", item(500.0, 0.6))],
        );

        let merged = Consolidator::new().consolidate(&[result(1, a), result(2, b)]);
        assert_eq!(merged.info.duplicates_removed, 1);
        assert_eq!(merged.info.conflicts_resolved, 0);
        // The retained instance's confidence dominates the discarded one's.
        assert_eq!(merged.line_items["assets"]["cash"].confidence, 0.8);
    }

    #[test]
    fn equal_confidence_prefers_more_year_columns() {
        let sparse = stmt_with(
            StatementType::BalanceSheet,
            0.9,
            &[("assets", "cash", item(500.0, 0.8))],
        );
        let complete = stmt_with(
            StatementType::BalanceSheet,
            0.9,
            &[(
                "assets",
                "cash",
                item(510.0, 0.8).with_year("year_1", 480.0).with_year("year_2", 450.0),
            )],
        );

        let merged =
            Consolidator::new().consolidate(&[result(1, sparse), result(2, complete)]);
        let kept = &merged.line_items["assets"]["cash"];
        assert_eq!(kept.value, Some(510.0));
        assert_eq!(kept.years.len(), 2);
        assert_eq!(merged.info.conflicts_resolved, 1);
    }

    // ── Equity merge ─────────────────────────────────────────────────────

    fn balance_sheet_page() -> ExtractedStatement {
        let mut stmt = stmt_with(
            StatementType::BalanceSheet,
            0.9,
            &[
                ("equity", "retained_earnings", item(4100.0, 0.85)),
                ("equity", "share_capital", item(2000.0, 0.9)),
            ],
        );
        stmt.summary_metrics.insert("total_assets".into(), 18_500.0);
        stmt
    }

    fn equity_page() -> ExtractedStatement {
        stmt_with(
            StatementType::Equity,
            0.8,
            &[
                ("equity", "common_stock", item(2100.0, 0.95)),
                ("equity", "treasury_shares", item(-300.0, 0.9)),
                ("equity", "dividends_paid", item(-900.0, 0.99)),
                ("equity", "beginning_balance", item(8000.0, 0.99)),
                ("equity", "change_in_reserves", item(150.0, 0.9)),
                ("equity", "issued_during_year", item(50.0, 0.9)),
                ("equity", "total_shareholders_equity", item(9200.0, 0.92)),
            ],
        )
    }

    #[test]
    fn movement_fields_never_enter_the_balance_sheet() {
        let merged = Consolidator::new()
            .consolidate(&[result(1, balance_sheet_page()), result(4, equity_page())]);
        let equity = &merged.line_items["equity"];
        for excluded in [
            "dividends_paid",
            "beginning_balance",
            "change_in_reserves",
            "issued_during_year",
        ] {
            assert!(
                !equity.contains_key(excluded),
                "movement field {excluded} leaked into balance sheet equity"
            );
        }
    }

    #[test]
    fn equity_fields_are_aliased_and_tagged() {
        let merged = Consolidator::new()
            .consolidate(&[result(1, balance_sheet_page()), result(4, equity_page())]);
        let equity = &merged.line_items["equity"];

        // common_stock (0.95) beats the balance sheet's share_capital (0.9).
        let share_capital = &equity["share_capital"];
        assert_eq!(share_capital.value, Some(2100.0));
        assert_eq!(share_capital.source.as_deref(), Some(EQUITY_SOURCE_TAG));

        // treasury_shares → treasury_stock, absent on the balance sheet.
        assert_eq!(equity["treasury_stock"].value, Some(-300.0));
        // total_shareholders_equity → total_equity.
        assert_eq!(equity["total_equity"].value, Some(9200.0));
    }

    #[test]
    fn balance_sheet_value_survives_lower_confidence_equity() {
        let mut equity = ExtractedStatement::new(StatementType::Equity);
        equity.confidence = 0.8;
        equity
            .line_items
            .entry("equity".into())
            .or_default()
            .insert("retained_earnings".into(), item(3900.0, 0.5));

        let merged = Consolidator::new()
            .consolidate(&[result(1, balance_sheet_page()), result(4, equity)]);
        let kept = &merged.line_items["equity"]["retained_earnings"];
        assert_eq!(kept.value, Some(4100.0));
        assert!(kept.source.is_none());
    }

    #[test]
    fn equity_without_balance_sheet_stays_standalone() {
        let merged = Consolidator::new().consolidate(&[result(4, equity_page())]);
        // Movement fields survive in the standalone case — the exclusion
        // rules guard only the balance-sheet merge.
        assert!(merged.line_items["equity"].contains_key("dividends_paid"));
        assert!(merged
            .info
            .notes
            .iter()
            .any(|n| n.contains("kept standalone")));
    }

    // ── Validation ───────────────────────────────────────────────────────

    fn full_balance_sheet(assets: f64, liabilities: f64, equity: f64) -> ExtractedStatement {
        let mut stmt = ExtractedStatement::new(StatementType::BalanceSheet);
        stmt.confidence = 0.9;
        stmt.summary_metrics.insert("total_assets".into(), assets);
        stmt.summary_metrics
            .insert("total_liabilities".into(), liabilities);
        stmt.summary_metrics.insert("total_equity".into(), equity);
        stmt
    }

    fn full_income_statement(revenue: f64, expenses: f64, net: f64) -> ExtractedStatement {
        let mut stmt = ExtractedStatement::new(StatementType::IncomeStatement);
        stmt.confidence = 0.9;
        stmt.summary_metrics.insert("total_revenue".into(), revenue);
        stmt.summary_metrics.insert("total_expenses".into(), expenses);
        stmt.summary_metrics.insert("net_income".into(), net);
        stmt
    }

    fn full_cash_flow(o: f64, i: f64, f: f64, change: f64, net: f64) -> ExtractedStatement {
        let mut stmt = ExtractedStatement::new(StatementType::CashFlow);
        stmt.confidence = 0.9;
        stmt.summary_metrics.insert("net_cash_from_operating".into(), o);
        stmt.summary_metrics.insert("net_cash_from_investing".into(), i);
        stmt.summary_metrics.insert("net_cash_from_financing".into(), f);
        stmt.summary_metrics.insert("net_change_in_cash".into(), change);
        stmt.summary_metrics.insert("net_income".into(), net);
        stmt
    }

    fn find_check(
        merged: &ConsolidatedStatement,
        identity: ValidationIdentity,
    ) -> Option<&ValidationCheck> {
        merged.info.validation.iter().find(|c| c.identity == identity)
    }

    #[test]
    fn all_identities_checked_when_inputs_resolve() {
        let merged = Consolidator::new().consolidate(&[
            result(1, full_balance_sheet(18_500.0, 9_300.0, 9_200.0)),
            result(2, full_income_statement(22_000.0, 19_500.0, 2_500.0)),
            result(3, full_cash_flow(4_100.0, -1_900.0, -600.0, 1_600.0, 2_500.0)),
        ]);

        assert_eq!(merged.info.validation.len(), 4);
        for check in &merged.info.validation {
            assert!(check.passed, "{:?} failed: {}", check.identity, check.detail);
        }
    }

    #[test]
    fn failed_identity_is_recorded_not_fatal() {
        let merged = Consolidator::new().consolidate(&[result(
            1,
            full_balance_sheet(18_500.0, 9_300.0, 5_000.0),
        )]);
        let check = find_check(&merged, ValidationIdentity::BalanceSheetEquation).unwrap();
        assert!(!check.passed);
        assert!(check.detail.contains("18500"));
    }

    #[test]
    fn unresolvable_identities_are_skipped() {
        // An income statement alone can check its own totals but nothing
        // cross-statement.
        let merged = Consolidator::new().consolidate(&[result(
            1,
            full_income_statement(22_000.0, 19_500.0, 2_500.0),
        )]);
        assert_eq!(merged.info.validation.len(), 1);
        assert_eq!(
            merged.info.validation[0].identity,
            ValidationIdentity::IncomeStatementTotals
        );
    }

    #[test]
    fn net_income_mismatch_fails_consistency() {
        let merged = Consolidator::new().consolidate(&[
            result(1, full_income_statement(22_000.0, 19_500.0, 2_500.0)),
            result(2, full_cash_flow(4_100.0, -1_900.0, -600.0, 1_600.0, 3_100.0)),
        ]);
        let check = find_check(&merged, ValidationIdentity::NetIncomeConsistency).unwrap();
        assert!(!check.passed);
    }

    #[test]
    fn validation_tolerates_rounding() {
        assert!(approx_eq(1000.0, 1000.9));
        assert!(approx_eq(100_000.0, 100_400.0));
        assert!(!approx_eq(100_000.0, 101_000.0));
        assert!(!approx_eq(1000.0, 1010.0));
    }

    // ── Years & metadata ─────────────────────────────────────────────────

    #[test]
    fn years_union_preserves_first_seen_order() {
        let mut a = full_balance_sheet(100.0, 60.0, 40.0);
        a.years_detected = vec!["2024".into(), "2023".into()];
        a.base_year = Some("2024".into());
        a.confidence = 0.7;

        let mut b = full_income_statement(10.0, 8.0, 2.0);
        b.years_detected = vec!["2023".into(), "2022".into()];
        b.base_year = Some("2023".into());
        b.confidence = 0.9;

        let merged = Consolidator::new().consolidate(&[result(1, a), result(2, b)]);
        assert_eq!(merged.years_detected, ["2024", "2023", "2022"]);
        // Highest-confidence source supplies the base year.
        assert_eq!(merged.base_year, "2023");
    }

    #[test]
    fn missing_base_year_is_empty_not_absent() {
        let merged =
            Consolidator::new().consolidate(&[result(1, full_balance_sheet(1.0, 1.0, 0.0))]);
        assert_eq!(merged.base_year, "");
        assert!(merged.years_detected.is_empty());
    }

    #[test]
    fn source_pages_ascend_regardless_of_result_order() {
        let merged = Consolidator::new().consolidate(&[
            result(5, full_income_statement(10.0, 8.0, 2.0)),
            result(2, full_balance_sheet(100.0, 60.0, 40.0)),
        ]);
        assert_eq!(merged.info.source_pages, [2, 5]);
    }

    #[test]
    fn income_statement_net_income_wins_summary_collision() {
        let merged = Consolidator::new().consolidate(&[
            result(1, full_income_statement(22_000.0, 19_500.0, 2_500.0)),
            result(2, full_cash_flow(4_100.0, -1_900.0, -600.0, 1_600.0, 9_999.0)),
        ]);
        // Declaration order: IncomeStatement before CashFlow.
        assert_eq!(merged.summary_metrics["net_income"], 2_500.0);
    }

    #[test]
    fn failed_results_contribute_nothing() {
        let failed = ExtractionResult {
            page_num: 9,
            statement_type: StatementType::CashFlow,
            statement: None,
            retries: 2,
            duration_ms: 10,
            error: Some(crate::error::PageError::Exhausted {
                page: 9,
                retries: 2,
                detail: "429".into(),
            }),
        };
        let merged = Consolidator::new()
            .consolidate(&[result(1, full_balance_sheet(100.0, 60.0, 40.0)), failed]);
        assert_eq!(merged.info.source_pages, [1]);
    }
}
