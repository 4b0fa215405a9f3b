//! Aggregate error summaries over the analytical table
//!
//! Renders a [`RuleSet`] into grouped SQL: one count per rule, plus
//! records-with-any-error and clean-approved totals per grouping value.
//! Per-rule counts are independent, so a record violating two rules adds
//! one to each rule column but only one to `records_with_any_error`.

use itertools::Itertools;
use rusqlite::Connection;

use super::RuleSet;
use super::expr::RuleExpr;
use crate::error::Result;

const APPROVED: &str = "Approved";

/// One summary row per grouping value.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSummaryRow {
    /// Grouping value, e.g. a state name. `None` for ungrouped rows.
    pub group: Option<String>,
    /// Records in the group.
    pub total_records: i64,
    /// `(rule name, fired count)` in registry order.
    pub rule_counts: Vec<(String, i64)>,
    /// Records where at least one rule fired.
    pub records_with_any_error: i64,
    /// Approved records with at least one fired rule.
    pub errors_approved: i64,
    /// Approved records with no fired rule.
    pub records_clean_and_approved: i64,
}

/// One quality-metric row per grouping value.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityRow {
    /// Grouping value.
    pub group: Option<String>,
    /// Records in the group.
    pub total_records: i64,
    /// Percentage of records with any fired rule, rounded to 2 decimals.
    pub error_rate: f64,
    /// Percentage of approved records that are clean. `None` when the
    /// group has no approved records at all.
    pub clean_approval_rate: Option<f64>,
}

fn count_when(predicate: &str) -> String {
    format!("SUM(CASE WHEN {predicate} THEN 1 ELSE 0 END)")
}

/// Grouped error-summary SQL for `rules` over `table`.
#[must_use]
pub fn error_summary_query(rules: &RuleSet, table: &str, group_column: &str) -> String {
    let any_error = combined_sql(rules, table);
    let rule_columns = rules
        .rules()
        .iter()
        .map(|rule| {
            format!(
                "{} AS \"{}\"",
                count_when(&rule.expr.to_sql(table)),
                rule.name
            )
        })
        .join(", ");

    format!(
        "SELECT \"{group_column}\", COUNT(*) AS total_records, {rule_columns}, \
         {any} AS records_with_any_error, \
         {errors_approved} AS errors_approved, \
         {clean_approved} AS records_clean_and_approved \
         FROM \"{table}\" GROUP BY \"{group_column}\" ORDER BY \"{group_column}\"",
        any = count_when(&format!("({any_error})")),
        errors_approved = count_when(&format!(
            "approval_status_desc = '{APPROVED}' AND ({any_error})"
        )),
        clean_approved = count_when(&format!(
            "approval_status_desc = '{APPROVED}' AND NOT ({any_error})"
        )),
    )
}

/// Run the grouped error summary and collect typed rows.
///
/// # Errors
/// Returns an error when the query fails, e.g. when the table is missing a
/// column the rules reference. Use [`RuleSet::for_columns`] first to drop
/// such rules.
pub fn run_error_summary(
    conn: &Connection,
    rules: &RuleSet,
    table: &str,
    group_column: &str,
) -> Result<Vec<ErrorSummaryRow>> {
    let sql = error_summary_query(rules, table, group_column);
    log::debug!("Error summary query: {sql}");
    let rule_count = rules.rules().len();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            let mut rule_counts = Vec::with_capacity(rule_count);
            for (offset, rule) in rules.rules().iter().enumerate() {
                rule_counts.push((rule.name.to_string(), row.get(2 + offset)?));
            }
            Ok(ErrorSummaryRow {
                group: row.get(0)?,
                total_records: row.get(1)?,
                rule_counts,
                records_with_any_error: row.get(2 + rule_count)?,
                errors_approved: row.get(3 + rule_count)?,
                records_clean_and_approved: row.get(4 + rule_count)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Grouped quality-metric SQL: error rate and clean-approval rate.
#[must_use]
pub fn quality_query(rules: &RuleSet, table: &str, group_column: &str) -> String {
    let any_error = combined_sql(rules, table);
    format!(
        "SELECT \"{group_column}\", COUNT(*) AS total_records, \
         ROUND({errors} * 100.0 / COUNT(*), 2) AS error_rate, \
         ROUND({clean_approved} * 100.0 / NULLIF({approved}, 0), 2) AS clean_approval_rate \
         FROM \"{table}\" GROUP BY \"{group_column}\" ORDER BY \"{group_column}\"",
        errors = count_when(&format!("({any_error})")),
        clean_approved = count_when(&format!(
            "approval_status_desc = '{APPROVED}' AND NOT ({any_error})"
        )),
        approved = count_when(&format!("approval_status_desc = '{APPROVED}'")),
    )
}

/// Run the quality metrics and collect typed rows.
///
/// # Errors
/// Returns an error when the query fails.
pub fn run_quality(
    conn: &Connection,
    rules: &RuleSet,
    table: &str,
    group_column: &str,
) -> Result<Vec<QualityRow>> {
    let sql = quality_query(rules, table, group_column);
    log::debug!("Quality query: {sql}");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(QualityRow {
                group: row.get(0)?,
                total_records: row.get(1)?,
                error_rate: row.get(2)?,
                clean_approval_rate: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn combined_sql(rules: &RuleSet, table: &str) -> String {
    RuleExpr::any_of(rules.rules().iter().map(|r| r.expr.clone()).collect()).to_sql(table)
}
