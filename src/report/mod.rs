//! Registration statistics over the analytical table
//!
//! Periodic reporting metrics, computed from the extracted SQLite table
//! rather than the operational source. Each metric is one grouped query
//! with a typed result row; the optional [`DateRange`] restricts every
//! metric to a registration-date window.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::error::Result;
use crate::validate::RuleSet;
use crate::validate::expr::RuleExpr;

const APPROVED: &str = "Approved";

/// Inclusive registration-date window for report queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First registration date included.
    pub start: NaiveDate,
    /// Last registration date included.
    pub end: NaiveDate,
}

impl DateRange {
    /// Window covering `start` through `end`, inclusive.
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    fn where_clause(filter: Option<&Self>) -> String {
        match filter {
            // The upper bound gets a time suffix so timestamp-valued
            // registration dates on the last day stay inside the window.
            Some(range) => format!(
                "WHERE \"Date_Registerred\" BETWEEN '{}' AND '{} 23:59:59'",
                range.start.format("%Y-%m-%d"),
                range.end.format("%Y-%m-%d")
            ),
            None => String::new(),
        }
    }
}

/// Headline totals for one reporting period.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationStats {
    /// Registrations in the window.
    pub total_registrations: i64,
    /// Distinct registrars who recorded them.
    pub total_registrars: i64,
    /// Distinct registration centers.
    pub total_centers: i64,
    /// Distinct local government areas.
    pub total_lgas: i64,
    /// Registered male children.
    pub male_count: i64,
    /// Registered female children.
    pub female_count: i64,
    /// Approved records.
    pub approved_count: i64,
    /// Queried records.
    pub queried_count: i64,
    /// Pending records, including those with no recorded status.
    pub pending_count: i64,
    /// Mean days from birth to registration, rounded. `None` when no
    /// record has both dates.
    pub avg_delay: Option<f64>,
}

/// One row of the month-by-month trend.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTrendRow {
    /// Month in `YYYY-MM` form.
    pub month: String,
    /// Registrations that month.
    pub registrations: i64,
    /// Distinct registrars that month.
    pub registrars: i64,
    /// Registered male children.
    pub male_count: i64,
    /// Registered female children.
    pub female_count: i64,
    /// Approved records.
    pub approved_count: i64,
    /// Mean days from birth to registration, rounded.
    pub avg_delay: Option<f64>,
}

/// Per-center workload, approval and error figures.
#[derive(Debug, Clone, PartialEq)]
pub struct CenterPerformanceRow {
    /// Registration center name.
    pub center: Option<String>,
    /// State the center belongs to.
    pub state: Option<String>,
    /// Local government area of the center.
    pub lga: Option<String>,
    /// Registrations at the center.
    pub total_registrations: i64,
    /// Distinct registrars at the center.
    pub registrars: i64,
    /// Approved records.
    pub approved_count: i64,
    /// Mean days from birth to registration, rounded.
    pub avg_delay: Option<f64>,
    /// Records flagged by any validation rule.
    pub error_count: i64,
}

fn count_when(predicate: &str) -> String {
    format!("SUM(CASE WHEN {predicate} THEN 1 ELSE 0 END)")
}

const AVG_DELAY: &str =
    "ROUND(AVG(JULIANDAY(\"Date_Registerred\") - JULIANDAY(\"child_birth_date\")))";

/// Compute the headline totals for a period.
///
/// # Errors
/// Returns an error when the query fails.
pub fn registration_stats(
    conn: &Connection,
    table: &str,
    filter: Option<&DateRange>,
) -> Result<RegistrationStats> {
    let sql = format!(
        "SELECT COUNT(*), \
         COUNT(DISTINCT \"registered_by_nin\"), \
         COUNT(DISTINCT \"registration_center\"), \
         COUNT(DISTINCT \"registration_center_lga\"), \
         {male}, {female}, {approved}, {queried}, {pending}, {AVG_DELAY} \
         FROM \"{table}\" {where_clause}",
        male = count_when("child_sex = 'MALE'"),
        female = count_when("child_sex = 'FEMALE'"),
        approved = count_when(&format!("approval_status_desc = '{APPROVED}'")),
        queried = count_when("approval_status_desc = 'Queried'"),
        pending = count_when(
            "approval_status_desc = 'Pending' OR approval_status_desc IS NULL"
        ),
        where_clause = DateRange::where_clause(filter),
    );
    log::debug!("Registration stats query: {sql}");

    let stats = conn.query_row(&sql, [], |row| {
        Ok(RegistrationStats {
            total_registrations: row.get(0)?,
            total_registrars: row.get(1)?,
            total_centers: row.get(2)?,
            total_lgas: row.get(3)?,
            male_count: row.get(4)?,
            female_count: row.get(5)?,
            approved_count: row.get(6)?,
            queried_count: row.get(7)?,
            pending_count: row.get(8)?,
            avg_delay: row.get(9)?,
        })
    })?;
    Ok(stats)
}

/// Month-by-month registration trend, ascending by month.
///
/// # Errors
/// Returns an error when the query fails.
pub fn monthly_trend(
    conn: &Connection,
    table: &str,
    filter: Option<&DateRange>,
) -> Result<Vec<MonthlyTrendRow>> {
    let sql = format!(
        "SELECT strftime('%Y-%m', \"Date_Registerred\") AS month, COUNT(*), \
         COUNT(DISTINCT \"registered_by_nin\"), \
         {male}, {female}, {approved}, {AVG_DELAY} \
         FROM \"{table}\" {where_clause} GROUP BY month ORDER BY month",
        male = count_when("child_sex = 'MALE'"),
        female = count_when("child_sex = 'FEMALE'"),
        approved = count_when(&format!("approval_status_desc = '{APPROVED}'")),
        where_clause = DateRange::where_clause(filter),
    );
    log::debug!("Monthly trend query: {sql}");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MonthlyTrendRow {
                month: row.get(0)?,
                registrations: row.get(1)?,
                registrars: row.get(2)?,
                male_count: row.get(3)?,
                female_count: row.get(4)?,
                approved_count: row.get(5)?,
                avg_delay: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Per-center performance, busiest centers first. The error count uses the
/// combined predicate of `rules`.
///
/// # Errors
/// Returns an error when the query fails.
pub fn center_performance(
    conn: &Connection,
    rules: &RuleSet,
    table: &str,
    filter: Option<&DateRange>,
) -> Result<Vec<CenterPerformanceRow>> {
    let any_error =
        RuleExpr::any_of(rules.rules().iter().map(|r| r.expr.clone()).collect()).to_sql(table);
    let sql = format!(
        "SELECT \"registration_center\", \"registration_center_state\", \
         \"registration_center_lga\", COUNT(*) AS total_registrations, \
         COUNT(DISTINCT \"registered_by_nin\"), \
         {approved}, {AVG_DELAY}, {errors} \
         FROM \"{table}\" {where_clause} \
         GROUP BY \"registration_center\", \"registration_center_state\", \
         \"registration_center_lga\" \
         ORDER BY total_registrations DESC",
        approved = count_when(&format!("approval_status_desc = '{APPROVED}'")),
        errors = count_when(&format!("({any_error})")),
        where_clause = DateRange::where_clause(filter),
    );
    log::debug!("Center performance query: {sql}");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CenterPerformanceRow {
                center: row.get(0)?,
                state: row.get(1)?,
                lga: row.get(2)?,
                total_registrations: row.get(3)?,
                registrars: row.get(4)?,
                approved_count: row.get(5)?,
                avg_delay: row.get(6)?,
                error_count: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
