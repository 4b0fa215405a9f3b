//! Boolean rule expressions over records
//!
//! Rules are built as expression trees and only rendered to SQL at the
//! reporting boundary, so the same rule definition drives both in-memory
//! verdicts and analytical queries. NULL follows SQL semantics throughout:
//! a comparison against a missing value never fires a rule.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::models::CleanRow;
use crate::schema::RecordSchema;

/// A boolean expression over one record, plus optional grouped context.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleExpr {
    /// Constant truth value.
    Always(bool),
    /// Every child expression holds.
    And(Vec<RuleExpr>),
    /// At least one child expression holds.
    Or(Vec<RuleExpr>),
    /// Numeric column strictly below a bound. Missing values never match.
    NumBelow { column: String, bound: i64 },
    /// Numeric column strictly above a bound. Missing values never match.
    NumAbove { column: String, bound: i64 },
    /// `left - right` strictly above a bound; both columns must be present.
    DiffAbove {
        left: String,
        right: String,
        bound: i64,
    },
    /// Column is missing (SQL NULL).
    IsNull { column: String },
    /// Column is missing or blank after trimming.
    IsBlank { column: String },
    /// Column is present (SQL NOT NULL).
    NotNull { column: String },
    /// Timestamp column falls on or after a calendar date.
    OnOrAfterDate { column: String, date: NaiveDate },
    /// Hour of day of a timestamp column lies outside `[start, end]`.
    HourOutside {
        column: String,
        start: u32,
        end: u32,
    },
    /// Days elapsed from one date column to another exceed a bound,
    /// counting fractional days.
    DaysBetweenAbove {
        from: String,
        to: String,
        days: i64,
    },
    /// The record belongs to a `(group, calendar day)` bucket holding more
    /// than `bound` records. The one rule shape that needs aggregation
    /// context instead of row-local fields.
    DailyCountAbove {
        key: String,
        group: String,
        date: String,
        bound: i64,
    },
}

impl RuleExpr {
    /// OR together `exprs`. Empty input yields a never-matching expression.
    #[must_use]
    pub fn any_of(mut exprs: Vec<RuleExpr>) -> Self {
        match exprs.len() {
            0 => Self::Always(false),
            1 => exprs.remove(0),
            _ => Self::Or(exprs),
        }
    }

    /// AND together `exprs`. Empty input yields an always-matching
    /// expression.
    #[must_use]
    pub fn all_of(mut exprs: Vec<RuleExpr>) -> Self {
        match exprs.len() {
            0 => Self::Always(true),
            1 => exprs.remove(0),
            _ => Self::And(exprs),
        }
    }

    /// Render the expression as a SQL predicate against `table`.
    #[must_use]
    pub fn to_sql(&self, table: &str) -> String {
        match self {
            Self::Always(true) => "1=1".to_string(),
            Self::Always(false) => "1=0".to_string(),
            Self::And(children) => {
                if children.is_empty() {
                    "1=1".to_string()
                } else {
                    children
                        .iter()
                        .map(|c| format!("({})", c.to_sql(table)))
                        .join(" AND ")
                }
            }
            Self::Or(children) => {
                if children.is_empty() {
                    "1=0".to_string()
                } else {
                    children
                        .iter()
                        .map(|c| format!("({})", c.to_sql(table)))
                        .join(" OR ")
                }
            }
            Self::NumBelow { column, bound } => format!("\"{column}\" < {bound}"),
            Self::NumAbove { column, bound } => format!("\"{column}\" > {bound}"),
            Self::DiffAbove { left, right, bound } => {
                format!("(\"{left}\" - \"{right}\") > {bound}")
            }
            Self::IsNull { column } => format!("\"{column}\" IS NULL"),
            Self::IsBlank { column } => {
                format!("(\"{column}\" IS NULL OR TRIM(\"{column}\") = '')")
            }
            Self::NotNull { column } => format!("\"{column}\" IS NOT NULL"),
            Self::OnOrAfterDate { column, date } => {
                format!("\"{column}\" >= '{}'", date.format("%Y-%m-%d"))
            }
            Self::HourOutside { column, start, end } => format!(
                "(CAST(strftime('%H', \"{column}\") AS INTEGER) < {start} \
                 OR CAST(strftime('%H', \"{column}\") AS INTEGER) > {end})"
            ),
            Self::DaysBetweenAbove { from, to, days } => {
                format!("(JULIANDAY(\"{to}\") - JULIANDAY(\"{from}\")) > {days}")
            }
            Self::DailyCountAbove {
                key,
                group,
                date,
                bound,
            } => format!(
                "\"{key}\" IN (SELECT \"{key}\" FROM \"{table}\" \
                 WHERE \"{group}\" IS NOT NULL \
                 AND (\"{group}\", DATE(\"{date}\")) IN (\
                 SELECT \"{group}\", DATE(\"{date}\") FROM \"{table}\" \
                 WHERE \"{group}\" IS NOT NULL \
                 GROUP BY \"{group}\", DATE(\"{date}\") \
                 HAVING COUNT(*) > {bound}))"
            ),
        }
    }

    /// Evaluate the expression against one record.
    #[must_use]
    pub fn evaluate(&self, record: &RecordView<'_>, ctx: &EvalContext) -> bool {
        match self {
            Self::Always(value) => *value,
            Self::And(children) => children.iter().all(|c| c.evaluate(record, ctx)),
            Self::Or(children) => children.iter().any(|c| c.evaluate(record, ctx)),
            Self::NumBelow { column, bound } => {
                record.get_int(column).is_some_and(|v| v < *bound)
            }
            Self::NumAbove { column, bound } => {
                record.get_int(column).is_some_and(|v| v > *bound)
            }
            Self::DiffAbove { left, right, bound } => {
                match (record.get_int(left), record.get_int(right)) {
                    (Some(l), Some(r)) => (l - r) > *bound,
                    _ => false,
                }
            }
            Self::IsNull { column } => record
                .get(column)
                .is_some_and(str::is_empty),
            Self::IsBlank { column } => record
                .get(column)
                .is_some_and(|v| v.trim().is_empty()),
            Self::NotNull { column } => record.get(column).is_some_and(|v| !v.is_empty()),
            Self::OnOrAfterDate { column, date } => record
                .get_datetime(column)
                .is_some_and(|dt| dt.date() >= *date),
            Self::HourOutside { column, start, end } => record
                .get_datetime(column)
                .is_some_and(|dt| dt.hour() < *start || dt.hour() > *end),
            Self::DaysBetweenAbove { from, to, days } => {
                match (record.get_datetime(from), record.get_datetime(to)) {
                    (Some(from_dt), Some(to_dt)) => {
                        let span = to_dt.signed_duration_since(from_dt);
                        span.num_seconds() as f64 / 86_400.0 > *days as f64
                    }
                    _ => false,
                }
            }
            Self::DailyCountAbove {
                group, date, bound, ..
            } => match (record.get_nonempty(group), record.get_datetime(date)) {
                (Some(group_value), Some(dt)) => {
                    ctx.daily_count(group_value, dt.date()) > *bound
                }
                _ => false,
            },
        }
    }

    /// Every column name the expression reads, deduplicated.
    #[must_use]
    pub fn required_columns(&self) -> Vec<&str> {
        fn collect<'a>(expr: &'a RuleExpr, out: &mut Vec<&'a str>) {
            match expr {
                RuleExpr::Always(_) => {}
                RuleExpr::And(children) | RuleExpr::Or(children) => {
                    for child in children {
                        collect(child, out);
                    }
                }
                RuleExpr::NumBelow { column, .. }
                | RuleExpr::NumAbove { column, .. }
                | RuleExpr::IsNull { column }
                | RuleExpr::IsBlank { column }
                | RuleExpr::NotNull { column }
                | RuleExpr::OnOrAfterDate { column, .. }
                | RuleExpr::HourOutside { column, .. } => out.push(column),
                RuleExpr::DiffAbove { left, right, .. } => {
                    out.push(left);
                    out.push(right);
                }
                RuleExpr::DaysBetweenAbove { from, to, .. } => {
                    out.push(from);
                    out.push(to);
                }
                RuleExpr::DailyCountAbove {
                    key, group, date, ..
                } => {
                    out.push(key);
                    out.push(group);
                    out.push(date);
                }
            }
        }

        let mut columns = Vec::new();
        collect(self, &mut columns);
        columns.into_iter().unique().collect_vec()
    }
}

/// A sanitized record paired with its schema for column lookup by name.
pub struct RecordView<'a> {
    schema: &'a RecordSchema,
    row: &'a CleanRow,
}

impl<'a> RecordView<'a> {
    /// View over `row`, whose values are in `schema` order.
    #[must_use]
    pub const fn new(schema: &'a RecordSchema, row: &'a CleanRow) -> Self {
        Self { schema, row }
    }

    /// Raw value of a column. `None` when the schema lacks the column;
    /// missing source values surface as the empty string.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.schema.index_of(column)?;
        self.row.values.get(idx).map(String::as_str)
    }

    fn get_nonempty(&self, column: &str) -> Option<&'a str> {
        self.get(column).filter(|v| !v.is_empty())
    }

    fn get_int(&self, column: &str) -> Option<i64> {
        self.get_nonempty(column)?.parse().ok()
    }

    fn get_datetime(&self, column: &str) -> Option<NaiveDateTime> {
        parse_datetime(self.get_nonempty(column)?)
    }
}

/// Aggregation context for rules that need grouped counts.
#[derive(Debug, Default)]
pub struct EvalContext {
    activity: FxHashMap<(String, NaiveDate), i64>,
}

impl EvalContext {
    /// Context with no aggregates; grouped rules never fire.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build per-group-per-day counts from a full pass over `rows`.
    #[must_use]
    pub fn with_activity(
        schema: &RecordSchema,
        rows: &[CleanRow],
        group_column: &str,
        date_column: &str,
    ) -> Self {
        let mut activity: FxHashMap<(String, NaiveDate), i64> = FxHashMap::default();
        for row in rows {
            let view = RecordView::new(schema, row);
            if let (Some(group), Some(dt)) = (
                view.get_nonempty(group_column),
                view.get_datetime(date_column),
            ) {
                *activity.entry((group.to_string(), dt.date())).or_insert(0) += 1;
            }
        }
        Self { activity }
    }

    fn daily_count(&self, group: &str, date: NaiveDate) -> i64 {
        self.activity
            .get(&(group.to_string(), date))
            .copied()
            .unwrap_or(0)
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse the timestamp formats seen in source exports. Bare dates parse
/// as midnight.
#[must_use]
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
