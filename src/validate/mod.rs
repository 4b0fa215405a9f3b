//! Declarative data-quality rules for extracted records
//!
//! A [`RuleSet`] is an immutable registry of named boolean checks, built
//! once from a [`Thresholds`] value and passed explicitly to whatever
//! compiles or evaluates predicates. Rules classify records, never mutate
//! them; a record's verdict is always recomputed from the current rules and
//! the current record content.
//!
//! Each rule carries a structured [`RuleExpr`], so the same definition
//! drives row-local verdicts in memory and SQL predicates against the
//! analytical table.

pub mod expr;
pub mod summary;
pub mod thresholds;

use itertools::Itertools;
use smallvec::SmallVec;

use crate::error::{ExtractError, Result};
use expr::{EvalContext, RecordView, RuleExpr};
use thresholds::Thresholds;

/// Rule grouping used for category-level compilation and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    /// Parent-age plausibility bounds.
    Age,
    /// Timing of the registration act itself.
    Time,
    /// Registrar throughput anomalies; needs grouped context.
    Activity,
    /// Required fields present and non-blank.
    Completeness,
}

impl RuleCategory {
    /// All categories, in summary order.
    pub const ALL: [Self; 4] = [Self::Age, Self::Time, Self::Activity, Self::Completeness];

    /// Selector name of the category.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Age => "age_checks",
            Self::Time => "time_checks",
            Self::Activity => "activity_checks",
            Self::Completeness => "completeness_checks",
        }
    }

    /// Parse a selector name back into a category.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// One named boolean check over a record.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Stable snake_case identifier, used as SQL alias and verdict label.
    pub name: &'static str,
    /// Category the rule belongs to.
    pub category: RuleCategory,
    /// Predicate that fires the rule.
    pub expr: RuleExpr,
}

/// Per-record classification: which rules fired, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityVerdict {
    /// Whether at least one rule fired.
    pub has_issues: bool,
    /// Names of the rules that fired, in registry order.
    pub fired: SmallVec<[&'static str; 4]>,
}

/// Immutable registry of validation rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// The standard birth-registration rules, parameterized by `thresholds`.
    #[must_use]
    pub fn with_defaults(thresholds: &Thresholds) -> Self {
        let t = thresholds;
        let mut outside_hours = vec![
            RuleExpr::NotNull {
                column: "initiated_at".to_string(),
            },
            RuleExpr::HourOutside {
                column: "initiated_at".to_string(),
                start: t.work_hours_start,
                end: t.work_hours_end,
            },
        ];
        if let Some(cutover) = t.outside_hours_start_date {
            // The timestamp field did not exist before the cutover, so
            // earlier records are exempt rather than suspicious.
            outside_hours.insert(
                0,
                RuleExpr::OnOrAfterDate {
                    column: "initiated_at".to_string(),
                    date: cutover,
                },
            );
        }

        let rules = vec![
            Rule {
                name: "mother_underage",
                category: RuleCategory::Age,
                expr: RuleExpr::NumBelow {
                    column: "mother_age_at_birth".to_string(),
                    bound: t.mother_min_age,
                },
            },
            Rule {
                name: "mother_overage",
                category: RuleCategory::Age,
                expr: RuleExpr::NumAbove {
                    column: "mother_age_at_birth".to_string(),
                    bound: t.mother_max_age,
                },
            },
            Rule {
                name: "father_underage",
                category: RuleCategory::Age,
                expr: RuleExpr::NumBelow {
                    column: "father_age_at_birth".to_string(),
                    bound: t.father_min_age,
                },
            },
            Rule {
                name: "father_overage",
                category: RuleCategory::Age,
                expr: RuleExpr::NumAbove {
                    column: "father_age_at_birth".to_string(),
                    bound: t.father_max_age,
                },
            },
            Rule {
                name: "age_gap",
                category: RuleCategory::Age,
                expr: RuleExpr::DiffAbove {
                    left: "mother_age_at_birth".to_string(),
                    right: "father_age_at_birth".to_string(),
                    bound: t.mother_father_age_gap,
                },
            },
            Rule {
                name: "outside_hours",
                category: RuleCategory::Time,
                expr: RuleExpr::all_of(outside_hours),
            },
            Rule {
                name: "registration_delay",
                category: RuleCategory::Time,
                expr: RuleExpr::DaysBetweenAbove {
                    from: "child_birth_date".to_string(),
                    to: "Date_Registerred".to_string(),
                    days: t.registration_delay_days,
                },
            },
            Rule {
                name: "high_daily_activity",
                category: RuleCategory::Activity,
                expr: RuleExpr::DailyCountAbove {
                    key: "Birth_Reg_ID".to_string(),
                    group: "registered_by_nin".to_string(),
                    date: "initiated_at".to_string(),
                    bound: t.high_activity_threshold,
                },
            },
            Rule {
                name: "missing_child_name",
                category: RuleCategory::Completeness,
                expr: RuleExpr::any_of(vec![
                    RuleExpr::IsBlank {
                        column: "child_surname".to_string(),
                    },
                    RuleExpr::IsBlank {
                        column: "child_firstname".to_string(),
                    },
                ]),
            },
            Rule {
                name: "missing_child_birth",
                category: RuleCategory::Completeness,
                expr: RuleExpr::IsNull {
                    column: "child_birth_date".to_string(),
                },
            },
            Rule {
                name: "missing_mother_details",
                category: RuleCategory::Completeness,
                expr: RuleExpr::any_of(vec![
                    RuleExpr::IsBlank {
                        column: "mother_surname".to_string(),
                    },
                    RuleExpr::IsBlank {
                        column: "mother_firstname".to_string(),
                    },
                    RuleExpr::IsNull {
                        column: "mother_age_at_birth".to_string(),
                    },
                ]),
            },
        ];
        Self { rules }
    }

    /// Registry built from an explicit rule list.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// All registered rules, in registry order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules of one category, in registry order.
    pub fn rules_in(&self, category: RuleCategory) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.category == category)
    }

    /// Restrict the registry to rules whose columns all exist in
    /// `available`. Dropped rules are logged, not errors: an analytical
    /// table missing an optional column skips the checks that need it.
    #[must_use]
    pub fn for_columns(&self, available: &[&str]) -> Self {
        let rules = self
            .rules
            .iter()
            .filter(|rule| {
                let missing = rule
                    .expr
                    .required_columns()
                    .into_iter()
                    .filter(|col| !available.contains(col))
                    .collect_vec();
                if missing.is_empty() {
                    true
                } else {
                    log::warn!(
                        "Skipping rule `{}`: column(s) {} not in this dataset",
                        rule.name,
                        missing.iter().map(|c| format!("`{c}`")).join(", ")
                    );
                    false
                }
            })
            .cloned()
            .collect_vec();
        Self { rules }
    }

    /// Combined predicate for a selector: `"all"` ORs every rule, a
    /// category name ORs that category's rules only.
    ///
    /// # Errors
    /// Returns a configuration error for an unknown selector. A typo in a
    /// report definition must fail loudly, not validate nothing.
    pub fn compile(&self, selector: &str) -> Result<RuleExpr> {
        if selector == "all" {
            return Ok(RuleExpr::any_of(
                self.rules.iter().map(|r| r.expr.clone()).collect(),
            ));
        }
        let category = RuleCategory::from_name(selector).ok_or_else(|| {
            ExtractError::Config(format!(
                "unknown rule category `{selector}` (expected `all` or one of {})",
                RuleCategory::ALL.iter().map(|c| c.name()).join(", ")
            ))
        })?;
        Ok(self.compile_category(category))
    }

    /// Combined predicate across one category.
    #[must_use]
    pub fn compile_category(&self, category: RuleCategory) -> RuleExpr {
        RuleExpr::any_of(self.rules_in(category).map(|r| r.expr.clone()).collect())
    }

    /// Classify one record against every registered rule.
    #[must_use]
    pub fn verdict(&self, record: &RecordView<'_>, ctx: &EvalContext) -> QualityVerdict {
        let fired: SmallVec<[&'static str; 4]> = self
            .rules
            .iter()
            .filter(|rule| rule.expr.evaluate(record, ctx))
            .map(|rule| rule.name)
            .collect();
        QualityVerdict {
            has_issues: !fired.is_empty(),
            fired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CleanRow;
    use crate::schema::RecordSchema;

    fn test_schema() -> RecordSchema {
        RecordSchema::new(
            "birth_records",
            "Birth_Reg_ID",
            [
                "Birth_Reg_ID",
                "child_surname",
                "child_firstname",
                "child_birth_date",
                "mother_surname",
                "mother_firstname",
                "mother_age_at_birth",
                "father_age_at_birth",
                "Date_Registerred",
                "initiated_at",
                "registered_by_nin",
            ],
        )
    }

    fn clean_record() -> CleanRow {
        CleanRow {
            key: 1,
            values: vec![
                "1".to_string(),
                "OKAFOR".to_string(),
                "ADA".to_string(),
                "2024-01-10".to_string(),
                "OKAFOR".to_string(),
                "NGOZI".to_string(),
                "28".to_string(),
                "33".to_string(),
                "2024-02-01 11:00:00".to_string(),
                "2024-02-01 11:00:00".to_string(),
                "NIN-1".to_string(),
            ],
        }
    }

    fn with_field(mut row: CleanRow, schema: &RecordSchema, column: &str, value: &str) -> CleanRow {
        row.values[schema.index_of(column).unwrap()] = value.to_string();
        row
    }

    #[test]
    fn clean_record_has_no_issues() {
        let schema = test_schema();
        let rules = RuleSet::with_defaults(&Thresholds::default());
        let row = clean_record();
        let verdict = rules.verdict(&RecordView::new(&schema, &row), &EvalContext::new());
        assert!(!verdict.has_issues);
        assert!(verdict.fired.is_empty());
    }

    #[test]
    fn underage_mother_fires_rule_category_and_all() {
        let schema = test_schema();
        let rules = RuleSet::with_defaults(&Thresholds::default());
        let row = with_field(clean_record(), &schema, "mother_age_at_birth", "14");
        let view = RecordView::new(&schema, &row);
        let ctx = EvalContext::new();

        let verdict = rules.verdict(&view, &ctx);
        assert!(verdict.has_issues);
        assert!(verdict.fired.contains(&"mother_underage"));

        assert!(rules.compile("age_checks").unwrap().evaluate(&view, &ctx));
        assert!(rules.compile("all").unwrap().evaluate(&view, &ctx));
    }

    /// Exactly at the floor is not underage; one below is.
    #[test]
    fn age_floor_is_exclusive() {
        let schema = test_schema();
        let rules = RuleSet::with_defaults(&Thresholds::default());
        let ctx = EvalContext::new();

        let at_floor = with_field(clean_record(), &schema, "mother_age_at_birth", "16");
        // age 16 against father 33 also clears the gap rule downward
        let verdict = rules.verdict(&RecordView::new(&schema, &at_floor), &ctx);
        assert!(!verdict.fired.contains(&"mother_underage"));

        let below = with_field(clean_record(), &schema, "mother_age_at_birth", "15");
        let verdict = rules.verdict(&RecordView::new(&schema, &below), &ctx);
        assert!(verdict.fired.contains(&"mother_underage"));
    }

    /// Completeness compilation never flags a record for an age violation.
    #[test]
    fn categories_are_isolated() {
        let schema = test_schema();
        let rules = RuleSet::with_defaults(&Thresholds::default());
        let ctx = EvalContext::new();

        let row = with_field(clean_record(), &schema, "mother_age_at_birth", "14");
        let view = RecordView::new(&schema, &row);
        let completeness = rules.compile("completeness_checks").unwrap();
        assert!(!completeness.evaluate(&view, &ctx));
    }

    #[test]
    fn unknown_selector_is_a_config_error() {
        let rules = RuleSet::with_defaults(&Thresholds::default());
        let err = rules.compile("agechecks").unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
        assert!(err.to_string().contains("agechecks"));
    }

    #[test]
    fn records_before_cutover_skip_outside_hours() {
        let schema = test_schema();
        let rules = RuleSet::with_defaults(&Thresholds::default());
        let ctx = EvalContext::new();

        let before = with_field(
            clean_record(),
            &schema,
            "initiated_at",
            "2023-09-30 22:00:00",
        );
        let verdict = rules.verdict(&RecordView::new(&schema, &before), &ctx);
        assert!(!verdict.fired.contains(&"outside_hours"));

        let after = with_field(
            clean_record(),
            &schema,
            "initiated_at",
            "2023-10-15 22:00:00",
        );
        let verdict = rules.verdict(&RecordView::new(&schema, &after), &ctx);
        assert!(verdict.fired.contains(&"outside_hours"));
    }

    #[test]
    fn ungated_cutover_judges_every_record() {
        let schema = test_schema();
        let thresholds = Thresholds {
            outside_hours_start_date: None,
            ..Thresholds::default()
        };
        let rules = RuleSet::with_defaults(&thresholds);
        let row = with_field(
            clean_record(),
            &schema,
            "initiated_at",
            "2020-01-01 03:00:00",
        );
        let verdict = rules.verdict(&RecordView::new(&schema, &row), &EvalContext::new());
        assert!(verdict.fired.contains(&"outside_hours"));
    }

    #[test]
    fn for_columns_drops_rules_with_absent_columns() {
        let rules = RuleSet::with_defaults(&Thresholds::default());
        let reduced = rules.for_columns(&[
            "Birth_Reg_ID",
            "mother_age_at_birth",
            "father_age_at_birth",
        ]);

        let names = reduced.rules().iter().map(|r| r.name).collect_vec();
        assert_eq!(
            names,
            vec![
                "mother_underage",
                "mother_overage",
                "father_underage",
                "father_overage",
                "age_gap"
            ]
        );
        let sql = reduced.compile("all").unwrap().to_sql("birth_records");
        assert!(!sql.contains("initiated_at"));
        assert!(!sql.contains("child_surname"));
    }

    #[test]
    fn one_record_can_fire_multiple_rules() {
        let schema = test_schema();
        let rules = RuleSet::with_defaults(&Thresholds::default());
        let row = with_field(
            with_field(clean_record(), &schema, "mother_age_at_birth", "14"),
            &schema,
            "child_surname",
            " ",
        );
        let verdict = rules.verdict(&RecordView::new(&schema, &row), &EvalContext::new());
        assert!(verdict.fired.contains(&"mother_underage"));
        assert!(verdict.fired.contains(&"missing_child_name"));
    }

    #[test]
    fn category_names_round_trip() {
        for category in RuleCategory::ALL {
            assert_eq!(RuleCategory::from_name(category.name()), Some(category));
        }
        assert_eq!(RuleCategory::from_name("bogus"), None);
    }
}
