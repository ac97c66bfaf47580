//! Criteria applied at division tree nodes.
//!
//! A node's predicate is built from the column's declared kind plus the
//! node's cell values, e.g. kind `graduate_year` with values
//! `{"comparison": "<=", "year": 2020}`. Context predicates keep every
//! subject or none; subject predicates keep a subset. Neither ever adds a
//! subject its parent did not have.

use crate::block::apply_subject::group_matches;
use crate::context::Context;
use crate::error::ScoreError;
use crate::subject::Subject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Numeric comparison operator used by division criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
        }
    }

    /// Whether `lhs <op> rhs` holds. Any comparison with `NaN` fails except
    /// `!=`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scorepipe::division::predicate::Comparator;
    ///
    /// let le: Comparator = "≤".parse().unwrap();
    /// assert!(le.holds(2019.0, 2020.0));
    /// assert!(!le.holds(2021.0, 2020.0));
    /// ```
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparator::Lt => lhs < rhs,
            Comparator::Le => lhs <= rhs,
            Comparator::Gt => lhs > rhs,
            Comparator::Ge => lhs >= rhs,
            Comparator::Eq => lhs == rhs,
            Comparator::Ne => lhs != rhs,
        }
    }
}

impl std::str::FromStr for Comparator {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" => Ok(Comparator::Lt),
            "<=" | "≤" => Ok(Comparator::Le),
            ">" => Ok(Comparator::Gt),
            ">=" | "≥" => Ok(Comparator::Ge),
            "==" | "=" => Ok(Comparator::Eq),
            "!=" | "≠" => Ok(Comparator::Ne),
            other => Err(ScoreError::InvalidDivision(format!(
                "unknown comparator {other:?}"
            ))),
        }
    }
}

impl TryFrom<String> for Comparator {
    type Error = ScoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Comparator> for String {
    fn from(c: Comparator) -> Self {
        c.symbol().to_string()
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The criterion of one division node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "division_type", rename_all = "snake_case")]
pub enum DivisionType {
    GraduateYear {
        comparison: Comparator,
        year: i32,
    },
    GraduateGrade {
        grade: String,
    },
    AdmissionCode {
        #[serde(default)]
        codes: Vec<String>,
        #[serde(default)]
        exclude_codes: Vec<String>,
    },
    MajorCode {
        #[serde(default)]
        codes: Vec<String>,
        #[serde(default)]
        exclude_codes: Vec<String>,
    },
    ApplicantType {
        applicant_type: String,
    },
    /// Keeps subjects of the listed groups whose group's total live `unit`
    /// satisfies the comparison.
    SubjectGroupUnitSum {
        subject_groups: Vec<String>,
        comparison: Comparator,
        threshold: f64,
    },
    SubjectGroup {
        subject_groups: Vec<String>,
    },
    SubjectSeparation {
        separation_codes: Vec<String>,
    },
    /// With `reinclude`, clears the exclusion marker of subjects filtered by
    /// one of `block_ids` (any block when empty) and keeps every subject.
    /// Otherwise keeps only subjects whose marker is in `block_ids`; `0`
    /// selects live subjects.
    FilteredBlockId {
        #[serde(default)]
        block_ids: Vec<u32>,
        #[serde(default)]
        reinclude: bool,
    },
}

fn code_admitted(codes: &[String], exclude_codes: &[String], code: &str) -> bool {
    (codes.is_empty() || codes.iter().any(|c| c == code))
        && !exclude_codes.iter().any(|c| c == code)
}

impl DivisionType {
    /// Build the predicate for a node of a column declared as `kind`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scorepipe::division::predicate::{Comparator, DivisionType};
    /// use serde_json::json;
    ///
    /// let predicate = DivisionType::from_cell("graduate_year", &json!({"comparison": "<=", "year": 2020})).unwrap();
    /// assert_eq!(predicate, DivisionType::GraduateYear { comparison: Comparator::Le, year: 2020 });
    /// ```
    pub fn from_cell(kind: &str, values: &serde_json::Value) -> Result<Self, ScoreError> {
        let mut object = match values {
            serde_json::Value::Object(map) => map.clone(),
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(ScoreError::InvalidDivision(format!(
                    "{kind} cell must be an object, got {other}"
                )))
            }
        };
        object.insert(
            "division_type".to_string(),
            serde_json::Value::String(kind.to_string()),
        );
        serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| ScoreError::InvalidDivision(format!("{kind}: {e}")))
    }

    /// Whether this criterion looks only at the context.
    pub fn is_context_predicate(&self) -> bool {
        matches!(
            self,
            DivisionType::GraduateYear { .. }
                | DivisionType::GraduateGrade { .. }
                | DivisionType::AdmissionCode { .. }
                | DivisionType::MajorCode { .. }
                | DivisionType::ApplicantType { .. }
        )
    }

    fn admits_context(&self, context: &Context) -> bool {
        match self {
            DivisionType::GraduateYear { comparison, year } => {
                comparison.holds(f64::from(context.graduate_year), f64::from(*year))
            }
            DivisionType::GraduateGrade { grade } => context.graduate_grade == *grade,
            DivisionType::AdmissionCode {
                codes,
                exclude_codes,
            } => code_admitted(codes, exclude_codes, &context.admission_code),
            DivisionType::MajorCode {
                codes,
                exclude_codes,
            } => code_admitted(codes, exclude_codes, &context.major_code),
            DivisionType::ApplicantType { applicant_type } => {
                context.applicant_type == *applicant_type
            }
            _ => true,
        }
    }

    /// Narrow `subjects` to the ones this branch keeps.
    pub fn apply(&self, context: &Context, mut subjects: Vec<Subject>) -> Vec<Subject> {
        if self.is_context_predicate() {
            if !self.admits_context(context) {
                subjects.clear();
            }
            return subjects;
        }

        match self {
            DivisionType::SubjectGroupUnitSum {
                subject_groups,
                comparison,
                threshold,
            } => {
                let mut units: BTreeMap<&str, f64> = BTreeMap::new();
                for subject in subjects.iter().filter(|s| s.is_live()) {
                    if group_matches(subject_groups, &subject.subject_group) {
                        *units.entry(subject.subject_group.as_str()).or_default() += subject.unit;
                    }
                }
                let passing: Vec<String> = units
                    .into_iter()
                    .filter(|(_, sum)| comparison.holds(*sum, *threshold))
                    .map(|(group, _)| group.to_string())
                    .collect();
                subjects.retain(|s| passing.contains(&s.subject_group));
            }
            DivisionType::SubjectGroup { subject_groups } => {
                subjects.retain(|s| group_matches(subject_groups, &s.subject_group));
            }
            DivisionType::SubjectSeparation { separation_codes } => {
                subjects.retain(|s| separation_codes.contains(&s.separation_code));
            }
            DivisionType::FilteredBlockId {
                block_ids,
                reinclude: true,
            } => {
                for subject in subjects.iter_mut() {
                    let marker = subject.filtered_block_id;
                    if marker != 0 && (block_ids.is_empty() || block_ids.contains(&marker)) {
                        tracing::debug!(seq_number = subject.seq_number, marker, "re-including subject");
                        subject.reinclude();
                    }
                }
            }
            DivisionType::FilteredBlockId {
                block_ids,
                reinclude: false,
            } => {
                subjects.retain(|s| block_ids.contains(&s.filtered_block_id));
            }
            _ => {}
        }
        subjects
    }

    /// Short human-readable criterion, used as the case description.
    pub fn describe(&self) -> String {
        match self {
            DivisionType::GraduateYear { comparison, year } => {
                format!("graduate_year {comparison} {year}")
            }
            DivisionType::GraduateGrade { grade } => format!("graduate_grade == {grade}"),
            DivisionType::AdmissionCode {
                codes,
                exclude_codes,
            } => format!("admission_code in {codes:?} not in {exclude_codes:?}"),
            DivisionType::MajorCode {
                codes,
                exclude_codes,
            } => format!("major_code in {codes:?} not in {exclude_codes:?}"),
            DivisionType::ApplicantType { applicant_type } => {
                format!("applicant_type == {applicant_type}")
            }
            DivisionType::SubjectGroupUnitSum {
                subject_groups,
                comparison,
                threshold,
            } => format!("unit_sum({}) {comparison} {threshold}", subject_groups.join(",")),
            DivisionType::SubjectGroup { subject_groups } => {
                format!("subject_group in {}", subject_groups.join(","))
            }
            DivisionType::SubjectSeparation { separation_codes } => {
                format!("separation_code in {}", separation_codes.join(","))
            }
            DivisionType::FilteredBlockId {
                block_ids,
                reinclude,
            } => format!("filtered_block_id in {block_ids:?} (reinclude: {reinclude})"),
        }
    }
}
