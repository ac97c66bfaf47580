//! Top-K subject selection.
//!
//! Ranks live subjects by a chain of sort keys, either across all subjects
//! or within each organization code, keeps the best `count` of each group
//! and excludes the rest. The ranking is total: after the configured keys,
//! ties fall back to the subject name (case-insensitive, then exact) and
//! finally to `seq_number`.

use super::{exclude_logged, BlockExecutor, BlockFlow, BlockType};
use crate::calc_log::{CalculationLog, CalculationLogManager};
use crate::context::Context;
use crate::error::ScoreError;
use crate::property::PropertyAccess;
use crate::subject::Subject;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

/// How subjects are grouped before taking the top `count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopGroupBy {
    #[default]
    All,
    Organization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSubjectParams {
    pub count: usize,
    #[serde(default)]
    pub group_by: TopGroupBy,
    /// Defaults to `score` descending when empty.
    #[serde(default)]
    pub sort_keys: Vec<SortKey>,
}

#[derive(Debug, Clone)]
pub struct TopSubject {
    block_id: u32,
    params: TopSubjectParams,
}

/// A sort value reduced to a totally ordered form.
#[derive(Debug, PartialEq)]
enum SortValue {
    Number(f64),
    Text(String),
    Missing,
}

impl SortValue {
    fn of(value: &Value) -> Self {
        match value {
            Value::Unresolved => SortValue::Missing,
            Value::Bool(_) => SortValue::Number(value.to_number()),
            other => match other.as_number() {
                Some(n) if n.is_nan() => SortValue::Missing,
                Some(n) => SortValue::Number(n),
                None => SortValue::Text(other.to_string()),
            },
        }
    }

    /// Ascending order among present values: numbers before text.
    fn cmp_present(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (SortValue::Number(_), _) => Ordering::Less,
            (_, SortValue::Number(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

/// Compare two sort values. Unresolved and `NaN` values sort last in both
/// orders.
fn compare_values(a: &Value, b: &Value, order: SortOrder) -> Ordering {
    let (a, b) = (SortValue::of(a), SortValue::of(b));
    match (&a, &b) {
        (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
        (SortValue::Missing, _) => Ordering::Greater,
        (_, SortValue::Missing) => Ordering::Less,
        _ => {
            let ordering = a.cmp_present(&b);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        }
    }
}

impl TopSubject {
    pub fn new(block_id: u32, mut params: TopSubjectParams) -> Self {
        if params.sort_keys.is_empty() {
            params.sort_keys.push(SortKey {
                field: "score".to_string(),
                order: SortOrder::Desc,
            });
        }
        Self { block_id, params }
    }

    fn rank(&self, a: &Subject, b: &Subject) -> Ordering {
        self.params
            .sort_keys
            .iter()
            .map(|key| {
                compare_values(
                    &a.get_property(&key.field),
                    &b.get_property(&key.field),
                    key.order,
                )
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.subject_name
                    .to_lowercase()
                    .cmp(&b.subject_name.to_lowercase())
            })
            .then_with(|| a.subject_name.cmp(&b.subject_name))
            .then(a.seq_number.cmp(&b.seq_number))
    }
}

impl BlockExecutor for TopSubject {
    fn block_id(&self) -> u32 {
        self.block_id
    }

    fn block_type(&self) -> BlockType {
        BlockType::TopSubject
    }

    fn execute(
        &self,
        _context: &mut Context,
        subjects: &mut [Subject],
        log: &mut CalculationLogManager,
    ) -> Result<BlockFlow, ScoreError> {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for index in super::live_indices(subjects) {
            let key = match self.params.group_by {
                TopGroupBy::All => String::new(),
                TopGroupBy::Organization => subjects[index].organization_code.clone(),
            };
            groups.entry(key).or_default().push(index);
        }

        let lead_field = self.params.sort_keys[0].field.as_str();
        for mut members in groups.into_values() {
            members.sort_by(|&a, &b| self.rank(&subjects[a], &subjects[b]));
            for (position, index) in members.into_iter().enumerate() {
                let subject = &mut subjects[index];
                let input = subject.get_property(lead_field);
                if position < self.params.count {
                    log.record(
                        subject.seq_number,
                        CalculationLog::new(lead_field, input, "rank", Value::from(position as f64 + 1.0)),
                    );
                } else {
                    exclude_logged(subject, self.block_id, lead_field, input, log);
                }
            }
        }
        Ok(BlockFlow::Continue)
    }

    fn description(&self) -> String {
        format!("top_subject({} by {:?})", self.params.count, self.params.group_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::test_support::subject;

    fn live_seqs(subjects: &[Subject]) -> Vec<u32> {
        subjects
            .iter()
            .filter(|s| s.is_live())
            .map(|s| s.seq_number)
            .collect()
    }

    #[test]
    fn test_global_top_k_by_score() {
        let mut subjects = vec![
            subject(1, "A", 70.0),
            subject(2, "A", 90.0),
            subject(3, "A", 80.0),
        ];
        let block = TopSubject::new(
            6,
            TopSubjectParams {
                count: 2,
                group_by: TopGroupBy::All,
                sort_keys: vec![],
            },
        );
        let mut log = CalculationLogManager::new(6, 4, 0);
        block
            .execute(&mut Context::new(), &mut subjects, &mut log)
            .unwrap();
        assert_eq!(live_seqs(&subjects), vec![2, 3]);
        assert_eq!(subjects[0].filtered_block_id, 6);
        assert_eq!(log.logs_for(2)[0].output, Value::from(1.0));
    }

    #[test]
    fn test_tie_break_chain() {
        let mut subjects = vec![
            subject(1, "A", 90.0),
            subject(2, "A", 90.0),
            subject(3, "A", 90.0),
        ];
        subjects[0].unit = 2.0;
        subjects[1].unit = 3.0;
        subjects[2].unit = 3.0;
        subjects[1].subject_name = "physics".to_string();
        subjects[2].subject_name = "Biology".to_string();
        let block = TopSubject::new(
            6,
            TopSubjectParams {
                count: 1,
                group_by: TopGroupBy::All,
                sort_keys: vec![
                    SortKey {
                        field: "score".to_string(),
                        order: SortOrder::Desc,
                    },
                    SortKey {
                        field: "unit".to_string(),
                        order: SortOrder::Desc,
                    },
                ],
            },
        );
        let mut log = CalculationLogManager::new(6, 4, 0);
        block
            .execute(&mut Context::new(), &mut subjects, &mut log)
            .unwrap();
        assert_eq!(live_seqs(&subjects), vec![3]);
    }

    #[test]
    fn test_per_organization_groups() {
        let mut subjects = vec![
            subject(1, "A", 50.0),
            subject(2, "A", 60.0),
            subject(3, "B", 40.0),
            subject(4, "B", 30.0),
        ];
        subjects[0].organization_code = "KOR".to_string();
        subjects[1].organization_code = "KOR".to_string();
        subjects[2].organization_code = "ENG".to_string();
        subjects[3].organization_code = "ENG".to_string();
        let block = TopSubject::new(
            6,
            TopSubjectParams {
                count: 1,
                group_by: TopGroupBy::Organization,
                sort_keys: vec![],
            },
        );
        let mut log = CalculationLogManager::new(6, 4, 0);
        block
            .execute(&mut Context::new(), &mut subjects, &mut log)
            .unwrap();
        assert_eq!(live_seqs(&subjects), vec![2, 3]);
    }

    #[test]
    fn test_unresolved_sorts_last_in_both_orders() {
        let a = Value::Unresolved;
        let b = Value::from(1.0);
        assert_eq!(compare_values(&a, &b, SortOrder::Asc), Ordering::Greater);
        assert_eq!(compare_values(&a, &b, SortOrder::Desc), Ordering::Greater);
    }

    #[test]
    fn test_nan_and_text_keys_rank_totally() {
        let nan = Value::from(f64::NAN);
        let one = Value::from(1.0);
        let two = Value::from(2.0);
        assert_eq!(compare_values(&nan, &two, SortOrder::Desc), Ordering::Greater);
        assert_eq!(compare_values(&nan, &one, SortOrder::Asc), Ordering::Greater);
        assert_eq!(compare_values(&one, &two, SortOrder::Desc), Ordering::Greater);

        let ten = Value::from("10");
        let nine = Value::from("9");
        let word = Value::from("a");
        assert_eq!(compare_values(&nine, &ten, SortOrder::Asc), Ordering::Less);
        assert_eq!(compare_values(&ten, &word, SortOrder::Asc), Ordering::Less);
        assert_eq!(compare_values(&nine, &word, SortOrder::Asc), Ordering::Less);
    }

    #[test]
    fn test_top_k_with_nan_scores_keeps_real_scores() {
        let mut subjects: Vec<Subject> = (1..=60u32)
            .map(|seq| {
                let score = if seq % 3 == 0 { f64::NAN } else { f64::from(seq) };
                let mut s = subject(seq, "A", score);
                if seq % 7 == 0 {
                    s.set_property("band", Value::from("high"));
                } else {
                    s.set_property("band", Value::from(f64::from(seq % 5)));
                }
                s
            })
            .collect();
        let block = TopSubject::new(
            6,
            TopSubjectParams {
                count: 5,
                group_by: TopGroupBy::All,
                sort_keys: vec![
                    SortKey {
                        field: "score".to_string(),
                        order: SortOrder::Desc,
                    },
                    SortKey {
                        field: "band".to_string(),
                        order: SortOrder::Asc,
                    },
                ],
            },
        );
        let mut log = CalculationLogManager::new(6, 4, 0);
        block
            .execute(&mut Context::new(), &mut subjects, &mut log)
            .unwrap();
        assert_eq!(live_seqs(&subjects), vec![53, 55, 56, 58, 59]);
    }
}
