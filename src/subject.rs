//! Course records.
//!
//! A `Subject` is one course a student took. Blocks never remove subjects;
//! they mark them as filtered through `filtered_block_id`, which stays set
//! for the rest of the branch unless an explicit re-inclusion rule clears it.

use crate::calc_log::SnapshotEntry;
use crate::property::{text_of, PropertyAccess};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One course record belonging to a student.
///
/// # Examples
///
/// ```rust
/// use scorepipe::Subject;
///
/// let mut subject = Subject::new(7);
/// subject.subject_group = "MATH".to_string();
/// assert!(subject.is_live());
///
/// subject.exclude(3);
/// assert_eq!(subject.filtered_block_id, 3);
/// assert!(!subject.is_live());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    /// Stable identity within a run.
    pub seq_number: u32,
    pub subject_name: String,
    pub subject_group: String,
    pub organization_code: String,
    pub separation_code: String,
    pub grade: String,
    pub term: String,
    pub unit: f64,
    pub raw_score: f64,
    pub average: f64,
    pub std_dev: f64,
    pub rank_grade: f64,
    pub achievement: String,
    pub student_count: f64,
    /// Working score most blocks read and write.
    pub score: f64,
    pub vars: BTreeMap<String, Value>,
    /// 0 while live, otherwise the id of the block that excluded it.
    pub filtered_block_id: u32,
    /// Append-only audit trail.
    pub snapshot: Vec<SnapshotEntry>,
}

impl Subject {
    /// Create a live subject with the given identity and empty fields.
    pub fn new(seq_number: u32) -> Self {
        Self {
            seq_number,
            ..Self::default()
        }
    }

    /// Whether no block has excluded this subject.
    pub fn is_live(&self) -> bool {
        self.filtered_block_id == 0
    }

    /// Mark the subject as excluded by `block_id`.
    ///
    /// An existing marker is kept, so the first excluding block stays on
    /// record.
    pub fn exclude(&mut self, block_id: u32) {
        if self.filtered_block_id == 0 {
            self.filtered_block_id = block_id;
        }
    }

    /// Clear the exclusion marker. Only re-inclusion rules call this.
    pub fn reinclude(&mut self) {
        self.filtered_block_id = 0;
    }

    /// `"grade-term"` key used by term filters.
    pub fn grade_term(&self) -> String {
        format!("{}-{}", self.grade, self.term)
    }
}

impl PropertyAccess for Subject {
    fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "seq_number" | "seqNumber" => Value::from(self.seq_number),
            "subject_name" | "subjectName" => Value::from(self.subject_name.as_str()),
            "subject_group" | "subjectGroup" => Value::from(self.subject_group.as_str()),
            "organization_code" | "organizationCode" => {
                Value::from(self.organization_code.as_str())
            }
            "separation_code" | "separationCode" => Value::from(self.separation_code.as_str()),
            "grade" => Value::from(self.grade.as_str()),
            "term" => Value::from(self.term.as_str()),
            "unit" => Value::from(self.unit),
            "raw_score" | "rawScore" => Value::from(self.raw_score),
            "average" => Value::from(self.average),
            "std_dev" | "stdDev" => Value::from(self.std_dev),
            "rank_grade" | "rankGrade" => Value::from(self.rank_grade),
            "achievement" => Value::from(self.achievement.as_str()),
            "student_count" | "studentCount" => Value::from(self.student_count),
            "score" => Value::from(self.score),
            "filtered_block_id" | "filteredBlockId" => Value::from(self.filtered_block_id),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, name: &str, value: &Value) -> bool {
        match name {
            "seq_number" | "seqNumber" | "filtered_block_id" | "filteredBlockId" => {
                tracing::warn!(
                    seq_number = self.seq_number,
                    field = name,
                    "ignoring write to identity/liveness field"
                );
            }
            "subject_name" | "subjectName" => self.subject_name = text_of(value),
            "subject_group" | "subjectGroup" => self.subject_group = text_of(value),
            "organization_code" | "organizationCode" => self.organization_code = text_of(value),
            "separation_code" | "separationCode" => self.separation_code = text_of(value),
            "grade" => self.grade = text_of(value),
            "term" => self.term = text_of(value),
            "unit" => self.unit = value.to_number(),
            "raw_score" | "rawScore" => self.raw_score = value.to_number(),
            "average" => self.average = value.to_number(),
            "std_dev" | "stdDev" => self.std_dev = value.to_number(),
            "rank_grade" | "rankGrade" => self.rank_grade = value.to_number(),
            "achievement" => self.achievement = text_of(value),
            "student_count" | "studentCount" => self.student_count = value.to_number(),
            "score" => self.score = value.to_number(),
            _ => return false,
        }
        true
    }

    fn vars(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }

    fn vars_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclude_keeps_first_marker() {
        let mut subject = Subject::new(1);
        subject.exclude(4);
        subject.exclude(9);
        assert_eq!(subject.filtered_block_id, 4);
        subject.reinclude();
        assert!(subject.is_live());
    }

    #[test]
    fn test_identity_not_writable_through_accessor() {
        let mut subject = Subject::new(5);
        subject.set_property("seqNumber", Value::from(99.0));
        subject.set_property("filtered_block_id", Value::from(3.0));
        assert_eq!(subject.seq_number, 5);
        assert!(subject.is_live());
        assert!(subject.vars.is_empty());
    }

    #[test]
    fn test_grade_term_key() {
        let mut subject = Subject::new(1);
        subject.grade = "2".to_string();
        subject.term = "1".to_string();
        assert_eq!(subject.grade_term(), "2-1");
    }

    #[test]
    fn test_text_fields_read_as_text() {
        let mut subject = Subject::new(1);
        subject.grade = "3".to_string();
        assert_eq!(subject.get_property("grade"), Value::from("3"));
        assert!(subject.get_property("grade").loose_eq(&Value::from(3.0)));
    }
}
