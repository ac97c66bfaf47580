//! Subject-group membership filter.

use super::{exclude_logged, BlockExecutor, BlockFlow, BlockType};
use crate::calc_log::{CalculationLog, CalculationLogManager};
use crate::context::Context;
use crate::error::ScoreError;
use crate::subject::Subject;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Whether matching subjects are kept or excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeOption {
    #[default]
    Include,
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplySubjectParams {
    #[serde(default)]
    pub include_option: IncludeOption,
    pub subject_groups: Vec<String>,
}

/// Keeps or excludes subjects by subject group.
///
/// A group pattern matches when the subject's group contains it; `"*"`
/// matches every subject.
///
/// # Examples
///
/// ```rust
/// use scorepipe::block::apply_subject::{ApplySubject, ApplySubjectParams, IncludeOption};
/// use scorepipe::block::BlockExecutor;
/// use scorepipe::calc_log::CalculationLogManager;
/// use scorepipe::{Context, Subject};
///
/// let block = ApplySubject::new(3, ApplySubjectParams {
///     include_option: IncludeOption::Exclude,
///     subject_groups: vec!["MATH".to_string()],
/// });
/// let mut subjects = vec![Subject::new(1), Subject::new(2)];
/// subjects[0].subject_group = "MATH_II".to_string();
/// subjects[1].subject_group = "KOREAN".to_string();
///
/// let mut log = CalculationLogManager::new(3, 2, 0);
/// block.execute(&mut Context::new(), &mut subjects, &mut log).unwrap();
/// assert_eq!(subjects[0].filtered_block_id, 3);
/// assert!(subjects[1].is_live());
/// ```
#[derive(Debug, Clone)]
pub struct ApplySubject {
    block_id: u32,
    params: ApplySubjectParams,
}

impl ApplySubject {
    pub fn new(block_id: u32, params: ApplySubjectParams) -> Self {
        Self { block_id, params }
    }

    fn matches(&self, group: &str) -> bool {
        group_matches(&self.params.subject_groups, group)
    }
}

/// Whether `group` contains any of `patterns`; `"*"` matches everything.
pub(crate) fn group_matches(patterns: &[String], group: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| pattern == "*" || group.contains(pattern.as_str()))
}

impl BlockExecutor for ApplySubject {
    fn block_id(&self) -> u32 {
        self.block_id
    }

    fn block_type(&self) -> BlockType {
        BlockType::ApplySubject
    }

    fn execute(
        &self,
        _context: &mut Context,
        subjects: &mut [Subject],
        log: &mut CalculationLogManager,
    ) -> Result<BlockFlow, ScoreError> {
        for subject in subjects.iter_mut().filter(|s| s.is_live()) {
            let matched = self.matches(&subject.subject_group);
            let keep = match self.params.include_option {
                IncludeOption::Include => matched,
                IncludeOption::Exclude => !matched,
            };
            let group = Value::from(subject.subject_group.as_str());
            if keep {
                log.record(
                    subject.seq_number,
                    CalculationLog::new("subject_group", group, "filtered_block_id", Value::from(0u32)),
                );
            } else {
                exclude_logged(subject, self.block_id, "subject_group", group, log);
            }
        }
        Ok(BlockFlow::Continue)
    }

    fn description(&self) -> String {
        format!(
            "apply_subject({:?} {})",
            self.params.include_option,
            self.params.subject_groups.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::test_support::subject;

    fn run(option: IncludeOption, groups: &[&str], subjects: &mut [Subject]) {
        let block = ApplySubject::new(
            9,
            ApplySubjectParams {
                include_option: option,
                subject_groups: groups.iter().map(|g| g.to_string()).collect(),
            },
        );
        let mut log = CalculationLogManager::new(9, 2, 0);
        block
            .execute(&mut Context::new(), subjects, &mut log)
            .unwrap();
        log.commit_subjects(subjects);
    }

    #[test]
    fn test_wildcard_include_filters_nothing() {
        let mut subjects = vec![subject(1, "MATH", 90.0), subject(2, "ENGLISH", 80.0)];
        run(IncludeOption::Include, &["*"], &mut subjects);
        assert!(subjects.iter().all(Subject::is_live));
        assert!(subjects.iter().all(|s| s.snapshot.len() == 1));
    }

    #[test]
    fn test_exclude_by_substring() {
        let mut subjects = vec![
            subject(1, "MATH", 90.0),
            subject(2, "APPLIED MATH", 85.0),
            subject(3, "SCIENCE", 70.0),
        ];
        run(IncludeOption::Exclude, &["MATH"], &mut subjects);
        assert_eq!(subjects[0].filtered_block_id, 9);
        assert_eq!(subjects[1].filtered_block_id, 9);
        assert!(subjects[2].is_live());
    }

    #[test]
    fn test_include_keeps_only_matches_and_skips_filtered() {
        let mut subjects = vec![subject(1, "MATH", 90.0), subject(2, "SCIENCE", 70.0)];
        subjects[0].exclude(4);
        run(IncludeOption::Include, &["SCIENCE"], &mut subjects);
        assert_eq!(subjects[0].filtered_block_id, 4);
        assert!(subjects[0].snapshot.is_empty());
        assert!(subjects[1].is_live());
    }
}
