//! Calculation audit trail.
//!
//! Every block invocation records, per subject, which property it read and
//! which property it wrote. Entries are collected in a
//! `CalculationLogManager` while the block runs and committed onto each
//! record's `snapshot` afterwards. Nothing in the engine reads them back.

use crate::context::Context;
use crate::subject::Subject;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One input → output transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationLog {
    pub input_key: String,
    pub input: Value,
    pub output_key: String,
    pub output: Value,
}

impl CalculationLog {
    pub fn new(
        input_key: impl Into<String>,
        input: Value,
        output_key: impl Into<String>,
        output: Value,
    ) -> Self {
        Self {
            input_key: input_key.into(),
            input,
            output_key: output_key.into(),
            output,
        }
    }
}

/// A calculation log tagged with the block invocation that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub block_id: u32,
    pub block_type: u32,
    pub case_index: usize,
    pub log: CalculationLog,
}

/// Collects logs for one block invocation.
///
/// # Examples
///
/// ```rust
/// use scorepipe::calc_log::{CalculationLog, CalculationLogManager};
/// use scorepipe::{Subject, Value};
///
/// let mut subjects = vec![Subject::new(1), Subject::new(2)];
/// let mut logs = CalculationLogManager::new(10, 12, 0);
/// logs.record(2, CalculationLog::new("score", Value::from(80.0), "score", Value::from(40.0)));
/// logs.commit_subjects(&mut subjects);
///
/// assert!(subjects[0].snapshot.is_empty());
/// assert_eq!(subjects[1].snapshot[0].block_id, 10);
/// ```
#[derive(Debug, Clone)]
pub struct CalculationLogManager {
    block_id: u32,
    block_type: u32,
    case_index: usize,
    subject_logs: BTreeMap<u32, Vec<CalculationLog>>,
    context_logs: Vec<CalculationLog>,
}

impl CalculationLogManager {
    pub fn new(block_id: u32, block_type: u32, case_index: usize) -> Self {
        Self {
            block_id,
            block_type,
            case_index,
            subject_logs: BTreeMap::new(),
            context_logs: Vec::new(),
        }
    }

    /// Record a log for the subject with `seq_number`.
    pub fn record(&mut self, seq_number: u32, log: CalculationLog) {
        self.subject_logs.entry(seq_number).or_default().push(log);
    }

    /// Record a log for a context-scoped calculation.
    pub fn record_context(&mut self, log: CalculationLog) {
        self.context_logs.push(log);
    }

    /// Logs recorded so far for one subject.
    pub fn logs_for(&self, seq_number: u32) -> &[CalculationLog] {
        self.subject_logs
            .get(&seq_number)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.subject_logs.is_empty() && self.context_logs.is_empty()
    }

    fn entry(&self, log: CalculationLog) -> SnapshotEntry {
        SnapshotEntry {
            block_id: self.block_id,
            block_type: self.block_type,
            case_index: self.case_index,
            log,
        }
    }

    /// Append collected subject logs to the matching subjects' snapshots.
    ///
    /// Logs for subjects not present in `subjects` are dropped.
    pub fn commit_subjects(&mut self, subjects: &mut [Subject]) {
        for subject in subjects.iter_mut() {
            if let Some(logs) = self.subject_logs.remove(&subject.seq_number) {
                let entries: Vec<SnapshotEntry> =
                    logs.into_iter().map(|log| self.entry(log)).collect();
                subject.snapshot.extend(entries);
            }
        }
        self.subject_logs.clear();
    }

    /// Append collected context logs to the context snapshot.
    pub fn commit_context(&mut self, context: &mut Context) {
        let logs = std::mem::take(&mut self.context_logs);
        context
            .snapshot
            .extend(logs.into_iter().map(|log| self.entry(log)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_grouped_per_subject() {
        let mut logs = CalculationLogManager::new(1, 5, 2);
        logs.record(3, CalculationLog::new("score", 10.0.into(), "score", 5.0.into()));
        logs.record(3, CalculationLog::new("unit", 2.0.into(), "unit", 2.0.into()));
        assert_eq!(logs.logs_for(3).len(), 2);
        assert!(logs.logs_for(4).is_empty());

        let mut subjects = vec![Subject::new(3)];
        logs.commit_subjects(&mut subjects);
        assert_eq!(subjects[0].snapshot.len(), 2);
        assert_eq!(subjects[0].snapshot[1].case_index, 2);
        assert!(logs.is_empty());
    }

    #[test]
    fn test_context_logs_commit() {
        let mut logs = CalculationLogManager::new(8, 11, 0);
        logs.record_context(CalculationLog::new("score", 1.0.into(), "final_score", 1.0.into()));
        let mut context = Context::new();
        logs.commit_context(&mut context);
        assert_eq!(context.snapshot.len(), 1);
        assert_eq!(context.snapshot[0].log.output_key, "final_score");
    }
}
