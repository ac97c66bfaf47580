//! Grade/term filter with an optional top-K cut.

use super::{exclude_logged, BlockExecutor, BlockFlow, BlockType};
use crate::calc_log::{CalculationLog, CalculationLogManager};
use crate::context::Context;
use crate::error::ScoreError;
use crate::subject::Subject;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyTermParams {
    /// Allowed `"grade-term"` keys, e.g. `"1-1"`, `"3-2"`.
    pub terms: BTreeSet<String>,
    /// Keep only this many of the remaining subjects, best `score` first.
    #[serde(default)]
    pub top_count: Option<usize>,
}

/// Keeps subjects taken in allowed terms.
#[derive(Debug, Clone)]
pub struct ApplyTerm {
    block_id: u32,
    params: ApplyTermParams,
}

impl ApplyTerm {
    pub fn new(block_id: u32, params: ApplyTermParams) -> Self {
        Self { block_id, params }
    }
}

impl BlockExecutor for ApplyTerm {
    fn block_id(&self) -> u32 {
        self.block_id
    }

    fn block_type(&self) -> BlockType {
        BlockType::ApplyTerm
    }

    fn execute(
        &self,
        _context: &mut Context,
        subjects: &mut [Subject],
        log: &mut CalculationLogManager,
    ) -> Result<BlockFlow, ScoreError> {
        for subject in subjects.iter_mut().filter(|s| s.is_live()) {
            let key = Value::from(subject.grade_term());
            if self.params.terms.contains(&subject.grade_term()) {
                log.record(
                    subject.seq_number,
                    CalculationLog::new("grade_term", key, "filtered_block_id", Value::from(0u32)),
                );
            } else {
                exclude_logged(subject, self.block_id, "grade_term", key, log);
            }
        }

        let Some(top_count) = self.params.top_count else {
            return Ok(BlockFlow::Continue);
        };

        // Best score first, NaN last; ties keep input order by identity.
        let mut ranked = super::live_indices(subjects);
        ranked.sort_by(|&a, &b| {
            let (x, y) = (subjects[a].score, subjects[b].score);
            x.is_nan()
                .cmp(&y.is_nan())
                .then_with(|| y.total_cmp(&x))
                .then(subjects[a].seq_number.cmp(&subjects[b].seq_number))
        });
        for &index in ranked.iter().skip(top_count) {
            let subject = &mut subjects[index];
            let score = Value::from(subject.score);
            exclude_logged(subject, self.block_id, "score", score, log);
        }
        Ok(BlockFlow::Continue)
    }

    fn description(&self) -> String {
        let terms: Vec<&str> = self.params.terms.iter().map(String::as_str).collect();
        match self.params.top_count {
            Some(k) => format!("apply_term({}; top {k})", terms.join(",")),
            None => format!("apply_term({})", terms.join(",")),
        }
    }
}
