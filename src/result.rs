//! Scoring run results.

use crate::context::Context;
use crate::subject::Subject;
use serde::{Deserialize, Serialize};

/// The context and subjects left by a pipeline run.
///
/// Subjects keep their input order; filtered subjects are still present,
/// marked through `filtered_block_id`, and every record carries its full
/// audit snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub context: Context,
    pub subjects: Vec<Subject>,
}

impl ScoringResult {
    pub fn new(context: Context, subjects: Vec<Subject>) -> Self {
        Self { context, subjects }
    }

    /// The context's `final_score`.
    pub fn final_score(&self) -> f64 {
        self.context.final_score
    }

    /// Subjects no block excluded.
    pub fn live_subjects(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.iter().filter(|s| s.is_live())
    }

    /// Look a subject up by `seq_number`.
    pub fn subject(&self, seq_number: u32) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.seq_number == seq_number)
    }
}
