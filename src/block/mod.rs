//! Block executors.
//!
//! A block is one business rule inside a pipeline component. At run time
//! each block row becomes a [`BlockExecutor`] built once per case from
//! already-shaped parameters, then executed against that case's private
//! context and subject snapshot.
//!
//! ```text
//! (block_type, header, body[case]) ─registry→ Box<dyn BlockExecutor> ─execute→ (context, subjects)
//! ```
//!
//! Executors only look at live subjects (see [`Subject::is_live`]) unless a
//! rule explicitly re-includes filtered ones.

pub mod aggregation;
pub mod apply_subject;
pub mod apply_term;
pub mod formula;
pub mod keyed_ratio;
pub mod registry;
pub mod scalar;
pub mod score_map;
pub mod top_subject;

use crate::calc_log::{CalculationLog, CalculationLogManager};
use crate::context::Context;
use crate::error::ScoreError;
use crate::property::PropertyAccess;
use crate::subject::Subject;
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the case engine should do after a block ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFlow {
    /// Run the next block.
    Continue,
    /// Abandon the case: none of its changes are merged back.
    DropCase,
}

/// Runtime strategy for one block row in one case.
///
/// Implementations are built from their parameters once and are otherwise
/// immutable; `execute` is the only operation with effects.
pub trait BlockExecutor: Send + Sync {
    fn block_id(&self) -> u32;

    fn block_type(&self) -> BlockType;

    /// Apply the rule to a case snapshot.
    ///
    /// # Arguments
    ///
    /// * `context` - The case's context, mutated in place
    /// * `subjects` - The case's subjects; never grown or shrunk
    /// * `log` - Collector for this invocation's audit entries
    fn execute(
        &self,
        context: &mut Context,
        subjects: &mut [Subject],
        log: &mut CalculationLogManager,
    ) -> Result<BlockFlow, ScoreError>;

    /// Human-readable summary for tracing.
    fn description(&self) -> String;
}

/// Integer tags identifying block kinds in pipeline definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockType {
    Division,
    ApplySubject,
    ApplyTerm,
    TopSubject,
    GradeRatio,
    SubjectGroupRatio,
    SeparationRatio,
    ScoreMap,
    Formula,
    Condition,
    Aggregation,
    Ratio,
    Decimal,
    Variable,
}

impl BlockType {
    const ALL: [BlockType; 14] = [
        BlockType::Division,
        BlockType::ApplySubject,
        BlockType::ApplyTerm,
        BlockType::TopSubject,
        BlockType::GradeRatio,
        BlockType::SubjectGroupRatio,
        BlockType::SeparationRatio,
        BlockType::ScoreMap,
        BlockType::Formula,
        BlockType::Condition,
        BlockType::Aggregation,
        BlockType::Ratio,
        BlockType::Decimal,
        BlockType::Variable,
    ];

    /// The integer tag used in block definitions.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scorepipe::BlockType;
    ///
    /// assert_eq!(BlockType::Ratio.tag(), 12);
    /// assert_eq!(BlockType::from_tag(12), Some(BlockType::Ratio));
    /// assert_eq!(BlockType::from_tag(99), None);
    /// ```
    pub fn tag(self) -> u32 {
        match self {
            BlockType::Division => 1,
            BlockType::ApplySubject => 2,
            BlockType::ApplyTerm => 3,
            BlockType::TopSubject => 4,
            BlockType::GradeRatio => 5,
            BlockType::SubjectGroupRatio => 6,
            BlockType::SeparationRatio => 7,
            BlockType::ScoreMap => 8,
            BlockType::Formula => 9,
            BlockType::Condition => 10,
            BlockType::Aggregation => 11,
            BlockType::Ratio => 12,
            BlockType::Decimal => 13,
            BlockType::Variable => 14,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Whether the block only declares something and has no runtime effect.
    pub fn is_declaration_only(self) -> bool {
        matches!(self, BlockType::Division | BlockType::Variable)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Whether a block reads/writes the context or each subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableScope {
    Context,
    #[default]
    Subject,
}

/// Merge header and body cells and deserialize them into typed params.
///
/// Both sides are expected to be JSON objects; keys in `body` win. A
/// missing (`null`) side contributes nothing.
pub(crate) fn parse_params<T: DeserializeOwned>(
    block_type: BlockType,
    block_id: u32,
    header: &serde_json::Value,
    body: &serde_json::Value,
) -> Result<T, ScoreError> {
    let merged = match (header, body) {
        (serde_json::Value::Object(h), serde_json::Value::Object(b)) => {
            let mut map = h.clone();
            map.extend(b.iter().map(|(k, v)| (k.clone(), v.clone())));
            serde_json::Value::Object(map)
        }
        (h, serde_json::Value::Null) => h.clone(),
        (_, b) => b.clone(),
    };
    serde_json::from_value(merged).map_err(|e| invalid_params(block_type, block_id, e))
}

pub(crate) fn invalid_params(
    block_type: BlockType,
    block_id: u32,
    reason: impl fmt::Display,
) -> ScoreError {
    ScoreError::InvalidBlockParams {
        block_id,
        block_type: block_type.tag(),
        reason: reason.to_string(),
    }
}

/// Resolve a placeholder name for one subject: the subject first, then the
/// context.
pub(crate) fn resolve_for_subject(name: &str, subject: &Subject, context: &Context) -> Value {
    if subject.has_property(name) {
        subject.get_property(name)
    } else {
        context.get_property(name)
    }
}

/// Indices of live subjects, in input order.
pub(crate) fn live_indices(subjects: &[Subject]) -> Vec<usize> {
    subjects
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_live())
        .map(|(i, _)| i)
        .collect()
}

/// Exclude a subject and record the liveness change.
pub(crate) fn exclude_logged(
    subject: &mut Subject,
    block_id: u32,
    input_key: &str,
    input: Value,
    log: &mut CalculationLogManager,
) {
    subject.exclude(block_id);
    log.record(
        subject.seq_number,
        CalculationLog::new(
            input_key,
            input,
            "filtered_block_id",
            Value::from(subject.filtered_block_id),
        ),
    );
}

fn default_score_prop() -> String {
    "score".to_string()
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Params {
        a: i32,
        b: String,
    }

    #[test]
    fn test_block_type_tags_round_trip() {
        for block_type in BlockType::ALL {
            assert_eq!(BlockType::from_tag(block_type.tag()), Some(block_type));
        }
        assert!(BlockType::Variable.is_declaration_only());
        assert!(!BlockType::Formula.is_declaration_only());
    }

    #[test]
    fn test_parse_params_body_wins() {
        let params: Params = parse_params(
            BlockType::Formula,
            1,
            &json!({"a": 1, "b": "header"}),
            &json!({"b": "body"}),
        )
        .unwrap();
        assert_eq!(
            params,
            Params {
                a: 1,
                b: "body".to_string()
            }
        );
    }

    #[test]
    fn test_parse_params_reports_block() {
        let err = parse_params::<Params>(BlockType::Ratio, 42, &json!(null), &json!({"a": 1}))
            .unwrap_err();
        assert!(matches!(
            err,
            ScoreError::InvalidBlockParams {
                block_id: 42,
                block_type: 12,
                ..
            }
        ));
    }
}
