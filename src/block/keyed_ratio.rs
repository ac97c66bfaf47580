//! Percentage multipliers keyed by a subject classification.
//!
//! Grade, subject-group (organization code) and separation ratios share one
//! executor and differ only in which field selects the percentage.

use super::{default_score_prop, BlockExecutor, BlockFlow, BlockType};
use crate::calc_log::{CalculationLog, CalculationLogManager};
use crate::context::Context;
use crate::error::ScoreError;
use crate::property::PropertyAccess;
use crate::subject::Subject;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which subject field picks the ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioKey {
    Grade,
    OrganizationCode,
    SeparationCode,
}

impl RatioKey {
    fn field(self) -> &'static str {
        match self {
            RatioKey::Grade => "grade",
            RatioKey::OrganizationCode => "organization_code",
            RatioKey::SeparationCode => "separation_code",
        }
    }

    fn block_type(self) -> BlockType {
        match self {
            RatioKey::Grade => BlockType::GradeRatio,
            RatioKey::OrganizationCode => BlockType::SubjectGroupRatio,
            RatioKey::SeparationCode => BlockType::SeparationRatio,
        }
    }

    fn key_of(self, subject: &Subject) -> &str {
        match self {
            RatioKey::Grade => &subject.grade,
            RatioKey::OrganizationCode => &subject.organization_code,
            RatioKey::SeparationCode => &subject.separation_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedRatioParams {
    #[serde(default = "default_score_prop")]
    pub input_prop: String,
    #[serde(default = "default_score_prop")]
    pub output_prop: String,
    /// Percentages by key, e.g. `{"1": 20, "2": 40, "3": 40}`.
    pub ratios: BTreeMap<String, f64>,
    /// Percentage for keys missing from `ratios`; such subjects are left
    /// unchanged when absent.
    #[serde(default)]
    pub default_ratio: Option<f64>,
}

/// Multiplies a subject property by the percentage for its key.
///
/// # Examples
///
/// ```rust
/// use scorepipe::block::keyed_ratio::{KeyedRatio, KeyedRatioParams, RatioKey};
/// use scorepipe::block::BlockExecutor;
/// use scorepipe::calc_log::CalculationLogManager;
/// use scorepipe::{Context, Subject};
///
/// let params = KeyedRatioParams {
///     input_prop: "score".to_string(),
///     output_prop: "score".to_string(),
///     ratios: [("1".to_string(), 20.0), ("2".to_string(), 80.0)].into_iter().collect(),
///     default_ratio: None,
/// };
/// let block = KeyedRatio::new(4, RatioKey::Grade, params);
///
/// let mut subject = Subject::new(1);
/// subject.grade = "2".to_string();
/// subject.score = 50.0;
/// let mut subjects = vec![subject];
///
/// let mut log = CalculationLogManager::new(4, 5, 0);
/// block.execute(&mut Context::new(), &mut subjects, &mut log).unwrap();
/// assert_eq!(subjects[0].score, 40.0);
/// ```
#[derive(Debug, Clone)]
pub struct KeyedRatio {
    block_id: u32,
    key: RatioKey,
    params: KeyedRatioParams,
}

impl KeyedRatio {
    pub fn new(block_id: u32, key: RatioKey, params: KeyedRatioParams) -> Self {
        Self {
            block_id,
            key,
            params,
        }
    }

    fn ratio_for(&self, subject: &Subject) -> Option<f64> {
        self.params
            .ratios
            .get(self.key.key_of(subject))
            .copied()
            .or(self.params.default_ratio)
    }
}

impl BlockExecutor for KeyedRatio {
    fn block_id(&self) -> u32 {
        self.block_id
    }

    fn block_type(&self) -> BlockType {
        self.key.block_type()
    }

    fn execute(
        &self,
        _context: &mut Context,
        subjects: &mut [Subject],
        log: &mut CalculationLogManager,
    ) -> Result<BlockFlow, ScoreError> {
        let input_prop = self.params.input_prop.as_str();
        let output_prop = self.params.output_prop.as_str();
        for subject in subjects.iter_mut().filter(|s| s.is_live()) {
            let input = subject.get_property(input_prop);
            let output = match self.ratio_for(subject) {
                Some(percent) => Value::Number(input.to_number() * percent / 100.0),
                None => {
                    tracing::debug!(
                        block_id = self.block_id,
                        seq_number = subject.seq_number,
                        key = self.key.key_of(subject),
                        "no ratio for key, leaving value unchanged"
                    );
                    input.clone()
                }
            };
            subject.set_property(output_prop, output.clone());
            log.record(
                subject.seq_number,
                CalculationLog::new(input_prop, input, output_prop, output),
            );
        }
        Ok(BlockFlow::Continue)
    }

    fn description(&self) -> String {
        format!(
            "{}_ratio({} -> {})",
            self.key.field(),
            self.params.input_prop,
            self.params.output_prop
        )
    }
}
