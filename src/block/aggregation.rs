//! Reduce live subjects into a single context value.

use super::{default_score_prop, BlockExecutor, BlockFlow, BlockType};
use crate::calc_log::{CalculationLog, CalculationLogManager};
use crate::context::Context;
use crate::error::ScoreError;
use crate::property::PropertyAccess;
use crate::subject::Subject;
use crate::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    /// `Σ(value × unit) / Σ unit`.
    #[default]
    UnitWeightedAverage,
    Average,
    Count,
    Sum,
}

impl AggregationMethod {
    /// Reduce `(value, unit)` pairs. Empty input and a zero unit total give 0.
    pub fn reduce(self, pairs: &[(f64, f64)]) -> f64 {
        match self {
            AggregationMethod::Count => pairs.len() as f64,
            AggregationMethod::Sum => pairs.iter().map(|(v, _)| v).sum(),
            AggregationMethod::Average => {
                if pairs.is_empty() {
                    0.0
                } else {
                    pairs.iter().map(|(v, _)| v).sum::<f64>() / pairs.len() as f64
                }
            }
            AggregationMethod::UnitWeightedAverage => {
                let units: f64 = pairs.iter().map(|(_, u)| u).sum();
                if units == 0.0 {
                    0.0
                } else {
                    pairs.iter().map(|(v, u)| v * u).sum::<f64>() / units
                }
            }
        }
    }
}

fn default_output_prop() -> String {
    "final_score".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationParams {
    #[serde(default = "default_score_prop")]
    pub input_prop: String,
    #[serde(default = "default_output_prop")]
    pub output_prop: String,
    #[serde(default)]
    pub method: AggregationMethod,
}

/// Writes an aggregate of live subjects into the context.
///
/// Subjects whose input is not a number are left out of the reduction
/// (except for `count`, which counts every live subject).
///
/// # Examples
///
/// ```rust
/// use scorepipe::block::aggregation::{Aggregation, AggregationMethod, AggregationParams};
/// use scorepipe::block::BlockExecutor;
/// use scorepipe::calc_log::CalculationLogManager;
/// use scorepipe::{Context, Subject};
///
/// let mut a = Subject::new(1);
/// a.score = 90.0;
/// a.unit = 3.0;
/// let mut b = Subject::new(2);
/// b.score = 70.0;
/// b.unit = 1.0;
/// let mut subjects = vec![a, b];
///
/// let block = Aggregation::new(30, AggregationParams {
///     input_prop: "score".to_string(),
///     output_prop: "final_score".to_string(),
///     method: AggregationMethod::UnitWeightedAverage,
/// });
/// let mut context = Context::new();
/// let mut log = CalculationLogManager::new(30, 11, 0);
/// block.execute(&mut context, &mut subjects, &mut log).unwrap();
/// assert_eq!(context.final_score, 85.0);
/// ```
#[derive(Debug, Clone)]
pub struct Aggregation {
    block_id: u32,
    params: AggregationParams,
}

impl Aggregation {
    pub fn new(block_id: u32, params: AggregationParams) -> Self {
        Self { block_id, params }
    }
}

impl BlockExecutor for Aggregation {
    fn block_id(&self) -> u32 {
        self.block_id
    }

    fn block_type(&self) -> BlockType {
        BlockType::Aggregation
    }

    fn execute(
        &self,
        context: &mut Context,
        subjects: &mut [Subject],
        log: &mut CalculationLogManager,
    ) -> Result<BlockFlow, ScoreError> {
        let input_prop = self.params.input_prop.as_str();
        let output_prop = self.params.output_prop.as_str();
        let counting = self.params.method == AggregationMethod::Count;

        let mut pairs = Vec::new();
        let mut inputs = Vec::new();
        for subject in subjects.iter().filter(|s| s.is_live()) {
            let input = subject.get_property(input_prop);
            let value = input.to_number();
            if counting || !value.is_nan() {
                pairs.push((value, subject.unit));
            }
            inputs.push((subject.seq_number, input));
        }

        let result = self.params.method.reduce(&pairs);
        for (seq_number, input) in inputs {
            log.record(
                seq_number,
                CalculationLog::new(input_prop, input, output_prop, Value::from(result)),
            );
        }
        context.set_property(output_prop, Value::from(result));
        log.record_context(CalculationLog::new(
            input_prop,
            Value::from(pairs.len() as f64),
            output_prop,
            Value::from(result),
        ));
        tracing::debug!(
            block_id = self.block_id,
            method = ?self.params.method,
            inputs = pairs.len(),
            result,
            "aggregated subjects"
        );
        Ok(BlockFlow::Continue)
    }

    fn description(&self) -> String {
        format!(
            "aggregation({:?}: {} -> {})",
            self.params.method, self.params.input_prop, self.params.output_prop
        )
    }
}
