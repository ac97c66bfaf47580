//! Single-value arithmetic blocks: Ratio and Decimal.

use super::{default_score_prop, BlockExecutor, BlockFlow, BlockType, VariableScope};
use crate::calc_log::{CalculationLog, CalculationLogManager};
use crate::context::Context;
use crate::error::ScoreError;
use crate::numeric::DecimalMethod;
use crate::property::PropertyAccess;
use crate::subject::Subject;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Apply `op` to `input_prop` of the context or of every live subject.
fn apply_scoped(
    scope: VariableScope,
    input_prop: &str,
    output_prop: &str,
    context: &mut Context,
    subjects: &mut [Subject],
    log: &mut CalculationLogManager,
    op: impl Fn(f64) -> f64,
) {
    match scope {
        VariableScope::Context => {
            let input = context.get_property(input_prop);
            let output = Value::from(op(input.to_number()));
            context.set_property(output_prop, output.clone());
            log.record_context(CalculationLog::new(input_prop, input, output_prop, output));
        }
        VariableScope::Subject => {
            for subject in subjects.iter_mut().filter(|s| s.is_live()) {
                let input = subject.get_property(input_prop);
                let output = Value::from(op(input.to_number()));
                subject.set_property(output_prop, output.clone());
                log.record(
                    subject.seq_number,
                    CalculationLog::new(input_prop, input, output_prop, output),
                );
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioParams {
    #[serde(default)]
    pub variable_scope: VariableScope,
    #[serde(default = "default_score_prop")]
    pub input_prop: String,
    /// Defaults to `input_prop`.
    #[serde(default)]
    pub output_prop: Option<String>,
    /// Percentage, so `50` halves the value.
    pub ratio: f64,
}

/// Multiplies a value by a fixed percentage.
///
/// # Examples
///
/// ```rust
/// use scorepipe::block::scalar::{Ratio, RatioParams};
/// use scorepipe::block::{BlockExecutor, VariableScope};
/// use scorepipe::calc_log::CalculationLogManager;
/// use scorepipe::{Context, Subject};
///
/// let block = Ratio::new(5, RatioParams {
///     variable_scope: VariableScope::Subject,
///     input_prop: "score".to_string(),
///     output_prop: None,
///     ratio: 50.0,
/// });
/// let mut subject = Subject::new(1);
/// subject.score = 90.0;
/// let mut subjects = vec![subject];
/// let mut log = CalculationLogManager::new(5, 12, 0);
/// block.execute(&mut Context::new(), &mut subjects, &mut log).unwrap();
/// assert_eq!(subjects[0].score, 45.0);
/// ```
#[derive(Debug, Clone)]
pub struct Ratio {
    block_id: u32,
    params: RatioParams,
}

impl Ratio {
    pub fn new(block_id: u32, params: RatioParams) -> Self {
        Self { block_id, params }
    }

    fn output_prop(&self) -> &str {
        self.params
            .output_prop
            .as_deref()
            .unwrap_or(&self.params.input_prop)
    }
}

impl BlockExecutor for Ratio {
    fn block_id(&self) -> u32 {
        self.block_id
    }

    fn block_type(&self) -> BlockType {
        BlockType::Ratio
    }

    fn execute(
        &self,
        context: &mut Context,
        subjects: &mut [Subject],
        log: &mut CalculationLogManager,
    ) -> Result<BlockFlow, ScoreError> {
        let percent = self.params.ratio;
        apply_scoped(
            self.params.variable_scope,
            &self.params.input_prop,
            self.output_prop(),
            context,
            subjects,
            log,
            |value| value * percent / 100.0,
        );
        Ok(BlockFlow::Continue)
    }

    fn description(&self) -> String {
        format!("ratio({} * {}%)", self.params.input_prop, self.params.ratio)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecimalParams {
    #[serde(default)]
    pub variable_scope: VariableScope,
    #[serde(default = "default_score_prop")]
    pub input_prop: String,
    #[serde(default = "default_score_prop")]
    pub output_prop: String,
    #[serde(default)]
    pub digits: i32,
    #[serde(default)]
    pub method: DecimalMethod,
}

/// Rounds a value with one of the float-safe [`DecimalMethod`] rules.
#[derive(Debug, Clone)]
pub struct Decimal {
    block_id: u32,
    params: DecimalParams,
}

impl Decimal {
    pub fn new(block_id: u32, params: DecimalParams) -> Self {
        Self { block_id, params }
    }
}

impl BlockExecutor for Decimal {
    fn block_id(&self) -> u32 {
        self.block_id
    }

    fn block_type(&self) -> BlockType {
        BlockType::Decimal
    }

    fn execute(
        &self,
        context: &mut Context,
        subjects: &mut [Subject],
        log: &mut CalculationLogManager,
    ) -> Result<BlockFlow, ScoreError> {
        let (method, digits) = (self.params.method, self.params.digits);
        apply_scoped(
            self.params.variable_scope,
            &self.params.input_prop,
            &self.params.output_prop,
            context,
            subjects,
            log,
            |value| method.apply(value, digits),
        );
        Ok(BlockFlow::Continue)
    }

    fn description(&self) -> String {
        format!(
            "decimal({:?} {} to {} digits)",
            self.params.method, self.params.input_prop, self.params.digits
        )
    }
}
