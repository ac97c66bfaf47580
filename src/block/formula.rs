//! Expression-driven blocks: Formula and Condition.
//!
//! Both substitute `#{name}` placeholders, then hand the result to the
//! expression language. At context scope the placeholders resolve against
//! the context; at subject scope against each live subject first and the
//! context second. A whole-expression aggregate (`AVG(score)`) always
//! reduces over the case's live subjects.
//!
//! Substitution is textual: a text value lands in the expression as-is. A
//! placeholder that may hold text, especially text with spaces, must be
//! quoted in the template, e.g. `'#{subject_name}' == 'Korean Lit'`;
//! unquoted it becomes a malformed expression and fails the block.

use super::{resolve_for_subject, BlockExecutor, BlockFlow, BlockType, VariableScope};
use crate::calc_log::{CalculationLog, CalculationLogManager};
use crate::context::Context;
use crate::dsl::eval::{NoScope, RecordScope};
use crate::dsl::Expression;
use crate::error::ScoreError;
use crate::placeholder::substitute;
use crate::property::PropertyAccess;
use crate::subject::Subject;
use crate::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaParams {
    #[serde(default)]
    pub variable_scope: VariableScope,
    pub output_prop: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionParams {
    #[serde(default)]
    pub variable_scope: VariableScope,
    pub expression: String,
}

/// Evaluate `template` at context scope.
fn evaluate_for_context(
    template: &str,
    context: &Context,
    subjects: &[Subject],
) -> Result<(String, Value), ScoreError> {
    let text = substitute(template, |name| context.get_property(name));
    let expression = Expression::parse(&text)?;
    let value = if expression.is_aggregate() {
        expression.evaluate_over(subjects.iter().filter(|s| s.is_live()))?
    } else {
        expression.evaluate(&NoScope)?
    };
    Ok((text, value))
}

/// Evaluate `template` once per live subject, without mutating anything.
fn evaluate_per_subject(
    template: &str,
    context: &Context,
    subjects: &[Subject],
) -> Result<Vec<(usize, String, Value)>, ScoreError> {
    let mut results = Vec::new();
    for index in super::live_indices(subjects) {
        let subject = &subjects[index];
        let text = substitute(template, |name| resolve_for_subject(name, subject, context));
        let expression = Expression::parse(&text)?;
        let value = if expression.is_aggregate() {
            expression.evaluate_over(subjects.iter().filter(|s| s.is_live()))?
        } else {
            expression.evaluate(&RecordScope::new(subject))?
        };
        results.push((index, text, value));
    }
    Ok(results)
}

/// Computes an expression into a context or subject property.
///
/// # Examples
///
/// ```rust
/// use scorepipe::block::formula::{Formula, FormulaParams};
/// use scorepipe::block::{BlockExecutor, VariableScope};
/// use scorepipe::calc_log::CalculationLogManager;
/// use scorepipe::{Context, Subject};
///
/// let block = Formula::new(2, FormulaParams {
///     variable_scope: VariableScope::Subject,
///     output_prop: "score".to_string(),
///     expression: "#{raw_score} * #{unit}".to_string(),
/// });
/// let mut subject = Subject::new(1);
/// subject.raw_score = 90.0;
/// subject.unit = 3.0;
/// let mut subjects = vec![subject];
///
/// let mut log = CalculationLogManager::new(2, 9, 0);
/// block.execute(&mut Context::new(), &mut subjects, &mut log).unwrap();
/// assert_eq!(subjects[0].score, 270.0);
/// ```
#[derive(Debug, Clone)]
pub struct Formula {
    block_id: u32,
    params: FormulaParams,
}

impl Formula {
    pub fn new(block_id: u32, params: FormulaParams) -> Self {
        Self { block_id, params }
    }
}

impl BlockExecutor for Formula {
    fn block_id(&self) -> u32 {
        self.block_id
    }

    fn block_type(&self) -> BlockType {
        BlockType::Formula
    }

    fn execute(
        &self,
        context: &mut Context,
        subjects: &mut [Subject],
        log: &mut CalculationLogManager,
    ) -> Result<BlockFlow, ScoreError> {
        let output_prop = self.params.output_prop.as_str();
        match self.params.variable_scope {
            VariableScope::Context => {
                let (text, value) = evaluate_for_context(&self.params.expression, context, subjects)?;
                context.set_property(output_prop, value.clone());
                log.record_context(CalculationLog::new(
                    self.params.expression.as_str(),
                    Value::Text(text),
                    output_prop,
                    value,
                ));
            }
            VariableScope::Subject => {
                for (index, text, value) in
                    evaluate_per_subject(&self.params.expression, context, subjects)?
                {
                    let subject = &mut subjects[index];
                    subject.set_property(output_prop, value.clone());
                    log.record(
                        subject.seq_number,
                        CalculationLog::new(
                            self.params.expression.as_str(),
                            Value::Text(text),
                            output_prop,
                            value,
                        ),
                    );
                }
            }
        }
        Ok(BlockFlow::Continue)
    }

    fn description(&self) -> String {
        format!("formula({} = {})", self.params.output_prop, self.params.expression)
    }
}

/// Gates a case or individual subjects on an expression.
///
/// At context scope a false result drops the whole case. At subject scope
/// each live subject whose result is false is excluded. The expression
/// `filtered_block_id == 0` is special: it clears the exclusion marker of
/// every subject in the case, re-admitting them.
#[derive(Debug, Clone)]
pub struct Condition {
    block_id: u32,
    params: ConditionParams,
    reinclusion: bool,
}

/// Whether `expression` is the re-inclusion rule, written with or without
/// placeholder braces.
fn is_reinclusion_rule(expression: &str) -> bool {
    let normalized: String = expression
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '#' | '{' | '}'))
        .collect();
    matches!(
        normalized.as_str(),
        "filtered_block_id==0" | "filteredBlockId==0"
    )
}

impl Condition {
    pub fn new(block_id: u32, params: ConditionParams) -> Self {
        let reinclusion = is_reinclusion_rule(&params.expression);
        Self {
            block_id,
            params,
            reinclusion,
        }
    }

    fn reinclude_all(&self, subjects: &mut [Subject], log: &mut CalculationLogManager) {
        for subject in subjects.iter_mut().filter(|s| !s.is_live()) {
            let previous = Value::from(subject.filtered_block_id);
            subject.reinclude();
            log.record(
                subject.seq_number,
                CalculationLog::new("filtered_block_id", previous, "filtered_block_id", Value::from(0u32)),
            );
        }
    }
}

impl BlockExecutor for Condition {
    fn block_id(&self) -> u32 {
        self.block_id
    }

    fn block_type(&self) -> BlockType {
        BlockType::Condition
    }

    fn execute(
        &self,
        context: &mut Context,
        subjects: &mut [Subject],
        log: &mut CalculationLogManager,
    ) -> Result<BlockFlow, ScoreError> {
        if self.reinclusion {
            self.reinclude_all(subjects, log);
            return Ok(BlockFlow::Continue);
        }

        let expression = self.params.expression.as_str();
        match self.params.variable_scope {
            VariableScope::Context => {
                let (text, value) = evaluate_for_context(expression, context, subjects)?;
                let passed = value.is_truthy();
                log.record_context(CalculationLog::new(
                    expression,
                    Value::Text(text),
                    "condition",
                    Value::Bool(passed),
                ));
                if !passed {
                    tracing::debug!(block_id = self.block_id, expression, "condition dropped case");
                    return Ok(BlockFlow::DropCase);
                }
            }
            VariableScope::Subject => {
                for (index, text, value) in evaluate_per_subject(expression, context, subjects)? {
                    let subject = &mut subjects[index];
                    if value.is_truthy() {
                        log.record(
                            subject.seq_number,
                            CalculationLog::new(expression, Value::Text(text), "filtered_block_id", Value::from(0u32)),
                        );
                    } else {
                        super::exclude_logged(subject, self.block_id, expression, Value::Text(text), log);
                    }
                }
            }
        }
        Ok(BlockFlow::Continue)
    }

    fn description(&self) -> String {
        format!("condition({:?}: {})", self.params.variable_scope, self.params.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::test_support::subject;

    fn condition(scope: VariableScope, expression: &str) -> Condition {
        Condition::new(
            20,
            ConditionParams {
                variable_scope: scope,
                expression: expression.to_string(),
            },
        )
    }

    #[test]
    fn test_context_formula_with_aggregate() {
        let mut subjects = vec![subject(1, "A", 80.0), subject(2, "A", 90.0), subject(3, "A", 10.0)];
        subjects[2].exclude(4);
        let block = Formula::new(
            3,
            FormulaParams {
                variable_scope: VariableScope::Context,
                output_prop: "final_score".to_string(),
                expression: "AVG(score)".to_string(),
            },
        );
        let mut context = Context::new();
        let mut log = CalculationLogManager::new(3, 9, 0);
        block.execute(&mut context, &mut subjects, &mut log).unwrap();
        assert_eq!(context.final_score, 85.0);
    }

    #[test]
    fn test_subject_formula_reads_context_fallback() {
        let mut subjects = vec![subject(1, "A", 50.0)];
        let mut context = Context::new();
        context.set_property("bonus", Value::from(5.0));
        let block = Formula::new(
            3,
            FormulaParams {
                variable_scope: VariableScope::Subject,
                output_prop: "adjusted".to_string(),
                expression: "#{score} + #{bonus}".to_string(),
            },
        );
        let mut log = CalculationLogManager::new(3, 9, 0);
        block.execute(&mut context, &mut subjects, &mut log).unwrap();
        assert_eq!(subjects[0].get_property("adjusted"), Value::from(55.0));
        assert_eq!(
            log.logs_for(1)[0].input,
            Value::from("50 + 5")
        );
    }

    #[test]
    fn test_formula_syntax_error_raises() {
        let block = Formula::new(
            3,
            FormulaParams {
                variable_scope: VariableScope::Subject,
                output_prop: "x".to_string(),
                expression: "#{score} +".to_string(),
            },
        );
        let mut subjects = vec![subject(1, "A", 50.0)];
        let mut log = CalculationLogManager::new(3, 9, 0);
        assert!(block
            .execute(&mut Context::new(), &mut subjects, &mut log)
            .is_err());
        assert!(subjects[0].get_property("x").is_unresolved());
    }

    #[test]
    fn test_context_condition_drops_case() {
        let mut context = Context::new();
        context.graduate_year = 2019;
        let mut log = CalculationLogManager::new(20, 10, 0);
        let flow = condition(VariableScope::Context, "#{graduate_year} >= 2020")
            .execute(&mut context, &mut [], &mut log)
            .unwrap();
        assert_eq!(flow, BlockFlow::DropCase);

        context.graduate_year = 2021;
        let flow = condition(VariableScope::Context, "#{graduate_year} >= 2020")
            .execute(&mut context, &mut [], &mut log)
            .unwrap();
        assert_eq!(flow, BlockFlow::Continue);
    }

    #[test]
    fn test_subject_condition_filters() {
        let mut subjects = vec![subject(1, "A", 40.0), subject(2, "A", 75.0)];
        let mut log = CalculationLogManager::new(20, 10, 0);
        condition(VariableScope::Subject, "#{score} >= 60")
            .execute(&mut Context::new(), &mut subjects, &mut log)
            .unwrap();
        assert_eq!(subjects[0].filtered_block_id, 20);
        assert!(subjects[1].is_live());
    }

    #[test]
    fn test_quoted_text_with_spaces_compares() {
        let mut subjects = vec![subject(1, "A", 80.0), subject(2, "A", 80.0)];
        subjects[0].subject_name = "Korean Lit".to_string();
        subjects[1].subject_name = "Algebra".to_string();
        let mut log = CalculationLogManager::new(21, 10, 0);
        condition(VariableScope::Subject, "'#{subject_name}' == 'Korean Lit'")
            .execute(&mut Context::new(), &mut subjects, &mut log)
            .unwrap();
        assert!(subjects[0].is_live());
        assert_eq!(subjects[1].filtered_block_id, 21);
    }

    #[test]
    fn test_reinclusion_rule_clears_markers() {
        let mut subjects = vec![subject(1, "A", 40.0), subject(2, "A", 75.0)];
        subjects[0].exclude(3);
        let mut log = CalculationLogManager::new(20, 10, 0);
        condition(VariableScope::Subject, "#{filtered_block_id} == 0")
            .execute(&mut Context::new(), &mut subjects, &mut log)
            .unwrap();
        assert!(subjects.iter().all(Subject::is_live));
        assert_eq!(log.logs_for(1)[0].input, Value::from(3u32));
        assert!(is_reinclusion_rule("filtered_block_id == 0"));
        assert!(!is_reinclusion_rule("filtered_block_id == 3"));
    }
}
