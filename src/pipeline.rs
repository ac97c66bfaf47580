//! Pipeline definitions and the component orchestrator.
//!
//! A pipeline is an ordered list of components. Each component owns at
//! most one division and a chain of blocks; components run one after the
//! other, each seeing the context and subjects left by the previous one.

use crate::block::BlockFlow;
use crate::case::{enumerate_cases, is_runtime_block, merge_subjects, run_case};
use crate::context::Context;
use crate::division::DivisionHeadData;
use crate::error::ScoreError;
use crate::result::ScoringResult;
use crate::subject::Subject;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One block row set inside a component.
///
/// `header_cells` holds parameters shared by every case; `body_cells[i]`
/// holds case `i`'s parameters, or applies to all cases when it is the only
/// row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub block_id: u32,
    pub block_type: u32,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub header_cells: serde_json::Value,
    #[serde(default)]
    pub body_cells: Vec<serde_json::Value>,
}

/// One pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub component_id: u32,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub division: Option<DivisionHeadData>,
    #[serde(default)]
    pub blocks: Vec<BlockDefinition>,
}

impl ComponentDefinition {
    /// Run this component over `subjects`, updating both arguments in place.
    ///
    /// Cases run in leaf order. Each starts from the running context and
    /// its own subject snapshot; on completion its subjects are merged back
    /// by `seq_number` and its context becomes the running context. Cases
    /// without subjects are skipped; dropped cases leave no trace.
    pub fn run(&self, context: &mut Context, subjects: &mut [Subject]) -> Result<(), ScoreError> {
        let mut blocks: Vec<&BlockDefinition> =
            self.blocks.iter().filter(|b| is_runtime_block(b)).collect();
        blocks.sort_by_key(|b| b.order);

        let cases = enumerate_cases(self.division.as_ref(), context, subjects)?;
        for mut case in cases {
            if case.subjects.is_empty() {
                debug!(
                    component_id = self.component_id,
                    case_index = case.case_index,
                    "skipping empty case"
                );
                continue;
            }
            debug!(
                component_id = self.component_id,
                case_index = case.case_index,
                subjects = case.subjects.len(),
                "running case: {}",
                case.description()
            );

            case.context = context.clone();
            match run_case(self.component_id, &blocks, &mut case)? {
                BlockFlow::Continue => {
                    merge_subjects(subjects, case.subjects);
                    *context = case.context;
                }
                BlockFlow::DropCase => {}
            }
        }
        Ok(())
    }
}

/// An ordered set of components.
///
/// # Examples
///
/// ```rust
/// use scorepipe::{Context, ScoringPipeline, Subject};
/// use serde_json::json;
///
/// let pipeline: ScoringPipeline = serde_json::from_value(json!({
///     "components": [{
///         "component_id": 1,
///         "blocks": [
///             {"block_id": 10, "block_type": 12, "body_cells": [{"ratio": 50}]},
///             {"block_id": 11, "block_type": 11, "order": 1,
///              "body_cells": [{"method": "sum"}]}
///         ]
///     }]
/// })).unwrap();
///
/// let mut a = Subject::new(1);
/// a.score = 80.0;
/// let mut b = Subject::new(2);
/// b.score = 60.0;
///
/// let result = pipeline.run(Context::new(), vec![a, b]).unwrap();
/// assert_eq!(result.final_score(), 70.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringPipeline {
    components: Vec<ComponentDefinition>,
}

impl ScoringPipeline {
    pub fn new(components: Vec<ComponentDefinition>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[ComponentDefinition] {
        &self.components
    }

    /// Add a component; it runs according to its `order`.
    pub fn push(&mut self, component: ComponentDefinition) {
        self.components.push(component);
    }

    /// Run every component in `order` and return the final state.
    ///
    /// # Errors
    ///
    /// The first division or block error aborts the run.
    pub fn run(&self, context: Context, subjects: Vec<Subject>) -> Result<ScoringResult, ScoreError> {
        let mut context = context;
        let mut subjects = subjects;

        let mut components: Vec<&ComponentDefinition> = self.components.iter().collect();
        components.sort_by_key(|c| c.order);
        for component in components {
            debug!(component_id = component.component_id, "running component");
            component.run(&mut context, &mut subjects)?;
        }
        Ok(ScoringResult::new(context, subjects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::test_support::subject;
    use serde_json::json;

    fn component(component_id: u32, order: i32, blocks: serde_json::Value) -> ComponentDefinition {
        serde_json::from_value(json!({
            "component_id": component_id,
            "order": order,
            "blocks": blocks
        }))
        .unwrap()
    }

    #[test]
    fn test_components_run_in_order() {
        let pipeline = ScoringPipeline::new(vec![
            component(2, 2, json!([{"block_id": 2, "block_type": 12, "body_cells": [{"ratio": 50}]}])),
            component(1, 1, json!([{"block_id": 1, "block_type": 9, "body_cells": [
                {"output_prop": "score", "expression": "#{score} + 10"}
            ]}])),
        ]);
        let result = pipeline
            .run(Context::new(), vec![subject(1, "A", 70.0)])
            .unwrap();
        assert_eq!(result.subjects[0].score, 40.0);
    }

    #[test]
    fn test_blocks_sorted_by_order() {
        let pipeline = ScoringPipeline::new(vec![component(1, 0, json!([
            {"block_id": 1, "block_type": 12, "order": 2, "body_cells": [{"ratio": 50}]},
            {"block_id": 2, "block_type": 9, "order": 1, "body_cells": [
                {"output_prop": "score", "expression": "#{score} + 10"}
            ]}
        ]))]);
        let result = pipeline
            .run(Context::new(), vec![subject(1, "A", 70.0)])
            .unwrap();
        assert_eq!(result.subjects[0].score, 40.0);
    }

    #[test]
    fn test_dropped_case_leaves_no_trace() {
        let pipeline = ScoringPipeline::new(vec![component(1, 0, json!([
            {"block_id": 1, "block_type": 12, "order": 1, "body_cells": [{"ratio": 50}]},
            {"block_id": 2, "block_type": 10, "order": 2, "body_cells": [
                {"variable_scope": "context", "expression": "1 > 2"}
            ]}
        ]))]);
        let result = pipeline
            .run(Context::new(), vec![subject(1, "A", 70.0)])
            .unwrap();
        assert_eq!(result.subjects[0].score, 70.0);
        assert!(result.subjects[0].snapshot.is_empty());
    }

    #[test]
    fn test_declaration_blocks_ignored() {
        let pipeline = ScoringPipeline::new(vec![component(1, 0, json!([
            {"block_id": 1, "block_type": 14, "body_cells": [{"anything": true}]}
        ]))]);
        let result = pipeline
            .run(Context::new(), vec![subject(1, "A", 70.0)])
            .unwrap();
        assert_eq!(result.subjects[0].score, 70.0);
    }
}
