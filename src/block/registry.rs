//! Block type tag → executor factory.

use super::aggregation::{Aggregation, AggregationParams};
use super::apply_subject::{ApplySubject, ApplySubjectParams};
use super::apply_term::{ApplyTerm, ApplyTermParams};
use super::formula::{Condition, ConditionParams, Formula, FormulaParams};
use super::keyed_ratio::{KeyedRatio, KeyedRatioParams, RatioKey};
use super::scalar::{Decimal, DecimalParams, Ratio, RatioParams};
use super::score_map::{ScoreMap, ScoreMapParams};
use super::top_subject::{TopSubject, TopSubjectParams};
use super::{parse_params, BlockExecutor, BlockType};
use crate::error::ScoreError;

/// Build the executor for one block row of one case.
///
/// Returns `Ok(None)` for declaration-only block types and for tags this
/// engine does not know; the caller skips those blocks. Parameters that do
/// not fit the block type are an error.
///
/// # Examples
///
/// ```rust
/// use scorepipe::block::registry::create_executor;
/// use serde_json::json;
///
/// let executor = create_executor(12, 7, 0, &json!({"ratio": 50}), &json!(null))
///     .unwrap()
///     .unwrap();
/// assert_eq!(executor.block_id(), 7);
///
/// assert!(create_executor(14, 8, 0, &json!({}), &json!(null)).unwrap().is_none());
/// assert!(create_executor(99, 9, 0, &json!({}), &json!(null)).unwrap().is_none());
/// ```
pub fn create_executor(
    block_type: u32,
    block_id: u32,
    case_index: usize,
    body_row: &serde_json::Value,
    header_row: &serde_json::Value,
) -> Result<Option<Box<dyn BlockExecutor>>, ScoreError> {
    let Some(kind) = BlockType::from_tag(block_type) else {
        tracing::warn!(block_type, block_id, case_index, "unknown block type, skipping");
        return Ok(None);
    };

    let executor: Box<dyn BlockExecutor> = match kind {
        BlockType::Division | BlockType::Variable => return Ok(None),
        BlockType::ApplySubject => {
            let params: ApplySubjectParams = parse_params(kind, block_id, header_row, body_row)?;
            Box::new(ApplySubject::new(block_id, params))
        }
        BlockType::ApplyTerm => {
            let params: ApplyTermParams = parse_params(kind, block_id, header_row, body_row)?;
            Box::new(ApplyTerm::new(block_id, params))
        }
        BlockType::TopSubject => {
            let params: TopSubjectParams = parse_params(kind, block_id, header_row, body_row)?;
            Box::new(TopSubject::new(block_id, params))
        }
        BlockType::GradeRatio | BlockType::SubjectGroupRatio | BlockType::SeparationRatio => {
            let key = match kind {
                BlockType::GradeRatio => RatioKey::Grade,
                BlockType::SubjectGroupRatio => RatioKey::OrganizationCode,
                _ => RatioKey::SeparationCode,
            };
            let params: KeyedRatioParams = parse_params(kind, block_id, header_row, body_row)?;
            Box::new(KeyedRatio::new(block_id, key, params))
        }
        BlockType::ScoreMap => {
            let params: ScoreMapParams = parse_params(kind, block_id, header_row, body_row)?;
            Box::new(ScoreMap::new(block_id, params)?)
        }
        BlockType::Formula => {
            let params: FormulaParams = parse_params(kind, block_id, header_row, body_row)?;
            Box::new(Formula::new(block_id, params))
        }
        BlockType::Condition => {
            let params: ConditionParams = parse_params(kind, block_id, header_row, body_row)?;
            Box::new(Condition::new(block_id, params))
        }
        BlockType::Aggregation => {
            let params: AggregationParams = parse_params(kind, block_id, header_row, body_row)?;
            Box::new(Aggregation::new(block_id, params))
        }
        BlockType::Ratio => {
            let params: RatioParams = parse_params(kind, block_id, header_row, body_row)?;
            Box::new(Ratio::new(block_id, params))
        }
        BlockType::Decimal => {
            let params: DecimalParams = parse_params(kind, block_id, header_row, body_row)?;
            Box::new(Decimal::new(block_id, params))
        }
    };

    tracing::debug!(
        block_id,
        case_index,
        executor = %executor.description(),
        "built executor"
    );
    Ok(Some(executor))
}
