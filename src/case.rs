//! Case enumeration and execution.
//!
//! A component with an active division is split into one case per leaf of
//! its criteria tree. Each case holds the subjects its root-to-leaf path
//! admitted and runs the component's blocks against private copies, which
//! the component merges back afterwards.

use crate::block::registry::create_executor;
use crate::block::{BlockFlow, BlockType};
use crate::calc_log::CalculationLogManager;
use crate::context::Context;
use crate::division::codec::grid_to_tree;
use crate::division::predicate::DivisionType;
use crate::division::DivisionHeadData;
use crate::error::ScoreError;
use crate::pipeline::BlockDefinition;
use crate::subject::Subject;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// One leaf of a division: the snapshot a block chain runs against.
#[derive(Debug, Clone, PartialEq)]
pub struct DivisionCase {
    /// Leaf position in grid-row order; selects each block's body row.
    pub case_index: usize,
    /// Criteria along the root-to-leaf path.
    pub criteria: Vec<String>,
    pub subjects: Vec<Subject>,
    pub context: Context,
}

impl DivisionCase {
    /// The single case used when a component has no active division.
    pub fn implicit(context: &Context, subjects: &[Subject]) -> Self {
        Self {
            case_index: 0,
            criteria: Vec::new(),
            subjects: subjects.to_vec(),
            context: context.clone(),
        }
    }

    pub fn description(&self) -> String {
        if self.criteria.is_empty() {
            "all subjects".to_string()
        } else {
            self.criteria.join(" / ")
        }
    }
}

/// Split `subjects` into the cases of `division`.
///
/// Without an active division, or with an empty grid, the result is one
/// implicit case holding every subject. Cases come out in leaf order,
/// including cases whose subject set ends up empty.
///
/// # Errors
///
/// [`ScoreError::InvalidDivision`] when the grid is malformed, a column has
/// no declared kind, or a cell does not fit its column's kind.
///
/// # Examples
///
/// ```rust
/// use scorepipe::case::enumerate_cases;
/// use scorepipe::division::{DivisionHeadData, DivisionHeader, GridCell};
/// use scorepipe::{Context, Subject};
/// use serde_json::json;
///
/// let division = DivisionHeadData {
///     block_id: 1,
///     header: vec![DivisionHeader { division_type: "subject_group".to_string() }],
///     body: vec![
///         vec![GridCell::new(json!({"subject_groups": ["KOR"]}), 1)],
///         vec![GridCell::new(json!({"subject_groups": ["MATH"]}), 1)],
///     ],
///     is_active: true,
/// };
/// let mut kor = Subject::new(1);
/// kor.subject_group = "KOR".to_string();
/// let mut math = Subject::new(2);
/// math.subject_group = "MATH".to_string();
///
/// let cases = enumerate_cases(Some(&division), &Context::new(), &[kor, math]).unwrap();
/// assert_eq!(cases.len(), 2);
/// assert_eq!(cases[1].subjects[0].seq_number, 2);
/// ```
pub fn enumerate_cases(
    division: Option<&DivisionHeadData>,
    context: &Context,
    subjects: &[Subject],
) -> Result<Vec<DivisionCase>, ScoreError> {
    let Some(division) = division.filter(|d| d.is_active && !d.body.is_empty()) else {
        return Ok(vec![DivisionCase::implicit(context, subjects)]);
    };

    let tree = grid_to_tree(&division.body)?;
    let mut cases = Vec::new();
    let mut stack: Vec<(NodeIndex, Vec<Subject>, Vec<String>)> = tree
        .roots()
        .iter()
        .rev()
        .map(|&root| (root, subjects.to_vec(), Vec::new()))
        .collect();

    while let Some((node, inherited, mut criteria)) = stack.pop() {
        let cell = tree.cell(node);
        let header = division.header.get(cell.col_index).ok_or_else(|| {
            ScoreError::InvalidDivision(format!(
                "division {} has no header for column {}",
                division.block_id, cell.col_index
            ))
        })?;
        let predicate = DivisionType::from_cell(&header.division_type, &cell.values)?;
        let narrowed = predicate.apply(context, inherited);
        criteria.push(predicate.describe());

        let children = tree.children(node);
        if children.is_empty() {
            cases.push(DivisionCase {
                case_index: cases.len(),
                criteria,
                subjects: narrowed,
                context: context.clone(),
            });
            continue;
        }
        for child in children.into_iter().rev() {
            stack.push((child, narrowed.clone(), criteria.clone()));
        }
    }

    debug!(
        division = division.block_id,
        cases = cases.len(),
        "enumerated division cases"
    );
    Ok(cases)
}

/// The body row a block uses in case `case_index`.
///
/// A single row applies to every case.
fn body_row(block: &BlockDefinition, case_index: usize) -> Option<&serde_json::Value> {
    match block.body_cells.as_slice() {
        [only] => Some(only),
        rows => rows.get(case_index),
    }
}

/// Run `blocks` in the given order against one case.
///
/// Returns [`BlockFlow::DropCase`] as soon as a block asks for it; the
/// caller then discards the case.
///
/// # Errors
///
/// Any block error, wrapped in [`ScoreError::BlockFailed`].
pub fn run_case(
    component_id: u32,
    blocks: &[&BlockDefinition],
    case: &mut DivisionCase,
) -> Result<BlockFlow, ScoreError> {
    let case_index = case.case_index;
    for block in blocks {
        let fail = |source: ScoreError| {
            error!(
                component_id,
                block_id = block.block_id,
                case_index,
                "block failed: {}",
                source
            );
            ScoreError::BlockFailed {
                component_id,
                block_id: block.block_id,
                source: Box::new(source),
            }
        };

        let Some(row) = body_row(block, case_index) else {
            warn!(
                component_id,
                block_id = block.block_id,
                case_index,
                "no body row for case, skipping block"
            );
            continue;
        };
        let Some(executor) =
            create_executor(block.block_type, block.block_id, case_index, row, &block.header_cells)
                .map_err(fail)?
        else {
            continue;
        };

        let mut log = CalculationLogManager::new(block.block_id, block.block_type, case_index);
        let flow = executor
            .execute(&mut case.context, &mut case.subjects, &mut log)
            .map_err(fail)?;
        log.commit_subjects(&mut case.subjects);
        log.commit_context(&mut case.context);

        if flow == BlockFlow::DropCase {
            debug!(
                component_id,
                block_id = block.block_id,
                case_index,
                "case dropped"
            );
            return Ok(BlockFlow::DropCase);
        }
    }
    Ok(BlockFlow::Continue)
}

/// Write case results back over the running subjects, matched by
/// `seq_number`. Running subjects the case did not hold are untouched.
pub fn merge_subjects(running: &mut [Subject], case_subjects: Vec<Subject>) {
    let positions: HashMap<u32, usize> = running
        .iter()
        .enumerate()
        .map(|(i, s)| (s.seq_number, i))
        .collect();
    for subject in case_subjects {
        if let Some(&i) = positions.get(&subject.seq_number) {
            running[i] = subject;
        }
    }
}

/// Whether a block definition runs per case, as opposed to declaring a
/// division or a variable.
pub(crate) fn is_runtime_block(block: &BlockDefinition) -> bool {
    BlockType::from_tag(block.block_type).map_or(true, |t| !t.is_declaration_only())
}
