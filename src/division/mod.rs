//! Division blocks: the branching criteria of a component.
//!
//! A division is authored as a rowspan-merged grid. Each column is one
//! criterion level whose kind is declared in the header; each row is one
//! root-to-leaf path. [`codec`] converts the grid to a [`tree::DivisionTree`]
//! and back, and [`predicate`] turns a cell into the filter applied at that
//! node.

pub mod codec;
pub mod predicate;
pub mod tree;

use serde::{Deserialize, Serialize};

/// One grid cell. A cell with `rowspan > 0` starts a node covering that many
/// rows; covered rows below it hold `{values: None, rowspan: 0}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridCell {
    #[serde(default)]
    pub values: Option<serde_json::Value>,
    #[serde(default)]
    pub rowspan: usize,
}

impl GridCell {
    pub fn new(values: serde_json::Value, rowspan: usize) -> Self {
        Self {
            values: Some(values),
            rowspan,
        }
    }

    /// A continuation cell under a merged node.
    pub fn covered() -> Self {
        Self::default()
    }
}

/// Declares the criterion kind of one grid column, e.g. `"graduate_year"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionHeader {
    pub division_type: String,
}

/// A component's division block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionHeadData {
    pub block_id: u32,
    pub header: Vec<DivisionHeader>,
    pub body: Vec<Vec<GridCell>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
