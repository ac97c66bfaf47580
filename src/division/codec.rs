//! Conversion between rowspan-merged grids and [`DivisionTree`]s.
//!
//! Every root-to-leaf path is one grid row and every tree level one column.
//! The first row of a node carries its values with `rowspan` equal to its
//! leaf count; the rows it covers below carry [`GridCell::covered`].

use super::tree::DivisionTree;
use super::GridCell;
use crate::error::ScoreError;
use petgraph::graph::NodeIndex;

/// Render `tree` as a grid.
///
/// # Examples
///
/// ```rust
/// use scorepipe::division::codec::tree_to_grid;
/// use scorepipe::division::tree::DivisionTree;
/// use serde_json::json;
///
/// let mut tree = DivisionTree::new();
/// let root = tree.add_root(json!("2020"));
/// tree.add_child(root, json!("A"));
/// tree.add_child(root, json!("B"));
///
/// let grid = tree_to_grid(&tree);
/// assert_eq!(grid.len(), 2);
/// assert_eq!(grid[0][0].rowspan, 2);
/// assert_eq!(grid[1][0].rowspan, 0);
/// assert_eq!(grid[1][1].values, Some(json!("B")));
/// ```
pub fn tree_to_grid(tree: &DivisionTree) -> Vec<Vec<GridCell>> {
    let counts = tree.leaf_counts();
    let depth = tree.depth();
    let mut grid = Vec::new();
    let mut previous: Vec<NodeIndex> = Vec::new();

    for leaf in tree.leaves() {
        let path = tree.path_to(leaf);
        let row: Vec<GridCell> = (0..depth)
            .map(|col| match path.get(col) {
                Some(&node) if previous.get(col) != Some(&node) => GridCell::new(
                    tree.cell(node).values.clone(),
                    counts.get(&node).copied().unwrap_or(1),
                ),
                _ => GridCell::covered(),
            })
            .collect();
        grid.push(row);
        previous = path;
    }
    grid
}

/// A column range still to be decoded.
struct Span {
    parent: Option<NodeIndex>,
    col: usize,
    start: usize,
    end: usize,
}

/// Rebuild the tree encoded by `grid`.
///
/// Scans each column top to bottom within its parent's row range. A cell
/// with `rowspan > 0` starts a node; the next column restricted to the
/// node's rows holds its children.
///
/// # Errors
///
/// Returns [`ScoreError::InvalidDivision`] when a node's rowspan runs past
/// its parent's rows.
pub fn grid_to_tree(grid: &[Vec<GridCell>]) -> Result<DivisionTree, ScoreError> {
    let mut tree = DivisionTree::new();
    let mut pending = vec![Span {
        parent: None,
        col: 0,
        start: 0,
        end: grid.len(),
    }];

    while let Some(span) = pending.pop() {
        let mut children = Vec::new();
        let mut row = span.start;
        while row < span.end {
            let Some(cell) = grid[row].get(span.col) else {
                row += 1;
                continue;
            };
            if cell.rowspan == 0 {
                row += 1;
                continue;
            }
            let end = match row.checked_add(cell.rowspan) {
                Some(end) if end <= span.end => end,
                _ => {
                    return Err(ScoreError::InvalidDivision(format!(
                        "cell at row {row}, column {} spans {} rows but only {} remain",
                        span.col,
                        cell.rowspan,
                        span.end - row
                    )))
                }
            };
            let values = cell.values.clone().unwrap_or(serde_json::Value::Null);
            let node = match span.parent {
                Some(parent) => tree.add_child_at(parent, values, row),
                None => tree.add_root_at(values, row),
            };
            children.push(Span {
                parent: Some(node),
                col: span.col + 1,
                start: row,
                end,
            });
            row = end;
        }
        // Siblings are already inserted in order; descend in any order.
        pending.extend(children);
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_level_grid() -> Vec<Vec<GridCell>> {
        vec![
            vec![GridCell::new(json!("x"), 2), GridCell::new(json!("x1"), 1)],
            vec![GridCell::covered(), GridCell::new(json!("x2"), 1)],
            vec![GridCell::new(json!("y"), 1), GridCell::new(json!("y1"), 1)],
        ]
    }

    #[test]
    fn test_grid_to_tree_structure() {
        let tree = grid_to_tree(&two_level_grid()).unwrap();
        assert_eq!(tree.roots().len(), 2);
        let x = tree.roots()[0];
        let children = tree.children(x);
        assert_eq!(children.len(), 2);
        assert_eq!(tree.cell(children[1]).values, json!("x2"));
        assert_eq!(tree.cell(children[1]).row_index, 1);
        assert_eq!(tree.cell(tree.roots()[1]).row_index, 2);
    }

    #[test]
    fn test_round_trip_small_grid() {
        let grid = two_level_grid();
        assert_eq!(tree_to_grid(&grid_to_tree(&grid).unwrap()), grid);
    }

    #[test]
    fn test_overlong_rowspan_rejected() {
        let grid = vec![
            vec![GridCell::new(json!("x"), 1), GridCell::new(json!("x1"), 2)],
            vec![GridCell::new(json!("y"), 1), GridCell::covered()],
        ];
        assert!(matches!(
            grid_to_tree(&grid),
            Err(ScoreError::InvalidDivision(_))
        ));

        let huge = vec![
            vec![GridCell::new(json!("x"), 1)],
            vec![GridCell::new(json!("y"), usize::MAX)],
        ];
        assert!(matches!(
            grid_to_tree(&huge),
            Err(ScoreError::InvalidDivision(_))
        ));
    }

    #[test]
    fn test_empty_grid() {
        let tree = grid_to_tree(&[]).unwrap();
        assert!(tree.is_empty());
        assert!(tree_to_grid(&tree).is_empty());
    }
}
