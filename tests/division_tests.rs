use proptest::prelude::*;
use scorepipe::division::codec::{grid_to_tree, tree_to_grid};
use scorepipe::*;
use serde_json::json;

/// Build a uniform-depth tree: `depth` levels, node fan-outs taken in turn
/// from `fanouts`.
fn build_tree(depth: usize, fanouts: &[usize]) -> DivisionTree {
    let mut tree = DivisionTree::new();
    let mut next = fanouts.iter().cycle();
    let mut counter = 0;
    let mut label = || {
        counter += 1;
        json!({"id": counter % 5})
    };

    let roots = *next.next().unwrap_or(&1);
    let mut level: Vec<_> = (0..roots).map(|_| tree.add_root(label())).collect();
    for _ in 1..depth {
        let mut below = Vec::new();
        for parent in level {
            let fanout = *next.next().unwrap_or(&1);
            for _ in 0..fanout {
                below.push(tree.add_child(parent, label()));
            }
        }
        level = below;
    }
    tree
}

fn preorder_values(tree: &DivisionTree) -> Vec<(usize, serde_json::Value)> {
    tree.preorder()
        .into_iter()
        .map(|node| {
            let cell = tree.cell(node);
            (cell.col_index, cell.values.clone())
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_tree_grid_round_trip(depth in 1usize..4, fanouts in prop::collection::vec(1usize..4, 1..12)) {
        let tree = build_tree(depth, &fanouts);
        let grid = tree_to_grid(&tree);
        let rebuilt = grid_to_tree(&grid).unwrap();

        prop_assert_eq!(grid.len(), tree.leaves().len());
        prop_assert_eq!(rebuilt.leaves().len(), tree.leaves().len());
        prop_assert_eq!(preorder_values(&rebuilt), preorder_values(&tree));
        prop_assert_eq!(tree_to_grid(&rebuilt), grid.clone());

        let counts = rebuilt.leaf_counts();
        for node in rebuilt.preorder() {
            let cell = rebuilt.cell(node);
            prop_assert_eq!(grid[cell.row_index][cell.col_index].rowspan, counts[&node]);
        }
    }
}

#[test]
fn test_division_from_json_grid() {
    let division: DivisionHeadData = serde_json::from_value(json!({
        "block_id": 5,
        "header": [{"division_type": "admission_code"}, {"division_type": "subject_separation"}],
        "body": [
            [{"values": {"codes": ["S1", "S2"]}, "rowspan": 2},
             {"values": {"separation_codes": ["COMMON"]}, "rowspan": 1}],
            [{"values": null, "rowspan": 0},
             {"values": {"separation_codes": ["ELECTIVE"]}, "rowspan": 1}],
            [{"values": {"codes": [], "exclude_codes": ["S1", "S2"]}, "rowspan": 1},
             {"values": {"separation_codes": ["COMMON", "ELECTIVE"]}, "rowspan": 1}]
        ]
    }))
    .unwrap();

    let mut common = Subject::new(1);
    common.separation_code = "COMMON".to_string();
    let mut elective = Subject::new(2);
    elective.separation_code = "ELECTIVE".to_string();
    let subjects = vec![common, elective];

    let mut context = Context::new();
    context.admission_code = "S2".to_string();
    let cases = scorepipe::case::enumerate_cases(Some(&division), &context, &subjects).unwrap();
    let sizes: Vec<usize> = cases.iter().map(|c| c.subjects.len()).collect();
    assert_eq!(sizes, vec![1, 1, 0]);
    assert_eq!(cases[1].subjects[0].seq_number, 2);

    context.admission_code = "R9".to_string();
    let cases = scorepipe::case::enumerate_cases(Some(&division), &context, &subjects).unwrap();
    let sizes: Vec<usize> = cases.iter().map(|c| c.subjects.len()).collect();
    assert_eq!(sizes, vec![0, 0, 2]);
}

#[test]
fn test_bad_cell_values_rejected() {
    let division = DivisionHeadData {
        block_id: 5,
        header: vec![DivisionHeader {
            division_type: "graduate_year".to_string(),
        }],
        body: vec![vec![GridCell::new(json!({"comparison": "<<", "year": 2020}), 1)]],
        is_active: true,
    };
    let err = scorepipe::case::enumerate_cases(Some(&division), &Context::new(), &[]).unwrap_err();
    assert!(matches!(err, ScoreError::InvalidDivision(_)));
}
