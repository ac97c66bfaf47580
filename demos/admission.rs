//! Admission example: a two-stage pipeline for one applicant
//!
//! This example demonstrates:
//! - Loading a pipeline definition from JSON
//! - Branching by graduation year with a division block
//! - Mapping achievements, weighting by grade and aggregating
//! - Reading the audit snapshot of a subject

use scorepipe::*;
use serde_json::json;

fn pipeline() -> ScoringPipeline {
    let definition = json!({
        "components": [
            {
                "component_id": 1,
                "order": 1,
                "division": {
                    "block_id": 100,
                    "header": [{"division_type": "graduate_year"}],
                    "body": [
                        [{"values": {"comparison": ">=", "year": 2024}, "rowspan": 1}],
                        [{"values": {"comparison": "<", "year": 2024}, "rowspan": 1}]
                    ]
                },
                "blocks": [
                    {"block_id": 101, "block_type": 3, "order": 1,
                     "body_cells": [
                         {"terms": ["1-1", "1-2", "2-1", "2-2", "3-1"]},
                         {"terms": ["1-1", "1-2", "2-1", "2-2", "3-1", "3-2"]}
                     ]},
                    {"block_id": 102, "block_type": 8, "order": 2,
                     "body_cells": [{"input_prop": "rank_grade", "output_prop": "score",
                                     "table": [[1, 2, 3, 4, 5], [100, 96, 90, 80, 60]],
                                     "filter_unmatched": true}]}
                ]
            },
            {
                "component_id": 2,
                "order": 2,
                "blocks": [
                    {"block_id": 201, "block_type": 5, "order": 1,
                     "body_cells": [{"ratios": {"1": 20, "2": 40, "3": 40}}]},
                    {"block_id": 202, "block_type": 11, "order": 2,
                     "body_cells": [{"method": "sum"}]},
                    {"block_id": 203, "block_type": 9, "order": 3,
                     "body_cells": [{"variable_scope": "context", "output_prop": "final_score",
                                     "expression": "#{final_score} / 3 * 10"}]},
                    {"block_id": 204, "block_type": 13, "order": 4,
                     "body_cells": [{"variable_scope": "context", "input_prop": "final_score",
                                     "output_prop": "final_score", "digits": 2}]}
                ]
            }
        ]
    });
    serde_json::from_value(definition).expect("demo pipeline definition is valid")
}

fn course(seq: u32, name: &str, grade: &str, term: &str, rank_grade: f64) -> Subject {
    let mut subject = Subject::new(seq);
    subject.subject_name = name.to_string();
    subject.grade = grade.to_string();
    subject.term = term.to_string();
    subject.rank_grade = rank_grade;
    subject.unit = 4.0;
    subject
}

fn main() -> Result<(), ScoreError> {
    let mut context = Context::new();
    context.graduate_year = 2023;
    context.admission_code = "EARLY".to_string();

    let subjects = vec![
        course(1, "Korean I", "1", "1", 2.0),
        course(2, "Mathematics I", "1", "2", 1.0),
        course(3, "English II", "2", "1", 3.0),
        course(4, "Physics I", "2", "2", 2.0),
        course(5, "Calculus", "3", "1", 1.0),
        course(6, "Chemistry II", "3", "2", 7.0),
    ];

    println!("Running pipeline for a {} graduate...", context.graduate_year);
    let result = pipeline().run(context, subjects)?;

    println!("\n=== Subjects ===");
    for subject in &result.subjects {
        let status = if subject.is_live() {
            "live".to_string()
        } else {
            format!("filtered by block {}", subject.filtered_block_id)
        };
        println!(
            "  #{} {:<14} grade {} rank {} -> score {:>6.2} ({status})",
            subject.seq_number, subject.subject_name, subject.grade, subject.rank_grade, subject.score
        );
    }

    println!("\n=== Final score: {:.2} ===", result.final_score());

    if let Some(calculus) = result.subject(5) {
        println!("\nAudit trail for {}:", calculus.subject_name);
        for entry in &calculus.snapshot {
            println!(
                "  block {} (type {}, case {}): {}={} -> {}={}",
                entry.block_id,
                entry.block_type,
                entry.case_index,
                entry.log.input_key,
                entry.log.input,
                entry.log.output_key,
                entry.log.output
            );
        }
    }

    Ok(())
}
