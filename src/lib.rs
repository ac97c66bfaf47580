//! # scorepipe - Deterministic Admission Scoring Pipeline Engine
//!
//! Computes a student's admission score by running a configurable,
//! tree-branching pipeline of scoring rules over per-course records.
//!
//! ## Core Concepts
//!
//! ### Pipeline Flow
//!
//! ```text
//! [ScoringPipeline] → components (by order)
//!     → [DivisionTree] → cases (one per leaf)
//!         → [BlockExecutor] chain per case
//!     → merge by seq_number → next component
//! ```
//!
//! 1. **Context** holds per-student facts and the running `final_score`
//! 2. **Subjects** are course records; blocks filter them by marking, never
//!    by removal
//! 3. **Blocks** are business rules (ratios, score maps, formulas,
//!    conditions, aggregations) built from typed parameters
//! 4. **Divisions** branch a component into cases by graduation year,
//!    admission code, subject group and similar criteria
//!
//! ### Key Features
//!
//! - **Expression language**: `#{placeholder}` substitution plus a small
//!   arithmetic/logic language with `SUM/AVG/COUNT/MAX/MIN/STD` aggregates
//! - **Float-safe rounding**: decimal rounding without binary artifacts
//! - **Audit trail**: every block invocation leaves a snapshot entry on
//!   each record it touched
//! - **Deterministic**: same definitions and inputs, same output
//!
//! ## Example
//!
//! ```rust
//! use scorepipe::*;
//! use serde_json::json;
//!
//! let pipeline: ScoringPipeline = serde_json::from_value(json!({
//!     "components": [{
//!         "component_id": 1,
//!         "blocks": [
//!             {"block_id": 1, "block_type": 2, "order": 1,
//!              "body_cells": [{"subject_groups": ["KOR", "MATH"]}]},
//!             {"block_id": 2, "block_type": 11, "order": 2,
//!              "body_cells": [{"method": "unit_weighted_average"}]},
//!             {"block_id": 3, "block_type": 13, "order": 3,
//!              "body_cells": [{"variable_scope": "context",
//!                              "input_prop": "final_score",
//!                              "output_prop": "final_score",
//!                              "digits": 1}]}
//!         ]
//!     }]
//! }))
//! .unwrap();
//!
//! let mut korean = Subject::new(1);
//! korean.subject_group = "KOR".to_string();
//! korean.unit = 4.0;
//! korean.score = 92.0;
//!
//! let mut math = Subject::new(2);
//! math.subject_group = "MATH".to_string();
//! math.unit = 3.0;
//! math.score = 85.0;
//!
//! let mut art = Subject::new(3);
//! art.subject_group = "ART".to_string();
//! art.unit = 1.0;
//! art.score = 40.0;
//!
//! let result = pipeline.run(Context::new(), vec![korean, math, art]).unwrap();
//! assert_eq!(result.final_score(), 89.0);
//! assert_eq!(result.live_subjects().count(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`value`] - Dynamically typed values
//! - [`property`] - Named property access on records
//! - [`context`] / [`subject`] - Per-student and per-course records
//! - [`numeric`] - Float-safe rounding
//! - [`dsl`] - Expression language
//! - [`placeholder`] - `#{name}` substitution
//! - [`calc_log`] - Calculation audit trail
//! - [`block`] - Block executors and their registry
//! - [`division`] - Division grids, trees and criteria
//! - [`case`] - Case enumeration and execution
//! - [`pipeline`] - Pipeline definitions and orchestration
//! - [`result`] - Run results
//! - [`error`] - Error types

pub mod block;
pub mod calc_log;
pub mod case;
pub mod context;
pub mod division;
pub mod dsl;
pub mod error;
pub mod numeric;
pub mod pipeline;
pub mod placeholder;
pub mod property;
pub mod result;
pub mod subject;
pub mod value;

// Re-export main types for convenience
pub use block::{BlockExecutor, BlockFlow, BlockType, VariableScope};
pub use context::Context;
pub use error::ScoreError;
pub use pipeline::{BlockDefinition, ComponentDefinition, ScoringPipeline};
pub use property::PropertyAccess;
pub use result::ScoringResult;
pub use subject::Subject;
pub use value::Value;

// Re-export division types
pub use division::predicate::{Comparator, DivisionType};
pub use division::tree::{DivisionTree, HierarchicalCell};
pub use division::{DivisionHeadData, DivisionHeader, GridCell};
