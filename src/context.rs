//! Per-student context threaded through a scoring run.
//!
//! The `Context` carries the student-level attributes that division
//! criteria branch on, the running final score, and any pipeline variables
//! declared at context scope. One context is created per run by the caller
//! and mutated in place by every component.

use crate::calc_log::SnapshotEntry;
use crate::property::{int_of, text_of, PropertyAccess};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Student-level state for one scoring run.
///
/// # Examples
///
/// ```rust
/// use scorepipe::{Context, PropertyAccess, Value};
///
/// let mut context = Context::new();
/// context.graduate_year = 2024;
/// context.set_property("bonus_total", Value::from(3.0));
///
/// assert_eq!(context.get_property("graduateYear"), Value::from(2024));
/// assert_eq!(context.get_property("bonus_total"), Value::from(3.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    pub graduate_year: i32,
    pub graduate_grade: String,
    pub admission_code: String,
    pub major_code: String,
    pub applicant_type: String,
    /// Running final score written by context-scoped blocks.
    pub final_score: f64,
    /// Pipeline variables declared at context scope.
    pub vars: BTreeMap<String, Value>,
    /// Audit entries from context-scoped blocks.
    pub snapshot: Vec<SnapshotEntry>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertyAccess for Context {
    fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "graduate_year" | "graduateYear" => Value::from(self.graduate_year),
            "graduate_grade" | "graduateGrade" => Value::from(self.graduate_grade.as_str()),
            "admission_code" | "admissionCode" => Value::from(self.admission_code.as_str()),
            "major_code" | "majorCode" => Value::from(self.major_code.as_str()),
            "applicant_type" | "applicantType" => Value::from(self.applicant_type.as_str()),
            "final_score" | "finalScore" => Value::from(self.final_score),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, name: &str, value: &Value) -> bool {
        match name {
            "graduate_year" | "graduateYear" => self.graduate_year = int_of(value),
            "graduate_grade" | "graduateGrade" => self.graduate_grade = text_of(value),
            "admission_code" | "admissionCode" => self.admission_code = text_of(value),
            "major_code" | "majorCode" => self.major_code = text_of(value),
            "applicant_type" | "applicantType" => self.applicant_type = text_of(value),
            "final_score" | "finalScore" => self.final_score = value.to_number(),
            _ => return false,
        }
        true
    }

    fn vars(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }

    fn vars_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.vars
    }
}
