//! Uniform property access over contexts and subjects.
//!
//! Block parameters name properties by string. A name first addresses a
//! fixed struct field (`score`, `graduate_year`, ...) and otherwise falls back
//! to the record's `vars` map, so a declared pipeline variable and a built-in
//! field are read and written the same way.

use crate::value::Value;
use std::collections::BTreeMap;

/// Field-or-variable accessor implemented by [`Context`](crate::Context) and
/// [`Subject`](crate::Subject).
///
/// # Examples
///
/// ```rust
/// use scorepipe::{PropertyAccess, Subject, Value};
///
/// let mut subject = Subject::new(1);
/// subject.set_property("score", Value::from(88.0));
/// subject.set_property("bonus", Value::from(2.0));
///
/// assert_eq!(subject.score, 88.0);
/// assert_eq!(subject.get_property("bonus"), Value::from(2.0));
/// assert!(subject.get_property("missing").is_unresolved());
/// ```
pub trait PropertyAccess {
    /// Read a fixed field. `None` when `name` is not a fixed field.
    fn field(&self, name: &str) -> Option<Value>;

    /// Write a fixed field. Returns `false` when `name` is not a fixed field.
    fn set_field(&mut self, name: &str, value: &Value) -> bool;

    fn vars(&self) -> &BTreeMap<String, Value>;

    fn vars_mut(&mut self) -> &mut BTreeMap<String, Value>;

    /// Read a fixed field or a variable; `Unresolved` when neither exists.
    fn get_property(&self, name: &str) -> Value {
        self.field(name)
            .or_else(|| self.vars().get(name).cloned())
            .unwrap_or(Value::Unresolved)
    }

    /// Write a fixed field, or declare/overwrite a variable.
    fn set_property(&mut self, name: &str, value: Value) {
        if !self.set_field(name, &value) {
            self.vars_mut().insert(name.to_string(), value);
        }
    }

    /// Whether `name` resolves to anything on this record.
    fn has_property(&self, name: &str) -> bool {
        self.field(name).is_some() || self.vars().contains_key(name)
    }
}

/// Coerce a value into a text field.
pub(crate) fn text_of(value: &Value) -> String {
    match value {
        Value::Unresolved => String::new(),
        other => other.to_string(),
    }
}

/// Coerce a value into an integer field; non-finite input becomes 0.
pub(crate) fn int_of(value: &Value) -> i32 {
    let n = value.to_number();
    if n.is_finite() {
        n as i32
    } else {
        0
    }
}
