//! `#{name}` placeholder substitution.
//!
//! Stored expressions reference pipeline properties as `#{name}`. Before an
//! expression reaches the DSL, the names are extracted, resolved against the
//! current context or subject, and the spans are replaced positionally with
//! the resolved values.

use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\{([^{}]*)\}").expect("placeholder pattern is valid"));

/// Inner contents of every `#{...}` span, left to right.
///
/// # Examples
///
/// ```rust
/// use scorepipe::placeholder::extract_pattern_contents;
///
/// assert_eq!(
///     extract_pattern_contents("#{score} * #{ratio} / 100"),
///     vec!["score".to_string(), "ratio".to_string()]
/// );
/// ```
pub fn extract_pattern_contents(text: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Replace successive `#{...}` spans with `values`, in order.
///
/// Spans beyond the supplied values are left untouched.
///
/// # Examples
///
/// ```rust
/// use scorepipe::placeholder::replace_with_values;
/// use scorepipe::Value;
///
/// let text = replace_with_values("#{a} + #{b} + #{c}", &[Value::from(1.0), Value::from("x")]);
/// assert_eq!(text, "1 + x + #{c}");
/// ```
pub fn replace_with_values(text: &str, values: &[Value]) -> String {
    let mut next = values.iter();
    PLACEHOLDER
        .replace_all(text, |caps: &regex::Captures<'_>| match next.next() {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Extract, resolve and replace in one pass.
///
/// `resolve` is called once per span, in order.
pub fn substitute(text: &str, mut resolve: impl FnMut(&str) -> Value) -> String {
    let values: Vec<Value> = extract_pattern_contents(text)
        .iter()
        .map(|name| resolve(name.trim()))
        .collect();
    replace_with_values(text, &values)
}
