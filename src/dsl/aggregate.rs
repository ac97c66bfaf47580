//! Aggregate calls: `SUM(..)`, `AVG(..)`, `COUNT(..)`, `MAX(..)`, `MIN(..)`,
//! `STD(..)`.
//!
//! An aggregate is recognised only when it spans the whole expression. Its
//! inner expression is evaluated once per item of a collection, numeric
//! results are kept and then reduced.

use serde::{Deserialize, Serialize};

/// The reduction applied by an aggregate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFn {
    Sum,
    Avg,
    Count,
    Max,
    Min,
    Std,
}

impl AggregateFn {
    /// Look up a function by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SUM" => Some(AggregateFn::Sum),
            "AVG" => Some(AggregateFn::Avg),
            "COUNT" => Some(AggregateFn::Count),
            "MAX" => Some(AggregateFn::Max),
            "MIN" => Some(AggregateFn::Min),
            "STD" => Some(AggregateFn::Std),
            _ => None,
        }
    }

    /// Reduce collected numbers. Every reduction of an empty set is 0.
    pub fn reduce(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let n = values.len() as f64;
        let sum: f64 = values.iter().sum();
        match self {
            AggregateFn::Sum => sum,
            AggregateFn::Avg => sum / n,
            AggregateFn::Count => n,
            AggregateFn::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregateFn::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggregateFn::Std => {
                let mean = sum / n;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                variance.sqrt()
            }
        }
    }
}

/// Split `NAME(inner)` into its function and inner source.
///
/// Returns `None` unless the parenthesis opened after the name is the one
/// that closes the expression, so `SUM(a) + SUM(b)` is not an aggregate.
///
/// # Examples
///
/// ```rust
/// use scorepipe::dsl::aggregate::{split_aggregate, AggregateFn};
///
/// assert_eq!(split_aggregate(" avg(score * 2) "), Some((AggregateFn::Avg, "score * 2")));
/// assert_eq!(split_aggregate("SUM(a) + SUM(b)"), None);
/// ```
pub fn split_aggregate(source: &str) -> Option<(AggregateFn, &str)> {
    let source = source.trim();
    let open = source.find('(')?;
    let function = AggregateFn::from_name(source[..open].trim())?;
    if !source.ends_with(')') {
        return None;
    }

    let close = source.len() - 1;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, ch) in source.char_indices().skip_while(|(i, _)| *i < open) {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '\'' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '\'' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (index == close).then(|| (function, &source[open + 1..close]));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reductions() {
        let values = [2.0, 4.0, 6.0];
        assert_eq!(AggregateFn::Sum.reduce(&values), 12.0);
        assert_eq!(AggregateFn::Avg.reduce(&values), 4.0);
        assert_eq!(AggregateFn::Count.reduce(&values), 3.0);
        assert_eq!(AggregateFn::Max.reduce(&values), 6.0);
        assert_eq!(AggregateFn::Min.reduce(&values), 2.0);
        assert!((AggregateFn::Std.reduce(&values) - 1.632993).abs() < 1e-6);
    }

    #[test]
    fn test_empty_reduces_to_zero() {
        for function in [
            AggregateFn::Sum,
            AggregateFn::Avg,
            AggregateFn::Count,
            AggregateFn::Max,
            AggregateFn::Min,
            AggregateFn::Std,
        ] {
            assert_eq!(function.reduce(&[]), 0.0);
        }
    }

    #[test]
    fn test_split_aggregate_shapes() {
        assert_eq!(split_aggregate("COUNT()"), Some((AggregateFn::Count, "")));
        assert_eq!(
            split_aggregate("MAX((a + b) * 2)"),
            Some((AggregateFn::Max, "(a + b) * 2"))
        );
        assert_eq!(
            split_aggregate("SUM(name == ')')"),
            Some((AggregateFn::Sum, "name == ')'"))
        );
        assert_eq!(split_aggregate("TOTAL(a)"), None);
        assert_eq!(split_aggregate("SUM(a) * 2"), None);
        assert_eq!(split_aggregate("score"), None);
    }
}
