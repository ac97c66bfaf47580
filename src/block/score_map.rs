//! Table lookup from an input value to an output value.
//!
//! The table alternates input rows and output rows; column `i` of an input
//! row maps to column `i` of the output row below it. In range mode an
//! input cell is a numeric interval:
//!
//! | cell     | matches          |
//! |----------|------------------|
//! | `80-100` | 80 ≤ x ≤ 100     |
//! | `[a-b]`  | a ≤ x ≤ b        |
//! | `(a-b]`  | a < x ≤ b        |
//! | `[a-b)`  | a ≤ x < b        |
//! | `a-`     | x ≥ a            |
//! | `-b`     | x ≤ b            |
//! | `85`     | x = 85           |
//!
//! `~` is accepted in place of `-` as the separator. Negative bounds are not
//! expressible; a leading `-` always opens the lower end.

use super::{exclude_logged, invalid_params, BlockExecutor, BlockFlow, BlockType, VariableScope};
use crate::calc_log::{CalculationLog, CalculationLogManager};
use crate::context::Context;
use crate::error::ScoreError;
use crate::property::PropertyAccess;
use crate::subject::Subject;
use crate::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Exact,
    Range,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMapParams {
    #[serde(default)]
    pub variable_scope: VariableScope,
    pub input_prop: String,
    pub output_prop: String,
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Alternating input and output rows.
    pub table: Vec<Vec<Value>>,
    /// Exclude subjects whose input matches no row.
    #[serde(default)]
    pub filter_unmatched: bool,
}

/// A numeric interval; `None` bounds are open-ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub low: Option<f64>,
    pub low_inclusive: bool,
    pub high: Option<f64>,
    pub high_inclusive: bool,
}

impl NumericRange {
    /// Parse a range cell. Returns `None` when a bound is not a number.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scorepipe::block::score_map::NumericRange;
    ///
    /// let range = NumericRange::parse("(80-90]").unwrap();
    /// assert!(!range.contains(80.0));
    /// assert!(range.contains(90.0));
    /// assert!(NumericRange::parse("60-").unwrap().contains(1000.0));
    /// ```
    pub fn parse(cell: &str) -> Option<Self> {
        let mut text = cell.trim();
        let mut low_inclusive = true;
        let mut high_inclusive = true;
        if let Some(rest) = text.strip_prefix('[') {
            text = rest;
        } else if let Some(rest) = text.strip_prefix('(') {
            text = rest;
            low_inclusive = false;
        }
        if let Some(rest) = text.strip_suffix(']') {
            text = rest;
        } else if let Some(rest) = text.strip_suffix(')') {
            text = rest;
            high_inclusive = false;
        }

        let is_separator = |c: char| c == '-' || c == '~';
        let (low, high) = if let Some(rest) = text.strip_prefix(is_separator) {
            ("", rest)
        } else if let Some(split) = text.find(is_separator) {
            (&text[..split], &text[split + 1..])
        } else {
            let point: f64 = text.trim().parse().ok()?;
            return Some(Self {
                low: Some(point),
                low_inclusive: true,
                high: Some(point),
                high_inclusive: true,
            });
        };

        Some(Self {
            low: parse_bound(low)?,
            low_inclusive,
            high: parse_bound(high)?,
            high_inclusive,
        })
    }

    pub fn contains(&self, x: f64) -> bool {
        if x.is_nan() {
            return false;
        }
        let above_low = match self.low {
            Some(low) if self.low_inclusive => x >= low,
            Some(low) => x > low,
            None => true,
        };
        let below_high = match self.high {
            Some(high) if self.high_inclusive => x <= high,
            Some(high) => x < high,
            None => true,
        };
        above_low && below_high
    }
}

/// An empty bound is open; anything else must be a number.
fn parse_bound(text: &str) -> Option<Option<f64>> {
    let text = text.trim();
    if text.is_empty() {
        Some(None)
    } else {
        text.parse().ok().map(Some)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Matcher {
    Exact(Value),
    Range(NumericRange),
    /// A range cell that failed to parse.
    Never,
}

impl Matcher {
    fn matches(&self, input: &Value) -> bool {
        match self {
            Matcher::Exact(expected) => input.loose_eq(expected),
            Matcher::Range(range) => input.as_number().is_some_and(|x| range.contains(x)),
            Matcher::Never => false,
        }
    }
}

/// Maps a context or subject property through a lookup table.
#[derive(Debug, Clone)]
pub struct ScoreMap {
    block_id: u32,
    params: ScoreMapParams,
    rows: Vec<(Matcher, Value)>,
}

impl ScoreMap {
    pub fn new(block_id: u32, params: ScoreMapParams) -> Result<Self, ScoreError> {
        if params.table.len() % 2 != 0 {
            return Err(invalid_params(
                BlockType::ScoreMap,
                block_id,
                "table must alternate input and output rows",
            ));
        }

        let mut rows = Vec::new();
        for (index, pair) in params.table.chunks(2).enumerate() {
            if pair[0].len() != pair[1].len() {
                return Err(invalid_params(
                    BlockType::ScoreMap,
                    block_id,
                    format!(
                        "input row {} has {} cells but its output row has {}",
                        index * 2,
                        pair[0].len(),
                        pair[1].len()
                    ),
                ));
            }
            for (input, output) in pair[0].iter().zip(&pair[1]) {
                let matcher = match (params.match_mode, input) {
                    (MatchMode::Exact, value) => Matcher::Exact(value.clone()),
                    (MatchMode::Range, Value::Number(n)) => Matcher::Range(NumericRange {
                        low: Some(*n),
                        low_inclusive: true,
                        high: Some(*n),
                        high_inclusive: true,
                    }),
                    (MatchMode::Range, value) => {
                        let cell = value.to_string();
                        match NumericRange::parse(&cell) {
                            Some(range) => Matcher::Range(range),
                            None => {
                                tracing::warn!(block_id, cell = %cell, "unparseable range cell never matches");
                                Matcher::Never
                            }
                        }
                    }
                };
                rows.push((matcher, output.clone()));
            }
        }

        Ok(Self {
            block_id,
            params,
            rows,
        })
    }

    /// Output for `input`, first matching row wins.
    pub fn lookup(&self, input: &Value) -> Option<&Value> {
        self.rows
            .iter()
            .find(|(matcher, _)| matcher.matches(input))
            .map(|(_, output)| output)
    }
}

impl BlockExecutor for ScoreMap {
    fn block_id(&self) -> u32 {
        self.block_id
    }

    fn block_type(&self) -> BlockType {
        BlockType::ScoreMap
    }

    fn execute(
        &self,
        context: &mut Context,
        subjects: &mut [Subject],
        log: &mut CalculationLogManager,
    ) -> Result<BlockFlow, ScoreError> {
        let input_prop = self.params.input_prop.as_str();
        let output_prop = self.params.output_prop.as_str();

        match self.params.variable_scope {
            VariableScope::Context => {
                let input = context.get_property(input_prop);
                let output = self.lookup(&input).cloned();
                if let Some(output) = &output {
                    context.set_property(output_prop, output.clone());
                }
                log.record_context(CalculationLog::new(
                    input_prop,
                    input,
                    output_prop,
                    output.unwrap_or_default(),
                ));
            }
            VariableScope::Subject => {
                for subject in subjects.iter_mut().filter(|s| s.is_live()) {
                    let input = subject.get_property(input_prop);
                    match self.lookup(&input) {
                        Some(output) => {
                            subject.set_property(output_prop, output.clone());
                            log.record(
                                subject.seq_number,
                                CalculationLog::new(input_prop, input, output_prop, output.clone()),
                            );
                        }
                        None if self.params.filter_unmatched => {
                            exclude_logged(subject, self.block_id, input_prop, input, log);
                        }
                        None => log.record(
                            subject.seq_number,
                            CalculationLog::new(input_prop, input, output_prop, Value::Unresolved),
                        ),
                    }
                }
            }
        }
        Ok(BlockFlow::Continue)
    }

    fn description(&self) -> String {
        format!(
            "score_map({:?}: {} -> {}, {} rows)",
            self.params.match_mode,
            self.params.input_prop,
            self.params.output_prop,
            self.rows.len()
        )
    }
}
