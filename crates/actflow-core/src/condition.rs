//! Condition predicates
//!
//! A condition node compares one external signal against an operand and
//! turns the result into a branch label (`"true"` or `"false"`) that picks
//! the conditional edge to follow.

use serde::{Deserialize, Serialize};

/// Branch label for a predicate that held
pub const BRANCH_TRUE: &str = "true";
/// Branch label for a predicate that did not hold
pub const BRANCH_FALSE: &str = "false";

/// Where a condition reads its value from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalRef {
    /// Milliseconds since the act started playing
    Time,
    /// Last value of a MIDI control change
    Midi { channel: u8, controller: u8 },
    /// Last float argument received on an OSC address
    Osc { address: String },
    /// Current value of a DMX channel (0-based)
    Dmx { channel: u16 },
}

/// Comparison applied to the signal value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    #[default]
    Equals,
    Greater,
    Less,
    /// Inclusive range `value..=upper`
    Between,
}

/// A typed predicate over one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionPredicate {
    pub source: SignalRef,
    #[serde(default)]
    pub operator: ComparisonOperator,
    pub value: f64,
    /// Upper bound, only read by [`ComparisonOperator::Between`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

impl ConditionPredicate {
    pub fn new(source: SignalRef, operator: ComparisonOperator, value: f64) -> Self {
        Self {
            source,
            operator,
            value,
            upper: None,
        }
    }

    pub fn between(source: SignalRef, low: f64, high: f64) -> Self {
        Self {
            source,
            operator: ComparisonOperator::Between,
            value: low,
            upper: Some(high),
        }
    }

    /// Evaluate against a sampled signal value
    pub fn evaluate(&self, sample: f64) -> bool {
        match self.operator {
            ComparisonOperator::Equals => (sample - self.value).abs() < f64::EPSILON,
            ComparisonOperator::Greater => sample > self.value,
            ComparisonOperator::Less => sample < self.value,
            ComparisonOperator::Between => {
                // a missing upper bound degenerates to a point range
                let upper = self.upper.unwrap_or(self.value);
                let (low, high) = if upper < self.value {
                    (upper, self.value)
                } else {
                    (self.value, upper)
                };
                (low..=high).contains(&sample)
            }
        }
    }
}

/// Payload of a `condition` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionPayload {
    pub predicate: ConditionPredicate,
}

impl ConditionPayload {
    pub fn new(predicate: ConditionPredicate) -> Self {
        Self { predicate }
    }
}

/// Branch label for an evaluation result
pub fn branch_label(result: bool) -> &'static str {
    if result {
        BRANCH_TRUE
    } else {
        BRANCH_FALSE
    }
}
