//! Comparison operators available to signature rules
//!
//! Every operator is a pure function of `(declared, observed)`. Text
//! comparisons are case-insensitive throughout, using Unicode lowercase
//! mapping. That is not full case folding: `ß` and `ss` compare unequal.

use crate::value::Value;
use std::fmt;

/// Operator bound to a rule at parse time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operator {
    /// Always holds; the rule only asserts the observed type
    #[default]
    True,
    Equals,
    Contains,
    ContainsIn,
    In,
}

impl Operator {
    /// Operators in the order declaration keys are scanned
    pub const ALL: [Operator; 5] = [
        Operator::True,
        Operator::Equals,
        Operator::Contains,
        Operator::ContainsIn,
        Operator::In,
    ];

    /// Resolve an operator from its declaration key
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.keyword() == keyword)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Operator::True => "true",
            Operator::Equals => "equals",
            Operator::Contains => "contains",
            Operator::ContainsIn => "contains_in",
            Operator::In => "in",
        }
    }

    pub fn apply(&self, declared: &Value, observed: &Value) -> bool {
        match self {
            Operator::True => true,
            Operator::Equals => equals(declared, observed),
            Operator::Contains => contains(declared, observed),
            Operator::ContainsIn => contains_in(declared, observed),
            Operator::In => is_in(declared, observed),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Structural equality, case-insensitive for text
pub fn equals(declared: &Value, observed: &Value) -> bool {
    match (declared, observed) {
        (Value::String(a), Value::String(b)) => a.to_lowercase() == b.to_lowercase(),
        (Value::Sequence(a), Value::Sequence(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y))
        }
        _ => declared == observed,
    }
}

/// Declared text is a substring of observed text, ignoring case
pub fn contains(declared: &Value, observed: &Value) -> bool {
    match (declared, observed) {
        (Value::String(needle), Value::String(haystack)) => haystack
            .to_lowercase()
            .contains(needle.to_lowercase().as_str()),
        _ => false,
    }
}

/// Observed value equals one element of the declared sequence
pub fn is_in(declared: &Value, observed: &Value) -> bool {
    declared
        .as_sequence()
        .is_some_and(|items| items.iter().any(|item| equals(item, observed)))
}

/// One element of the declared sequence is contained in the observed text
pub fn contains_in(declared: &Value, observed: &Value) -> bool {
    declared
        .as_sequence()
        .is_some_and(|items| items.iter().any(|item| contains(item, observed)))
}
