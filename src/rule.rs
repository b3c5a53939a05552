//! A single predicate of a call signature
//!
//! Rules are declared as YAML mappings:
//!
//! ```yaml
//! - element: argument
//!   argument_index: 2
//!   type: number
//!   in: [0x40, 0x20]
//! ```
//!
//! The element and operator are resolved once, when the declaration is
//! parsed. Matching is a plain `match` over closed enums.

use crate::operator::Operator;
use crate::value::{Value, ValueType};
use serde_yml::Mapping;
use std::fmt;
use thiserror::Error;

/// Errors raised while parsing a rule declaration
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid argument_index for element '{element}': {value}")]
    InvalidArgumentIndex { element: String, value: String },

    #[error("unknown argument element '{0}' (expected 'argument')")]
    UnknownArgumentElement(String),

    #[error("rule declares more than one operator: '{first}' and '{second}'")]
    MultipleOperators { first: Operator, second: Operator },

    #[error("invalid hex value '{value}': {source}")]
    InvalidHex {
        value: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("bytes rule expects hex text, got {0}")]
    NotHexText(String),
}

/// Part of a call a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    FunctionName,
    NumberOfArguments,
    Argument(usize),
    AnyArgument,
    /// Element name this version does not know; matching it is an error
    Unrecognized(String),
}

impl Element {
    pub fn name(&self) -> &str {
        match self {
            Element::FunctionName => "function name",
            Element::NumberOfArguments => "number of arguments",
            Element::Argument(_) => "argument",
            Element::AnyArgument => "any argument",
            Element::Unrecognized(name) => name,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Argument(index) => write!(f, "argument[{}]", index),
            other => f.write_str(other.name()),
        }
    }
}

/// One typed predicate over a call element
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    element: Element,
    operator: Operator,
    declared: Value,
    value_type: ValueType,
}

impl Rule {
    /// Build a rule, decoding hex text when the type is `bytes`
    pub fn new(
        element: Element,
        operator: Operator,
        declared: Value,
        value_type: ValueType,
    ) -> Result<Self, RuleError> {
        let declared = if value_type == ValueType::Bytes {
            decode_hex_value(declared)?
        } else {
            declared
        };

        Ok(Self {
            element,
            operator,
            declared,
            value_type,
        })
    }

    /// Parse a rule from its YAML mapping
    ///
    /// # Errors
    /// Fails if `element` is missing, if an `argument*` element lacks a
    /// numeric `argument_index`, if several operator keys are present, or if
    /// a `bytes` value is not valid hex.
    pub fn from_yaml(declaration: &Mapping) -> Result<Self, RuleError> {
        let element_name = field(declaration, "element")
            .and_then(serde_yml::Value::as_str)
            .ok_or(RuleError::MissingField("element"))?;
        let element = parse_element(element_name, declaration)?;

        let (operator, declared) = parse_operator(declaration)?;

        let value_type = match field(declaration, "type") {
            Some(node) => ValueType::from_name(node.as_str().unwrap_or_default()),
            None => declared.value_type(),
        };

        Self::new(element, operator, declared, value_type)
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn declared(&self) -> &Value {
        &self.declared
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Compare the rule against one observed value
    ///
    /// An unknown function name always matches. Otherwise the observed type
    /// must equal the rule type before the operator runs.
    pub fn matches(&self, observed: &Value) -> bool {
        let observed_type = observed.value_type();

        if observed_type == ValueType::Unknown && self.element == Element::FunctionName {
            return true;
        }

        observed_type == self.value_type && self.operator.apply(&self.declared, observed)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operator == Operator::True || self.declared.is_unknown() {
            write!(f, "[{} is of type {}]", self.element, self.value_type)
        } else {
            write!(
                f,
                "[{} {} {} ({})]",
                self.element, self.operator, self.declared, self.value_type
            )
        }
    }
}

fn field<'a>(declaration: &'a Mapping, name: &str) -> Option<&'a serde_yml::Value> {
    declaration
        .iter()
        .find(|(key, _)| key.as_str() == Some(name))
        .map(|(_, value)| value)
}

/// Operator keyword of a mapping key
///
/// Unquoted `true:` is a YAML boolean key, not a string.
fn operator_key(key: &serde_yml::Value) -> Option<Operator> {
    match key {
        serde_yml::Value::String(name) => Operator::from_keyword(name),
        serde_yml::Value::Bool(true) => Some(Operator::True),
        _ => None,
    }
}

fn parse_element(name: &str, declaration: &Mapping) -> Result<Element, RuleError> {
    if name.starts_with("argument") {
        let index = parse_argument_index(name, declaration)?;
        if name != "argument" {
            return Err(RuleError::UnknownArgumentElement(name.to_string()));
        }
        return Ok(Element::Argument(index));
    }

    Ok(match name {
        "function name" => Element::FunctionName,
        "number of arguments" => Element::NumberOfArguments,
        "any argument" => Element::AnyArgument,
        other => Element::Unrecognized(other.to_string()),
    })
}

fn parse_argument_index(element: &str, declaration: &Mapping) -> Result<usize, RuleError> {
    let node = field(declaration, "argument_index").ok_or(RuleError::MissingField("argument_index"))?;

    let index = match node {
        serde_yml::Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        serde_yml::Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };

    index.ok_or_else(|| RuleError::InvalidArgumentIndex {
        element: element.to_string(),
        value: serde_yml::to_string(node)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    })
}

fn parse_operator(declaration: &Mapping) -> Result<(Operator, Value), RuleError> {
    let mut found: Option<(Operator, Value)> = None;

    for (key, node) in declaration {
        let Some(operator) = operator_key(key) else {
            continue;
        };

        if let Some((first, _)) = &found {
            return Err(RuleError::MultipleOperators {
                first: *first,
                second: operator,
            });
        }

        // Under `true:` the value only contributes its type
        found = Some((operator, Value::from_yaml(node)));
    }

    Ok(found.unwrap_or((Operator::True, Value::Unknown)))
}

fn decode_hex_value(value: Value) -> Result<Value, RuleError> {
    match value {
        Value::String(text) => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            hex::decode(&compact)
                .map(Value::Bytes)
                .map_err(|source| RuleError::InvalidHex {
                    value: text,
                    source,
                })
        }
        Value::Sequence(items) => items
            .into_iter()
            .map(decode_hex_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Value::Unknown => Ok(Value::Unknown),
        Value::Bytes(bytes) => Ok(Value::Bytes(bytes)),
        Value::Number(n) => Err(RuleError::NotHexText(n.to_string())),
    }
}
