//! Call signatures: a technique label plus an ordered conjunction of rules
//!
//! # Example YAML
//! ```yaml
//! signature:
//!   technique: T1055
//!   description: Remote memory allocated as RWX
//!   rules:
//!     - element: function name
//!       equals: VirtualAllocEx
//!     - element: argument
//!       argument_index: 4
//!       equals: 0x40
//! ```

use crate::call::Call;
use crate::rule::{Element, Rule, RuleError};
use crate::value::Value;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a signature declaration
#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid signature YAML: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("signature has an empty technique")]
    EmptyTechnique,

    #[error("rule #{index}: {source}")]
    Rule {
        index: usize,
        #[source]
        source: RuleError,
    },
}

/// A signature could not be evaluated against a call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("unknown rule element '{element}' in signature {signature}")]
    UnknownElement { element: String, signature: String },
}

#[derive(Deserialize)]
struct SignatureFile {
    signature: SignatureDeclaration,
}

#[derive(Deserialize)]
struct SignatureDeclaration {
    technique: String,
    #[serde(default)]
    description: Option<String>,
    rules: Vec<serde_yml::Mapping>,
}

/// A parsed call signature
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub technique: String,
    pub description: String,
    pub rules: Vec<Rule>,
    /// File the signature was loaded from
    pub source: PathBuf,
}

impl Signature {
    pub fn new(
        technique: impl Into<String>,
        description: impl Into<String>,
        rules: Vec<Rule>,
        source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            technique: technique.into(),
            description: description.into(),
            rules,
            source: source.into(),
        }
    }

    /// Load a signature from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SignatureError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SignatureError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml_str(&content, path)
    }

    /// Parse a signature declaration
    ///
    /// `source` only labels the signature in match records and logs.
    pub fn from_yaml_str(content: &str, source: impl Into<PathBuf>) -> Result<Self, SignatureError> {
        let file: SignatureFile = serde_yml::from_str(content)?;
        let declaration = file.signature;

        if declaration.technique.trim().is_empty() {
            return Err(SignatureError::EmptyTechnique);
        }

        let rules = declaration
            .rules
            .iter()
            .enumerate()
            .map(|(index, mapping)| {
                Rule::from_yaml(mapping).map_err(|source| SignatureError::Rule { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            declaration.technique,
            declaration.description.unwrap_or_default(),
            rules,
            source,
        ))
    }

    /// Base name of the declaration file
    pub fn filename(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }

    /// Rules whose element this version cannot evaluate
    pub fn unrecognized_elements(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().filter_map(|rule| match rule.element() {
            Element::Unrecognized(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Check every rule against a call, stopping at the first miss
    ///
    /// # Errors
    /// Returns [`MatchError::UnknownElement`] when a rule targets an element
    /// that does not exist. Such a signature was written for another schema
    /// and is reported instead of silently never matching.
    pub fn matches(&self, call: &Call) -> Result<bool, MatchError> {
        for rule in &self.rules {
            let result = match rule.element() {
                Element::FunctionName => rule.matches(&call.name_value()),
                Element::NumberOfArguments => {
                    let count = i64::try_from(call.argument_count()).unwrap_or(i64::MAX);
                    rule.matches(&Value::Number(count))
                }
                Element::Argument(index) => call
                    .arguments
                    .get(*index)
                    .is_some_and(|argument| rule.matches(argument)),
                Element::AnyArgument => call.arguments.iter().any(|argument| rule.matches(argument)),
                Element::Unrecognized(element) => {
                    return Err(MatchError::UnknownElement {
                        element: element.clone(),
                        signature: self.filename(),
                    });
                }
            };

            tracing::trace!("{}: {} -> {}", call, rule, result);

            if !result {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules: Vec<String> = self.rules.iter().map(ToString::to_string).collect();
        write!(f, "{}: {}", self.technique, rules.join(" and "))
    }
}
