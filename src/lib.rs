//! callsig - call signature matching for decompiled binaries
//!
//! Signatures are YAML files describing a function name, argument count
//! and argument values that together indicate a technique. Every call site a
//! decompiler reports is normalized into a [`call::Call`] and tested against
//! every [`signature::Signature`] in the [`catalog::SignatureCatalog`].

pub mod call;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod decompiler;
pub mod json_output;
pub mod matcher;
pub mod operator;
pub mod program;
pub mod report;
pub mod rule;
pub mod signature;
pub mod value;

pub use call::Call;
pub use catalog::SignatureCatalog;
pub use matcher::Matcher;
pub use rule::Rule;
pub use signature::Signature;
pub use value::{Value, ValueType};
