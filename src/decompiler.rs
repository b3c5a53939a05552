//! Interface to the decompiler that supplies functions and call sites
//!
//! The matcher never depends on a concrete decompiler. A host implements
//! [`Decompiler`] (and the [`MemoryView`] it extends) over whatever analysis
//! backend it has; [`crate::program::ProgramDump`] is the implementation used
//! by the command line tool.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A function failed to decompile
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to decompile {function}: {reason}")]
pub struct DecompileError {
    pub function: String,
    pub reason: String,
}

/// A function known to the decompiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub address: u64,
    pub name: String,
    /// Statically linked library code (e.g. FLIRT-identified)
    pub is_library: bool,
    /// Import stub / dynamically linked trampoline
    pub is_thunk: bool,
}

/// One argument as the decompiler reports it, before normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawArgument {
    /// String literal
    String { value: String },
    /// Numeric constant, signed or unsigned 64-bit in the dump
    Number {
        #[serde(deserialize_with = "crate::program::constant::deserialize")]
        value: i64,
    },
    /// Reference to a global variable, usually a string literal
    Global {
        #[serde(with = "crate::program::address")]
        address: u64,
    },
    /// Reference to a data item, read back with its declared size
    Ref {
        #[serde(with = "crate::program::address")]
        address: u64,
    },
    /// Partially analysed expression, possibly carrying literal text
    Unknown {
        #[serde(default)]
        string: Option<String>,
    },
}

/// A call site as the decompiler reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCall {
    #[serde(with = "crate::program::address")]
    pub address: u64,
    /// Target name; auto-generated names (`sub_*`) count as unresolved
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<RawArgument>,
}

/// Read access to the analysed program's data
pub trait MemoryView {
    /// Bytes of the string literal stored at a global, without terminator
    fn read_string(&self, address: u64) -> Option<Vec<u8>>;

    /// Bytes of the data item at `address`, using its declared size
    fn read_item(&self, address: u64) -> Option<Vec<u8>>;
}

/// Source of functions and their call sites
pub trait Decompiler: MemoryView {
    /// All functions, in the order they should be scanned
    fn functions(&self) -> Vec<FunctionInfo>;

    /// Decompile one function and list its call sites
    ///
    /// # Errors
    /// Returns [`DecompileError`] when the function cannot be decompiled.
    /// Callers report it and move on to the next function.
    fn decompile(&self, function: &FunctionInfo) -> Result<Vec<RawCall>, DecompileError>;
}
