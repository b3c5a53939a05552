//! JSON program dumps
//!
//! A program dump is what a decompiler host exports for offline matching:
//! functions with their call sites and typed arguments, plus the data items
//! that global/memory-reference arguments point to.
//!
//! # Example
//! ```json
//! {
//!   "functions": [
//!     { "address": "0x401000", "name": "main",
//!       "calls": [ { "address": "0x401010", "name": "WinExec",
//!                    "arguments": [ {"kind": "global", "address": "0x403000"},
//!                                   {"kind": "number", "value": 0} ] } ] }
//!   ],
//!   "data": [ { "address": "0x403000", "bytes": "636d642e65786500" } ]
//! }
//! ```

use crate::decompiler::{DecompileError, Decompiler, FunctionInfo, MemoryView, RawCall};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Serde adapter accepting addresses as integers or `0x` text
pub(crate) mod address {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u64),
        Text(String),
    }

    pub fn parse(text: &str) -> Result<u64, std::num::ParseIntError> {
        let text = text.trim();
        match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(digits) => u64::from_str_radix(digits, 16),
            None => text.parse(),
        }
    }

    pub fn serialize<S: Serializer>(address: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", address))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Int(n) => Ok(n),
            Repr::Text(text) => {
                parse(&text).map_err(|e| D::Error::custom(format!("invalid address '{}': {}", text, e)))
            }
        }
    }
}

/// Constants wider than `i64` keep their bit pattern
pub(crate) mod constant {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Signed(i64),
        Unsigned(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Signed(n) => n,
            Repr::Unsigned(n) => n as i64,
        })
    }
}

/// Hex-encoded byte payload
mod hex_bytes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text.trim()).map_err(D::Error::custom)
    }
}

/// One function of the dump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpFunction {
    #[serde(with = "address")]
    pub address: u64,
    pub name: String,
    #[serde(default)]
    pub library: bool,
    #[serde(default)]
    pub thunk: bool,
    /// Set when the host could not decompile the function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decompile_error: Option<String>,
    #[serde(default)]
    pub calls: Vec<RawCall>,
}

/// A data item with its declared contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataItem {
    #[serde(with = "address")]
    pub address: u64,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DumpFile {
    #[serde(default)]
    functions: Vec<DumpFunction>,
    #[serde(default)]
    data: Vec<DataItem>,
}

/// Decompiler backed by a JSON dump
#[derive(Debug, Clone, Default)]
pub struct ProgramDump {
    functions: Vec<DumpFunction>,
    data: BTreeMap<u64, Vec<u8>>,
}

impl ProgramDump {
    pub fn new(functions: Vec<DumpFunction>, data: Vec<DataItem>) -> Self {
        Self {
            functions,
            data: data.into_iter().map(|item| (item.address, item.bytes)).collect(),
        }
    }

    /// Load a dump from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read program dump: {}", path.display()))?;

        Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse program dump: {}", path.display()))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: DumpFile = serde_json::from_str(content).context("Invalid program dump JSON")?;
        Ok(Self::new(file.functions, file.data))
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

impl MemoryView for ProgramDump {
    fn read_string(&self, address: u64) -> Option<Vec<u8>> {
        let bytes = self.data.get(&address)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        Some(bytes[..end].to_vec())
    }

    fn read_item(&self, address: u64) -> Option<Vec<u8>> {
        self.data.get(&address).cloned()
    }
}

impl Decompiler for ProgramDump {
    fn functions(&self) -> Vec<FunctionInfo> {
        self.functions
            .iter()
            .map(|f| FunctionInfo {
                address: f.address,
                name: f.name.clone(),
                is_library: f.library,
                is_thunk: f.thunk,
            })
            .collect()
    }

    fn decompile(&self, function: &FunctionInfo) -> Result<Vec<RawCall>, DecompileError> {
        let dumped = self
            .functions
            .iter()
            .find(|f| f.address == function.address)
            .ok_or_else(|| DecompileError {
                function: function.name.clone(),
                reason: "function not present in dump".to_string(),
            })?;

        match &dumped.decompile_error {
            Some(reason) => Err(DecompileError {
                function: function.name.clone(),
                reason: reason.clone(),
            }),
            None => Ok(dumped.calls.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompiler::RawArgument;

    const DUMP: &str = r#"{
        "functions": [
            { "address": "0x401000", "name": "main",
              "calls": [
                { "address": 4198416, "name": "WinExec",
                  "arguments": [ {"kind": "global", "address": "0x403000"},
                                 {"kind": "number", "value": 5} ] },
                { "address": "0x401020", "name": "sub_401800",
                  "arguments": [ {"kind": "ref", "address": "0x403010"},
                                 {"kind": "unknown"},
                                 {"kind": "string", "value": "x"} ] }
              ] },
            { "address": "0x402000", "name": "_memcpy", "library": true },
            { "address": "0x402100", "name": "huge", "decompile_error": "too big" }
        ],
        "data": [
            { "address": "0x403000", "bytes": "636d642e65786500" },
            { "address": "0x403010", "bytes": "ff00" }
        ]
    }"#;

    #[test]
    fn test_unsigned_constant_keeps_low_bits() {
        let dump = ProgramDump::from_json_str(
            r#"{ "functions": [ { "address": 4096, "name": "main", "calls": [
                { "address": 4100, "name": "CloseHandle",
                  "arguments": [ {"kind": "number", "value": 18446744073709551615},
                                 {"kind": "number", "value": -2} ] } ] } ] }"#,
        )
        .unwrap();

        let functions = dump.functions();
        let calls = dump.decompile(&functions[0]).unwrap();
        assert_eq!(calls[0].arguments[0], RawArgument::Number { value: -1 });

        let call = crate::call::Call::from_raw(&calls[0], &dump);
        assert_eq!(call.arguments[0], crate::value::Value::Number(0xFFFF_FFFF));
        assert_eq!(call.arguments[1], crate::value::Value::Number(0xFFFF_FFFE));
    }

    #[test]
    fn test_parse_dump() {
        let dump = ProgramDump::from_json_str(DUMP).unwrap();
        assert_eq!(dump.function_count(), 3);

        let functions = dump.functions();
        assert_eq!(functions[0].address, 0x401000);
        assert!(!functions[0].is_library && !functions[0].is_thunk);
        assert!(functions[1].is_library);

        let calls = dump.decompile(&functions[0]).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].address, 0x401010);
        assert_eq!(calls[0].arguments[0], RawArgument::Global { address: 0x403000 });
        assert_eq!(calls[1].arguments[1], RawArgument::Unknown { string: None });
    }

    #[test]
    fn test_decompile_error() {
        let dump = ProgramDump::from_json_str(DUMP).unwrap();
        let functions = dump.functions();
        let err = dump.decompile(&functions[2]).unwrap_err();
        assert_eq!(err.reason, "too big");
        assert!(err.to_string().contains("huge"));
    }

    #[test]
    fn test_memory_view() {
        let dump = ProgramDump::from_json_str(DUMP).unwrap();
        assert_eq!(dump.read_string(0x403000), Some(b"cmd.exe".to_vec()));
        assert_eq!(dump.read_item(0x403000).map(|b| b.len()), Some(8));
        assert_eq!(dump.read_item(0x403010), Some(vec![0xff, 0x00]));
        assert_eq!(dump.read_string(0x999), None);
    }

    #[test]
    fn test_invalid_dump() {
        assert!(ProgramDump::from_json_str("{ not json").is_err());
        assert!(ProgramDump::from_json_str(
            r#"{"data": [{"address": "0xZZ", "bytes": "00"}]}"#
        )
        .is_err());
        assert!(ProgramDump::from_json_str(
            r#"{"data": [{"address": 1, "bytes": "0g"}]}"#
        )
        .is_err());
    }

    #[test]
    fn test_empty_dump() {
        let dump = ProgramDump::from_json_str("{}").unwrap();
        assert_eq!(dump.function_count(), 0);
    }

    #[test]
    fn test_address_parse() {
        assert_eq!(address::parse("0x10"), Ok(16));
        assert_eq!(address::parse("0X10"), Ok(16));
        assert_eq!(address::parse("10"), Ok(10));
        assert!(address::parse("0x").is_err());
    }
}
