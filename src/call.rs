//! Normalized view of one call site
//!
//! Built once per call from the decompiler's raw data. Nothing here fails:
//! arguments that cannot be decoded become [`Value::Unknown`] so that one bad
//! argument never stops the remaining rules from being evaluated.

use crate::decompiler::{MemoryView, RawArgument, RawCall};
use crate::value::Value;
use std::fmt;

/// Prefix of names the decompiler generates for unnamed functions
const AUTO_NAME_PREFIX: &str = "sub_";

/// Typed snapshot of a call's target, argument count and arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub address: u64,
    /// `None` when the target is unresolved or auto-named
    pub function_name: Option<String>,
    pub arguments: Vec<Value>,
}

impl Call {
    pub fn new(address: u64, function_name: Option<String>, arguments: Vec<Value>) -> Self {
        Self {
            address,
            function_name,
            arguments,
        }
    }

    /// Normalize a raw call site
    pub fn from_raw<M: MemoryView + ?Sized>(raw: &RawCall, memory: &M) -> Self {
        let function_name = if raw.name.is_empty() || raw.name.starts_with(AUTO_NAME_PREFIX) {
            None
        } else {
            Some(raw.name.clone())
        };

        let arguments = raw
            .arguments
            .iter()
            .map(|argument| normalize_argument(argument, memory))
            .collect();

        Self {
            address: raw.address,
            function_name,
            arguments,
        }
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    /// Function name as a rule operand
    pub fn name_value(&self) -> Value {
        self.function_name.clone().into()
    }
}

/// Apply the per-kind argument policy
fn normalize_argument<M: MemoryView + ?Sized>(argument: &RawArgument, memory: &M) -> Value {
    match argument {
        RawArgument::String { value } => Value::String(value.clone()),
        // Only the low 32 bits of constants are kept
        RawArgument::Number { value } => Value::Number(*value & 0xFFFF_FFFF),
        RawArgument::Global { address } => memory
            .read_string(*address)
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .map_or(Value::Unknown, Value::String),
        RawArgument::Ref { address } => memory
            .read_item(*address)
            .map_or(Value::Unknown, Value::Bytes),
        RawArgument::Unknown { string: Some(text) } => Value::String(text.clone()),
        RawArgument::Unknown { string: None } => Value::Unknown,
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.arguments.iter().map(ToString::to_string).collect();
        write!(
            f,
            "{}({})",
            self.function_name.as_deref().unwrap_or("?"),
            rendered.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeMemory {
        strings: HashMap<u64, Vec<u8>>,
        items: HashMap<u64, Vec<u8>>,
    }

    impl MemoryView for FakeMemory {
        fn read_string(&self, address: u64) -> Option<Vec<u8>> {
            self.strings.get(&address).cloned()
        }

        fn read_item(&self, address: u64) -> Option<Vec<u8>> {
            self.items.get(&address).cloned()
        }
    }

    fn raw(name: &str, arguments: Vec<RawArgument>) -> RawCall {
        RawCall {
            address: 0x401000,
            name: name.to_string(),
            arguments,
        }
    }

    #[test]
    fn test_auto_named_target_is_unknown() {
        let memory = FakeMemory::default();
        assert_eq!(Call::from_raw(&raw("sub_401A20", vec![]), &memory).function_name, None);
        assert_eq!(Call::from_raw(&raw("", vec![]), &memory).function_name, None);
        assert_eq!(
            Call::from_raw(&raw("RegSetValueExW", vec![]), &memory).function_name,
            Some("RegSetValueExW".to_string())
        );
    }

    #[test]
    fn test_numbers_truncated_to_32_bits() {
        let memory = FakeMemory::default();
        let call = Call::from_raw(
            &raw(
                "f",
                vec![
                    RawArgument::Number { value: 0x1_0000_0040 },
                    RawArgument::Number { value: -1 },
                    RawArgument::Number { value: 7 },
                ],
            ),
            &memory,
        );
        assert_eq!(
            call.arguments,
            vec![
                Value::Number(0x40),
                Value::Number(0xFFFF_FFFF),
                Value::Number(7)
            ]
        );
    }

    #[test]
    fn test_global_and_ref_resolution() {
        let mut memory = FakeMemory::default();
        memory.strings.insert(0x5000, b"cmd.exe".to_vec());
        memory.strings.insert(0x5100, vec![0xff, 0xfe, 0x00]);
        memory.items.insert(0x6000, vec![0xde, 0xad, 0xbe, 0xef]);

        let call = Call::from_raw(
            &raw(
                "f",
                vec![
                    RawArgument::Global { address: 0x5000 },
                    RawArgument::Global { address: 0x5100 },
                    RawArgument::Global { address: 0x9999 },
                    RawArgument::Ref { address: 0x6000 },
                    RawArgument::Ref { address: 0x9999 },
                ],
            ),
            &memory,
        );

        assert_eq!(
            call.arguments,
            vec![
                Value::from("cmd.exe"),
                Value::Unknown,
                Value::Unknown,
                Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef]),
                Value::Unknown,
            ]
        );
    }

    #[test]
    fn test_partial_arguments() {
        let memory = FakeMemory::default();
        let call = Call::from_raw(
            &raw(
                "f",
                vec![
                    RawArgument::Unknown {
                        string: Some("SeDebugPrivilege".to_string()),
                    },
                    RawArgument::Unknown { string: None },
                ],
            ),
            &memory,
        );
        assert_eq!(call.argument_count(), 2);
        assert_eq!(call.arguments[0], Value::from("SeDebugPrivilege"));
        assert_eq!(call.arguments[1], Value::Unknown);
    }

    #[test]
    fn test_display() {
        let call = Call::new(
            0x1000,
            Some("WriteFile".to_string()),
            vec![
                Value::from("a.txt"),
                Value::Number(0x40),
                Value::Bytes(vec![0xff, 0x00]),
                Value::Unknown,
            ],
        );
        assert_eq!(call.to_string(), "WriteFile('a.txt', 0x40, 0xff00, ?)");

        let call = Call::new(0x1000, None, vec![]);
        assert_eq!(call.to_string(), "?()");
    }
}
