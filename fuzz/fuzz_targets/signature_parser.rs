#![no_main]

use callsig::{Call, Signature, Value};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing and evaluating must never panic, whatever the declaration
        if let Ok(signature) = Signature::from_yaml_str(input, "fuzz.yaml") {
            let call = Call::new(
                0x1000,
                Some("CreateFileW".to_string()),
                vec![Value::from("C:\\x"), Value::from(0x40), Value::Unknown],
            );
            let _ = signature.matches(&call);
            let _ = signature.to_string();
        }
    }
});
