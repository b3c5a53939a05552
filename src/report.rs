//! Match records and the sinks that collect them

use crate::call::Call;
use crate::signature::Signature;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One successful signature match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Call address as `0x...` text
    pub address: String,
    pub technique: String,
    /// Rendered call, e.g. `WinExec('cmd.exe', 0x0)`
    pub call: String,
    /// File name of the matching signature
    pub signature: String,
    #[serde(skip)]
    pub raw_address: u64,
}

impl MatchRecord {
    pub fn new(call: &Call, signature: &Signature) -> Self {
        Self {
            address: format!("{:#x}", call.address),
            technique: signature.technique.clone(),
            call: call.to_string(),
            signature: signature.filename(),
            raw_address: call.address,
        }
    }
}

/// Receiver of match records, in match order
pub trait MatchSink {
    fn add(&mut self, record: MatchRecord);
}

/// Ordered in-memory result list
#[derive(Debug, Clone, Default)]
pub struct MatchList {
    records: Vec<MatchRecord>,
}

impl MatchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Order by call address; records at the same address keep match order
    pub fn sort_by_address(&mut self) {
        self.records.sort_by_key(|r| r.raw_address);
    }

    /// Render as aligned text columns
    pub fn to_text(&self) -> String {
        const HEADERS: [&str; 4] = ["Address", "Technique", "Call", "Call Signature"];

        let rows: Vec<[&str; 4]> = self
            .records
            .iter()
            .map(|r| {
                [
                    r.address.as_str(),
                    r.technique.as_str(),
                    r.call.as_str(),
                    r.signature.as_str(),
                ]
            })
            .collect();

        let mut widths = HEADERS.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        for row in std::iter::once(&HEADERS).chain(rows.iter()) {
            let mut line = String::new();
            for (i, (cell, width)) in row.iter().zip(widths).enumerate() {
                if i + 1 == row.len() {
                    line.push_str(cell);
                } else {
                    let _ = write!(line, "{:<width$}  ", cell, width = width);
                }
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

impl MatchSink for MatchList {
    fn add(&mut self, record: MatchRecord) {
        self.records.push(record);
    }
}

impl MatchSink for Vec<MatchRecord> {
    fn add(&mut self, record: MatchRecord) {
        self.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn record(address: u64, technique: &str) -> MatchRecord {
        let call = Call::new(
            address,
            Some("WinExec".to_string()),
            vec![Value::from("cmd.exe"), Value::from(0)],
        );
        let signature = Signature::new(technique, "", vec![], "sigs/exec.yaml");
        MatchRecord::new(&call, &signature)
    }

    #[test]
    fn test_record_fields() {
        let r = record(0x401a2b, "T1059");
        assert_eq!(r.address, "0x401a2b");
        assert_eq!(r.technique, "T1059");
        assert_eq!(r.call, "WinExec('cmd.exe', 0x0)");
        assert_eq!(r.signature, "exec.yaml");
        assert_eq!(r.raw_address, 0x401a2b);
    }

    #[test]
    fn test_sort_by_address_is_stable() {
        let mut list = MatchList::new();
        list.add(record(0x3000, "A"));
        list.add(record(0x1000, "B"));
        list.add(record(0x3000, "C"));
        list.sort_by_address();

        let techniques: Vec<&str> = list.records().iter().map(|r| r.technique.as_str()).collect();
        assert_eq!(techniques, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_text_table() {
        let mut list = MatchList::new();
        list.add(record(0x1000, "T1059"));
        let text = list.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Address"));
        assert!(lines[0].ends_with("Call Signature"));
        assert!(lines[1].starts_with("0x1000"));
        assert!(lines[1].contains("WinExec('cmd.exe', 0x0)"));
        assert!(lines[1].ends_with("exec.yaml"));
    }
}
