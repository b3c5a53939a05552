//! JSON output format for match results

use crate::matcher::ScanSummary;
use crate::report::MatchRecord;
use serde::Serialize;

/// Top-level JSON document
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    pub matches: &'a [MatchRecord],
    pub summary: JsonSummary,
}

/// Scan and catalog counters
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    pub signatures: usize,
    pub signature_failures: usize,
    #[serde(flatten)]
    pub scan: ScanSummary,
}

impl<'a> JsonOutput<'a> {
    pub fn new(
        matches: &'a [MatchRecord],
        signatures: usize,
        signature_failures: usize,
        scan: ScanSummary,
    ) -> Self {
        Self {
            matches,
            summary: JsonSummary {
                signatures,
                signature_failures,
                scan,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_document() {
        let records = vec![MatchRecord {
            address: "0x1010".to_string(),
            technique: "T1".to_string(),
            call: "CreateFileW('a')".to_string(),
            signature: "t1.yaml".to_string(),
            raw_address: 0x1010,
        }];
        let scan = ScanSummary {
            functions_scanned: 1,
            calls: 3,
            matches: 1,
            ..ScanSummary::default()
        };

        let json = JsonOutput::new(&records, 4, 1, scan).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["matches"][0]["address"], "0x1010");
        assert_eq!(value["matches"][0]["technique"], "T1");
        assert_eq!(value["matches"][0]["signature"], "t1.yaml");
        assert!(value["matches"][0].get("raw_address").is_none());
        assert_eq!(value["summary"]["signatures"], 4);
        assert_eq!(value["summary"]["signature_failures"], 1);
        assert_eq!(value["summary"]["calls"], 3);
        assert_eq!(value["summary"]["functions_skipped"], 0);
    }
}
