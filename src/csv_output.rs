//! CSV output format for match results

use crate::report::MatchRecord;

/// CSV output formatter
#[derive(Debug, Default)]
pub struct CsvOutput<'a> {
    records: Vec<&'a MatchRecord>,
}

impl<'a> CsvOutput<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&mut self, record: &'a MatchRecord) {
        self.records.push(record);
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_record(record: &MatchRecord) -> String {
        [
            record.address.as_str(),
            record.technique.as_str(),
            record.call.as_str(),
            record.signature.as_str(),
        ]
        .iter()
        .map(|field| Self::escape_field(field))
        .collect::<Vec<_>>()
        .join(",")
    }

    /// Header plus one row per record
    pub fn format(&self) -> String {
        let mut output = String::from("address,technique,call,signature\n");
        for record in &self.records {
            output.push_str(&Self::format_record(record));
            output.push('\n');
        }
        output
    }
}

impl<'a> FromIterator<&'a MatchRecord> for CsvOutput<'a> {
    fn from_iter<I: IntoIterator<Item = &'a MatchRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
