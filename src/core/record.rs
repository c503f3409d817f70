use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub const REQUIRED_COLUMNS: [&str; 3] = ["Hostname", "OS", "Result"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Pass,
    Fail,
    Other,
}

impl Outcome {
    pub fn parse(result: &str) -> Self {
        let lowered = result.to_lowercase();
        match lowered.as_str() {
            "pass" => Outcome::Pass,
            "fail" => Outcome::Fail,
            _ => Outcome::Other,
        }
    }
}

/// One (host, control-check) evaluation. Columns beyond the required three
/// are kept in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub hostname: String,
    pub os: String,
    pub result: String,
    pub extra: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new(hostname: impl Into<String>, os: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            os: os.into(),
            result: result.into(),
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((column.into(), value.into()));
        self
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::parse(&self.result)
    }

    pub fn is_pass(&self) -> bool {
        self.outcome() == Outcome::Pass
    }

    pub fn value(&self, column: &str) -> Option<&str> {
        match column {
            "Hostname" => Some(&self.hostname),
            "OS" => Some(&self.os),
            "Result" => Some(&self.result),
            _ => self
                .extra
                .iter()
                .find(|(name, _)| name == column)
                .map(|(_, v)| v.as_str()),
        }
    }
}

/// Concatenated records plus the union of their columns (first-seen order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTable {
    columns: Vec<String>,
    records: Vec<RawRecord>,
}

impl Default for RecordTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordTable {
    pub fn new() -> Self {
        Self {
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            records: Vec::new(),
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = RawRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.push(record);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn add_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }

    pub fn push(&mut self, record: RawRecord) {
        for (column, _) in &record.extra {
            self.add_column(column);
        }
        self.records.push(record);
    }

    pub fn append(&mut self, other: RecordTable) {
        for column in &other.columns {
            self.add_column(column);
        }
        self.records.extend(other.records);
    }

    /// Values for every table column; columns the record does not carry are empty.
    pub fn row_values(&self, record: &RawRecord) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| record.value(c).unwrap_or_default().to_string())
            .collect()
    }

    /// Drops exact full-row duplicates, keeping the first occurrence.
    /// Returns the number of removed rows.
    pub fn dedup(&mut self) -> usize {
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let keep: Vec<bool> = self
            .records
            .iter()
            .map(|r| seen.insert(self.row_values(r)))
            .collect();
        let before = self.records.len();
        let mut keep = keep.into_iter();
        self.records.retain(|_| keep.next().unwrap_or(true));
        before - self.records.len()
    }

    pub fn for_host(&self, hostname: &str) -> RecordTable {
        RecordTable {
            columns: self.columns.clone(),
            records: self
                .records
                .iter()
                .filter(|r| r.hostname == hostname)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_is_case_insensitive() {
        assert_eq!(Outcome::parse("PASS"), Outcome::Pass);
        assert_eq!(Outcome::parse("Fail"), Outcome::Fail);
        assert_eq!(Outcome::parse("n/a"), Outcome::Other);
        assert_eq!(Outcome::parse(""), Outcome::Other);
    }

    #[test]
    fn append_unions_columns_in_first_seen_order() {
        let mut a = RecordTable::from_records([RawRecord::new("h1", "linux", "pass")
            .with_extra("Control", "c1")]);
        let b = RecordTable::from_records([RawRecord::new("h2", "win", "fail")
            .with_extra("Severity", "high")
            .with_extra("Control", "c2")]);
        a.append(b);

        assert_eq!(
            a.columns(),
            ["Hostname", "OS", "Result", "Control", "Severity"]
        );
        assert_eq!(
            a.row_values(&a.records()[0]),
            vec!["h1", "linux", "pass", "c1", ""]
        );
    }

    #[test]
    fn dedup_removes_exact_duplicates_only() {
        let mut table = RecordTable::from_records([
            RawRecord::new("h1", "linux", "pass").with_extra("Control", "c1"),
            RawRecord::new("h1", "linux", "pass").with_extra("Control", "c1"),
            RawRecord::new("h1", "linux", "PASS").with_extra("Control", "c1"),
            RawRecord::new("h1", "linux", "pass").with_extra("Control", "c2"),
        ]);

        assert_eq!(table.dedup(), 1);
        assert_eq!(table.len(), 3);
        assert_eq!(table.dedup(), 0);
    }

    #[test]
    fn missing_and_empty_values_compare_equal() {
        let mut table = RecordTable::from_records([
            RawRecord::new("h1", "linux", "pass").with_extra("Note", ""),
            RawRecord::new("h1", "linux", "pass"),
        ]);
        assert_eq!(table.dedup(), 1);
    }

    #[test]
    fn for_host_keeps_columns_and_matches_hostname_only() {
        let table = RecordTable::from_records([
            RawRecord::new("h1", "linux", "pass"),
            RawRecord::new("h2", "linux", "pass"),
            RawRecord::new("h1", "rhel", "fail").with_extra("Control", "c9"),
        ]);
        let host = table.for_host("h1");
        assert_eq!(host.len(), 2);
        assert_eq!(host.columns(), table.columns());
    }
}
