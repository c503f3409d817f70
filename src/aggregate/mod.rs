use std::collections::BTreeMap;

use crate::core::{HostKey, HostSummary, RecordTable};

/// Groups records by (Hostname, OS) and counts passing controls.
/// Rows come out ordered by Hostname, then OS.
pub fn summarize(table: &RecordTable) -> Vec<HostSummary> {
    let mut groups: BTreeMap<HostKey, (usize, usize)> = BTreeMap::new();
    for record in table.records() {
        let key = HostKey {
            hostname: record.hostname.clone(),
            os: record.os.clone(),
        };
        let entry = groups.entry(key).or_insert((0, 0));
        if record.is_pass() {
            entry.0 += 1;
        }
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(key, (pass, total))| HostSummary::from_counts(key, pass, total))
        .collect()
}
