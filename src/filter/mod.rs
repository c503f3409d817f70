use crate::core::{ComplianceStatus, FilterSelection, HostSummary};

/// OS values in the order they first appear in the summary.
pub fn observed_os(summary: &[HostSummary]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for row in summary {
        if !out.contains(&row.os) {
            out.push(row.os.clone());
        }
    }
    out
}

pub fn observed_status(summary: &[HostSummary]) -> Vec<ComplianceStatus> {
    let mut out = Vec::new();
    for row in summary {
        if !out.contains(&row.status) {
            out.push(row.status);
        }
    }
    out
}

pub fn apply(summary: &[HostSummary], selection: &FilterSelection) -> Vec<HostSummary> {
    summary
        .iter()
        .filter(|row| selection.matches(row))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HostKey;
    use std::collections::BTreeSet;

    fn row(host: &str, os: &str, pass: usize, total: usize) -> HostSummary {
        HostSummary::from_counts(
            HostKey {
                hostname: host.to_string(),
                os: os.to_string(),
            },
            pass,
            total,
        )
    }

    fn summary() -> Vec<HostSummary> {
        vec![
            row("h1", "linux", 1, 2),
            row("h2", "win", 1, 1),
            row("h3", "linux", 3, 3),
            row("h4", "mac", 0, 2),
        ]
    }

    #[test]
    fn observed_values_keep_first_seen_order() {
        let s = summary();
        assert_eq!(observed_os(&s), vec!["linux", "win", "mac"]);
        assert_eq!(
            observed_status(&s),
            vec![ComplianceStatus::NotComply, ComplianceStatus::Comply]
        );
    }

    #[test]
    fn default_selection_keeps_everything() {
        let s = summary();
        assert_eq!(apply(&s, &FilterSelection::all(&s)), s);
    }

    #[test]
    fn filtered_rows_are_a_subset_matching_both_sets() {
        let s = summary();
        let selection = FilterSelection {
            os: BTreeSet::from(["linux".to_string(), "mac".to_string()]),
            status: BTreeSet::from([ComplianceStatus::NotComply]),
        };
        let filtered = apply(&s, &selection);
        let hosts: Vec<&str> = filtered.iter().map(|r| r.hostname.as_str()).collect();
        assert_eq!(hosts, vec!["h1", "h4"]);
        for r in &filtered {
            assert!(s.contains(r));
            assert!(selection.os.contains(&r.os));
            assert!(selection.status.contains(&r.status));
        }
    }

    #[test]
    fn empty_inclusion_set_yields_nothing() {
        let s = summary();
        let mut no_os = FilterSelection::all(&s);
        no_os.os.clear();
        assert!(apply(&s, &no_os).is_empty());

        let mut no_status = FilterSelection::all(&s);
        no_status.status.clear();
        assert!(apply(&s, &no_status).is_empty());
    }
}
