use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::{ComplianceStatus, HostSummary};

/// Inclusion sets for the OS and status dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub os: BTreeSet<String>,
    pub status: BTreeSet<ComplianceStatus>,
}

impl FilterSelection {
    pub fn all(summary: &[HostSummary]) -> Self {
        Self {
            os: summary.iter().map(|r| r.os.clone()).collect(),
            status: summary.iter().map(|r| r.status).collect(),
        }
    }

    pub fn matches(&self, row: &HostSummary) -> bool {
        self.os.contains(&row.os) && self.status.contains(&row.status)
    }
}
