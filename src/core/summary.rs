use serde::{Deserialize, Serialize};

use crate::core::ComplianceStatus;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostKey {
    pub hostname: String,
    pub os: String,
}

/// Aggregated outcome for one (Hostname, OS) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSummary {
    pub hostname: String,
    pub os: String,
    pub pass_count: usize,
    pub total_controls: usize,
    pub status: ComplianceStatus,
    pub compliance_ratio: String,
}

impl HostSummary {
    pub fn from_counts(key: HostKey, pass_count: usize, total_controls: usize) -> Self {
        Self {
            hostname: key.hostname,
            os: key.os,
            pass_count,
            total_controls,
            status: ComplianceStatus::from_counts(pass_count, total_controls),
            compliance_ratio: format!("{pass_count}/{total_controls}"),
        }
    }

    pub fn key(&self) -> HostKey {
        HostKey {
            hostname: self.hostname.clone(),
            os: self.os.clone(),
        }
    }

    pub fn selection_label(&self) -> String {
        format!("{}/{}/{}", self.hostname, self.os, self.status)
    }
}
