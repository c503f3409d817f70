use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::{ComplianceStatus, FilterSelection, HostKey, HostSummary};
use crate::filter::{observed_os, observed_status};

/// Picks a host row. Without an OS the first row with a matching Hostname wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSelector {
    pub hostname: String,
    pub os: Option<String>,
}

impl HostSelector {
    pub fn hostname(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            os: None,
        }
    }

    pub fn key(key: &HostKey) -> Self {
        Self {
            hostname: key.hostname.clone(),
            os: Some(key.os.clone()),
        }
    }

    pub fn matches(&self, row: &HostSummary) -> bool {
        row.hostname == self.hostname && self.os.as_ref().is_none_or(|os| *os == row.os)
    }
}

/// State that survives between passes. Everything else is recomputed.
///
/// Filter values are tracked as "unchecked", so a value first observed in a
/// later pass (e.g. after an upload) starts out checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    upload: Option<PathBuf>,
    unchecked_os: BTreeSet<String>,
    unchecked_status: BTreeSet<ComplianceStatus>,
    selected_host: Option<HostSelector>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload(&self) -> Option<&Path> {
        self.upload.as_deref()
    }

    pub fn set_upload(&mut self, upload: Option<PathBuf>) {
        self.upload = upload;
    }

    pub fn is_os_checked(&self, os: &str) -> bool {
        !self.unchecked_os.contains(os)
    }

    pub fn toggle_os(&mut self, os: &str) {
        if !self.unchecked_os.remove(os) {
            self.unchecked_os.insert(os.to_string());
        }
    }

    pub fn is_status_checked(&self, status: ComplianceStatus) -> bool {
        !self.unchecked_status.contains(&status)
    }

    pub fn toggle_status(&mut self, status: ComplianceStatus) {
        if !self.unchecked_status.remove(&status) {
            self.unchecked_status.insert(status);
        }
    }

    /// Leaves only `wanted` checked among the observed OS values.
    pub fn restrict_os(&mut self, observed: &[String], wanted: &[String]) {
        for os in observed {
            if wanted.contains(os) {
                self.unchecked_os.remove(os);
            } else {
                self.unchecked_os.insert(os.clone());
            }
        }
    }

    pub fn restrict_status(&mut self, wanted: &[ComplianceStatus]) {
        for status in ComplianceStatus::ALL {
            if wanted.contains(&status) {
                self.unchecked_status.remove(&status);
            } else {
                self.unchecked_status.insert(status);
            }
        }
    }

    pub fn filter_for(&self, summary: &[HostSummary]) -> FilterSelection {
        FilterSelection {
            os: observed_os(summary)
                .into_iter()
                .filter(|os| self.is_os_checked(os))
                .collect(),
            status: observed_status(summary)
                .into_iter()
                .filter(|s| self.is_status_checked(*s))
                .collect(),
        }
    }

    pub fn selected_host(&self) -> Option<&HostSelector> {
        self.selected_host.as_ref()
    }

    pub fn select_host(&mut self, selector: HostSelector) {
        self.selected_host = Some(selector);
    }

    pub fn clear_host(&mut self) {
        self.selected_host = None;
    }

    /// Row click: selects the row, or deselects it when it is already selected.
    pub fn toggle_host(&mut self, key: &HostKey) {
        let selector = HostSelector::key(key);
        if self.selected_host.as_ref() == Some(&selector) {
            self.selected_host = None;
        } else {
            self.selected_host = Some(selector);
        }
    }
}
