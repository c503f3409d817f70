use serde::{Deserialize, Serialize};

use crate::core::{
    ComplianceStatus, Distribution, FileFailure, FilterSelection, HostSummary, SourceReport,
    UploadState,
};

pub const TITLE: &str = "Baseline Compliance";
pub const DESCRIPTION: &str = "A Baseline Compliance Dashboard.";
pub const NO_DATA_MESSAGE: &str =
    "No data loaded. Add CSV files to the working directory or upload one.";
pub const EMPTY_FILTER_MESSAGE: &str = "No data available for the selected OS/status filters.";
pub const NO_HOST_MESSAGE: &str = "No host selected.";
pub const WAITING_MESSAGE: &str = "Waiting on file upload... (or loading CSV from local folder)";
pub const LOADED_MESSAGE: &str = "Data loaded.";
pub const UPLOAD_FAILED_MESSAGE: &str = "Uploaded file could not be loaded.";

/// Everything one pass produces, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub schema_version: String,
    pub tool_version: String,
    pub generated_at: String,
    pub sources: Vec<SourceReport>,
    pub failures: Vec<FileFailure>,
    pub upload: UploadState,
    pub duplicates_removed: usize,
    pub body: ViewBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewBody {
    NoData,
    Dashboard(Dashboard),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub observed_os: Vec<String>,
    pub observed_status: Vec<ComplianceStatus>,
    pub filter: FilterSelection,
    pub panel: FilteredPanel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FilteredPanel {
    Empty,
    Populated {
        distribution: Distribution,
        hosts: Vec<HostSummary>,
        selection: HostSelection,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HostSelection {
    None,
    Selected(HostDetail),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostDetail {
    /// 0-based index into the filtered host table.
    pub row: usize,
    pub summary: HostSummary,
    pub columns: Vec<String>,
    pub records: Vec<Vec<String>>,
    pub distribution: Distribution,
}

impl DashboardView {
    pub fn dashboard(&self) -> Option<&Dashboard> {
        match &self.body {
            ViewBody::Dashboard(d) => Some(d),
            ViewBody::NoData => None,
        }
    }

    pub fn hosts(&self) -> &[HostSummary] {
        match self.dashboard().map(|d| &d.panel) {
            Some(FilteredPanel::Populated { hosts, .. }) => hosts,
            _ => &[],
        }
    }

    pub fn distribution(&self) -> Option<&Distribution> {
        match self.dashboard().map(|d| &d.panel) {
            Some(FilteredPanel::Populated { distribution, .. }) => Some(distribution),
            _ => None,
        }
    }

    pub fn selected(&self) -> Option<&HostDetail> {
        match self.dashboard().map(|d| &d.panel) {
            Some(FilteredPanel::Populated {
                selection: HostSelection::Selected(detail),
                ..
            }) => Some(detail),
            _ => None,
        }
    }

    pub fn upload_message(&self) -> &'static str {
        match self.upload {
            UploadState::None => WAITING_MESSAGE,
            UploadState::Loaded => LOADED_MESSAGE,
            UploadState::Failed => UPLOAD_FAILED_MESSAGE,
        }
    }
}
