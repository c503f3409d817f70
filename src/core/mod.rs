mod chart;
mod record;
mod selection;
mod source;
mod status;
mod summary;
mod view;

pub use chart::{Distribution, Slice, SliceColor};
pub use record::{Outcome, RawRecord, RecordTable, REQUIRED_COLUMNS};
pub use selection::FilterSelection;
pub use source::{FileFailure, SourceOrigin, SourceReport, UploadState};
pub use status::ComplianceStatus;
pub use summary::{HostKey, HostSummary};
pub use view::{
    DESCRIPTION, Dashboard, DashboardView, EMPTY_FILTER_MESSAGE, FilteredPanel, HostDetail,
    HostSelection, LOADED_MESSAGE, NO_DATA_MESSAGE, NO_HOST_MESSAGE, TITLE,
    UPLOAD_FAILED_MESSAGE, WAITING_MESSAGE, ViewBody,
};
