use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use globset::GlobSet;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::core::{
    Dashboard, DashboardView, Distribution, FilteredPanel, HostDetail, HostSelection,
    RecordTable, ViewBody,
};
use crate::ingest::Ingested;
use crate::session::SessionState;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub dir: PathBuf,
    pub patterns: Vec<String>,
    pub show_progress: bool,
}

/// Runs one full pass: ingestion, aggregation, filtering, presentation.
#[derive(Clone)]
pub struct Engine {
    opts: EngineOptions,
    patterns: GlobSet,
}

impl Engine {
    pub fn new(opts: EngineOptions) -> Result<Self> {
        let patterns = crate::ingest::build_pattern_set(&opts.patterns)?;
        Ok(Self { opts, patterns })
    }

    pub fn dir(&self) -> &Path {
        &self.opts.dir
    }

    pub fn patterns(&self) -> &[String] {
        &self.opts.patterns
    }

    pub fn load(&self, upload: Option<&Path>) -> Result<Ingested> {
        use std::io::IsTerminal;
        let progress_enabled = self.opts.show_progress && std::io::stderr().is_terminal();
        let pb = if progress_enabled {
            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            pb.set_message(format!("Loading CSV files from {}", self.opts.dir.display()));
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let result = crate::ingest::load(&self.opts.dir, &self.patterns, upload)
            .with_context(|| format!("failed to load data from {}", self.opts.dir.display()));

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        result
    }

    pub fn view(&self, ingested: Ingested, session: &SessionState) -> DashboardView {
        let body = build_body(&ingested.table, session);

        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        info!(
            sources = ingested.sources.len(),
            failures = ingested.failures.len(),
            rows = ingested.table.len(),
            "pass complete"
        );

        DashboardView {
            schema_version: "1.0".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at,
            sources: ingested.sources,
            failures: ingested.failures,
            upload: ingested.upload,
            duplicates_removed: ingested.duplicates_removed,
            body,
        }
    }

    pub fn pass(&self, session: &SessionState) -> Result<DashboardView> {
        let ingested = self.load(session.upload())?;
        Ok(self.view(ingested, session))
    }
}

fn build_body(table: &RecordTable, session: &SessionState) -> ViewBody {
    if table.is_empty() {
        return ViewBody::NoData;
    }

    let summary = crate::aggregate::summarize(table);
    let observed_os = crate::filter::observed_os(&summary);
    let observed_status = crate::filter::observed_status(&summary);
    let filter = session.filter_for(&summary);
    let hosts = crate::filter::apply(&summary, &filter);

    let panel = if hosts.is_empty() {
        FilteredPanel::Empty
    } else {
        let distribution = Distribution::compliance(&hosts);
        let selection = session
            .selected_host()
            .and_then(|selector| hosts.iter().position(|r| selector.matches(r)))
            .map(|row| HostSelection::Selected(host_detail(table, &hosts, row)))
            .unwrap_or(HostSelection::None);
        FilteredPanel::Populated {
            distribution,
            hosts,
            selection,
        }
    };

    ViewBody::Dashboard(Dashboard {
        observed_os,
        observed_status,
        filter,
        panel,
    })
}

fn host_detail(table: &RecordTable, hosts: &[crate::core::HostSummary], row: usize) -> HostDetail {
    let summary = hosts[row].clone();
    let records = table.for_host(&summary.hostname);
    let distribution =
        Distribution::host_results(&summary.hostname, summary.status, records.records());
    HostDetail {
        row,
        columns: records.columns().to_vec(),
        records: records
            .records()
            .iter()
            .map(|r| records.row_values(r))
            .collect(),
        distribution,
        summary,
    }
}
