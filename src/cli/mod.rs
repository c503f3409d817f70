use std::io;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::{debug, warn};

use crate::core::{
    ComplianceStatus, DESCRIPTION, DashboardView, Distribution, EMPTY_FILTER_MESSAGE,
    FilteredPanel, HostSelection, NO_DATA_MESSAGE, NO_HOST_MESSAGE, TITLE, ViewBody,
};
use crate::engine::{Engine, EngineOptions};
use crate::logging::LogTarget;
use crate::session::{HostSelector, SessionState};
use crate::ui::UiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "baseline",
    version,
    about = "Baseline compliance dashboard: aggregates host scan results from CSV files"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory scanned for CSV files (defaults to the configured directory).
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,
    /// An extra CSV file loaded after the local ones.
    #[arg(long, global = true)]
    pub upload: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Ui(UiArgs),
    Summary(SummaryArgs),
    Completion(CompletionArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct UiArgs {}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Only include these OS values (repeatable).
    #[arg(long)]
    pub os: Vec<String>,
    /// Only include these statuses: comply | not_comply (repeatable).
    #[arg(long)]
    pub status: Vec<ComplianceStatus>,
    /// Show the details of the first filtered row with this Hostname.
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long, requires = "host")]
    pub host_os: Option<String>,
    #[arg(long)]
    pub markdown: bool,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let stdin_is_tty = io::stdin().is_terminal();
    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = crate::config::home_dir().map_err(crate::exit::invalid_args_err)?;

    let env_config_path = std::env::var_os("BASELINE_CONFIG").map(PathBuf::from);
    let cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(crate::exit::invalid_args_err)?;

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;

    let ui_cfg = UiConfig {
        color,
        stdin_is_tty,
        stdout_is_tty,
        stderr_is_tty,
        max_table_rows: cfg.ui.max_table_rows,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let is_ui_mode = matches!(&cli.command, Commands::Ui(_));
    let configured_level =
        crate::config::parse_level(&cfg.log.level).map_err(crate::exit::invalid_args_err)?;
    let level = crate::logging::effective_level(configured_level, cli.quiet, cli.verbose);
    if is_ui_mode {
        let log_path = crate::config::config_dir(&home_dir)
            .join("logs")
            .join("ui.log");
        if let Err(err) = crate::logging::init(level, LogTarget::File(&log_path)) {
            if !cli.quiet {
                eprintln!("warning: logging disabled: {err:#}");
            }
        }
    } else {
        crate::logging::init(level, LogTarget::Stderr)?;
    }

    let dir = cli.dir.clone().unwrap_or_else(|| cfg.ingest.dir.clone());
    debug!(dir = %dir.display(), patterns = ?cfg.ingest.patterns, "resolved input");
    let engine = Engine::new(EngineOptions {
        dir,
        patterns: cfg.ingest.patterns.clone(),
        show_progress: ui_cfg.stderr_is_tty && !cli.quiet && !cli.json && !is_ui_mode,
    })
    .map_err(crate::exit::invalid_args_err)?;

    match cli.command {
        Commands::Summary(args) => {
            if cli.json && args.markdown {
                return Err(crate::exit::invalid_args(
                    "summary: --json and --markdown cannot be combined",
                ));
            }
            let view = summary_view(&engine, cli.upload.clone(), &args)?;
            if cli.json {
                write_json(&view)?;
            } else if args.markdown {
                write_markdown_summary(&view)?;
            } else {
                crate::ui::print_view(&view, &ui_cfg);
            }
        }
        Commands::Ui(_args) => {
            if cli.json {
                return Err(crate::exit::invalid_args("ui cannot be combined with --json"));
            }
            if !(ui_cfg.stdin_is_tty && ui_cfg.stdout_is_tty) {
                return Err(crate::exit::invalid_args(
                    "ui requires a TTY (stdin + stdout)",
                ));
            }
            let mut session = SessionState::new();
            session.set_upload(cli.upload.clone());
            crate::tui::run(engine, session, ui_cfg.color)?;
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = std::io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "baseline", &mut out);
        }
        Commands::Config(args) => {
            if args.show {
                if cli.json {
                    let stdout = std::io::stdout();
                    serde_json::to_writer_pretty(stdout.lock(), &cfg)?;
                    println!();
                } else {
                    println!("{}", toml::to_string_pretty(&cfg)?);
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: use `baseline config --show`");
            }
        }
    }

    Ok(())
}

/// One pass with the command-line filters applied on top of the defaults.
fn summary_view(
    engine: &Engine,
    upload: Option<PathBuf>,
    args: &SummaryArgs,
) -> Result<DashboardView> {
    let ingested = engine
        .load(upload.as_deref())
        .map_err(crate::exit::load_failed_err)?;

    let mut session = SessionState::new();
    session.set_upload(upload);

    if !args.os.is_empty() {
        let summary = crate::aggregate::summarize(&ingested.table);
        let observed = crate::filter::observed_os(&summary);
        for os in &args.os {
            if !observed.contains(os) {
                warn!(os = %os, "requested OS was not observed in the data");
            }
        }
        session.restrict_os(&observed, &args.os);
    }
    if !args.status.is_empty() {
        session.restrict_status(&args.status);
    }
    if let Some(host) = &args.host {
        session.select_host(HostSelector {
            hostname: host.clone(),
            os: args.host_os.clone(),
        });
    }

    Ok(engine.view(ingested, &session))
}

fn write_json(view: &DashboardView) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(view)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn write_markdown_summary(view: &DashboardView) -> Result<()> {
    use std::io::Write;

    let markdown = format_markdown_summary(view);
    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(markdown.as_bytes()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn format_markdown_summary(view: &DashboardView) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();

    let _ = writeln!(out, "# {TITLE}");
    let _ = writeln!(out);
    let _ = writeln!(out, "{DESCRIPTION}");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Tool version: {}", view.tool_version);
    let _ = writeln!(out, "- Generated at: {}", view.generated_at);
    let rows: usize = view.sources.iter().map(|s| s.rows).sum();
    let _ = writeln!(
        out,
        "- Sources: {} file(s), {} row(s)",
        view.sources.len(),
        rows
    );
    if view.duplicates_removed > 0 {
        let _ = writeln!(out, "- Duplicates removed: {}", view.duplicates_removed);
    }
    let _ = writeln!(out, "- Upload: {}", view.upload_message());

    if !view.failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Skipped files ({})", view.failures.len());
        let _ = writeln!(out);
        for fail in &view.failures {
            let _ = writeln!(out, "- `{}`: {}", fail.path, fail.error);
        }
    }

    let dashboard = match &view.body {
        ViewBody::NoData => {
            let _ = writeln!(out);
            let _ = writeln!(out, "_{NO_DATA_MESSAGE}_");
            return out;
        }
        ViewBody::Dashboard(d) => d,
    };

    let _ = writeln!(out);
    let _ = writeln!(out, "## Filters");
    let _ = writeln!(out);
    let os: Vec<String> = dashboard
        .observed_os
        .iter()
        .map(|o| checkbox(dashboard.filter.os.contains(o), o))
        .collect();
    let _ = writeln!(out, "- By OS: {}", os.join(" "));
    let status: Vec<String> = dashboard
        .observed_status
        .iter()
        .map(|s| checkbox(dashboard.filter.status.contains(s), s.as_str()))
        .collect();
    let _ = writeln!(out, "- By Status: {}", status.join(" "));

    let (distribution, hosts, selection) = match &dashboard.panel {
        FilteredPanel::Empty => {
            let _ = writeln!(out);
            let _ = writeln!(out, "_{EMPTY_FILTER_MESSAGE}_");
            return out;
        }
        FilteredPanel::Populated {
            distribution,
            hosts,
            selection,
        } => (distribution, hosts, selection),
    };

    let _ = writeln!(out);
    let _ = writeln!(out, "## {}", distribution.title);
    let _ = writeln!(out);
    write_markdown_distribution(&mut out, distribution);

    let _ = writeln!(out);
    let _ = writeln!(out, "## Host Compliance Status ({})", hosts.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "| # | Hostname | OS | pass | total | status | ratio |");
    let _ = writeln!(out, "|---:|---|---|---:|---:|---|---|");
    for (i, h) in hosts.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} |",
            i + 1,
            escape_cell(&h.hostname),
            escape_cell(&h.os),
            h.pass_count,
            h.total_controls,
            h.status,
            h.compliance_ratio
        );
    }

    let _ = writeln!(out);
    match selection {
        HostSelection::None => {
            let _ = writeln!(out, "Selection: None");
            let _ = writeln!(out);
            let _ = writeln!(out, "_{NO_HOST_MESSAGE}_");
        }
        HostSelection::Selected(detail) => {
            let _ = writeln!(out, "Selection: {}", detail.summary.selection_label());
            let _ = writeln!(out);
            let _ = writeln!(out, "## Hostname: {}", detail.summary.hostname);
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "- Status: `{}` ({})",
                detail.summary.status, detail.summary.compliance_ratio
            );
            let _ = writeln!(out);
            let header: Vec<String> = detail.columns.iter().map(|c| escape_cell(c)).collect();
            let _ = writeln!(out, "| {} |", header.join(" | "));
            let _ = writeln!(out, "|{}", "---|".repeat(detail.columns.len()));
            for record in &detail.records {
                let cells: Vec<String> = record.iter().map(|v| escape_cell(v)).collect();
                let _ = writeln!(out, "| {} |", cells.join(" | "));
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "### {}", detail.distribution.title);
            let _ = writeln!(out);
            write_markdown_distribution(&mut out, &detail.distribution);
        }
    }

    out
}

fn write_markdown_distribution(out: &mut String, dist: &Distribution) {
    use std::fmt::Write as _;

    let _ = writeln!(out, "| label | count | percent |");
    let _ = writeln!(out, "|---|---:|---:|");
    for slice in &dist.slices {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            escape_cell(&slice.label),
            slice.count,
            slice.percent_label()
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Total: {}", dist.center_label());
}

fn checkbox(checked: bool, label: &str) -> String {
    if checked {
        format!("[x] {label}")
    } else {
        format!("[ ] {label}")
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RawRecord, RecordTable};
    use crate::ingest::Ingested;

    fn example_engine() -> Engine {
        Engine::new(EngineOptions {
            dir: PathBuf::from("."),
            patterns: vec!["*.csv".to_string()],
            show_progress: false,
        })
        .expect("engine")
    }

    fn example_ingested() -> Ingested {
        Ingested {
            table: RecordTable::from_records([
                RawRecord::new("h1", "linux", "pass").with_extra("Control", "c|1"),
                RawRecord::new("h1", "linux", "fail").with_extra("Control", "c2"),
                RawRecord::new("h2", "win", "pass").with_extra("Control", "c1"),
            ]),
            sources: vec![],
            failures: vec![],
            upload: crate::core::UploadState::None,
            duplicates_removed: 0,
        }
    }

    #[test]
    fn parse_shell_accepts_known_shells() {
        assert_eq!(parse_shell("bash").unwrap(), clap_complete::Shell::Bash);
        assert_eq!(parse_shell(" ZSH ").unwrap(), clap_complete::Shell::Zsh);
        assert_eq!(parse_shell("fish").unwrap(), clap_complete::Shell::Fish);
        let err = parse_shell("powershell").unwrap_err();
        assert_eq!(crate::exit::exit_code(&err), 2);
    }

    #[test]
    fn cli_parses_summary_filters() {
        let cli = Cli::try_parse_from([
            "baseline",
            "summary",
            "--os",
            "linux",
            "--status",
            "not-comply",
            "--host",
            "h1",
            "--host-os",
            "linux",
        ])
        .expect("parse");
        let Commands::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.os, vec!["linux"]);
        assert_eq!(args.status, vec![ComplianceStatus::NotComply]);
        assert_eq!(args.host.as_deref(), Some("h1"));
    }

    #[test]
    fn host_os_requires_host() {
        assert!(Cli::try_parse_from(["baseline", "summary", "--host-os", "linux"]).is_err());
        assert!(Cli::try_parse_from(["baseline", "summary", "--status", "maybe"]).is_err());
    }

    #[test]
    fn markdown_summary_lists_hosts_and_selection() {
        let engine = example_engine();
        let mut session = SessionState::new();
        session.select_host(HostSelector::hostname("h1"));
        let view = engine.view(example_ingested(), &session);

        let md = format_markdown_summary(&view);
        assert!(md.starts_with("# Baseline Compliance\n"));
        assert!(md.contains("- By OS: [x] linux [x] win"));
        assert!(md.contains("## Compliance Status Distribution"));
        assert!(md.contains("| comply | 1 | 50.0% |"));
        assert!(md.contains("| 1 | h1 | linux | 1 | 2 | not_comply | 1/2 |"));
        assert!(md.contains("Selection: h1/linux/not_comply"));
        assert!(md.contains("| Hostname | OS | Result | Control |"));
        assert!(md.contains("| h1 | linux | pass | c\\|1 |"));
        assert!(md.contains("Total: 2 controls"));
    }

    #[test]
    fn markdown_summary_reports_empty_filter() {
        let engine = example_engine();
        let mut session = SessionState::new();
        session.restrict_status(&[]);
        let view = engine.view(example_ingested(), &session);

        let md = format_markdown_summary(&view);
        assert!(md.contains("- By Status: [ ] not_comply [ ] comply"));
        assert!(md.contains(EMPTY_FILTER_MESSAGE));
        assert!(!md.contains("## Compliance Status Distribution"));
    }

    #[test]
    fn markdown_summary_without_data() {
        let engine = example_engine();
        let mut ingested = example_ingested();
        ingested.table = RecordTable::new();
        let view = engine.view(ingested, &SessionState::new());

        let md = format_markdown_summary(&view);
        assert!(md.contains(NO_DATA_MESSAGE));
        assert!(!md.contains("## Filters"));
    }
}
