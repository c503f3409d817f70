use anyhow::Error;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use crate::core::{
    ComplianceStatus, DESCRIPTION, Dashboard, DashboardView, Distribution, EMPTY_FILTER_MESSAGE,
    FilteredPanel, HostDetail, HostSelection, HostSummary, NO_DATA_MESSAGE, NO_HOST_MESSAGE,
    SliceColor, TITLE, ViewBody,
};

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdin_is_tty: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub max_table_rows: usize,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let _ = writeln!(stderr, "  - re-run with `--verbose` for more detail");
    let _ = writeln!(
        stderr,
        "  - see `baseline --help` for available commands and options"
    );
}

pub fn print_view(view: &DashboardView, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    write_view(&mut out, view, cfg);
}

/// Renders one pass as plain text, top to bottom in dashboard order.
pub fn write_view(out: &mut dyn Write, view: &DashboardView, cfg: &UiConfig) {
    let _ = writeln!(out, "{TITLE}");
    let _ = writeln!(out, "{DESCRIPTION}");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", view.upload_message());

    let rows: usize = view.sources.iter().map(|s| s.rows).sum();
    let mut sources_line = format!(
        "Sources: {} file(s), {} row(s)",
        view.sources.len(),
        rows
    );
    if view.duplicates_removed > 0 {
        sources_line.push_str(&format!(
            " ({} duplicate(s) removed)",
            view.duplicates_removed
        ));
    }
    let _ = writeln!(out, "{sources_line}");
    for failure in &view.failures {
        let _ = writeln!(
            out,
            "{} {}: {}",
            paint("Skipped file", "33", cfg.color),
            failure.path,
            failure.error
        );
    }
    for source in view.sources.iter().filter(|s| s.skipped_rows > 0) {
        let _ = writeln!(
            out,
            "Note: {} row(s) without Hostname or OS ignored in {}",
            source.skipped_rows, source.path
        );
    }
    let _ = writeln!(out);

    let dashboard = match &view.body {
        ViewBody::NoData => {
            let _ = writeln!(out, "{NO_DATA_MESSAGE}");
            return;
        }
        ViewBody::Dashboard(d) => d,
    };

    write_filters(out, dashboard, cfg);
    let _ = writeln!(out);

    match &dashboard.panel {
        FilteredPanel::Empty => {
            let _ = writeln!(out, "{EMPTY_FILTER_MESSAGE}");
        }
        FilteredPanel::Populated {
            distribution,
            hosts,
            selection,
        } => {
            let _ = writeln!(out, "Compliance Status");
            write_distribution(out, distribution, cfg.color);
            let _ = writeln!(out);

            let _ = writeln!(out, "Host Compliance Status");
            write_hosts_table(out, hosts, cfg);

            match selection {
                HostSelection::Selected(detail) => {
                    let _ = writeln!(out, "Selection: {}", detail.summary.selection_label());
                    let _ = writeln!(out);
                    write_host_detail(out, detail, cfg);
                }
                HostSelection::None => {
                    let _ = writeln!(out, "Selection: None");
                    let _ = writeln!(out);
                    let _ = writeln!(out, "{NO_HOST_MESSAGE}");
                }
            }
        }
    }
}

fn write_filters(out: &mut dyn Write, dashboard: &Dashboard, cfg: &UiConfig) {
    let os: Vec<String> = dashboard
        .observed_os
        .iter()
        .map(|os| checkbox(dashboard.filter.os.contains(os), os))
        .collect();
    let status: Vec<String> = dashboard
        .observed_status
        .iter()
        .map(|s| {
            checkbox(
                dashboard.filter.status.contains(s),
                &format_status(*s, cfg.color),
            )
        })
        .collect();
    let _ = writeln!(out, "Filters");
    let _ = writeln!(out, "  By OS     : {}", os.join("  "));
    let _ = writeln!(out, "  By Status : {}", status.join("  "));
}

fn checkbox(checked: bool, label: &str) -> String {
    if checked {
        format!("[x] {label}")
    } else {
        format!("[ ] {label}")
    }
}

pub fn write_distribution(out: &mut dyn Write, dist: &Distribution, color: bool) {
    let _ = writeln!(out, "{} ({})", dist.title, dist.center_label());
    let label_w = dist
        .slices
        .iter()
        .map(|s| visible_width_ansi(&s.label))
        .max()
        .unwrap_or(0);
    let count_w = dist
        .slices
        .iter()
        .map(|s| s.count.to_string().len())
        .max()
        .unwrap_or(1);
    for slice in &dist.slices {
        let filled = ((slice.fraction() * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
        let bar = paint(&"█".repeat(filled), slice_color_code(slice.color), color);
        let _ = writeln!(
            out,
            "  {}  {}  {}  {}",
            pad_end_display(&slice.label, label_w),
            pad_start_display(&slice.count.to_string(), count_w),
            pad_start_display(&slice.percent_label(), 6),
            bar
        );
    }
}

fn write_hosts_table(out: &mut dyn Write, hosts: &[HostSummary], cfg: &UiConfig) {
    let headers = [
        "#",
        "Hostname",
        "OS",
        "pass_count",
        "total_controls",
        "status",
        "compliance_ratio",
    ];
    let rows: Vec<Vec<String>> = hosts
        .iter()
        .enumerate()
        .map(|(i, h)| {
            vec![
                (i + 1).to_string(),
                h.hostname.clone(),
                h.os.clone(),
                h.pass_count.to_string(),
                h.total_controls.to_string(),
                format_status(h.status, cfg.color),
                h.compliance_ratio.clone(),
            ]
        })
        .collect();
    write_table(out, &headers, &rows, cfg.max_table_rows);
}

fn write_host_detail(out: &mut dyn Write, detail: &HostDetail, cfg: &UiConfig) {
    let _ = writeln!(out, "Hostname: {}", detail.summary.hostname);
    let _ = writeln!(
        out,
        "Status  : {} ({})",
        format_status(detail.summary.status, cfg.color),
        detail.summary.compliance_ratio
    );

    let mut headers: Vec<&str> = vec!["#"];
    headers.extend(detail.columns.iter().map(String::as_str));
    let rows: Vec<Vec<String>> = detail
        .records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut row = vec![(i + 1).to_string()];
            row.extend(r.iter().cloned());
            row
        })
        .collect();
    write_table(out, &headers, &rows, cfg.max_table_rows);
    let _ = writeln!(out);
    write_distribution(out, &detail.distribution, cfg.color);
}

fn write_table(out: &mut dyn Write, headers: &[&str], rows: &[Vec<String>], max_rows: usize) {
    let shown = rows.len().min(max_rows.max(1));
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_width_ansi(h)).collect();
    for row in rows.iter().take(shown) {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(visible_width_ansi(cell));
            }
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad_end_display(h, *w))
        .collect();
    let _ = writeln!(out, "  {}", header_line.join("  ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "  {}", rule.join("  "));

    for row in rows.iter().take(shown) {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                if i == 0 {
                    pad_start_display(cell, *w)
                } else {
                    pad_end_display(cell, *w)
                }
            })
            .collect();
        let _ = writeln!(out, "  {}", cells.join("  ").trim_end());
    }
    if rows.len() > shown {
        let _ = writeln!(out, "  ... ({} more)", rows.len() - shown);
    }
}

fn format_status(status: ComplianceStatus, color: bool) -> String {
    let code = match status {
        ComplianceStatus::Comply => "32",
        ComplianceStatus::NotComply => "31",
    };
    paint(status.as_str(), code, color)
}

fn slice_color_code(color: SliceColor) -> &'static str {
    match color {
        SliceColor::Positive => "32",
        SliceColor::Negative => "31",
        SliceColor::Neutral => "90",
    }
}

fn paint(s: &str, code: &str, color: bool) -> String {
    if !color {
        return s.to_string();
    }
    format!("\x1b[{code}m{s}\x1b[0m")
}

fn pad_end_display(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_start_display(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{}{}", " ".repeat(width - w), s)
}

fn visible_width_ansi(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            let _ = chars.next();
            for ch2 in chars.by_ref() {
                if ch2 == 'm' {
                    break;
                }
            }
            continue;
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}
