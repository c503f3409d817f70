use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::{
    FileFailure, RawRecord, RecordTable, REQUIRED_COLUMNS, SourceOrigin, SourceReport,
    UploadState,
};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub table: RecordTable,
    pub skipped_rows: usize,
}

/// Result of one ingestion: the concatenated, deduplicated table plus what
/// happened to each candidate file.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub table: RecordTable,
    pub sources: Vec<SourceReport>,
    pub failures: Vec<FileFailure>,
    pub upload: UploadState,
    pub duplicates_removed: usize,
}

pub fn validate_patterns(patterns: &[String]) -> Result<()> {
    let _ = build_pattern_set(patterns)?;
    Ok(())
}

pub fn build_pattern_set(patterns: &[String]) -> Result<GlobSet> {
    let patterns: Vec<&str> = patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if patterns.is_empty() {
        return Err(anyhow!("at least one non-blank file pattern is required"));
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| anyhow!("invalid file pattern: {pattern} ({e})"))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| anyhow!("failed to build file patterns: {e}"))
}

/// Files directly inside `dir` whose name matches `patterns`, sorted by name.
pub fn discover(dir: &Path, patterns: &GlobSet) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow!("working directory not found: {}", dir.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(anyhow::Error::new(err)
                    .context(format!("cannot read working directory: {}", dir.display())));
            }
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if patterns.is_match(entry.file_name()) {
            files.push(entry.into_path());
        }
    }
    debug!(dir = %dir.display(), count = files.len(), "discovered input files");
    Ok(files)
}

pub fn parse_file(path: &Path) -> Result<ParsedFile, IngestError> {
    let file = std::fs::File::open(path)?;
    parse_reader(io::BufReader::new(file))
}

pub fn parse_reader<R: io::Read>(reader: R) -> Result<ParsedFile, IngestError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    parse_csv(reader)
}

fn parse_csv<R: io::Read>(mut reader: csv::Reader<R>) -> Result<ParsedFile, IngestError> {
    let headers = dedupe_headers(
        reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string()),
    );

    let position = |name: &str| headers.iter().position(|h| h == name);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| position(**c).is_none())
        .map(|c| c.to_string())
        .collect();
    let (Some(host_idx), Some(os_idx), Some(result_idx)) =
        (position("Hostname"), position("OS"), position("Result"))
    else {
        return Err(IngestError::MissingColumns(missing));
    };

    let extra_columns: Vec<(usize, &String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| ![host_idx, os_idx, result_idx].contains(i))
        .collect();

    let mut table = RecordTable::new();
    for (_, name) in &extra_columns {
        table.add_column(name);
    }

    let mut skipped_rows = 0;
    for row in reader.records() {
        let row = row?;
        let hostname = row.get(host_idx).unwrap_or_default();
        let os = row.get(os_idx).unwrap_or_default();
        if hostname.is_empty() || os.is_empty() {
            skipped_rows += 1;
            continue;
        }
        let mut record = RawRecord::new(hostname, os, row.get(result_idx).unwrap_or_default());
        for (idx, name) in &extra_columns {
            record = record.with_extra(name.as_str(), row.get(*idx).unwrap_or_default());
        }
        table.push(record);
    }

    Ok(ParsedFile {
        table,
        skipped_rows,
    })
}

/// Repeated header names get a `.N` suffix (`Control`, `Control.1`, ...), so
/// every column survives into the table.
fn dedupe_headers(headers: impl Iterator<Item = String>) -> Vec<String> {
    let headers: Vec<String> = headers.collect();
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for name in &headers {
        let mut candidate = name.clone();
        let mut n = 0;
        while out.contains(&candidate)
            || (candidate != *name && headers.contains(&candidate))
        {
            n += 1;
            candidate = format!("{name}.{n}");
        }
        out.push(candidate);
    }
    out
}

/// Discovers local files, appends the upload, parses everything and removes
/// duplicate rows. Only an unreadable working directory is an error; a bad
/// file becomes a [`FileFailure`].
pub fn load(dir: &Path, patterns: &GlobSet, upload: Option<&Path>) -> Result<Ingested> {
    let mut candidates: Vec<(PathBuf, SourceOrigin)> = discover(dir, patterns)?
        .into_iter()
        .map(|p| (p, SourceOrigin::Local))
        .collect();
    if let Some(upload) = upload {
        candidates.push((upload.to_path_buf(), SourceOrigin::Upload));
    }

    let mut table = RecordTable::new();
    let mut sources = Vec::new();
    let mut failures = Vec::new();
    let mut upload_state = UploadState::None;

    for (path, origin) in candidates {
        let shown = path.display().to_string();
        match parse_file(&path) {
            Ok(parsed) => {
                if parsed.skipped_rows > 0 {
                    warn!(
                        path = %shown,
                        skipped = parsed.skipped_rows,
                        "skipped rows without Hostname or OS"
                    );
                }
                debug!(path = %shown, rows = parsed.table.len(), "parsed input file");
                sources.push(SourceReport {
                    path: shown,
                    origin,
                    rows: parsed.table.len(),
                    skipped_rows: parsed.skipped_rows,
                });
                table.append(parsed.table);
                if origin == SourceOrigin::Upload {
                    upload_state = UploadState::Loaded;
                }
            }
            Err(err) => {
                warn!(path = %shown, error = %err, "skipping unreadable input file");
                failures.push(FileFailure {
                    path: shown,
                    origin,
                    error: err.to_string(),
                });
                if origin == SourceOrigin::Upload {
                    upload_state = UploadState::Failed;
                }
            }
        }
    }

    let duplicates_removed = table.dedup();
    if duplicates_removed > 0 {
        debug!(removed = duplicates_removed, "dropped duplicate rows");
    }

    Ok(Ingested {
        table,
        sources,
        failures,
        upload: upload_state,
        duplicates_removed,
    })
}
