use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub ui: UiConfig,
    pub ingest: IngestConfig,
    pub log: LogConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub max_table_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestConfig {
    pub dir: PathBuf,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogConfig {
    pub level: String,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            ui: UiConfig {
                color: true,
                max_table_rows: 20,
            },
            ingest: IngestConfig {
                dir: PathBuf::from("."),
                patterns: vec!["*.csv".to_string()],
            },
            log: LogConfig {
                level: "warn".to_string(),
            },
            config_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    ui: Option<RawUiConfig>,
    ingest: Option<RawIngestConfig>,
    log: Option<RawLogConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUiConfig {
    color: Option<bool>,
    max_table_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawIngestConfig {
    dir: Option<PathBuf>,
    patterns: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogConfig {
    level: Option<String>,
}

pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("the HOME environment variable is not set"))
}

pub fn config_dir(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/baseline")
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    config_dir(home_dir).join("config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s).context("failed to parse config file (TOML)")?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    } else if config_path.is_some() {
        return Err(anyhow::anyhow!(
            "config file not found: {}",
            path.display()
        ));
    }

    apply_env_overrides(&mut cfg)?;
    validate(&cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(max_table_rows) = ui.max_table_rows {
            cfg.ui.max_table_rows = max_table_rows;
        }
    }

    if let Some(ingest) = raw.ingest {
        if let Some(dir) = ingest.dir {
            cfg.ingest.dir = dir;
        }
        if let Some(patterns) = ingest.patterns {
            cfg.ingest.patterns = patterns;
        }
    }

    if let Some(log) = raw.log {
        if let Some(level) = log.level {
            cfg.log.level = level;
        }
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("BASELINE_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).with_context(|| "BASELINE_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("BASELINE_UI_MAX_TABLE_ROWS") {
        cfg.ui.max_table_rows = v
            .trim()
            .parse::<usize>()
            .with_context(|| "BASELINE_UI_MAX_TABLE_ROWS")?;
    }
    if let Ok(v) = std::env::var("BASELINE_INGEST_DIR") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.ingest.dir = PathBuf::from(v);
        }
    }
    if let Ok(v) = std::env::var("BASELINE_INGEST_PATTERNS") {
        let parts: Vec<String> = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        if !parts.is_empty() {
            cfg.ingest.patterns = parts;
        }
    }
    if let Ok(v) = std::env::var("BASELINE_LOG_LEVEL") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.log.level = v.to_string();
        }
    }

    Ok(())
}

fn validate(cfg: &EffectiveConfig) -> Result<()> {
    if cfg.ui.max_table_rows == 0 {
        return Err(anyhow::anyhow!("ui.max_table_rows must be greater than 0"));
    }
    crate::ingest::validate_patterns(&cfg.ingest.patterns).context("ingest.patterns")?;
    parse_level(&cfg.log.level).context("log.level")?;
    Ok(())
}

pub fn parse_level(s: &str) -> Result<tracing::Level> {
    s.trim()
        .parse::<tracing::Level>()
        .map_err(|_| {
            anyhow::anyhow!("invalid log level: {s} (expected error|warn|info|debug|trace)")
        })
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_overrides_only_given_fields() {
        let mut cfg = EffectiveConfig::default();
        let raw: RawConfig = toml::from_str(
            r#"
[ui]
max_table_rows = 5

[ingest]
patterns = ["*.csv", "*.txt"]
"#,
        )
        .expect("parse");
        apply_raw_config(&mut cfg, raw);
        assert!(cfg.ui.color);
        assert_eq!(cfg.ui.max_table_rows, 5);
        assert_eq!(cfg.ingest.dir, PathBuf::from("."));
        assert_eq!(cfg.ingest.patterns, vec!["*.csv", "*.txt"]);
        assert_eq!(cfg.log.level, "warn");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<RawConfig>("[ui]\ncolour = true\n").is_err());
    }

    #[test]
    fn validate_rejects_zero_rows_and_bad_level() {
        let mut cfg = EffectiveConfig::default();
        cfg.ui.max_table_rows = 0;
        assert!(validate(&cfg).is_err());

        let mut cfg = EffectiveConfig::default();
        cfg.log.level = "loud".to_string();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn parse_bool_variants() {
        assert!(parse_bool(" Yes ").expect("bool"));
        assert!(!parse_bool("off").expect("bool"));
        assert!(parse_bool("maybe").is_err());
    }
}
