use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::thresholds::Thresholds;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Descriptive statistics and fraud signals over healthcare claims
#[derive(Parser, Debug, Clone)]
#[command(
    name = "claims-audit",
    about = "Descriptive statistics and fraud signals over healthcare claims",
    version
)]
pub struct Settings {
    /// Directory holding patients, providers, procedures and claims tables
    #[arg(long)]
    pub data_path: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,

    /// Number of rows in each top-N summary list
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// JSON file with threshold overrides
    #[arg(long)]
    pub thresholds: Option<PathBuf>,

    /// Flag providers whose denial rate (percent) is above this
    #[arg(long)]
    pub high_denial_rate_pct: Option<f64>,

    /// Quantile of per-patient total billed used as the high-billed cut-off
    #[arg(long)]
    pub high_billed_quantile: Option<f64>,

    /// Flag procedures whose max billed exceeds this multiple of the median
    #[arg(long)]
    pub unusual_max_to_median: Option<f64>,

    /// Flag claims billed above this multiple of their procedure median
    #[arg(long)]
    pub overcharge_ratio: Option<f64>,

    /// Flag procedures whose mean billed exceeds this multiple of the median
    #[arg(long)]
    pub variability_ratio: Option<f64>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.claims-audit/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,
}

impl LastUsedParams {
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".claims-audit").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories if
    /// needed.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with an explicit argument
    /// list and config path.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // clap keys args by field name (underscores), not by flag spelling.
        if settings.data_path.is_none() {
            settings.data_path = last.data_path;
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top") {
            if let Some(v) = last.top {
                settings.top = v;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Build the effective thresholds: defaults, then the `--thresholds`
    /// file, then individual flags. The result is validated.
    pub fn resolve_thresholds(&self) -> Result<Thresholds> {
        let mut t = match &self.thresholds {
            Some(path) => Thresholds::load_from(path)?,
            None => Thresholds::default(),
        };
        if let Some(v) = self.high_denial_rate_pct {
            t.high_denial_rate_pct = v;
        }
        if let Some(v) = self.high_billed_quantile {
            t.high_billed_quantile = v;
        }
        if let Some(v) = self.unusual_max_to_median {
            t.unusual_max_to_median = v;
        }
        if let Some(v) = self.overcharge_ratio {
            t.overcharge_ratio = v;
        }
        if let Some(v) = self.variability_ratio {
            t.variability_ratio = v;
        }
        t.validate()?;
        Ok(t)
    }

    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_path: s.data_path.clone(),
            format: Some(s.format.clone()),
            top: Some(s.top),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
