//! Command-line surface for bardcheck, using clap's derive API.
//!
//! Two verbs: `scan` runs a full vulnerability scan, `db update` refreshes
//! the on-disk advisory cache for the project's dependency set.

use crate::types::{FailOn, Severity};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bardcheck",
    version,
    about = "Dependency vulnerability scanner for npm projects",
    long_about = "bardcheck enumerates the packages pinned by a lockfile, resolves known \
                  advisories against an OSV-compatible database with a local cache, and emits \
                  JSON, Markdown and SARIF reports with CI-friendly exit codes."
)]
pub struct Cli {
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a project directory for vulnerable dependencies.
    Scan(ScanArgs),

    /// Manage the local advisory database cache.
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Re-fetch advisories for the project's dependency set into the cache.
    Update(DbUpdateArgs),
}

/// Report output selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    Json,
    Md,
    Sarif,
    /// JSON and Markdown.
    #[default]
    Both,
}

/// Console findings listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ListFilter {
    #[default]
    None,
    CriticalHigh,
    MediumUp,
    All,
}

impl ListFilter {
    /// Whether a finding of this severity appears in the console listing.
    pub fn includes(&self, severity: Severity) -> bool {
        match self {
            ListFilter::None => false,
            ListFilter::CriticalHigh => severity >= Severity::High,
            ListFilter::MediumUp => severity >= Severity::Medium,
            ListFilter::All => true,
        }
    }
}

/// Privacy preset bundles. `strict` is the default: no network at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PrivacyPreset {
    #[default]
    Strict,
    Standard,
}

/// Evidence collection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EvidenceMode {
    None,
    Imports,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Project directory containing the lockfile.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Report formats to write.
    #[arg(long, value_enum, default_value_t = ReportFormat::Both)]
    pub format: ReportFormat,

    /// Directory for reports and the advisory cache.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Minimum severity that triggers exit code 1.
    #[arg(long, value_enum, default_value_t = FailOn::High)]
    pub fail_on: FailOn,

    /// Cache-only mode: lookup misses become unknown findings.
    /// Presets set this; pass `--offline false` to override.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub offline: Option<bool>,

    /// Re-classify unresolved findings as this severity.
    #[arg(long, value_enum, default_value_t = Severity::Unknown)]
    pub unknown_as: Severity,

    /// Ignore cache reads (writes still occur).
    #[arg(long)]
    pub refresh_cache: bool,

    /// Which findings to list on the console.
    #[arg(long, value_enum, default_value_t = ListFilter::None)]
    pub list_findings: ListFilter,

    /// Write the filtered findings list as JSON to this file.
    #[arg(long, value_name = "FILE")]
    pub findings_json: Option<PathBuf>,

    /// Privacy preset: strict (offline, no fallbacks, redacted paths, no
    /// evidence) or standard (offline batch, id-only fallbacks, evidence on).
    #[arg(long, value_enum, default_value_t = PrivacyPreset::Strict)]
    pub privacy: PrivacyPreset,

    /// Enable the OSV-detail/NVD/GHSA enrichment chain for unknown severities.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub fallback_calls: Option<bool>,

    /// Strip target and evidence paths from reports.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub redact_paths: Option<bool>,

    /// Evidence collection mode.
    #[arg(long, value_enum)]
    pub evidence: Option<EvidenceMode>,

    /// Also exit 1 if any finding is unresolved.
    #[arg(long)]
    pub fail_on_unknown: bool,

    /// Override the OSV API base URL (mirrors).
    #[arg(long, value_name = "URL", default_value = "https://api.osv.dev")]
    pub osv_url: String,

    /// Enable anonymous usage telemetry (rejected under strict privacy).
    #[arg(long)]
    pub telemetry: bool,
}

#[derive(Args, Debug)]
pub struct DbUpdateArgs {
    /// Project directory containing the lockfile.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Directory holding the advisory cache.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Override the OSV API base URL (mirrors).
    #[arg(long, value_name = "URL", default_value = "https://api.osv.dev")]
    pub osv_url: String,
}
