pub mod advisory;
pub mod cli;
pub mod config;
pub mod error;
pub mod evidence;
pub mod lockfile;
pub mod report;
pub mod scan;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use advisory::{advisory_url, AdvisoryCache, LookupResult, OsvClient};
pub use cli::{Cli, Commands, DbCommand, EvidenceMode, ListFilter, PrivacyPreset, ReportFormat};
pub use config::{DbUpdateOptions, ScanOptions};
pub use error::{BardcheckError, Result};
pub use evidence::EvidenceIndex;
pub use lockfile::{LockfileKind, ParsedLock};
pub use report::{JsonReporter, MarkdownReporter, Reporter, SarifReporter, TerminalReporter};
pub use scan::{
    run_db_update, run_scan, threshold_hit, unknown_hit, write_findings_json, write_reports,
    DbUpdateOutcome, ScanOutcome,
};
pub use types::{
    Confidence, DependencyNode, FailOn, Finding, LookupSource, ScanReport, Severity,
    SeveritySource, Summary, UnknownReason, Vulnerability,
};
