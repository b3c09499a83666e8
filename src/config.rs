//! Effective scan configuration: privacy preset resolution and CLI overrides.
//!
//! The CLI carries tri-state booleans (`None` means "preset decides"); this
//! module folds them into concrete options and rejects combinations the
//! strict preset forbids.

use crate::cli::{DbUpdateArgs, EvidenceMode, ListFilter, PrivacyPreset, ReportFormat, ScanArgs};
use crate::error::{BardcheckError, Result};
use crate::types::{FailOn, Severity};
use std::path::{Path, PathBuf};

/// Default output directory name, created under the current directory.
pub const DEFAULT_OUT_DIR: &str = ".bardcheck";

/// Fully resolved options for a scan run.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub path: PathBuf,
    pub out_dir: Option<PathBuf>,
    pub format: ReportFormat,
    pub fail_on: FailOn,
    pub offline: bool,
    pub unknown_as: Severity,
    pub refresh_cache: bool,
    pub list_findings: ListFilter,
    pub findings_json: Option<PathBuf>,
    pub fallback_calls: bool,
    pub redact_paths: bool,
    pub evidence: EvidenceMode,
    pub fail_on_unknown: bool,
    pub osv_url: String,
}

/// Options for `db update`.
#[derive(Debug, Clone)]
pub struct DbUpdateOptions {
    pub path: PathBuf,
    pub out_dir: Option<PathBuf>,
    pub osv_url: String,
}

/// Preset defaults before CLI overrides are applied.
struct PresetDefaults {
    offline: bool,
    fallback_calls: bool,
    redact_paths: bool,
    evidence: EvidenceMode,
}

impl PrivacyPreset {
    fn defaults(&self) -> PresetDefaults {
        match self {
            PrivacyPreset::Strict => PresetDefaults {
                offline: true,
                fallback_calls: false,
                redact_paths: true,
                evidence: EvidenceMode::None,
            },
            PrivacyPreset::Standard => PresetDefaults {
                offline: true,
                fallback_calls: true,
                redact_paths: false,
                evidence: EvidenceMode::Imports,
            },
        }
    }
}

impl ScanOptions {
    pub fn from_args(args: &ScanArgs) -> Result<Self> {
        let preset = args.privacy.defaults();

        if args.privacy == PrivacyPreset::Strict {
            if args.offline == Some(false) {
                return Err(BardcheckError::ConfigConflict(
                    "--offline false is not allowed under strict privacy; \
                     use --privacy standard"
                        .to_string(),
                ));
            }
            if args.telemetry {
                return Err(BardcheckError::ConfigConflict(
                    "--telemetry is not allowed under strict privacy".to_string(),
                ));
            }
        }

        Ok(Self {
            path: args.path.clone(),
            out_dir: args.out_dir.clone(),
            format: args.format,
            fail_on: args.fail_on,
            offline: args.offline.unwrap_or(preset.offline),
            unknown_as: args.unknown_as,
            refresh_cache: args.refresh_cache,
            list_findings: args.list_findings,
            findings_json: args.findings_json.clone(),
            fallback_calls: args.fallback_calls.unwrap_or(preset.fallback_calls),
            redact_paths: args.redact_paths.unwrap_or(preset.redact_paths),
            evidence: args.evidence.unwrap_or(preset.evidence),
            fail_on_unknown: args.fail_on_unknown,
            osv_url: args.osv_url.clone(),
        })
    }
}

impl DbUpdateOptions {
    pub fn from_args(args: &DbUpdateArgs) -> Self {
        Self {
            path: args.path.clone(),
            out_dir: args.out_dir.clone(),
            osv_url: args.osv_url.clone(),
        }
    }
}

/// Resolve and create the output directory. Falls back to the system temp
/// directory when the default location cannot be created; an explicitly
/// requested directory gets no fallback.
pub fn resolve_out_dir(requested: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = requested {
        return std::fs::create_dir_all(dir)
            .map(|_| dir.to_path_buf())
            .map_err(|source| BardcheckError::OutDirUnwritable {
                path: dir.to_path_buf(),
                source,
            });
    }

    let default = PathBuf::from(DEFAULT_OUT_DIR);
    if std::fs::create_dir_all(&default).is_ok() {
        return Ok(default);
    }

    let fallback = std::env::temp_dir().join("bardcheck");
    std::fs::create_dir_all(&fallback)
        .map(|_| fallback.clone())
        .map_err(|source| BardcheckError::OutDirUnwritable {
            path: fallback,
            source,
        })
}
