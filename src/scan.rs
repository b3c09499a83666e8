//! Scan orchestration: joins the dependency set, the evidence index and the
//! advisory lookups into a deterministic, stably ordered report.

use crate::advisory::{AdvisoryCache, LookupResult, OsvClient};
use crate::cli::{EvidenceMode, ReportFormat};
use crate::config::{resolve_out_dir, DbUpdateOptions, ScanOptions};
use crate::error::{BardcheckError, Result};
use crate::evidence::{self, EvidenceIndex};
use crate::lockfile;
use crate::report::{JsonReporter, MarkdownReporter, Reporter, SarifReporter};
use crate::types::{
    Confidence, Finding, LookupSource, ScanReport, Severity, SeveritySource, Summary,
    UnknownReason,
};
use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const REDACTED: &str = "<redacted>";

/// A finished scan: the report plus where its artifacts live.
#[derive(Debug)]
pub struct ScanOutcome {
    pub report: ScanReport,
    pub out_dir: PathBuf,
}

/// Result of `db update`.
#[derive(Debug)]
pub struct DbUpdateOutcome {
    pub packages: usize,
    pub advisories: usize,
    pub out_dir: PathBuf,
}

pub async fn run_scan(opts: &ScanOptions) -> Result<ScanOutcome> {
    let out_dir = resolve_out_dir(opts.out_dir.as_deref())?;

    let lock = lockfile::parse_project(&opts.path)?;
    info!(dependencies = lock.len(), "lockfile resolved");

    let evidence = match opts.evidence {
        EvidenceMode::None => EvidenceIndex::empty(),
        EvidenceMode::Imports => evidence::collect(&opts.path),
    };
    debug!(scanned_files = evidence.scanned_files(), "evidence collected");

    let cache = AdvisoryCache::new(&out_dir, opts.refresh_cache);
    let client = OsvClient::new(cache, opts.offline, opts.fallback_calls, &opts.osv_url);
    let lookup = client.batch_query(lock.nodes()).await;

    let mut findings = synthesize_findings(&lock, &evidence, &lookup);
    apply_unknown_as(&mut findings, opts.unknown_as);
    if opts.redact_paths {
        redact_evidence(&mut findings);
    }
    findings.sort_by_key(Finding::sort_key);

    let summary = Summary::compute(lock.len(), evidence.scanned_files(), &findings);
    let target_path = if opts.redact_paths {
        REDACTED.to_string()
    } else {
        opts.path.display().to_string()
    };

    let report = ScanReport {
        target_path,
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        fail_on: opts.fail_on,
        summary,
        findings,
    };
    Ok(ScanOutcome { report, out_dir })
}

/// One pass over the dependency set in lockfile order. A dependency with no
/// matched advisories produces nothing unless its lookup never happened, in
/// which case it produces a single unknown finding.
fn synthesize_findings(
    lock: &lockfile::ParsedLock,
    evidence: &EvidenceIndex,
    lookup: &std::collections::HashMap<String, LookupResult>,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for dep in lock.nodes() {
        let evidence_files = evidence.files_for(&dep.name).to_vec();
        let has_evidence = !evidence_files.is_empty();

        match lookup.get(&dep.key()) {
            Some(result)
                if result.source != LookupSource::Unknown
                    && result.vulnerabilities.is_empty() => {}
            Some(result) if result.source != LookupSource::Unknown => {
                // Highest severity wins; ties keep the earliest advisory.
                let mut top = &result.vulnerabilities[0];
                for vuln in &result.vulnerabilities[1..] {
                    if vuln.severity > top.severity {
                        top = vuln;
                    }
                }
                findings.push(Finding {
                    package_name: dep.name.clone(),
                    version: dep.version.clone(),
                    direct: dep.direct,
                    severity: top.severity,
                    severity_source: top.severity_source,
                    unknown_reason: top.unknown_reason,
                    confidence: Confidence::from_signals(dep.direct, has_evidence),
                    evidence: evidence_files,
                    vulnerabilities: result.vulnerabilities.clone(),
                    source: result.source,
                });
            }
            _ => findings.push(Finding {
                package_name: dep.name.clone(),
                version: dep.version.clone(),
                direct: dep.direct,
                severity: Severity::Unknown,
                severity_source: SeveritySource::Unknown,
                unknown_reason: Some(UnknownReason::LookupFailed),
                confidence: Confidence::Unknown,
                evidence: evidence_files,
                vulnerabilities: Vec::new(),
                source: LookupSource::Unknown,
            }),
        }
    }
    findings
}

/// Substitute the policy severity for unresolved findings. The unknown
/// reason survives so `unknown hit` still reports truthfully.
fn apply_unknown_as(findings: &mut [Finding], unknown_as: Severity) {
    if unknown_as == Severity::Unknown {
        return;
    }
    for finding in findings.iter_mut() {
        if finding.severity == Severity::Unknown {
            finding.severity = unknown_as;
            finding.severity_source = SeveritySource::PolicyOverride;
        }
    }
}

fn redact_evidence(findings: &mut [Finding]) {
    for finding in findings.iter_mut() {
        if !finding.evidence.is_empty() {
            finding.evidence = vec![REDACTED.to_string()];
        }
    }
}

/// Whether any finding reaches the fail-on threshold.
pub fn threshold_hit(report: &ScanReport) -> bool {
    let Some(threshold) = report.fail_on.threshold() else {
        return false;
    };
    report.findings.iter().any(|f| f.severity >= threshold)
}

/// Whether any finding is still unresolved at the advisory layer.
pub fn unknown_hit(report: &ScanReport) -> bool {
    report.findings.iter().any(|f| f.unknown_reason.is_some())
}

/// Write the selected report files under the output directory.
pub fn write_reports(report: &ScanReport, format: ReportFormat, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut emit = |name: &str, content: String| -> Result<()> {
        let path = out_dir.join(name);
        std::fs::write(&path, content).map_err(|source| BardcheckError::ReportWriteFailed {
            path: path.clone(),
            source,
        })?;
        written.push(path);
        Ok(())
    };

    match format {
        ReportFormat::Json => emit("report.json", JsonReporter::new().report(report))?,
        ReportFormat::Md => emit("report.md", MarkdownReporter::new().report(report))?,
        ReportFormat::Sarif => emit("report.sarif", SarifReporter::new().report(report))?,
        ReportFormat::Both => {
            emit("report.json", JsonReporter::new().report(report))?;
            emit("report.md", MarkdownReporter::new().report(report))?;
        }
    }
    Ok(written)
}

/// Write the `--findings-json` file: the findings that pass the console
/// listing filter, as a JSON array.
pub fn write_findings_json(report: &ScanReport, opts: &ScanOptions, path: &Path) -> Result<()> {
    let filtered: Vec<&Finding> = report
        .findings
        .iter()
        .filter(|f| opts.list_findings.includes(f.severity))
        .collect();
    let content = serde_json::to_string_pretty(&filtered)?;
    std::fs::write(path, content).map_err(|source| BardcheckError::ReportWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// `db update`: force-refresh the batch cache for the project's dependency
/// set. Always online, always bypassing cache reads, with enrichment so the
/// cached entries carry resolved severities for later offline scans.
pub async fn run_db_update(opts: &DbUpdateOptions) -> Result<DbUpdateOutcome> {
    let out_dir = resolve_out_dir(opts.out_dir.as_deref())?;
    let lock = lockfile::parse_project(&opts.path)?;

    let cache = AdvisoryCache::new(&out_dir, true);
    let client = OsvClient::new(cache, false, true, &opts.osv_url);
    let lookup = client.batch_query(lock.nodes()).await;

    let advisories = lookup.values().map(|r| r.vulnerabilities.len()).sum();
    Ok(DbUpdateOutcome {
        packages: lock.len(),
        advisories,
        out_dir,
    })
}
