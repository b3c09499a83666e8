//! OSV API client: batched advisory lookup and severity normalization.
//!
//! The batch endpoint is asked once per scan with every cache-missed
//! package; there is no partial retry. Severity normalization prefers a
//! numeric CVSS score and falls back to the database-specific label. Network
//! failures never propagate; they degrade to `source=unknown`.

use super::cache::AdvisoryCache;
use super::enrich::{enrich_unknowns, EnrichJob};
use super::LookupResult;
use crate::types::{
    DependencyNode, LookupSource, Severity, SeveritySource, UnknownReason, Vulnerability,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, warn};

/// Per-request timeout for every advisory endpoint.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const DEFAULT_NVD_URL: &str = "https://services.nvd.nist.gov/rest/json/cves/2.0";
const DEFAULT_GHSA_URL: &str = "https://api.github.com/advisories";
const ECOSYSTEM: &str = "npm";

const USER_AGENT: &str = concat!(
    "bardcheck/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/bardcheck/bardcheck)"
);

#[derive(Debug, Clone)]
pub struct OsvClient {
    pub(crate) http: Client,
    pub(crate) cache: AdvisoryCache,
    pub(crate) offline: bool,
    pub(crate) fallbacks: bool,
    pub(crate) base_url: String,
    pub(crate) nvd_url: String,
    pub(crate) ghsa_url: String,
}

impl OsvClient {
    pub fn new(cache: AdvisoryCache, offline: bool, fallbacks: bool, osv_url: &str) -> Self {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "falling back to default http client");
                Client::new()
            });
        Self {
            http,
            cache,
            offline,
            fallbacks,
            base_url: osv_url.trim_end_matches('/').to_string(),
            nvd_url: DEFAULT_NVD_URL.to_string(),
            ghsa_url: DEFAULT_GHSA_URL.to_string(),
        }
    }

    /// Resolve advisories for every package, keyed by `name@version`.
    ///
    /// Cache-first; misses are fetched in one batched POST unless offline.
    /// With fallback calls permitted, unknown severities are enriched
    /// through the OSV-detail / NVD / GHSA chain afterwards.
    pub async fn batch_query(
        &self,
        packages: &[DependencyNode],
    ) -> HashMap<String, LookupResult> {
        self.cache.ensure_root();
        if !self.offline {
            self.cache.prune_expired();
        }

        let mut results: HashMap<String, LookupResult> = HashMap::new();
        let mut queue: Vec<&DependencyNode> = Vec::new();

        for package in packages {
            let key = package.key();
            if results.contains_key(&key) {
                continue;
            }
            if let Some(vulns) = self.cache.read_batch(&package.name, &package.version) {
                results.insert(
                    key,
                    LookupResult {
                        source: LookupSource::Cache,
                        vulnerabilities: vulns,
                    },
                );
            } else if self.offline {
                results.insert(key, LookupResult::unknown());
            } else {
                queue.push(package);
            }
        }

        if !queue.is_empty() {
            match self.fetch_batch(&queue).await {
                Ok(lists) => {
                    for (package, vulns) in queue.iter().zip(lists) {
                        self.cache.write_batch(&package.name, &package.version, &vulns);
                        results.insert(
                            package.key(),
                            LookupResult {
                                source: LookupSource::Osv,
                                vulnerabilities: vulns,
                            },
                        );
                    }
                }
                Err(e) => {
                    warn!(error = %e, "batch query failed; treating whole batch as unknown");
                    for package in &queue {
                        results.insert(package.key(), LookupResult::unknown());
                    }
                }
            }
        }

        if self.fallbacks {
            self.enrich_results(&mut results, packages).await;
        }

        results
    }

    async fn fetch_batch(
        &self,
        queue: &[&DependencyNode],
    ) -> Result<Vec<Vec<Vulnerability>>, reqwest::Error> {
        let request = BatchRequest {
            queries: queue
                .iter()
                .map(|p| BatchQuery {
                    package: PackageRef {
                        name: p.name.clone(),
                        ecosystem: ECOSYSTEM.to_string(),
                    },
                    version: p.version.clone(),
                })
                .collect(),
        };

        let url = format!("{}/v1/querybatch", self.base_url);
        debug!(url = %url, packages = queue.len(), "issuing batch query");
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let body: BatchResponse = response.json().await?;

        // Results align positionally with the queries; short responses pad
        // out as empty.
        Ok((0..queue.len())
            .map(|i| {
                body.results
                    .get(i)
                    .and_then(|r| r.vulns.as_ref())
                    .map(|vulns| {
                        vulns
                            .iter()
                            .cloned()
                            .map(|raw| normalize_raw(raw, SeverityContext::Batch))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect())
    }

    /// Run the fallback chain over every unknown-severity vulnerability in
    /// the result set, then fold outcomes back in and refresh the cache for
    /// packages whose lists changed.
    async fn enrich_results(
        &self,
        results: &mut HashMap<String, LookupResult>,
        packages: &[DependencyNode],
    ) {
        let mut jobs: Vec<EnrichJob> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for result in results.values() {
            if result.source == LookupSource::Unknown {
                continue;
            }
            for vuln in &result.vulnerabilities {
                if vuln.severity == Severity::Unknown && seen.insert(vuln.id.clone()) {
                    jobs.push(EnrichJob {
                        id: vuln.id.clone(),
                        aliases: vuln.aliases.clone(),
                    });
                }
            }
        }
        if jobs.is_empty() {
            return;
        }

        debug!(count = jobs.len(), "enriching unknown severities");
        let outcomes = enrich_unknowns(self, jobs).await;

        let mut changed: HashSet<String> = HashSet::new();
        for (key, result) in results.iter_mut() {
            for vuln in &mut result.vulnerabilities {
                if vuln.severity != Severity::Unknown {
                    continue;
                }
                let Some(outcome) = outcomes.get(&vuln.id) else {
                    continue;
                };
                if outcome.severity != Severity::Unknown {
                    vuln.severity = outcome.severity;
                    vuln.severity_source = outcome.severity_source;
                    vuln.unknown_reason = None;
                } else {
                    vuln.unknown_reason = Some(UnknownReason::LookupFailed);
                }
                changed.insert(key.clone());
            }
        }

        for package in packages {
            if !changed.contains(&package.key()) {
                continue;
            }
            if let Some(result) = results.get(&package.key()) {
                self.cache
                    .write_batch(&package.name, &package.version, &result.vulnerabilities);
            }
        }
    }
}

// ---- wire format ----

#[derive(Debug, Serialize)]
struct BatchRequest {
    queries: Vec<BatchQuery>,
}

#[derive(Debug, Serialize)]
struct BatchQuery {
    package: PackageRef,
    version: String,
}

#[derive(Debug, Serialize)]
struct PackageRef {
    name: String,
    ecosystem: String,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    results: Vec<BatchEntry>,
}

#[derive(Debug, Deserialize)]
struct BatchEntry {
    vulns: Option<Vec<RawVulnerability>>,
}

/// An OSV advisory document as returned by the batch and detail endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawVulnerability {
    pub id: String,
    pub summary: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub modified: Option<String>,
    pub severity: Option<Vec<RawSeverity>>,
    pub references: Option<Vec<RawReference>>,
    pub affected: Option<Vec<RawAffected>>,
    pub database_specific: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSeverity {
    #[serde(rename = "type")]
    pub kind: String,
    pub score: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawReference {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAffected {
    pub ranges: Option<Vec<RawRange>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawRange {
    pub events: Option<Vec<RawEvent>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawEvent {
    pub fixed: Option<String>,
}

/// Which document a severity was read from, for provenance tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeverityContext {
    Batch,
    Detail,
}

impl SeverityContext {
    fn cvss_source(&self) -> SeveritySource {
        match self {
            SeverityContext::Batch => SeveritySource::OsvCvss,
            SeverityContext::Detail => SeveritySource::OsvDetailCvss,
        }
    }

    fn label_source(&self) -> SeveritySource {
        match self {
            SeverityContext::Batch => SeveritySource::OsvLabel,
            SeverityContext::Detail => SeveritySource::OsvDetailLabel,
        }
    }
}

/// A CVSS `score` field is usually the numeric base score, but some
/// databases ship the full vector string; in that case the last `/`
/// separated token is taken as the number.
fn parse_cvss_score(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(score) = raw.parse::<f64>() {
        return Some(score);
    }
    raw.rsplit('/').next()?.trim().parse::<f64>().ok()
}

/// Severity resolution: numeric CVSS first, database-specific label second,
/// otherwise unknown with `missing_score`.
pub(crate) fn map_severity(
    severities: &[RawSeverity],
    database_specific: Option<&serde_json::Value>,
    ctx: SeverityContext,
) -> (Severity, SeveritySource, Option<UnknownReason>) {
    for entry in severities {
        if !entry.kind.to_lowercase().contains("cvss") {
            continue;
        }
        if let Some(score) = parse_cvss_score(&entry.score) {
            return (Severity::from_cvss(score), ctx.cvss_source(), None);
        }
    }

    if let Some(label) = database_specific
        .and_then(|db| db.get("severity"))
        .and_then(|v| v.as_str())
    {
        let label = label.to_lowercase();
        let severity = if label.contains("critical") {
            Some(Severity::Critical)
        } else if label.contains("high") {
            Some(Severity::High)
        } else if label.contains("medium") || label.contains("moderate") {
            Some(Severity::Medium)
        } else if label.contains("low") {
            Some(Severity::Low)
        } else {
            None
        };
        if let Some(severity) = severity {
            return (severity, ctx.label_source(), None);
        }
    }

    (
        Severity::Unknown,
        SeveritySource::Unknown,
        Some(UnknownReason::MissingScore),
    )
}

/// Lexicographically smallest `fixed` event across all affected ranges.
/// Deliberately not semver-aware; the value is advisory display data.
fn extract_fixed_version(affected: &[RawAffected]) -> Option<String> {
    affected
        .iter()
        .flat_map(|a| a.ranges.iter().flatten())
        .flat_map(|r| r.events.iter().flatten())
        .filter_map(|e| e.fixed.clone())
        .min()
}

/// Deduplicated, order-preserving, non-empty reference URLs.
fn extract_references(references: &[RawReference]) -> Vec<String> {
    let mut seen = HashSet::new();
    references
        .iter()
        .filter_map(|r| r.url.clone())
        .filter(|url| !url.is_empty())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Normalize a raw OSV document into the report's Vulnerability shape.
pub(crate) fn normalize_raw(raw: RawVulnerability, ctx: SeverityContext) -> Vulnerability {
    let (severity, severity_source, unknown_reason) = map_severity(
        raw.severity.as_deref().unwrap_or(&[]),
        raw.database_specific.as_ref(),
        ctx,
    );
    Vulnerability {
        id: raw.id,
        summary: raw.summary,
        aliases: raw.aliases.unwrap_or_default(),
        severity,
        severity_source,
        unknown_reason,
        modified: raw.modified,
        references: extract_references(raw.references.as_deref().unwrap_or(&[])),
        fixed_version: extract_fixed_version(raw.affected.as_deref().unwrap_or(&[])),
    }
}
