//! Severity enrichment for advisories the batch response left unknown.
//!
//! Fallback chain per advisory: the full OSV detail document, then NVD CVSS
//! via `CVE-` aliases, then the GitHub advisory endpoint for `GHSA-` ids.
//! First success wins. Jobs drain from a shared FIFO through a fixed pool of
//! six workers; every endpoint read goes through the cache first.

use super::cache::GhsaOutcome;
use super::osv::{map_severity, normalize_raw, OsvClient, RawVulnerability, SeverityContext};
use crate::types::{Severity, SeveritySource};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Fixed worker count for the enrichment pool.
pub(crate) const ENRICH_WORKERS: usize = 6;

/// One unknown-severity advisory to resolve.
#[derive(Debug, Clone)]
pub(crate) struct EnrichJob {
    pub id: String,
    pub aliases: Vec<String>,
}

/// What the chain concluded. `Severity::Unknown` means every step came up
/// empty or a transport error cut the chain short.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EnrichOutcome {
    pub severity: Severity,
    pub severity_source: SeveritySource,
}

impl EnrichOutcome {
    fn unresolved() -> Self {
        Self {
            severity: Severity::Unknown,
            severity_source: SeveritySource::Unknown,
        }
    }
}

/// Drain the job queue with a bounded worker pool and collect outcomes by
/// advisory id. Workers self-terminate when the queue is empty.
pub(crate) async fn enrich_unknowns(
    client: &OsvClient,
    jobs: Vec<EnrichJob>,
) -> HashMap<String, EnrichOutcome> {
    let queue: Arc<Mutex<VecDeque<EnrichJob>>> = Arc::new(Mutex::new(jobs.into()));
    let workers = ENRICH_WORKERS.min(queue.lock().map(|q| q.len()).unwrap_or(0)).max(1);

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let mut resolved = Vec::new();
            loop {
                let job = queue
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .pop_front();
                let Some(job) = job else { break };
                let outcome = resolve_one(&client, &job).await;
                resolved.push((job.id, outcome));
            }
            resolved
        }));
    }

    let mut outcomes = HashMap::new();
    for handle in handles {
        if let Ok(resolved) = handle.await {
            outcomes.extend(resolved);
        }
    }
    outcomes
}

async fn resolve_one(client: &OsvClient, job: &EnrichJob) -> EnrichOutcome {
    match run_chain(client, job).await {
        Ok(Some(outcome)) => outcome,
        Ok(None) => EnrichOutcome::unresolved(),
        Err(e) => {
            warn!(id = %job.id, error = %e, "enrichment lookup failed");
            EnrichOutcome::unresolved()
        }
    }
}

/// Each step returns `Ok(None)` when it has no data (falls through to the
/// next step); a transport error aborts the rest of the chain.
async fn run_chain(
    client: &OsvClient,
    job: &EnrichJob,
) -> Result<Option<EnrichOutcome>, reqwest::Error> {
    if let Some(outcome) = detail_severity(client, &job.id).await? {
        return Ok(Some(outcome));
    }

    for alias in job.aliases.iter().filter(|a| a.starts_with("CVE-")) {
        if let Some(score) = nvd_score(client, alias).await? {
            return Ok(Some(EnrichOutcome {
                severity: Severity::from_cvss(score),
                severity_source: SeveritySource::AliasCvss,
            }));
        }
    }

    let ghsa_ids = std::iter::once(&job.id)
        .chain(job.aliases.iter())
        .filter(|id| id.starts_with("GHSA-"));
    for id in ghsa_ids {
        if let Some(outcome) = ghsa_severity(client, id).await? {
            return Ok(Some(outcome));
        }
    }

    Ok(None)
}

/// Step 1: the OSV detail document, which often carries scores the batch
/// response omits.
async fn detail_severity(
    client: &OsvClient,
    id: &str,
) -> Result<Option<EnrichOutcome>, reqwest::Error> {
    let doc = match client.cache.read_detail(id) {
        Some(doc) => doc,
        None => {
            let url = format!("{}/v1/vulns/{}", client.base_url, id);
            debug!(url = %url, "fetching OSV detail");
            let response = client.http.get(&url).send().await?;
            if !response.status().is_success() {
                return Ok(None);
            }
            let doc: serde_json::Value = response.json().await?;
            client.cache.write_detail(id, &doc);
            doc
        }
    };

    let Ok(raw) = serde_json::from_value::<RawVulnerability>(doc) else {
        return Ok(None);
    };
    let normalized = normalize_raw(raw, SeverityContext::Detail);
    if normalized.severity == Severity::Unknown {
        return Ok(None);
    }
    Ok(Some(EnrichOutcome {
        severity: normalized.severity,
        severity_source: normalized.severity_source,
    }))
}

/// Step 2: NVD base score for a CVE alias, preferring CVSS v3.1, then v3.0,
/// then v2.
async fn nvd_score(client: &OsvClient, cve_id: &str) -> Result<Option<f64>, reqwest::Error> {
    if let Some(score) = client.cache.read_nvd_score(cve_id) {
        return Ok(Some(score));
    }

    let url = format!("{}?cveId={}", client.nvd_url, cve_id);
    debug!(url = %url, "fetching NVD score");
    let response = client.http.get(&url).send().await?;
    if !response.status().is_success() {
        return Ok(None);
    }
    let doc: serde_json::Value = response.json().await?;

    let Some(score) = extract_nvd_base_score(&doc) else {
        return Ok(None);
    };
    client.cache.write_nvd_score(cve_id, score);
    Ok(Some(score))
}

fn extract_nvd_base_score(doc: &serde_json::Value) -> Option<f64> {
    let metrics = doc
        .get("vulnerabilities")?
        .get(0)?
        .get("cve")?
        .get("metrics")?;
    for key in ["cvssMetricV31", "cvssMetricV30", "cvssMetricV2"] {
        let score = metrics
            .get(key)
            .and_then(|m| m.get(0))
            .and_then(|m| m.get("cvssData"))
            .and_then(|d| d.get("baseScore"))
            .and_then(|s| s.as_f64());
        if score.is_some() {
            return score;
        }
    }
    None
}

/// Step 3: the GitHub advisory endpoint. A numeric `cvss.score` wins over
/// the coarse severity label. The outcome is cached either way so the
/// endpoint is not re-asked within the TTL.
async fn ghsa_severity(
    client: &OsvClient,
    ghsa_id: &str,
) -> Result<Option<EnrichOutcome>, reqwest::Error> {
    if let Some(cached) = client.cache.read_ghsa(ghsa_id) {
        return Ok(resolved_outcome(cached));
    }

    let url = format!("{}/{}", client.ghsa_url, ghsa_id);
    debug!(url = %url, "fetching GitHub advisory");
    let response = client
        .http
        .get(&url)
        .header("Accept", "application/vnd.github+json")
        .send()
        .await?;
    if !response.status().is_success() {
        return Ok(None);
    }
    let doc: serde_json::Value = response.json().await?;

    let outcome = classify_ghsa(&doc);
    client.cache.write_ghsa(ghsa_id, outcome);
    Ok(resolved_outcome(outcome))
}

fn classify_ghsa(doc: &serde_json::Value) -> GhsaOutcome {
    if let Some(score) = doc
        .get("cvss")
        .and_then(|c| c.get("score"))
        .and_then(|s| s.as_f64())
    {
        return GhsaOutcome {
            severity: Severity::from_cvss(score),
            severity_source: SeveritySource::GhsaCvss,
        };
    }

    let label = doc.get("severity").and_then(|s| s.as_str()).unwrap_or("");
    let severity = match label {
        "critical" => Some(Severity::Critical),
        "high" => Some(Severity::High),
        "medium" => Some(Severity::Medium),
        "low" => Some(Severity::Low),
        _ => None,
    };
    match severity {
        Some(severity) => GhsaOutcome {
            severity,
            severity_source: SeveritySource::GhsaLabel,
        },
        None => GhsaOutcome {
            severity: Severity::Unknown,
            severity_source: SeveritySource::Unknown,
        },
    }
}

fn resolved_outcome(outcome: GhsaOutcome) -> Option<EnrichOutcome> {
    (outcome.severity != Severity::Unknown).then_some(EnrichOutcome {
        severity: outcome.severity,
        severity_source: outcome.severity_source,
    })
}
