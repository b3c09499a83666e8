//! On-disk advisory cache.
//!
//! Content-addressed under `<outDir>/.cache/osv` with four namespaces:
//! batch results at the root, OSV detail documents under `details/`, NVD
//! base scores under `nvd/`, GHSA severity outcomes under `ghsa/`. Entries
//! expire 24 hours after their file mtime. Every read and write error here
//! is swallowed; a broken cache degrades to a miss, never to a failed scan.

use crate::types::{Severity, SeveritySource, UnknownReason, Vulnerability};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Cache entry lifetime.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const DETAILS_DIR: &str = "details";
const NVD_DIR: &str = "nvd";
const GHSA_DIR: &str = "ghsa";

/// Cached NVD lookup: just the extracted base score.
#[derive(Debug, Serialize, Deserialize)]
struct NvdScoreRecord {
    score: f64,
}

/// Cached GHSA lookup outcome. An unresolved outcome is cached too so the
/// endpoint is not asked again within the TTL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhsaOutcome {
    pub severity: Severity,
    pub severity_source: SeveritySource,
}

#[derive(Debug, Clone)]
pub struct AdvisoryCache {
    root: PathBuf,
    refresh: bool,
}

impl AdvisoryCache {
    /// Cache rooted under the scan's output directory. With `refresh` set,
    /// every read reports a miss while writes still land.
    pub fn new(out_dir: &Path, refresh: bool) -> Self {
        Self {
            root: out_dir.join(".cache").join("osv"),
            refresh,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the namespace directories. Failure is reported but not fatal;
    /// subsequent writes will fail individually and be swallowed.
    pub fn ensure_root(&self) {
        for dir in [
            self.root.clone(),
            self.root.join(DETAILS_DIR),
            self.root.join(NVD_DIR),
            self.root.join(GHSA_DIR),
        ] {
            if let Err(e) = std::fs::create_dir_all(&dir) {
                warn!(path = %dir.display(), error = %e, "cannot create cache directory");
            }
        }
    }

    fn hash_key(payload: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn batch_path(&self, name: &str, version: &str) -> PathBuf {
        let payload = serde_json::json!({ "name": name, "version": version }).to_string();
        self.root.join(format!("{}.json", Self::hash_key(&payload)))
    }

    fn detail_path(&self, id: &str) -> PathBuf {
        let payload = serde_json::json!({ "id": id }).to_string();
        self.root
            .join(DETAILS_DIR)
            .join(format!("{}.json", Self::hash_key(&payload)))
    }

    fn nvd_path(&self, cve_id: &str) -> PathBuf {
        let payload = serde_json::json!({ "cveId": cve_id }).to_string();
        self.root
            .join(NVD_DIR)
            .join(format!("{}.json", Self::hash_key(&payload)))
    }

    fn ghsa_path(&self, ghsa_id: &str) -> PathBuf {
        let payload = serde_json::json!({ "ghsaId": ghsa_id }).to_string();
        self.root
            .join(GHSA_DIR)
            .join(format!("{}.json", Self::hash_key(&payload)))
    }

    /// Read a batch entry if present and fresh. Records written before the
    /// `severitySource` field existed are normalized on the way out.
    pub fn read_batch(&self, name: &str, version: &str) -> Option<Vec<Vulnerability>> {
        let mut vulns: Vec<Vulnerability> = self.read_json(&self.batch_path(name, version))?;
        for vuln in &mut vulns {
            normalize_legacy_record(vuln);
        }
        Some(vulns)
    }

    pub fn write_batch(&self, name: &str, version: &str, vulns: &[Vulnerability]) {
        self.write_json(&self.batch_path(name, version), &vulns);
    }

    pub fn read_detail(&self, id: &str) -> Option<serde_json::Value> {
        self.read_json(&self.detail_path(id))
    }

    pub fn write_detail(&self, id: &str, doc: &serde_json::Value) {
        self.write_json(&self.detail_path(id), doc);
    }

    pub fn read_nvd_score(&self, cve_id: &str) -> Option<f64> {
        let record: NvdScoreRecord = self.read_json(&self.nvd_path(cve_id))?;
        Some(record.score)
    }

    pub fn write_nvd_score(&self, cve_id: &str, score: f64) {
        self.write_json(&self.nvd_path(cve_id), &NvdScoreRecord { score });
    }

    pub fn read_ghsa(&self, ghsa_id: &str) -> Option<GhsaOutcome> {
        self.read_json(&self.ghsa_path(ghsa_id))
    }

    pub fn write_ghsa(&self, ghsa_id: &str, outcome: GhsaOutcome) {
        self.write_json(&self.ghsa_path(ghsa_id), &outcome);
    }

    /// Unlink every cache file whose mtime is older than the TTL. Runs only
    /// on non-offline scans; all errors are swallowed so pruning can never
    /// fail a scan.
    pub fn prune_expired(&self) {
        let mut removed = 0usize;
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if is_fresh(entry.path()) {
                continue;
            }
            if std::fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "pruned expired cache entries");
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Option<T> {
        if self.refresh || !is_fresh(path) {
            return None;
        }
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable cache entry");
                None
            }
        }
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) {
        let Ok(content) = serde_json::to_vec(value) else {
            return;
        };
        if let Err(e) = std::fs::write(path, content) {
            warn!(path = %path.display(), error = %e, "cache write failed");
        }
    }
}

/// A cache file is fresh when (now - mtime) <= TTL. Missing files and
/// metadata errors count as stale.
fn is_fresh(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    let Ok(mtime) = metadata.modified() else {
        return false;
    };
    SystemTime::now()
        .duration_since(mtime)
        .map(|age| age <= CACHE_TTL)
        .unwrap_or(true)
}

/// Records cached before `severitySource` existed deserialize with an
/// `unknown` source; derive one from the stored severity.
fn normalize_legacy_record(vuln: &mut Vulnerability) {
    if vuln.severity_source != SeveritySource::Unknown {
        return;
    }
    if vuln.severity == Severity::Unknown {
        if vuln.unknown_reason.is_none() {
            vuln.unknown_reason = Some(UnknownReason::MissingScore);
        }
    } else {
        vuln.severity_source = SeveritySource::OsvLabel;
    }
}
