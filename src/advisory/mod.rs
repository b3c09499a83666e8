//! Advisory resolution: the OSV client, the on-disk cache, and the severity
//! enrichment chain.

pub mod cache;
mod enrich;
pub mod osv;

pub use cache::{AdvisoryCache, CACHE_TTL};
pub use osv::{OsvClient, REQUEST_TIMEOUT};

use crate::types::{LookupSource, Vulnerability};

/// What the advisory layer knows about one `name@version`.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult {
    pub source: LookupSource,
    pub vulnerabilities: Vec<Vulnerability>,
}

impl LookupResult {
    /// The result recorded when a lookup could not happen at all: offline
    /// cache miss or batch failure.
    pub fn unknown() -> Self {
        Self {
            source: LookupSource::Unknown,
            vulnerabilities: Vec::new(),
        }
    }
}

/// Human-facing URL for an advisory id, by id family.
pub fn advisory_url(id: &str) -> String {
    if id.starts_with("GHSA-") {
        format!("https://github.com/advisories/{}", id)
    } else if id.starts_with("CVE-") {
        format!("https://nvd.nist.gov/vuln/detail/{}", id)
    } else {
        format!("https://osv.dev/vulnerability/{}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisory_url_families() {
        assert_eq!(
            advisory_url("GHSA-aaaa-bbbb-cccc"),
            "https://github.com/advisories/GHSA-aaaa-bbbb-cccc"
        );
        assert_eq!(
            advisory_url("CVE-2024-9999"),
            "https://nvd.nist.gov/vuln/detail/CVE-2024-9999"
        );
        assert_eq!(
            advisory_url("OSV-2024-1"),
            "https://osv.dev/vulnerability/OSV-2024-1"
        );
    }

    #[test]
    fn test_unknown_lookup_result() {
        let result = LookupResult::unknown();
        assert_eq!(result.source, LookupSource::Unknown);
        assert!(result.vulnerabilities.is_empty());
    }
}
