//! bun dialect: the binary lock is not parsed. The manifest (plus any
//! workspace manifests) stands in for it, which loses transitive
//! dependencies; every emitted entry is marked direct.

use super::{manifest, ParsedLock};
use crate::error::{BardcheckError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\d+\.\d+\.\d+(?:[-+][0-9A-Za-z.-]+)?").expect("version pattern compiles")
    })
}

pub fn parse(root: &Path) -> Result<ParsedLock> {
    let manifests = manifest::project_manifests(root);
    if manifests.is_empty() {
        return Err(BardcheckError::lockfile_corrupt(
            "bun lockfile present but package.json is missing or invalid",
        ));
    }

    let mut lock = ParsedLock::default();
    for m in &manifests {
        for (name, spec) in manifest::dependency_entries(m) {
            lock.insert(&name, &normalize_spec(&spec), true);
        }
    }

    debug!(count = lock.len(), "bun manifest fallback (transitives unavailable)");
    Ok(lock)
}

/// Pull the first pinned-looking version out of a range specifier; specs
/// with no embedded version (tags, workspace refs) pass through unchanged.
fn normalize_spec(spec: &str) -> String {
    version_pattern()
        .find(spec)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| spec.to_string())
}
