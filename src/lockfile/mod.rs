//! Lockfile dialect detection and parsing.
//!
//! Four dialects are supported, probed in a fixed order. Each parser
//! produces the same normalized shape: a deduplicated set of pinned
//! `(name, version)` pairs with a direct/transitive flag.

mod bun;
mod manifest;
mod npm;
mod pnpm;
mod yarn;

use crate::error::{BardcheckError, Result};
use crate::types::DependencyNode;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use manifest::direct_dependency_names;

/// Supported lockfile dialects, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockfileKind {
    Npm,
    Pnpm,
    Yarn,
    Bun,
}

impl LockfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockfileKind::Npm => "package-lock.json",
            LockfileKind::Pnpm => "pnpm-lock.yaml",
            LockfileKind::Yarn => "yarn.lock",
            LockfileKind::Bun => "bun.lock",
        }
    }
}

/// Normalized dependency set. Keyed by `name@version`; first-seen order is
/// preserved so downstream iteration is deterministic. Merging an entry that
/// already exists keeps `direct = true` if either occurrence was direct.
#[derive(Debug, Default, Clone)]
pub struct ParsedLock {
    nodes: Vec<DependencyNode>,
    index: HashMap<String, usize>,
}

impl ParsedLock {
    pub fn insert(&mut self, name: &str, version: &str, direct: bool) {
        let key = format!("{}@{}", name, version);
        match self.index.get(&key).copied() {
            Some(i) => self.nodes[i].direct |= direct,
            None => {
                self.index.insert(key, self.nodes.len());
                self.nodes.push(DependencyNode::new(name, version, direct));
            }
        }
    }

    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Probe the project directory for a lockfile. First match wins.
pub fn detect(dir: &Path) -> Option<(LockfileKind, PathBuf)> {
    let candidates = [
        (LockfileKind::Npm, "package-lock.json"),
        (LockfileKind::Pnpm, "pnpm-lock.yaml"),
        (LockfileKind::Yarn, "yarn.lock"),
        (LockfileKind::Bun, "bun.lock"),
        (LockfileKind::Bun, "bun.lockb"),
    ];
    candidates.iter().find_map(|(kind, file)| {
        let path = dir.join(file);
        path.is_file().then_some((*kind, path))
    })
}

/// Detect the dialect and parse the project's dependency set.
pub fn parse_project(dir: &Path) -> Result<ParsedLock> {
    let (kind, path) = detect(dir).ok_or(BardcheckError::NoLockfile)?;
    debug!(lockfile = %path.display(), dialect = kind.as_str(), "parsing lockfile");

    let lock = match kind {
        LockfileKind::Npm => {
            let content = read_lockfile(&path)?;
            npm::parse(&content)?
        }
        LockfileKind::Pnpm => {
            let content = read_lockfile(&path)?;
            pnpm::parse(&content)?
        }
        LockfileKind::Yarn => {
            let content = read_lockfile(&path)?;
            let direct = manifest::direct_dependency_names(dir);
            yarn::parse(&content, &direct)
        }
        LockfileKind::Bun => bun::parse(dir)?,
    };

    debug!(count = lock.len(), "lockfile parsed");
    Ok(lock)
}

fn read_lockfile(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| BardcheckError::read_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_detect_prefers_npm_over_pnpm() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();

        let (kind, _) = detect(dir.path()).unwrap();
        assert_eq!(kind, LockfileKind::Npm);
    }

    #[test]
    fn test_detect_order_yarn_before_bun() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("yarn.lock"), "").unwrap();
        fs::write(dir.path().join("bun.lockb"), "").unwrap();

        let (kind, _) = detect(dir.path()).unwrap();
        assert_eq!(kind, LockfileKind::Yarn);
    }

    #[test]
    fn test_detect_bun_lockb() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bun.lockb"), [0u8; 4]).unwrap();

        let (kind, path) = detect(dir.path()).unwrap();
        assert_eq!(kind, LockfileKind::Bun);
        assert!(path.ends_with("bun.lockb"));
    }

    #[test]
    fn test_detect_none() {
        let dir = TempDir::new().unwrap();
        assert!(detect(dir.path()).is_none());
    }

    #[test]
    fn test_parse_project_no_lockfile() {
        let dir = TempDir::new().unwrap();
        let err = parse_project(dir.path()).unwrap_err();
        assert!(matches!(err, BardcheckError::NoLockfile));
    }

    #[test]
    fn test_parsed_lock_merge_keeps_direct() {
        let mut lock = ParsedLock::default();
        lock.insert("lodash", "4.17.21", false);
        lock.insert("lodash", "4.17.21", true);
        lock.insert("lodash", "4.17.21", false);

        assert_eq!(lock.len(), 1);
        assert!(lock.nodes()[0].direct);
    }

    #[test]
    fn test_parsed_lock_distinct_versions_kept() {
        let mut lock = ParsedLock::default();
        lock.insert("semver", "6.3.1", false);
        lock.insert("semver", "7.6.0", true);

        assert_eq!(lock.len(), 2);
    }

    #[test]
    fn test_parsed_lock_preserves_first_seen_order() {
        let mut lock = ParsedLock::default();
        lock.insert("zzz", "1.0.0", true);
        lock.insert("aaa", "1.0.0", true);

        let names: Vec<_> = lock.nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["zzz", "aaa"]);
    }
}
