//! package-lock.json parser (npm).
//!
//! Modern lockfiles (`lockfileVersion >= 2`) carry a flat `packages` map
//! keyed by install path; legacy lockfiles nest a `dependencies` tree.

use super::ParsedLock;
use crate::error::{BardcheckError, Result};
use serde_json::Value;

const NODE_MODULES: &str = "node_modules/";

pub fn parse(content: &str) -> Result<ParsedLock> {
    let doc: Value = serde_json::from_str(content).map_err(BardcheckError::lockfile_corrupt)?;

    let mut lock = ParsedLock::default();

    let version = doc
        .get("lockfileVersion")
        .and_then(Value::as_u64)
        .unwrap_or(1);

    match doc.get("packages").and_then(Value::as_object) {
        Some(packages) if version >= 2 && !packages.is_empty() => {
            for (key, entry) in packages {
                // The root project entry has an empty key.
                if key.is_empty() {
                    continue;
                }
                let Some((name, direct)) = split_install_path(key) else {
                    continue;
                };
                let Some(version) = entry.get("version").and_then(Value::as_str) else {
                    continue;
                };
                lock.insert(name, version, direct);
            }
        }
        _ => {
            if let Some(deps) = doc.get("dependencies") {
                walk_legacy_tree(deps, true, &mut lock);
            }
        }
    }

    Ok(lock)
}

/// Extract the package name from an install path key. The name is whatever
/// follows the LAST `node_modules/` segment, which handles nested installs;
/// a scoped name keeps both of its path segments. The entry is direct when
/// the key has no nesting at all, i.e. it is exactly `node_modules/<name>`.
fn split_install_path(key: &str) -> Option<(&str, bool)> {
    let idx = key.rfind(NODE_MODULES)?;
    let name = &key[idx + NODE_MODULES.len()..];
    if name.is_empty() {
        return None;
    }
    Some((name, idx == 0))
}

/// Legacy `dependencies` tree: top-level entries are direct, anything nested
/// is transitive.
fn walk_legacy_tree(deps: &Value, direct: bool, lock: &mut ParsedLock) {
    let Some(map) = deps.as_object() else {
        return;
    };
    for (name, entry) in map {
        if let Some(version) = entry.get("version").and_then(Value::as_str) {
            lock.insert(name, version, direct);
        }
        if let Some(nested) = entry.get("dependencies") {
            walk_legacy_tree(nested, false, lock);
        }
    }
}
