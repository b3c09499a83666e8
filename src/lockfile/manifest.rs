//! package.json manifest reading: direct dependency names and workspace
//! member discovery for the yarn and bun dialects.

use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

const DEPENDENCY_SECTIONS: [&str; 3] = ["dependencies", "devDependencies", "optionalDependencies"];

/// Read and parse a package.json. Unreadable or invalid manifests yield
/// `None`; the caller decides whether that is fatal for its dialect.
pub fn read_manifest(path: &Path) -> Option<Value> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "manifest not readable");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "manifest not valid JSON");
            None
        }
    }
}

/// Names and version specifiers declared across the dependency sections of
/// one manifest.
pub fn dependency_entries(manifest: &Value) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for section in DEPENDENCY_SECTIONS {
        let Some(map) = manifest.get(section).and_then(Value::as_object) else {
            continue;
        };
        for (name, spec) in map {
            if let Some(spec) = spec.as_str() {
                entries.push((name.clone(), spec.to_string()));
            }
        }
    }
    entries
}

/// Workspace member patterns: `workspaces: [...]` or
/// `workspaces: { packages: [...] }`.
fn workspace_patterns(manifest: &Value) -> Vec<String> {
    let node = match manifest.get("workspaces") {
        Some(Value::Array(_)) => manifest.get("workspaces"),
        Some(Value::Object(obj)) => obj.get("packages"),
        _ => None,
    };
    node.and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Expand a workspace pattern to member manifest paths. Trailing `/*` globs
/// expand one directory level; anything else is taken literally.
fn expand_pattern(root: &Path, pattern: &str) -> Vec<PathBuf> {
    if let Some(prefix) = pattern.strip_suffix("/*") {
        let Ok(entries) = std::fs::read_dir(root.join(prefix)) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path().join("package.json"))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();
        paths
    } else {
        let path = root.join(pattern).join("package.json");
        if path.is_file() { vec![path] } else { Vec::new() }
    }
}

/// All manifests for a project: the root package.json plus every workspace
/// member the root declares.
pub fn project_manifests(root: &Path) -> Vec<Value> {
    let Some(root_manifest) = read_manifest(&root.join("package.json")) else {
        return Vec::new();
    };

    let mut manifests = Vec::new();
    for pattern in workspace_patterns(&root_manifest) {
        for path in expand_pattern(root, &pattern) {
            if let Some(manifest) = read_manifest(&path) {
                manifests.push(manifest);
            }
        }
    }
    manifests.insert(0, root_manifest);
    manifests
}

/// Union of direct dependency names declared by the root manifest and all
/// workspace member manifests.
pub fn direct_dependency_names(root: &Path) -> HashSet<String> {
    let mut names = HashSet::new();
    for manifest in project_manifests(root) {
        for (name, _) in dependency_entries(&manifest) {
            names.insert(name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_dependency_entries_all_sections() {
        let manifest: Value = serde_json::from_str(
            r#"{
                "dependencies": {"lodash": "^4.17.0"},
                "devDependencies": {"vitest": "^1.0.0"},
                "optionalDependencies": {"fsevents": "^2.3.0"},
                "peerDependencies": {"react": "^18.0.0"}
            }"#,
        )
        .unwrap();

        let entries = dependency_entries(&manifest);
        let names: HashSet<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains("lodash"));
        assert!(names.contains("vitest"));
        assert!(names.contains("fsevents"));
        assert!(!names.contains("react"));
    }

    #[test]
    fn test_direct_names_without_workspaces() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"chalk": "^5.0.0"}}"#,
        )
        .unwrap();

        let names = direct_dependency_names(dir.path());
        assert_eq!(names, HashSet::from(["chalk".to_string()]));
    }

    #[test]
    fn test_direct_names_with_workspace_array() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"workspaces": ["packages/*"], "dependencies": {"chalk": "^5.0.0"}}"#,
        )
        .unwrap();
        let member = dir.path().join("packages").join("app");
        fs::create_dir_all(&member).unwrap();
        fs::write(
            member.join("package.json"),
            r#"{"dependencies": {"express": "^4.18.0"}}"#,
        )
        .unwrap();

        let names = direct_dependency_names(dir.path());
        assert!(names.contains("chalk"));
        assert!(names.contains("express"));
    }

    #[test]
    fn test_direct_names_with_workspaces_packages_object() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"workspaces": {"packages": ["tools/cli"]}}"#,
        )
        .unwrap();
        let member = dir.path().join("tools").join("cli");
        fs::create_dir_all(&member).unwrap();
        fs::write(
            member.join("package.json"),
            r#"{"devDependencies": {"typescript": "^5.4.0"}}"#,
        )
        .unwrap();

        let names = direct_dependency_names(dir.path());
        assert!(names.contains("typescript"));
    }

    #[test]
    fn test_missing_manifest_yields_empty_set() {
        let dir = TempDir::new().unwrap();
        assert!(direct_dependency_names(dir.path()).is_empty());
    }

    #[test]
    fn test_invalid_manifest_yields_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(read_manifest(&path).is_none());
    }
}
