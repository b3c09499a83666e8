//! pnpm-lock.yaml parser.
//!
//! Direct names come from the `importers` section; the flat `packages` map
//! carries every pinned version. Package keys look like
//! `/name@1.2.3(peer@x)` (v6-) or `name@1.2.3(peer@x)` (v9+).

use super::ParsedLock;
use crate::error::{BardcheckError, Result};
use serde_yml::Value;
use std::collections::HashSet;

const IMPORTER_SECTIONS: [&str; 3] = ["dependencies", "devDependencies", "optionalDependencies"];

pub fn parse(content: &str) -> Result<ParsedLock> {
    let doc: Value = serde_yml::from_str(content).map_err(BardcheckError::lockfile_corrupt)?;

    let direct = collect_direct_names(&doc);

    let mut lock = ParsedLock::default();
    if let Some(packages) = doc.get("packages").and_then(Value::as_mapping) {
        for (key, _) in packages {
            let Some(key) = key.as_str() else {
                continue;
            };
            let Some((name, version)) = split_package_key(key) else {
                continue;
            };
            lock.insert(name, version, direct.contains(name));
        }
    }

    Ok(lock)
}

/// Union of dependency names declared by every importer.
fn collect_direct_names(doc: &Value) -> HashSet<String> {
    let mut names = HashSet::new();
    let Some(importers) = doc.get("importers").and_then(Value::as_mapping) else {
        return names;
    };
    for (_, importer) in importers {
        for section in IMPORTER_SECTIONS {
            let Some(deps) = importer.get(section).and_then(Value::as_mapping) else {
                continue;
            };
            for (name, _) in deps {
                if let Some(name) = name.as_str() {
                    names.insert(name.to_string());
                }
            }
        }
    }
    names
}

/// Split a packages key into name and version: strip the leading `/`, cut
/// the peer suffix at the first `(`, then split at the LAST `@` so scoped
/// names survive.
fn split_package_key(key: &str) -> Option<(&str, &str)> {
    let key = key.strip_prefix('/').unwrap_or(key);
    let key = key.split('(').next().unwrap_or(key);
    let (name, version) = key.rsplit_once('@')?;
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some((name, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importer_declared_is_direct() {
        let content = r#"
lockfileVersion: '9.0'
importers:
  .:
    dependencies:
      lodash:
        specifier: ^4.17.0
        version: 4.17.21
packages:
  lodash@4.17.21:
    resolution: {integrity: sha512-xxx}
  ansi-styles@6.2.1(patch_hash=abc):
    resolution: {integrity: sha512-yyy}
"#;

        let lock = parse(content).unwrap();
        assert_eq!(lock.len(), 2);

        let lodash = lock.nodes().iter().find(|n| n.name == "lodash").unwrap();
        assert!(lodash.direct);
        assert_eq!(lodash.version, "4.17.21");

        let ansi = lock.nodes().iter().find(|n| n.name == "ansi-styles").unwrap();
        assert!(!ansi.direct);
        assert_eq!(ansi.version, "6.2.1");
    }

    #[test]
    fn test_legacy_slash_prefixed_keys() {
        let content = r#"
lockfileVersion: 5.4
importers:
  .:
    dependencies:
      chalk: 5.0.0
packages:
  /chalk@5.0.0:
    resolution: {integrity: sha512-xxx}
  /supports-color@9.4.0(node@20):
    resolution: {integrity: sha512-yyy}
"#;

        let lock = parse(content).unwrap();
        let chalk = lock.nodes().iter().find(|n| n.name == "chalk").unwrap();
        assert!(chalk.direct);
        let sc = lock
            .nodes()
            .iter()
            .find(|n| n.name == "supports-color")
            .unwrap();
        assert!(!sc.direct);
        assert_eq!(sc.version, "9.4.0");
    }

    #[test]
    fn test_scoped_package_key() {
        let content = r#"
importers:
  .:
    devDependencies:
      '@babel/core': 7.24.0
packages:
  '@babel/core@7.24.0':
    resolution: {integrity: sha512-xxx}
  '@babel/helper-plugin-utils@7.24.0':
    resolution: {integrity: sha512-yyy}
"#;

        let lock = parse(content).unwrap();
        let core = lock.nodes().iter().find(|n| n.name == "@babel/core").unwrap();
        assert!(core.direct);
        assert_eq!(core.version, "7.24.0");
        let helper = lock
            .nodes()
            .iter()
            .find(|n| n.name == "@babel/helper-plugin-utils")
            .unwrap();
        assert!(!helper.direct);
    }

    #[test]
    fn test_direct_union_across_importers() {
        let content = r#"
importers:
  .:
    dependencies:
      lodash: 4.17.21
  packages/app:
    dependencies:
      express: 4.18.2
packages:
  lodash@4.17.21:
    resolution: {integrity: sha512-a}
  express@4.18.2:
    resolution: {integrity: sha512-b}
"#;

        let lock = parse(content).unwrap();
        assert!(lock.nodes().iter().all(|n| n.direct));
    }

    #[test]
    fn test_no_packages_section_is_empty() {
        let lock = parse("lockfileVersion: '9.0'\n").unwrap();
        assert!(lock.is_empty());
    }

    #[test]
    fn test_invalid_yaml_reports_lockfile_corrupt() {
        let err = parse("importers:\n  bad\n    indent: [").unwrap_err();
        assert!(matches!(err, BardcheckError::LockfileCorrupt { .. }));
    }

    #[test]
    fn test_split_package_key() {
        assert_eq!(
            split_package_key("/lodash@4.17.21"),
            Some(("lodash", "4.17.21"))
        );
        assert_eq!(
            split_package_key("lodash@4.17.21"),
            Some(("lodash", "4.17.21"))
        );
        assert_eq!(
            split_package_key("@scope/pkg@1.0.0(peer@2.0.0)"),
            Some(("@scope/pkg", "1.0.0"))
        );
        assert_eq!(split_package_key("no-version"), None);
    }
}
