//! yarn.lock parser (classic line-oriented format).
//!
//! A column-0 line ending in `:` opens a selector group ("name@range",
//! comma-separated, optionally quoted); the next indented `version "X"` line
//! pins every selector in the group. Direct classification comes from the
//! manifest(s), not the lockfile.

use super::ParsedLock;
use std::collections::HashSet;

pub fn parse(content: &str, direct_names: &HashSet<String>) -> ParsedLock {
    let mut lock = ParsedLock::default();
    let mut group: Vec<String> = Vec::new();

    for line in content.lines() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        if !line.starts_with([' ', '\t']) {
            group.clear();
            if let Some(selectors) = line.strip_suffix(':') {
                group.extend(
                    selectors
                        .split(',')
                        .map(|s| s.trim().trim_matches('"').to_string())
                        .filter(|s| !s.is_empty()),
                );
            }
            continue;
        }

        if group.is_empty() {
            continue;
        }
        let Some(version) = parse_version_line(line) else {
            continue;
        };
        for selector in group.drain(..) {
            if let Some(name) = selector_name(&selector) {
                lock.insert(name, version, direct_names.contains(name));
            }
        }
    }

    lock
}

/// Match an indented `version "1.2.3"` line (yarn berry also writes
/// `version: 1.2.3`).
fn parse_version_line(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("version")?;
    let version = rest
        .trim_start_matches(':')
        .trim()
        .trim_matches('"');
    (!version.is_empty()).then_some(version)
}

/// Extract the package name from a selector, truncating at the `@` that
/// separates name from range. A leading `@scope/` keeps its own `@`; the
/// `@npm:` protocol prefix in ranges needs no special handling because the
/// cut happens before it.
fn selector_name(selector: &str) -> Option<&str> {
    let at = if let Some(rest) = selector.strip_prefix('@') {
        rest.find('@').map(|i| i + 1)?
    } else {
        selector.find('@')?
    };
    let name = &selector[..at];
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const BASIC_LOCK: &str = r#"# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.
# yarn lockfile v1


lodash@^4.17.0:
  version "4.17.21"
  resolved "https://registry.yarnpkg.com/lodash/-/lodash-4.17.21.tgz"
  integrity sha512-xxx

ansi-styles@^6.0.0, ansi-styles@^6.2.0:
  version "6.2.1"
  resolved "https://registry.yarnpkg.com/ansi-styles/-/ansi-styles-6.2.1.tgz"
"#;

    #[test]
    fn test_basic_groups() {
        let lock = parse(BASIC_LOCK, &direct(&["lodash"]));
        assert_eq!(lock.len(), 2);

        let lodash = lock.nodes().iter().find(|n| n.name == "lodash").unwrap();
        assert_eq!(lodash.version, "4.17.21");
        assert!(lodash.direct);

        let ansi = lock.nodes().iter().find(|n| n.name == "ansi-styles").unwrap();
        assert_eq!(ansi.version, "6.2.1");
        assert!(!ansi.direct);
    }

    #[test]
    fn test_quoted_scoped_selectors() {
        let content = r#"
"@babel/core@^7.0.0", "@babel/core@^7.20.0":
  version "7.24.0"
"#;
        let lock = parse(content, &direct(&["@babel/core"]));
        assert_eq!(lock.len(), 1);
        let node = &lock.nodes()[0];
        assert_eq!(node.name, "@babel/core");
        assert_eq!(node.version, "7.24.0");
        assert!(node.direct);
    }

    #[test]
    fn test_npm_protocol_range() {
        let content = r#"
strip-ansi@npm:^7.0.1:
  version "7.1.0"
"#;
        let lock = parse(content, &HashSet::new());
        assert_eq!(lock.len(), 1);
        assert_eq!(lock.nodes()[0].name, "strip-ansi");
        assert_eq!(lock.nodes()[0].version, "7.1.0");
    }

    #[test]
    fn test_same_package_two_versions() {
        let content = r#"
semver@^6.3.0:
  version "6.3.1"

semver@^7.5.0:
  version "7.6.0"
"#;
        let lock = parse(content, &direct(&["semver"]));
        assert_eq!(lock.len(), 2);
        assert!(lock.nodes().iter().all(|n| n.direct));
    }

    #[test]
    fn test_berry_colon_version_line() {
        let content = r#"
"chalk@npm:^5.0.0":
  version: 5.3.0
"#;
        let lock = parse(content, &HashSet::new());
        assert_eq!(lock.len(), 1);
        assert_eq!(lock.nodes()[0].version, "5.3.0");
    }

    #[test]
    fn test_selector_name() {
        assert_eq!(selector_name("lodash@^4.17.0"), Some("lodash"));
        assert_eq!(selector_name("@scope/pkg@^1.0.0"), Some("@scope/pkg"));
        assert_eq!(selector_name("pkg@npm:^1.0.0"), Some("pkg"));
        assert_eq!(selector_name("no-at-sign"), None);
    }

    #[test]
    fn test_empty_lockfile() {
        let lock = parse("# yarn lockfile v1\n", &HashSet::new());
        assert!(lock.is_empty());
    }
}
