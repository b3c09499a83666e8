//! Evidence indexer: grep project sources for import specifiers so findings
//! can say which files actually use a vulnerable package.

use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;
use walkdir::WalkDir;

const SOURCE_EXTENSIONS: [&str; 7] = ["ts", "tsx", "js", "jsx", "mjs", "cjs", "vue"];
const EXCLUDED_DIRS: [&str; 3] = ["node_modules", "dist", ".next"];

/// Static imports and requires: `import ... from '<spec>'`, `require('<spec>')`.
fn static_import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?:\bimport\b[^'"()]*?\bfrom\b|\brequire\s*\()\s*['"]([^'"]+)['"]"#)
            .expect("static import pattern compiles")
    })
}

/// Dynamic imports: `import('<spec>')`.
fn dynamic_import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\bimport\(\s*['"]([^'"]+)['"]\s*\)"#)
            .expect("dynamic import pattern compiles")
    })
}

/// Immutable map from package name to the source files importing it.
#[derive(Debug, Default, Clone)]
pub struct EvidenceIndex {
    scanned_files: usize,
    by_package: HashMap<String, Vec<String>>,
}

impl EvidenceIndex {
    /// The index produced when evidence collection is disabled.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn scanned_files(&self) -> usize {
        self.scanned_files
    }

    /// Sorted, deduplicated relative paths importing `package`.
    pub fn files_for(&self, package: &str) -> &[String] {
        self.by_package
            .get(package)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Walk `root` and build the index. Per-file read errors are swallowed;
/// excluded directories are pruned at any depth.
pub fn collect(root: &Path) -> EvidenceIndex {
    let mut scanned_files = 0;
    let mut sets: HashMap<String, BTreeSet<String>> = HashMap::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        !(e.file_type().is_dir()
            && e.file_name()
                .to_str()
                .is_some_and(|name| EXCLUDED_DIRS.contains(&name)))
    });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || !has_source_extension(entry.path()) {
            continue;
        }
        let content = match std::fs::read_to_string(entry.path()) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "skipping unreadable source file");
                continue;
            }
        };
        scanned_files += 1;

        let rel = relative_posix(root, entry.path());
        for spec in extract_specifiers(&content) {
            if let Some(package) = normalize_specifier(&spec) {
                sets.entry(package).or_default().insert(rel.clone());
            }
        }
    }

    let by_package = sets
        .into_iter()
        .map(|(pkg, files)| (pkg, files.into_iter().collect()))
        .collect();

    EvidenceIndex {
        scanned_files,
        by_package,
    }
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// POSIX-style path relative to the project root.
fn relative_posix(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// All import specifiers in a file, both static and dynamic forms.
fn extract_specifiers(content: &str) -> Vec<String> {
    let mut specs = Vec::new();
    for pattern in [static_import_pattern(), dynamic_import_pattern()] {
        for capture in pattern.captures_iter(content) {
            specs.push(capture[1].to_string());
        }
    }
    specs
}

/// Map a specifier to a package name. Relative and absolute specifiers are
/// dropped; scoped specifiers keep two segments, bare ones keep the first.
fn normalize_specifier(spec: &str) -> Option<String> {
    if spec.starts_with('.') || spec.starts_with('/') {
        return None;
    }
    if spec.starts_with('@') {
        let mut segments = spec.split('/');
        let scope = segments.next()?;
        let name = segments.next()?;
        if name.is_empty() {
            return None;
        }
        Some(format!("{}/{}", scope, name))
    } else {
        let first = spec.split('/').next()?;
        (!first.is_empty()).then(|| first.to_string())
    }
}
