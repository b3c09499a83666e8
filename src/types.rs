use serde::{Deserialize, Serialize};

/// Advisory severity. Ordering follows the total order
/// critical > high > medium > low > unknown.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Unknown => "unknown",
        }
    }

    /// Numeric rank used by the report sort key. Higher is more severe.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
            Severity::Unknown => 0,
        }
    }

    /// CVSS base score banding: >=9.0 critical, >=7.0 high, >=4.0 medium,
    /// everything below is low.
    pub fn from_cvss(score: f64) -> Self {
        if score >= 9.0 {
            Severity::Critical
        } else if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How likely a finding is to matter for this project, derived from whether
/// the package is a direct dependency and whether imports of it were found.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_signals(direct: bool, has_evidence: bool) -> Self {
        match (direct, has_evidence) {
            (true, true) => Confidence::High,
            (true, false) => Confidence::Medium,
            (false, true) => Confidence::Low,
            (false, false) => Confidence::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provenance tag recording which data point produced a severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeveritySource {
    OsvCvss,
    OsvLabel,
    OsvDetailCvss,
    OsvDetailLabel,
    AliasCvss,
    GhsaCvss,
    GhsaLabel,
    PolicyOverride,
    #[default]
    Unknown,
}

impl SeveritySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeveritySource::OsvCvss => "osv_cvss",
            SeveritySource::OsvLabel => "osv_label",
            SeveritySource::OsvDetailCvss => "osv_detail_cvss",
            SeveritySource::OsvDetailLabel => "osv_detail_label",
            SeveritySource::AliasCvss => "alias_cvss",
            SeveritySource::GhsaCvss => "ghsa_cvss",
            SeveritySource::GhsaLabel => "ghsa_label",
            SeveritySource::PolicyOverride => "policy_override",
            SeveritySource::Unknown => "unknown",
        }
    }
}

/// Why a severity is unresolved at the advisory layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownReason {
    MissingScore,
    LookupFailed,
}

/// Where a lookup result came from: the network batch, the on-disk cache,
/// or nowhere (lookup failed or offline miss).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LookupSource {
    Osv,
    Cache,
    #[default]
    Unknown,
}

/// Minimum severity that fails a CI run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailOn {
    Critical,
    #[default]
    High,
    Medium,
    Low,
    None,
}

impl FailOn {
    /// The severity a finding must reach to trip the threshold.
    /// `None` means the threshold can never trip.
    pub fn threshold(&self) -> Option<Severity> {
        match self {
            FailOn::Critical => Some(Severity::Critical),
            FailOn::High => Some(Severity::High),
            FailOn::Medium => Some(Severity::Medium),
            FailOn::Low => Some(Severity::Low),
            FailOn::None => None,
        }
    }
}

/// One pinned package from a lockfile. Identity is `(name, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    pub name: String,
    pub version: String,
    pub direct: bool,
}

impl DependencyNode {
    pub fn new(name: impl Into<String>, version: impl Into<String>, direct: bool) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            direct,
        }
    }

    /// `name@version` key used across lookup maps and cache entries.
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// A normalized advisory attached to a package version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub severity: Severity,
    #[serde(default)]
    pub severity_source: SeveritySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_reason: Option<UnknownReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_version: Option<String>,
}

/// One reported package: its aggregated severity, confidence, evidence and
/// the advisories that matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub package_name: String,
    pub version: String,
    pub direct: bool,
    pub severity: Severity,
    pub severity_source: SeveritySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_reason: Option<UnknownReason>,
    pub confidence: Confidence,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    pub source: LookupSource,
}

impl Finding {
    /// Content-based ordering key: severities descending, then package name,
    /// version and advisory id sequence ascending. Sorting by this key with a
    /// stable sort makes the report order a pure function of its content.
    pub fn sort_key(&self) -> String {
        let ids: Vec<&str> = self
            .vulnerabilities
            .iter()
            .map(|v| v.id.as_str())
            .collect();
        format!(
            "{}:{}:{}:{}",
            9 - self.severity.rank(),
            self.package_name,
            self.version,
            ids.join(",")
        )
    }
}

/// Findings per severity bucket. Fixed fields keep JSON key order stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.unknown
    }
}

/// Findings per confidence bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfidenceCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl ConfidenceCounts {
    pub fn record(&mut self, confidence: Confidence) {
        match confidence {
            Confidence::High => self.high += 1,
            Confidence::Medium => self.medium += 1,
            Confidence::Low => self.low += 1,
            Confidence::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low + self.unknown
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub dependency_count: usize,
    pub scanned_files: usize,
    pub findings_count: usize,
    pub by_severity: SeverityCounts,
    pub by_confidence: ConfidenceCounts,
}

impl Summary {
    pub fn compute(dependency_count: usize, scanned_files: usize, findings: &[Finding]) -> Self {
        let mut by_severity = SeverityCounts::default();
        let mut by_confidence = ConfidenceCounts::default();
        for finding in findings {
            by_severity.record(finding.severity);
            by_confidence.record(finding.confidence);
        }
        Self {
            dependency_count,
            scanned_files,
            findings_count: findings.len(),
            by_severity,
            by_confidence,
        }
    }
}

/// The complete scan result, serialized verbatim as `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub target_path: String,
    pub generated_at: String,
    pub fail_on: FailOn,
    pub summary: Summary,
    pub findings: Vec<Finding>,
}
