//! Markdown reporter: a human-readable report suitable for pull requests
//! and CI artifacts.

use crate::advisory::advisory_url;
use crate::report::Reporter;
use crate::types::{Finding, ScanReport};

/// At most this many reference links per advisory.
const MAX_REFERENCES: usize = 3;

pub struct MarkdownReporter;

impl MarkdownReporter {
    pub fn new() -> Self {
        Self
    }

    fn format_header(&self, report: &ScanReport) -> String {
        let mut out = String::new();
        out.push_str("# bardcheck report\n\n");
        out.push_str(&format!("- Target: `{}`\n", report.target_path));
        out.push_str(&format!("- Generated: {}\n", report.generated_at));
        out.push_str(&format!(
            "- Dependencies: {}\n",
            report.summary.dependency_count
        ));
        out.push_str(&format!("- Findings: {}\n", report.summary.findings_count));
        out.push('\n');
        out
    }

    fn format_finding(&self, finding: &Finding) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "## {}@{}\n\n",
            finding.package_name, finding.version
        ));
        out.push_str(&format!(
            "- Severity: **{}** ({})\n",
            finding.severity,
            finding.severity_source.as_str()
        ));
        out.push_str(&format!("- Confidence: {}\n", finding.confidence));
        out.push_str(&format!(
            "- Direct dependency: {}\n",
            if finding.direct { "yes" } else { "no" }
        ));
        out.push('\n');

        for vuln in &finding.vulnerabilities {
            let summary = vuln.summary.as_deref().unwrap_or("(no summary)");
            out.push_str(&format!(
                "- [{}]({}): {}\n",
                vuln.id,
                advisory_url(&vuln.id),
                summary
            ));
            if let Some(fixed) = &vuln.fixed_version {
                out.push_str(&format!("  - Fixed in: {}\n", fixed));
            }
            for reference in vuln.references.iter().take(MAX_REFERENCES) {
                out.push_str(&format!("  - Ref: {}\n", reference));
            }
        }

        if !finding.evidence.is_empty() {
            out.push_str(&format!("\nEvidence: {}\n", finding.evidence.join(", ")));
        }
        out.push('\n');
        out
    }
}

impl Default for MarkdownReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for MarkdownReporter {
    fn report(&self, report: &ScanReport) -> String {
        let mut out = self.format_header(report);
        if report.findings.is_empty() {
            out.push_str("No known vulnerabilities found.\n");
            return out;
        }
        for finding in &report.findings {
            out.push_str(&self.format_finding(finding));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{create_finding, create_test_report};
    use crate::types::{Severity, SeveritySource};

    #[test]
    fn test_markdown_empty_report() {
        let reporter = MarkdownReporter::new();
        let output = reporter.report(&create_test_report(vec![]));
        assert!(output.contains("# bardcheck report"));
        assert!(output.contains("No known vulnerabilities found."));
        assert!(output.contains("- Dependencies: 3"));
    }

    #[test]
    fn test_markdown_finding_section() {
        let reporter = MarkdownReporter::new();
        let mut finding = create_finding(
            "lodash",
            "4.17.21",
            Severity::Critical,
            SeveritySource::OsvCvss,
            &["GHSA-aaaa-bbbb-cccc"],
        );
        finding.evidence = vec!["src/app.ts".to_string()];
        finding.vulnerabilities[0].summary = Some("Prototype pollution".to_string());
        finding.vulnerabilities[0].fixed_version = Some("4.17.22".to_string());
        let output = reporter.report(&create_test_report(vec![finding]));

        assert!(output.contains("## lodash@4.17.21"));
        assert!(output.contains("**critical** (osv_cvss)"));
        assert!(output.contains(
            "[GHSA-aaaa-bbbb-cccc](https://github.com/advisories/GHSA-aaaa-bbbb-cccc): Prototype pollution"
        ));
        assert!(output.contains("Fixed in: 4.17.22"));
        assert!(output.contains("Evidence: src/app.ts"));
    }

    #[test]
    fn test_markdown_limits_references_to_three() {
        let reporter = MarkdownReporter::new();
        let mut finding = create_finding(
            "pkg",
            "1.0.0",
            Severity::High,
            SeveritySource::OsvCvss,
            &["CVE-2024-0001"],
        );
        finding.vulnerabilities[0].references = (0..5)
            .map(|i| format!("https://example.com/ref/{}", i))
            .collect();
        let output = reporter.report(&create_test_report(vec![finding]));

        assert!(output.contains("https://example.com/ref/2"));
        assert!(!output.contains("https://example.com/ref/3"));
    }

    #[test]
    fn test_markdown_cve_links_to_nvd() {
        let reporter = MarkdownReporter::new();
        let finding = create_finding(
            "pkg",
            "1.0.0",
            Severity::Medium,
            SeveritySource::AliasCvss,
            &["CVE-2024-0001"],
        );
        let output = reporter.report(&create_test_report(vec![finding]));
        assert!(output.contains("https://nvd.nist.gov/vuln/detail/CVE-2024-0001"));
    }
}
