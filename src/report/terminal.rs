//! Terminal summary printer: severity and confidence histograms, threshold
//! verdicts, and an optional findings listing.

use crate::cli::ListFilter;
use crate::report::Reporter;
use crate::types::{ScanReport, Severity};
use colored::Colorize;

pub struct TerminalReporter {
    list_findings: ListFilter,
    threshold_hit: bool,
    unknown_hit: bool,
}

impl TerminalReporter {
    pub fn new(list_findings: ListFilter, threshold_hit: bool, unknown_hit: bool) -> Self {
        Self {
            list_findings,
            threshold_hit,
            unknown_hit,
        }
    }

    fn severity_label(&self, severity: Severity) -> colored::ColoredString {
        let label = format!("[{}]", severity.as_str().to_uppercase());
        match severity {
            Severity::Critical => label.red().bold(),
            Severity::High => label.yellow().bold(),
            Severity::Medium => label.cyan(),
            Severity::Low => label.white(),
            Severity::Unknown => label.dimmed(),
        }
    }

    fn yes_no(&self, hit: bool) -> colored::ColoredString {
        if hit {
            "yes".red().bold()
        } else {
            "no".green()
        }
    }
}

impl Reporter for TerminalReporter {
    fn report(&self, report: &ScanReport) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "{}\n",
            format!("bardcheck v{}", env!("CARGO_PKG_VERSION")).bold()
        ));
        out.push_str(&format!("Target: {}\n", report.target_path));
        out.push_str(&format!(
            "Dependencies: {}  Files scanned: {}  Findings: {}\n\n",
            report.summary.dependency_count,
            report.summary.scanned_files,
            report.summary.findings_count
        ));

        let listed: Vec<_> = report
            .findings
            .iter()
            .filter(|f| self.list_findings.includes(f.severity))
            .collect();
        for finding in &listed {
            out.push_str(&format!(
                "{} {}@{} confidence={} {}\n",
                self.severity_label(finding.severity),
                finding.package_name,
                finding.version,
                finding.confidence,
                format!("({})", finding.severity_source.as_str()).dimmed()
            ));
            for vuln in &finding.vulnerabilities {
                out.push_str(&format!("    {}\n", vuln.id.dimmed()));
            }
        }
        if !listed.is_empty() {
            out.push('\n');
        }

        let severities = &report.summary.by_severity;
        out.push_str(&format!(
            "Severity:   {} critical, {} high, {} medium, {} low, {} unknown\n",
            severities.critical.to_string().red().bold(),
            severities.high.to_string().yellow().bold(),
            severities.medium.to_string().cyan(),
            severities.low,
            severities.unknown
        ));
        let confidences = &report.summary.by_confidence;
        out.push_str(&format!(
            "Confidence: {} high, {} medium, {} low, {} unknown\n",
            confidences.high, confidences.medium, confidences.low, confidences.unknown
        ));
        out.push_str(&format!(
            "threshold hit: {}\n",
            self.yes_no(self.threshold_hit)
        ));
        out.push_str(&format!("unknown hit: {}\n", self.yes_no(self.unknown_hit)));

        out
    }
}
