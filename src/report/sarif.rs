//! SARIF 2.1.0 reporter: one run, one rule per unique advisory id, one
//! result per (finding, vulnerability) pair.

use crate::advisory::advisory_url;
use crate::report::Reporter;
use crate::types::{ScanReport, Severity};
use serde::Serialize;
use std::collections::HashSet;

/// Synthetic rule id for findings with no matched advisory (unresolved
/// lookups).
const UNKNOWN_RULE_ID: &str = "BARDCHECK-UNKNOWN";

pub struct SarifReporter;

impl SarifReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SarifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for SarifReporter {
    fn report(&self, report: &ScanReport) -> String {
        let sarif = SarifReport::from_scan_report(report);
        serde_json::to_string_pretty(&sarif)
            .unwrap_or_else(|e| format!(r#"{{"error": "Failed to serialize SARIF: {}"}}"#, e))
    }
}

#[derive(Debug, Serialize)]
pub struct SarifReport {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub version: String,
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifDriver {
    pub name: String,
    pub version: String,
    pub information_uri: String,
    pub rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRule {
    pub id: String,
    pub short_description: SarifMessage,
    pub help_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
    pub rule_id: String,
    pub level: String,
    pub message: SarifMessage,
}

#[derive(Debug, Serialize)]
pub struct SarifMessage {
    pub text: String,
}

impl SarifReport {
    pub fn from_scan_report(report: &ScanReport) -> Self {
        let mut rules: Vec<SarifRule> = Vec::new();
        let mut seen_rule_ids: HashSet<&str> = HashSet::new();
        let mut results: Vec<SarifResult> = Vec::new();

        for finding in &report.findings {
            if finding.vulnerabilities.is_empty() {
                if seen_rule_ids.insert(UNKNOWN_RULE_ID) {
                    rules.push(SarifRule {
                        id: UNKNOWN_RULE_ID.to_string(),
                        short_description: SarifMessage {
                            text: "Advisory lookup did not resolve".to_string(),
                        },
                        help_uri: "https://osv.dev".to_string(),
                    });
                }
                results.push(SarifResult {
                    rule_id: UNKNOWN_RULE_ID.to_string(),
                    level: severity_to_level(finding.severity).to_string(),
                    message: SarifMessage {
                        text: format!(
                            "{}@{}: advisory lookup did not resolve",
                            finding.package_name, finding.version
                        ),
                    },
                });
                continue;
            }

            for vuln in &finding.vulnerabilities {
                if seen_rule_ids.insert(&vuln.id) {
                    rules.push(SarifRule {
                        id: vuln.id.clone(),
                        short_description: SarifMessage {
                            text: vuln
                                .summary
                                .clone()
                                .unwrap_or_else(|| vuln.id.clone()),
                        },
                        help_uri: advisory_url(&vuln.id),
                    });
                }
                results.push(SarifResult {
                    rule_id: vuln.id.clone(),
                    level: severity_to_level(finding.severity).to_string(),
                    message: SarifMessage {
                        text: format!(
                            "{}@{} is affected by {} (severity: {})",
                            finding.package_name, finding.version, vuln.id, finding.severity
                        ),
                    },
                });
            }
        }

        SarifReport {
            schema: "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json".to_string(),
            version: "2.1.0".to_string(),
            runs: vec![SarifRun {
                tool: SarifTool {
                    driver: SarifDriver {
                        name: "bardcheck".to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                        information_uri: "https://github.com/bardcheck/bardcheck".to_string(),
                        rules,
                    },
                },
                results,
            }],
        }
    }
}

fn severity_to_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium | Severity::Low => "warning",
        Severity::Unknown => "note",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{create_finding, create_test_report, create_unknown_finding};
    use crate::types::SeveritySource;

    #[test]
    fn test_sarif_empty_report() {
        let reporter = SarifReporter::new();
        let output = reporter.report(&create_test_report(vec![]));

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["version"], "2.1.0");
        assert_eq!(parsed["runs"][0]["tool"]["driver"]["name"], "bardcheck");
        assert!(parsed["runs"][0]["results"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_sarif_one_result_per_finding_vulnerability_pair() {
        let reporter = SarifReporter::new();
        let finding = create_finding(
            "lodash",
            "4.17.21",
            Severity::Critical,
            SeveritySource::OsvCvss,
            &["GHSA-aaaa-bbbb-cccc", "CVE-2024-0001"],
        );
        let output = reporter.report(&create_test_report(vec![finding]));

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let results = parsed["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["ruleId"], "GHSA-aaaa-bbbb-cccc");
        assert_eq!(results[0]["level"], "error");
        assert_eq!(results[1]["ruleId"], "CVE-2024-0001");
    }

    #[test]
    fn test_sarif_rules_deduplicated_across_findings() {
        let reporter = SarifReporter::new();
        let a = create_finding(
            "pkg-a",
            "1.0.0",
            Severity::High,
            SeveritySource::OsvCvss,
            &["GHSA-same-same-same"],
        );
        let b = create_finding(
            "pkg-b",
            "2.0.0",
            Severity::High,
            SeveritySource::OsvCvss,
            &["GHSA-same-same-same"],
        );
        let output = reporter.report(&create_test_report(vec![a, b]));

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let rules = parsed["runs"][0]["tool"]["driver"]["rules"]
            .as_array()
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0]["helpUri"],
            "https://github.com/advisories/GHSA-same-same-same"
        );
        let results = parsed["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_sarif_severity_levels() {
        assert_eq!(severity_to_level(Severity::Critical), "error");
        assert_eq!(severity_to_level(Severity::High), "error");
        assert_eq!(severity_to_level(Severity::Medium), "warning");
        assert_eq!(severity_to_level(Severity::Low), "warning");
        assert_eq!(severity_to_level(Severity::Unknown), "note");
    }

    #[test]
    fn test_sarif_unknown_finding_uses_synthetic_rule() {
        let reporter = SarifReporter::new();
        let output = reporter.report(&create_test_report(vec![create_unknown_finding(
            "lost-pkg", "1.0.0",
        )]));

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let results = parsed["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["ruleId"], "BARDCHECK-UNKNOWN");
        assert_eq!(results[0]["level"], "note");
    }
}
