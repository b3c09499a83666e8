#[cfg(test)]
pub mod fixtures {
    use crate::types::{
        Confidence, FailOn, Finding, LookupSource, ScanReport, Severity, SeveritySource, Summary,
        UnknownReason, Vulnerability,
    };

    pub fn create_test_report(findings: Vec<Finding>) -> ScanReport {
        let summary = Summary::compute(3, 2, &findings);
        ScanReport {
            target_path: "./test-project".to_string(),
            generated_at: "2026-01-25T12:00:00Z".to_string(),
            fail_on: FailOn::High,
            summary,
            findings,
        }
    }

    pub fn create_finding(
        package_name: &str,
        version: &str,
        severity: Severity,
        severity_source: SeveritySource,
        advisory_ids: &[&str],
    ) -> Finding {
        Finding {
            package_name: package_name.to_string(),
            version: version.to_string(),
            direct: true,
            severity,
            severity_source,
            unknown_reason: None,
            confidence: Confidence::Medium,
            evidence: vec![],
            vulnerabilities: advisory_ids
                .iter()
                .map(|id| Vulnerability {
                    id: id.to_string(),
                    summary: None,
                    aliases: vec![],
                    severity,
                    severity_source,
                    unknown_reason: None,
                    modified: None,
                    references: vec![],
                    fixed_version: None,
                })
                .collect(),
            source: LookupSource::Osv,
        }
    }

    pub fn create_unknown_finding(package_name: &str, version: &str) -> Finding {
        Finding {
            package_name: package_name.to_string(),
            version: version.to_string(),
            direct: true,
            severity: Severity::Unknown,
            severity_source: SeveritySource::Unknown,
            unknown_reason: Some(UnknownReason::LookupFailed),
            confidence: Confidence::Unknown,
            evidence: vec![],
            vulnerabilities: vec![],
            source: LookupSource::Unknown,
        }
    }
}
