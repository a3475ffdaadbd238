// 📤 Export - Run report envelope and findings CSV
// Plain data for the reporting side; no styling here.

use crate::comparator::Finding;
use crate::config::ReconConfig;
use crate::matcher::{MatchResult, MatchSummary};
use crate::records::{value_as_text, BudgetItem, ModelElement};
use crate::summary::{ComparisonResult, ComparisonSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

// ============================================================================
// RUN REPORT
// ============================================================================

/// Everything one run produced, with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Unique id for this run
    pub run_id: String,

    pub generated_at: DateTime<Utc>,

    /// Crate version that produced the report
    pub version: String,

    /// SHA-256 over both serialized input collections
    pub input_fingerprint: String,

    /// Settings the run used
    pub config: ReconConfig,

    pub matching: MatchSummary,
    pub comparison: ComparisonSummary,

    /// Findings in pair order
    pub findings: Vec<Finding>,
}

impl RunReport {
    pub fn new(
        models: &[ModelElement],
        budget: &[BudgetItem],
        config: &ReconConfig,
        match_result: &MatchResult,
        comparison: &ComparisonResult,
    ) -> Result<Self> {
        Ok(RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            version: crate::VERSION.to_string(),
            input_fingerprint: input_fingerprint(models, budget)?,
            config: config.clone(),
            matching: match_result.summary(),
            comparison: comparison.summary(),
            findings: comparison.findings().to_vec(),
        })
    }

    /// Write as pretty JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write report: {:?}", path.as_ref()))?;
        Ok(())
    }
}

/// Hex SHA-256 of the model and budget collections, in input order.
pub fn input_fingerprint(models: &[ModelElement], budget: &[BudgetItem]) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(models).context("Failed to serialize model elements")?);
    hasher.update(b"\n");
    hasher.update(serde_json::to_vec(budget).context("Failed to serialize budget items")?);
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// FINDINGS CSV
// ============================================================================

const CSV_HEADER: [&str; 8] = [
    "kind",
    "severity",
    "code",
    "name",
    "attribute",
    "model_value",
    "budget_value",
    "message",
];

/// One row per finding, in order.
pub fn write_findings_csv<P: AsRef<Path>>(findings: &[Finding], path: P) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Failed to create CSV file: {:?}", path.as_ref()))?;

    writer
        .write_record(CSV_HEADER)
        .context("Failed to write CSV header")?;

    for finding in findings {
        writer
            .write_record([
                finding.kind.as_str(),
                finding.severity.as_str(),
                finding.subject_code.as_deref().unwrap_or(""),
                finding.subject_name.as_str(),
                finding.attribute_name.as_deref().unwrap_or(""),
                value_as_text(&finding.model_value).as_str(),
                value_as_text(&finding.budget_value).as_str(),
                finding.message.as_str(),
            ])
            .context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(findings.len())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::Comparator;
    use crate::matcher::Matcher;

    fn fixture() -> (Vec<ModelElement>, Vec<BudgetItem>) {
        let models = vec![
            ModelElement::new("G1", "Pilar 600x600")
                .with_tag("C01")
                .with_property("Height", 0.6),
            ModelElement::new("G2", "Orphan"),
        ];
        let budget = vec![BudgetItem::new("C01", "Pilar, hormigón").with_property("Altura", 0.8)];
        (models, budget)
    }

    #[test]
    fn test_fingerprint_is_stable_and_input_sensitive() {
        let (models, budget) = fixture();

        let a = input_fingerprint(&models, &budget).unwrap();
        let b = input_fingerprint(&models, &budget).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let c = input_fingerprint(&models[..1], &budget).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_run_report_json() {
        let (models, budget) = fixture();
        let config = ReconConfig::default();
        let matched = Matcher::default().match_records(&models, &budget).unwrap();
        let comparison = Comparator::new(config.comparator.clone())
            .unwrap()
            .compare(&matched)
            .unwrap();

        let report = RunReport::new(&models, &budget, &config, &matched, &comparison).unwrap();
        assert_eq!(report.matching.matched, 1);
        assert_eq!(report.comparison.errors, 1);
        assert_eq!(report.findings.len(), 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();

        let loaded: RunReport = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.run_id, report.run_id);
        assert_eq!(loaded.input_fingerprint, report.input_fingerprint);
        assert_eq!(loaded.findings, report.findings);
    }

    #[test]
    fn test_findings_csv() {
        let (models, budget) = fixture();
        let matched = Matcher::default().match_records(&models, &budget).unwrap();
        let comparison = Comparator::new(Default::default())
            .unwrap()
            .compare(&matched)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("findings.csv");
        let rows = write_findings_csv(comparison.findings(), &path).unwrap();
        assert_eq!(rows, 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("kind"));

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(0), Some("PROPERTY_MISMATCH"));
        assert_eq!(records[0].get(2), Some("C01"));
        // Comma in the description survives quoting
        assert_eq!(records[0].get(3), Some("Pilar, hormigón"));
        assert_eq!(records[1].get(0), Some("MISSING_IN_BUDGET"));
        assert_eq!(records[1].get(2), Some("G2"));
    }
}
