// 📊 Result Aggregator - Findings plus exact counters
// Every counter is derived by filtering the finding list, so they cannot drift.

use crate::comparator::{Finding, FindingKind, Severity};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// COMPARISON RESULT
// ============================================================================

/// Output of one comparison run. Read-only once built.
///
/// Serializes as the finding list flattened together with its `summary()` counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    findings: Vec<Finding>,

    /// Pairs with status MATCHED
    total_matched: usize,

    /// Pairs (matched or not) with at least one finding
    total_with_conflicts: usize,

    /// Attribute comparisons actually performed
    total_properties_compared: usize,
}

impl ComparisonResult {
    pub fn new(
        findings: Vec<Finding>,
        total_matched: usize,
        total_with_conflicts: usize,
        total_properties_compared: usize,
    ) -> Self {
        ComparisonResult {
            findings,
            total_matched,
            total_with_conflicts,
            total_properties_compared,
        }
    }

    /// Findings in pair order
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn total_matched(&self) -> usize {
        self.total_matched
    }

    pub fn total_with_conflicts(&self) -> usize {
        self.total_with_conflicts
    }

    pub fn total_properties_compared(&self) -> usize {
        self.total_properties_compared
    }

    // ------------------------------------------------------------------------
    // Counters by kind
    // ------------------------------------------------------------------------

    pub fn missing_in_budget(&self) -> usize {
        self.count_kind(FindingKind::MissingInBudget)
    }

    pub fn missing_in_model(&self) -> usize {
        self.count_kind(FindingKind::MissingInModel)
    }

    pub fn property_mismatches(&self) -> usize {
        self.count_kind(FindingKind::PropertyMismatch)
    }

    pub fn quantity_mismatches(&self) -> usize {
        self.count_kind(FindingKind::QuantityMismatch)
    }

    pub fn code_mismatches(&self) -> usize {
        self.count_kind(FindingKind::CodeMismatch)
    }

    pub fn unit_mismatches(&self) -> usize {
        self.count_kind(FindingKind::UnitMismatch)
    }

    pub fn type_mismatches(&self) -> usize {
        self.count_kind(FindingKind::TypeMismatch)
    }

    // ------------------------------------------------------------------------
    // Counters by severity
    // ------------------------------------------------------------------------

    pub fn errors(&self) -> usize {
        self.count_severity(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count_severity(Severity::Warning)
    }

    pub fn infos(&self) -> usize {
        self.count_severity(Severity::Info)
    }

    pub fn has_errors(&self) -> bool {
        self.errors() > 0
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn by_kind(&self, kind: FindingKind) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.kind == kind).collect()
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.severity == severity).collect()
    }

    /// Findings whose subject code equals `code`
    pub fn for_code(&self, code: &str) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.subject_code.as_deref() == Some(code))
            .collect()
    }

    pub fn summary(&self) -> ComparisonSummary {
        let mut by_kind = BTreeMap::new();
        for finding in &self.findings {
            *by_kind.entry(finding.kind).or_insert(0) += 1;
        }

        ComparisonSummary {
            total_findings: self.findings.len(),
            total_matched: self.total_matched,
            total_with_conflicts: self.total_with_conflicts,
            total_properties_compared: self.total_properties_compared,
            missing_in_budget: self.missing_in_budget(),
            missing_in_model: self.missing_in_model(),
            property_mismatches: self.property_mismatches(),
            quantity_mismatches: self.quantity_mismatches(),
            code_mismatches: self.code_mismatches(),
            unit_mismatches: self.unit_mismatches(),
            type_mismatches: self.type_mismatches(),
            errors: self.errors(),
            warnings: self.warnings(),
            infos: self.infos(),
            by_kind,
        }
    }

    fn count_kind(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }

    fn count_severity(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}

impl Serialize for ComparisonResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Shape<'r> {
            findings: &'r [Finding],
            #[serde(flatten)]
            summary: ComparisonSummary,
        }

        Shape {
            findings: &self.findings,
            summary: self.summary(),
        }
        .serialize(serializer)
    }
}

// ============================================================================
// COMPARISON SUMMARY
// ============================================================================

/// Owned counter snapshot for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub total_findings: usize,
    pub total_matched: usize,
    pub total_with_conflicts: usize,
    pub total_properties_compared: usize,
    pub missing_in_budget: usize,
    pub missing_in_model: usize,
    pub property_mismatches: usize,
    pub quantity_mismatches: usize,
    pub code_mismatches: usize,
    pub unit_mismatches: usize,
    pub type_mismatches: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub by_kind: BTreeMap<FindingKind, usize>,
}

impl fmt::Display for ComparisonSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} findings: {} errors, {} warnings, {} info ({} of {} matched pairs compared cleanly)",
            self.total_findings,
            self.errors,
            self.warnings,
            self.infos,
            self.total_matched.saturating_sub(self.conflicting_matched()),
            self.total_matched
        )
    }
}

impl ComparisonSummary {
    /// Matched pairs with at least one finding (each unmatched pair has exactly one).
    fn conflicting_matched(&self) -> usize {
        self.total_with_conflicts
            .saturating_sub(self.missing_in_budget + self.missing_in_model)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn finding(kind: FindingKind, severity: Severity, code: &str) -> Finding {
        Finding {
            kind,
            severity,
            subject_code: Some(code.to_string()),
            subject_name: format!("Element {}", code),
            attribute_name: None,
            model_value: Value::Null,
            budget_value: Value::Null,
            message: String::new(),
        }
    }

    fn sample() -> ComparisonResult {
        ComparisonResult::new(
            vec![
                finding(FindingKind::PropertyMismatch, Severity::Error, "C01"),
                finding(FindingKind::UnitMismatch, Severity::Warning, "C01"),
                finding(FindingKind::CodeMismatch, Severity::Error, "C02"),
                finding(FindingKind::MissingInBudget, Severity::Warning, "G9"),
                finding(FindingKind::MissingInModel, Severity::Warning, "X1"),
            ],
            3,
            4,
            7,
        )
    }

    #[test]
    fn test_counters_match_filters() {
        let result = sample();

        assert_eq!(result.errors(), 2);
        assert_eq!(result.warnings(), 3);
        assert_eq!(result.infos(), 0);
        assert_eq!(result.property_mismatches(), 1);
        assert_eq!(result.code_mismatches(), 1);
        assert_eq!(result.unit_mismatches(), 1);
        assert_eq!(result.missing_in_budget(), 1);
        assert_eq!(result.missing_in_model(), 1);
        assert_eq!(result.quantity_mismatches(), 0);
        assert!(result.has_errors());

        assert_eq!(
            result.errors(),
            result.findings().iter().filter(|f| f.severity == Severity::Error).count()
        );
    }

    #[test]
    fn test_queries() {
        let result = sample();

        assert_eq!(result.for_code("C01").len(), 2);
        assert_eq!(result.for_code("nope").len(), 0);
        assert_eq!(result.by_kind(FindingKind::CodeMismatch).len(), 1);
        assert_eq!(result.by_severity(Severity::Warning).len(), 3);
    }

    #[test]
    fn test_summary() {
        let summary = sample().summary();

        assert_eq!(summary.total_findings, 5);
        assert_eq!(summary.total_matched, 3);
        assert_eq!(summary.total_properties_compared, 7);
        assert_eq!(summary.by_kind.get(&FindingKind::PropertyMismatch), Some(&1));
        assert_eq!(summary.by_kind.get(&FindingKind::TypeMismatch), None);

        // 4 conflicting pairs, 2 of them unmatched → 1 of 3 matched pairs clean
        assert!(summary.to_string().contains("1 of 3 matched pairs"));
    }

    #[test]
    fn test_empty_result() {
        let result = ComparisonResult::new(Vec::new(), 0, 0, 0);
        assert_eq!(result.errors(), 0);
        assert!(!result.has_errors());
        assert!(result.summary().by_kind.is_empty());
    }

    #[test]
    fn test_serializes_findings_with_counters() {
        let result = sample();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["findings"][0]["kind"], "PROPERTY_MISMATCH");
        assert_eq!(json["findings"][0]["severity"], "ERROR");
        assert_eq!(json["findings"][0]["subjectCode"], "C01");
        assert_eq!(json["totalMatched"], 3);
        assert_eq!(json["totalFindings"], result.findings().len());
        assert_eq!(json["errors"], result.errors());
        assert_eq!(json["warnings"], result.warnings());
        assert_eq!(json["missingInBudget"], result.missing_in_budget());
        assert_eq!(json["byKind"]["PROPERTY_MISMATCH"], result.property_mismatches());
        assert!(json.get("total_matched").is_none());
    }
}
