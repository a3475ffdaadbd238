// ⚖️ Comparator - Diff matched pairs under tolerance
// Emits classified findings; absent data is skipped, never an error.
//
// Per matched pair, in order:
//   1. Code check (fuzzy matches whose identifiers differ)
//   2. Unit check
//   3. Instance-count check (countable units only)
//   4. Type name check
//   5. Attribute set
//   6. Shared properties (same key on both sides)
//
// Unmatched pairs yield exactly one MISSING_IN_* finding each.

use crate::attributes::{AttributeDefinition, AttributeSet, PairAttributes, ValueSource};
use crate::config::ComparatorConfig;
use crate::error::ReconResult;
use crate::matcher::{MatchResult, MatchedPair, PairSides};
use crate::records::{is_present, value_as_number, value_as_text, BudgetItem, ModelElement};
use crate::similarity::normalize_for_comparison;
use crate::summary::ComparisonResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

/// Floor for the relative-difference denominator
const EPSILON: f64 = 1e-9;

/// Relative rounding allowance on the tolerance; zero tolerance stays exact
const RATIO_SLACK: f64 = 4.0 * f64::EPSILON;

/// Units that count instances
pub const COUNTABLE_UNITS: &[&str] = &["u", "ud", "un", "pza", "ut", "unidad", "unidades"];

// ============================================================================
// FINDING KIND / SEVERITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    PropertyMismatch,
    QuantityMismatch,
    CodeMismatch,
    UnitMismatch,
    MissingInBudget,
    MissingInModel,
    TypeMismatch,
}

impl FindingKind {
    pub fn all() -> [FindingKind; 7] {
        [
            FindingKind::PropertyMismatch,
            FindingKind::QuantityMismatch,
            FindingKind::CodeMismatch,
            FindingKind::UnitMismatch,
            FindingKind::MissingInBudget,
            FindingKind::MissingInModel,
            FindingKind::TypeMismatch,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::PropertyMismatch => "PROPERTY_MISMATCH",
            FindingKind::QuantityMismatch => "QUANTITY_MISMATCH",
            FindingKind::CodeMismatch => "CODE_MISMATCH",
            FindingKind::UnitMismatch => "UNIT_MISMATCH",
            FindingKind::MissingInBudget => "MISSING_IN_BUDGET",
            FindingKind::MissingInModel => "MISSING_IN_MODEL",
            FindingKind::TypeMismatch => "TYPE_MISMATCH",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// FINDING
// ============================================================================

/// One detected discrepancy. Created once by the comparator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,

    /// Budget code, model tag or global id of the subject
    pub subject_code: Option<String>,

    pub subject_name: String,

    /// Attribute compared (None for pair-level findings)
    pub attribute_name: Option<String>,

    pub model_value: Value,
    pub budget_value: Value,

    /// Short English sentence
    pub message: String,
}

impl Finding {
    fn for_pair(kind: FindingKind, severity: Severity, pair: &MatchedPair) -> Self {
        Finding {
            kind,
            severity,
            subject_code: pair.code().map(str::to_string),
            subject_name: pair.name().to_string(),
            attribute_name: None,
            model_value: Value::Null,
            budget_value: Value::Null,
            message: String::new(),
        }
    }

    fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute_name = Some(name.into());
        self
    }

    fn with_values(mut self, model_value: Value, budget_value: Value) -> Self {
        self.model_value = model_value;
        self.budget_value = budget_value;
        self
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.subject_code.as_deref().unwrap_or("?");
        match &self.attribute_name {
            Some(attr) => write!(
                f,
                "[{}] {}: {} - model: {}, budget: {}",
                self.severity,
                code,
                attr,
                value_as_text(&self.model_value),
                value_as_text(&self.budget_value)
            ),
            None => write!(f, "[{}] {}: {}", self.severity, code, self.message),
        }
    }
}

// ============================================================================
// NUMERIC / UNIT HELPERS
// ============================================================================

/// Relative tolerance test: |a - b| / max(|a|, |b|, ε) <= tolerance.
///
/// Two zeros are always equal; signs are not normalized away.
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    let diff = (a - b).abs();
    if diff == 0.0 {
        return true;
    }

    let scale = a.abs().max(b.abs()).max(EPSILON);
    diff / scale <= tolerance * (1.0 + RATIO_SLACK)
}

/// Canonical unit: lowercased, `m²` → `m2`, `m³` → `m3`, countables → `u`.
pub fn canonical_unit(unit: &str) -> String {
    let normalized = normalize_for_comparison(unit)
        .replace('²', "2")
        .replace('³', "3")
        .trim_end_matches('.')
        .to_string();

    if is_countable_unit(&normalized) {
        "u".to_string()
    } else {
        normalized
    }
}

pub fn is_countable_unit(unit: &str) -> bool {
    let normalized = normalize_for_comparison(unit);
    COUNTABLE_UNITS.contains(&normalized.trim_end_matches('.'))
}

/// Outcome of comparing one attribute on a pair
enum Verdict {
    /// Not comparable under the current settings
    Skipped,
    Equal,
    Differs(FindingKind),
}

// ============================================================================
// COMPARATOR
// ============================================================================

pub struct Comparator {
    config: ComparatorConfig,
    attributes: AttributeSet,
    pair_attributes: PairAttributes,
}

impl Comparator {
    /// Create a comparator; tolerance and attribute-set name are validated here.
    pub fn new(config: ComparatorConfig) -> ReconResult<Self> {
        config.validate()?;
        let attributes = AttributeSet::by_name(&config.attribute_set)?;

        Ok(Comparator {
            config,
            attributes,
            pair_attributes: PairAttributes::new(),
        })
    }

    /// Builder: compare a caller-defined attribute set instead of a preset
    pub fn with_attribute_set(mut self, attributes: AttributeSet) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    pub fn attribute_set(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Compare every pair, in pair order.
    ///
    /// Fails only on a malformed pair.
    pub fn compare(&self, result: &MatchResult) -> ReconResult<ComparisonResult> {
        let mut findings = Vec::new();
        let mut total_matched = 0;
        let mut total_with_conflicts = 0;
        let mut properties_compared = 0;

        for pair in result.pairs() {
            let before = findings.len();

            match pair.sides()? {
                PairSides::Matched(model, budget) => {
                    total_matched += 1;
                    properties_compared += self.compare_pair(pair, model, budget, &mut findings);
                }
                PairSides::ModelOnly(_) => {
                    findings.push(
                        Finding::for_pair(FindingKind::MissingInBudget, Severity::Warning, pair)
                            .with_message("Element exists in the model but not in the budget"),
                    );
                }
                PairSides::BudgetOnly(_) => {
                    findings.push(
                        Finding::for_pair(FindingKind::MissingInModel, Severity::Warning, pair)
                            .with_message("Item exists in the budget but not in the model"),
                    );
                }
            }

            if findings.len() > before {
                total_with_conflicts += 1;
            }
        }

        let comparison = ComparisonResult::new(
            findings,
            total_matched,
            total_with_conflicts,
            properties_compared,
        );
        info!(
            "Comparison complete: {} findings ({} errors, {} warnings) over {} matched pairs",
            comparison.findings().len(),
            comparison.errors(),
            comparison.warnings(),
            total_matched
        );
        Ok(comparison)
    }

    /// Run all checks on one matched pair; returns the attributes compared.
    fn compare_pair(
        &self,
        pair: &MatchedPair,
        model: &ModelElement,
        budget: &BudgetItem,
        findings: &mut Vec<Finding>,
    ) -> usize {
        let start = findings.len();

        if self.config.check_codes {
            self.check_code(pair, model, budget, findings);
        }
        if self.config.check_units {
            self.check_unit(pair, model, budget, findings);
        }
        if self.config.check_counts {
            self.check_count(pair, model, budget, findings);
        }
        if self.config.compare_names {
            self.check_type_name(pair, model, budget, findings);
        }

        let mut compared = 0;
        if self.config.check_properties {
            compared += self.check_attributes(pair, model, budget, findings);
            if self.config.compare_shared_properties {
                compared += self.check_shared_properties(pair, model, budget, findings);
            }
        }

        if findings.len() > start {
            debug!(
                "{}: {} findings ({} matched by {})",
                pair.code().unwrap_or("?"),
                findings.len() - start,
                pair.name(),
                pair.method()
            );
        }
        compared
    }

    // ------------------------------------------------------------------------
    // Pair-level checks
    // ------------------------------------------------------------------------

    fn check_code(
        &self,
        pair: &MatchedPair,
        model: &ModelElement,
        budget: &BudgetItem,
        findings: &mut Vec<Finding>,
    ) {
        if pair.method().is_exact_identifier() {
            return;
        }

        let model_code = model.tag();
        let budget_code = budget.code();
        if model_code.is_some() && model_code == budget_code {
            return;
        }

        findings.push(
            Finding::for_pair(FindingKind::CodeMismatch, self.config.code_mismatch_severity, pair)
                .with_attribute("code")
                .with_values(optional_text(model_code), optional_text(budget_code))
                .with_message(format!(
                    "Identifiers differ: model uses '{}', budget uses '{}'",
                    model_code.unwrap_or("?"),
                    budget_code.unwrap_or("?")
                )),
        );
    }

    fn check_unit(
        &self,
        pair: &MatchedPair,
        model: &ModelElement,
        budget: &BudgetItem,
        findings: &mut Vec<Finding>,
    ) {
        let Some(model_unit) = self.model_unit(model) else {
            return;
        };
        let Some(budget_unit) = self.budget_unit(budget) else {
            return;
        };

        if canonical_unit(&model_unit) == canonical_unit(&budget_unit) {
            return;
        }

        findings.push(
            Finding::for_pair(FindingKind::UnitMismatch, Severity::Warning, pair)
                .with_attribute("unit")
                .with_message(format!(
                    "Units differ: model={}, budget={}",
                    model_unit, budget_unit
                ))
                .with_values(Value::from(model_unit), Value::from(budget_unit)),
        );
    }

    /// Instance count vs. budgeted quantity, for countable budget units only.
    fn check_count(
        &self,
        pair: &MatchedPair,
        model: &ModelElement,
        budget: &BudgetItem,
        findings: &mut Vec<Finding>,
    ) {
        let Some(unit) = self.budget_unit(budget) else {
            return;
        };
        if !is_countable_unit(&unit) {
            return;
        }

        let attr = &self.pair_attributes.count;
        let model_count = attr
            .resolve_model(model)
            .and_then(|r| value_as_number(&r.value));
        let budget_count = attr
            .resolve_budget(budget)
            .and_then(|r| value_as_number(&r.value));

        let (Some(model_count), Some(budget_count)) = (model_count, budget_count) else {
            return;
        };
        if model_count <= 0.0 || budget_count <= 0.0 {
            return;
        }

        // Counts are compared absolutely: one missing instance is always a finding
        if (model_count - budget_count).abs() <= self.config.tolerance {
            return;
        }

        findings.push(
            Finding::for_pair(FindingKind::QuantityMismatch, Severity::Error, pair)
                .with_attribute(attr.display_name.clone())
                .with_values(Value::from(model_count), Value::from(budget_count))
                .with_message(format!(
                    "Quantity differs: budget={} {}, model={} instances",
                    budget_count, unit, model_count
                )),
        );
    }

    fn check_type_name(
        &self,
        pair: &MatchedPair,
        model: &ModelElement,
        budget: &BudgetItem,
        findings: &mut Vec<Finding>,
    ) {
        let model_type = model.type_name.trim();
        if model_type.is_empty() {
            return;
        }
        let Some(resolved) = self.pair_attributes.type_name.resolve_budget(budget) else {
            return;
        };
        let budget_type = value_as_text(&resolved.value);

        if normalize_for_comparison(model_type) == normalize_for_comparison(&budget_type) {
            return;
        }

        findings.push(
            Finding::for_pair(FindingKind::TypeMismatch, Severity::Warning, pair)
                .with_attribute(self.pair_attributes.type_name.display_name.clone())
                .with_values(Value::from(model_type), resolved.value)
                .with_message("Type name differs"),
        );
    }

    // ------------------------------------------------------------------------
    // Attribute checks
    // ------------------------------------------------------------------------

    fn check_attributes(
        &self,
        pair: &MatchedPair,
        model: &ModelElement,
        budget: &BudgetItem,
        findings: &mut Vec<Finding>,
    ) -> usize {
        let mut compared = 0;

        for attr in self.attributes.iter() {
            // Exactly one side present is a presence issue, not a mismatch
            let (Some(m), Some(b)) = (attr.resolve_model(model), attr.resolve_budget(budget)) else {
                continue;
            };

            match self.verdict(&m.value, &b.value, m.source) {
                Verdict::Skipped => {}
                Verdict::Equal => compared += 1,
                Verdict::Differs(kind) => {
                    compared += 1;
                    findings.push(self.mismatch(pair, attr, kind, m.value, b.value));
                }
            }
        }

        compared
    }

    /// Budget properties whose exact key also exists on the model.
    fn check_shared_properties(
        &self,
        pair: &MatchedPair,
        model: &ModelElement,
        budget: &BudgetItem,
        findings: &mut Vec<Finding>,
    ) -> usize {
        let mut compared = 0;

        for (key, budget_value) in &budget.properties {
            if !is_present(budget_value)
                || self.attributes.covers_budget_key(key)
                || self.pair_attributes.covers_budget_key(key)
            {
                continue;
            }
            let Some(model_value) = model.properties.get(key).filter(|v| is_present(v)) else {
                continue;
            };

            match self.verdict(model_value, budget_value, ValueSource::Property) {
                Verdict::Skipped => {}
                Verdict::Equal => compared += 1,
                Verdict::Differs(kind) => {
                    compared += 1;
                    let attr = AttributeDefinition::new(key.as_str(), key.as_str());
                    findings.push(self.mismatch(
                        pair,
                        &attr,
                        kind,
                        model_value.clone(),
                        budget_value.clone(),
                    ));
                }
            }
        }

        compared
    }

    /// Numbers under relative tolerance; text (when enabled) after normalization.
    fn verdict(&self, model_value: &Value, budget_value: &Value, source: ValueSource) -> Verdict {
        match (value_as_number(model_value), value_as_number(budget_value)) {
            (Some(a), Some(b)) => {
                if within_tolerance(a, b, self.config.tolerance) {
                    Verdict::Equal
                } else if source == ValueSource::Quantity {
                    Verdict::Differs(FindingKind::QuantityMismatch)
                } else {
                    Verdict::Differs(FindingKind::PropertyMismatch)
                }
            }
            _ if !self.config.compare_names => Verdict::Skipped,
            _ => {
                let a = normalize_for_comparison(&value_as_text(model_value));
                let b = normalize_for_comparison(&value_as_text(budget_value));
                if a == b {
                    Verdict::Equal
                } else {
                    Verdict::Differs(FindingKind::PropertyMismatch)
                }
            }
        }
    }

    fn mismatch(
        &self,
        pair: &MatchedPair,
        attr: &AttributeDefinition,
        kind: FindingKind,
        model_value: Value,
        budget_value: Value,
    ) -> Finding {
        let message = format!(
            "'{}' differs: model={}, budget={}",
            attr.display_name,
            value_as_text(&model_value),
            value_as_text(&budget_value)
        );

        Finding::for_pair(kind, Severity::Error, pair)
            .with_attribute(attr.display_name.clone())
            .with_values(model_value, budget_value)
            .with_message(message)
    }

    fn model_unit(&self, model: &ModelElement) -> Option<String> {
        self.pair_attributes
            .unit
            .resolve_model(model)
            .map(|r| value_as_text(&r.value))
            .filter(|u| !u.trim().is_empty())
    }

    /// BudgetItem.unit, falling back to a unit property
    fn budget_unit(&self, budget: &BudgetItem) -> Option<String> {
        budget.unit().map(str::to_string).or_else(|| {
            self.pair_attributes
                .unit
                .resolve_budget(budget)
                .map(|r| value_as_text(&r.value))
                .filter(|u| !u.trim().is_empty())
        })
    }
}

/// One-shot entry point: validate `config`, then compare.
pub fn compare(result: &MatchResult, config: &ComparatorConfig) -> ReconResult<ComparisonResult> {
    Comparator::new(config.clone())?.compare(result)
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

// ============================================================================
// TESTS
// ============================================================================
