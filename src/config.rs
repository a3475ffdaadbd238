// ⚙️ Configuration - Matcher and comparator settings
// Validated up front: a bad tolerance or attribute-set name fails before any matching.

use crate::attributes::AttributeSet;
use crate::comparator::Severity;
use crate::error::{ReconError, ReconResult};
use crate::filters::IgnoreFilter;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// MATCHER CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct MatcherConfig {
    /// Strategy 1: budget linkedGlobalId ↔ model globalId
    pub use_global_id: bool,

    /// Strategy 2: budget code ↔ model tag
    pub use_tag: bool,

    /// Strategy 3: normalized name ↔ description
    pub use_name: bool,

    /// Strategy 4: Jaccard word overlap
    pub use_description: bool,

    /// Minimum name similarity for strategy 3 (default: 0.7)
    pub min_confidence: f64,

    /// Minimum Jaccard similarity for strategy 4 (default: 0.5)
    pub description_floor: f64,

    /// Pre-filter for non-comparable model elements
    pub ignore: Option<IgnoreFilter>,
}

impl MatcherConfig {
    pub fn validate(&self) -> ReconResult<()> {
        check_unit_interval("min_confidence", self.min_confidence)?;
        check_unit_interval("description_floor", self.description_floor)?;
        Ok(())
    }

    /// Builder: drop the fuzzy strategies (identifier matches only)
    pub fn identifiers_only(mut self) -> Self {
        self.use_name = false;
        self.use_description = false;
        self
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            use_global_id: true,
            use_tag: true,
            use_name: true,
            use_description: true,
            min_confidence: 0.7,
            description_floor: 0.5,
            ignore: None,
        }
    }
}

// ============================================================================
// COMPARATOR CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct ComparatorConfig {
    /// Relative numeric tolerance (default: 0.01 = 1%)
    pub tolerance: f64,

    /// "spatial" or "full"
    pub attribute_set: String,

    /// Compare non-numeric attributes and type names (normalized text)
    pub compare_names: bool,

    /// Severity of CODE_MISMATCH findings
    pub code_mismatch_severity: Severity,

    /// Flag fuzzy matches whose identifiers differ
    pub check_codes: bool,

    pub check_units: bool,

    /// Model instance count vs. budgeted quantity for countable units
    pub check_counts: bool,

    /// Compare the attribute set at all
    pub check_properties: bool,

    /// Also compare budget properties whose key exists verbatim on the model
    pub compare_shared_properties: bool,
}

impl ComparatorConfig {
    pub fn validate(&self) -> ReconResult<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ReconError::InvalidTolerance(self.tolerance));
        }
        AttributeSet::by_name(&self.attribute_set)?;
        Ok(())
    }

    /// Preset for an analysis phase
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::QuickCheck => ComparatorConfig {
                tolerance: 0.1,
                attribute_set: "spatial".to_string(),
                compare_names: false,
                code_mismatch_severity: Severity::Error,
                check_codes: true,
                check_units: true,
                check_counts: true,
                check_properties: false,
                compare_shared_properties: false,
            },
            Phase::FullAnalysis => ComparatorConfig {
                tolerance: 0.01,
                attribute_set: "full".to_string(),
                compare_names: true,
                code_mismatch_severity: Severity::Error,
                check_codes: true,
                check_units: true,
                check_counts: true,
                check_properties: true,
                compare_shared_properties: true,
            },
        }
    }

    /// Builder: override tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder: select attribute set by name
    pub fn with_attribute_set(mut self, name: impl Into<String>) -> Self {
        self.attribute_set = name.into();
        self
    }
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self::for_phase(Phase::FullAnalysis)
    }
}

// ============================================================================
// ANALYSIS PHASE
// ============================================================================

/// Depth of analysis: quick (codes, units, counts) or full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    QuickCheck,
    FullAnalysis,
}

impl Phase {
    pub fn all() -> [Phase; 2] {
        [Phase::QuickCheck, Phase::FullAnalysis]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::QuickCheck => "quick",
            Phase::FullAnalysis => "full",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Phase::QuickCheck => "Codes, units and instance counts",
            Phase::FullAnalysis => "Every configured attribute, type names and shared properties",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Phase {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick" | "quick_check" => Ok(Phase::QuickCheck),
            "full" | "full_analysis" => Ok(Phase::FullAnalysis),
            _ => Err(ReconError::UnknownPhase(s.to_string())),
        }
    }
}

// ============================================================================
// RECON CONFIG (file surface)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct ReconConfig {
    pub matcher: MatcherConfig,
    pub comparator: ComparatorConfig,
}

impl ReconConfig {
    /// Load from a JSON file and validate
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: ReconConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub fn for_phase(phase: Phase) -> Self {
        ReconConfig {
            matcher: MatcherConfig::default(),
            comparator: ComparatorConfig::for_phase(phase),
        }
    }

    pub fn validate(&self) -> ReconResult<()> {
        self.matcher.validate()?;
        self.comparator.validate()
    }
}

fn check_unit_interval(name: &'static str, value: f64) -> ReconResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ReconError::InvalidThreshold { name, value })
    }
}

// ============================================================================
// TESTS
// ============================================================================
