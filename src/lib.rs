// BIM ↔ Budget Reconciliation - Core Library
// Links model elements to budget items and reports discrepancies.
//
// Pipeline: match_records(models, budget) → MatchResult → compare(result) → ComparisonResult

pub mod error;
pub mod records;     // Record Model - ModelElement / BudgetItem
pub mod attributes;  // Attribute Registry - synonym keys per logical attribute
pub mod similarity;  // Text Similarity - pure scoring functions
pub mod filters;     // Ignore Filter - non-comparable model elements
pub mod config;      // Matcher / comparator settings and phases
pub mod matcher;     // Linker - four-strategy cascade
pub mod comparator;  // Differ - tolerant attribute comparison
pub mod summary;     // Result Aggregator
pub mod export;      // Run report + findings CSV

// Re-export commonly used types
pub use error::{ReconError, ReconResult};
pub use records::{
    BudgetItem, ModelElement, PropertyMap, QuantityMap,
    load_budget_items, load_model_elements,
};
pub use attributes::{
    AttributeDefinition, AttributeRegistry, AttributeSet, ValueSource,
};
pub use similarity::{
    description_similarity, jaccard, name_similarity, normalize_text, tokenize,
};
pub use filters::IgnoreFilter;
pub use config::{ComparatorConfig, MatcherConfig, Phase, ReconConfig};
pub use matcher::{
    match_records, MatchMethod, MatchResult, MatchStatus, MatchSummary, MatchedPair, Matcher,
    PairSides,
};
pub use comparator::{
    compare, within_tolerance, Comparator, Finding, FindingKind, Severity,
};
pub use summary::{ComparisonResult, ComparisonSummary};
pub use export::{write_findings_csv, RunReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
