// 🧱 Record Model - Model elements and budget items
// Fixed intermediate shapes produced by the upstream BIM and budget readers.
//
// The engines only ever borrow these records; nothing downstream mutates them.

use crate::error::{ReconError, ReconResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Arbitrary property bag (string key → JSON value).
///
/// Ordered so that anything iterating the bag is deterministic.
pub type PropertyMap = BTreeMap<String, Value>;

/// Numeric quantity bag (e.g. "NetVolume" → 0.36).
pub type QuantityMap = BTreeMap<String, f64>;

// ============================================================================
// MODEL ELEMENT (BIM side)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelElement {
    /// Stable unique id assigned by the authoring tool (blank when the export lacks one)
    #[serde(default)]
    pub global_id: String,

    /// Secondary short identifier, often the budget code
    #[serde(default)]
    pub tag: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub type_name: String,

    /// Schema class, e.g. IfcColumnType
    #[serde(default)]
    pub class_name: String,

    #[serde(default)]
    pub properties: PropertyMap,

    #[serde(default)]
    pub quantities: QuantityMap,
}

impl ModelElement {
    pub fn new(global_id: impl Into<String>, name: impl Into<String>) -> Self {
        ModelElement {
            global_id: global_id.into(),
            tag: None,
            name: name.into(),
            type_name: String::new(),
            class_name: String::new(),
            properties: PropertyMap::new(),
            quantities: QuantityMap::new(),
        }
    }

    /// Builder: set tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Builder: set type name
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Builder: set schema class
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    /// Builder: add a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Builder: add a quantity
    pub fn with_quantity(mut self, key: impl Into<String>, value: f64) -> Self {
        self.quantities.insert(key.into(), value);
        self
    }

    /// Global id, or None when blank.
    pub fn global_id(&self) -> Option<&str> {
        non_blank(&self.global_id)
    }

    /// Tag, or None when missing or blank.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().and_then(non_blank)
    }

    /// Name used in findings: element name, falling back to the type name.
    pub fn display_name(&self) -> &str {
        non_blank(&self.name)
            .or_else(|| non_blank(&self.type_name))
            .unwrap_or("")
    }

    /// Non-blank names worth comparing against budget descriptions.
    pub fn name_candidates(&self) -> Vec<&str> {
        let mut candidates = Vec::with_capacity(2);
        if let Some(name) = non_blank(&self.name) {
            candidates.push(name);
        }
        if let Some(type_name) = non_blank(&self.type_name) {
            if !candidates.contains(&type_name) {
                candidates.push(type_name);
            }
        }
        candidates
    }
}

// ============================================================================
// BUDGET ITEM (cost side)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    /// Primary key within its budget (blank when the line has none)
    #[serde(default)]
    pub code: String,

    /// Cross-reference to a model element's global id, when the budget carries one
    #[serde(default)]
    pub linked_global_id: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub unit_price: f64,

    #[serde(default)]
    pub properties: PropertyMap,

    /// Chapter/parent code; carried for report context only
    #[serde(default)]
    pub parent_code: Option<String>,
}

impl BudgetItem {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        BudgetItem {
            code: code.into(),
            linked_global_id: None,
            description: description.into(),
            unit: String::new(),
            unit_price: 0.0,
            properties: PropertyMap::new(),
            parent_code: None,
        }
    }

    /// Builder: set the embedded model cross-reference
    pub fn with_linked_global_id(mut self, global_id: impl Into<String>) -> Self {
        self.linked_global_id = Some(global_id.into());
        self
    }

    /// Builder: set unit of measure
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Builder: set unit price
    pub fn with_unit_price(mut self, unit_price: f64) -> Self {
        self.unit_price = unit_price;
        self
    }

    /// Builder: add a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Builder: set parent code
    pub fn with_parent_code(mut self, parent_code: impl Into<String>) -> Self {
        self.parent_code = Some(parent_code.into());
        self
    }

    /// Code, or None when blank.
    pub fn code(&self) -> Option<&str> {
        non_blank(&self.code)
    }

    pub fn linked_global_id(&self) -> Option<&str> {
        self.linked_global_id.as_deref().and_then(non_blank)
    }

    pub fn description(&self) -> Option<&str> {
        non_blank(&self.description)
    }

    pub fn unit(&self) -> Option<&str> {
        non_blank(&self.unit)
    }
}

// ============================================================================
// VALUE HELPERS
// ============================================================================

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Present = not null and not a blank string.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Coerce a property value to a number.
///
/// Accepts JSON numbers and numeric strings, including a decimal comma
/// ("0,6") when the string has no dot.
pub fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(n) = trimmed.parse::<f64>() {
                return n.is_finite().then_some(n);
            }
            if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
                if let Ok(n) = trimmed.replace(',', ".").parse::<f64>() {
                    return n.is_finite().then_some(n);
                }
            }
            None
        }
        _ => None,
    }
}

/// Render a property value as text for string comparison and messages.
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// INPUT CONTRACTS
// ============================================================================

/// Reject duplicate (non-blank) global ids.
pub fn check_unique_model_ids(elements: &[ModelElement]) -> ReconResult<()> {
    let mut seen = HashSet::with_capacity(elements.len());
    for element in elements {
        if let Some(id) = element.global_id() {
            if !seen.insert(id) {
                return Err(ReconError::DuplicateModelId(id.to_string()));
            }
        }
    }
    Ok(())
}

/// Reject duplicate (non-blank) budget codes.
pub fn check_unique_budget_codes(items: &[BudgetItem]) -> ReconResult<()> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if let Some(code) = item.code() {
            if !seen.insert(code) {
                return Err(ReconError::DuplicateBudgetCode(code.to_string()));
            }
        }
    }
    Ok(())
}

// ============================================================================
// LOADING (intermediate JSON written by the upstream readers)
// ============================================================================

/// Load model elements from a JSON array file
pub fn load_model_elements<P: AsRef<Path>>(path: P) -> Result<Vec<ModelElement>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read model elements file: {:?}", path.as_ref()))?;

    serde_json::from_str(&content).context("Failed to parse model elements JSON")
}

/// Load budget items from a JSON array file
pub fn load_budget_items<P: AsRef<Path>>(path: P) -> Result<Vec<BudgetItem>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read budget items file: {:?}", path.as_ref()))?;

    serde_json::from_str(&content).context("Failed to parse budget items JSON")
}

// ============================================================================
// TESTS
// ============================================================================
