// 🏛️ Attribute Registry - Logical attributes and their synonym keys
// "Height" may arrive as "Height", "h" or "Altura": resolve once, here.
//
// Each logical attribute carries a prioritized list of candidate keys per side.
// The first key present wins; the comparator never does ad hoc lookups.

use crate::error::{ReconError, ReconResult};
use crate::records::{is_present, BudgetItem, ModelElement};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ============================================================================
// RESOLVED VALUE
// ============================================================================

/// Which bag a model-side value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueSource {
    Property,
    Quantity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue<'a> {
    /// Key actually found in the bag
    pub key: &'a str,
    pub value: Value,
    pub source: ValueSource,
}

// ============================================================================
// ATTRIBUTE DEFINITION
// ============================================================================

/// One logical attribute and where to find it on each side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    /// Unique ID (e.g., "attr:height")
    pub id: String,

    /// Name reported in findings (e.g., "height")
    pub display_name: String,

    /// Candidate keys on the model side, highest priority first
    pub model_keys: Vec<String>,

    /// Candidate keys on the budget side, highest priority first
    pub budget_keys: Vec<String>,

    #[serde(default)]
    pub description: String,
}

impl AttributeDefinition {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        AttributeDefinition {
            id: id.into(),
            display_name: display_name.into(),
            model_keys: Vec::new(),
            budget_keys: Vec::new(),
            description: String::new(),
        }
    }

    /// Builder: same candidate keys on both sides
    pub fn with_keys(self, keys: &[&str]) -> Self {
        self.with_model_keys(keys).with_budget_keys(keys)
    }

    /// Builder: append model-side candidate keys
    pub fn with_model_keys(mut self, keys: &[&str]) -> Self {
        self.model_keys.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    /// Builder: append budget-side candidate keys
    pub fn with_budget_keys(mut self, keys: &[&str]) -> Self {
        self.budget_keys.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    /// Builder: add description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Resolve on the model side: properties first, then quantities.
    pub fn resolve_model<'a>(&self, element: &'a ModelElement) -> Option<ResolvedValue<'a>> {
        if let Some((key, value)) = lookup(&element.properties, &self.model_keys) {
            return Some(ResolvedValue {
                key,
                value: value.clone(),
                source: ValueSource::Property,
            });
        }

        lookup_quantity(&element.quantities, &self.model_keys).map(|(key, value)| ResolvedValue {
            key,
            value: Value::from(value),
            source: ValueSource::Quantity,
        })
    }

    /// Resolve on the budget side (properties only).
    pub fn resolve_budget<'a>(&self, item: &'a BudgetItem) -> Option<ResolvedValue<'a>> {
        lookup(&item.properties, &self.budget_keys).map(|(key, value)| ResolvedValue {
            key,
            value: value.clone(),
            source: ValueSource::Property,
        })
    }

    /// True if `key` is one of the budget-side candidates (case-insensitive).
    pub fn covers_budget_key(&self, key: &str) -> bool {
        self.budget_keys.iter().any(|k| k.eq_ignore_ascii_case(key))
    }
}

/// First present candidate: exact key pass, then a case-insensitive pass.
fn lookup<'a>(bag: &'a BTreeMap<String, Value>, keys: &[String]) -> Option<(&'a str, &'a Value)> {
    for key in keys {
        if let Some((k, v)) = bag.get_key_value(key.as_str()) {
            if is_present(v) {
                return Some((k.as_str(), v));
            }
        }
    }

    for key in keys {
        let found = bag
            .iter()
            .find(|(k, v)| k.to_lowercase() == key.to_lowercase() && is_present(v));
        if let Some((k, v)) = found {
            return Some((k.as_str(), v));
        }
    }

    None
}

fn lookup_quantity<'a>(bag: &'a BTreeMap<String, f64>, keys: &[String]) -> Option<(&'a str, f64)> {
    for key in keys {
        if let Some((k, v)) = bag.get_key_value(key.as_str()) {
            return Some((k.as_str(), *v));
        }
    }

    for key in keys {
        if let Some((k, v)) = bag.iter().find(|(k, _)| k.to_lowercase() == key.to_lowercase()) {
            return Some((k.as_str(), *v));
        }
    }

    None
}

// ============================================================================
// ATTRIBUTE REGISTRY
// ============================================================================

/// Catalog of every logical attribute the comparator knows about.
pub struct AttributeRegistry {
    attributes: BTreeMap<String, AttributeDefinition>,
}

impl AttributeRegistry {
    /// Create a registry with the dimensional, material and thermal attributes
    pub fn new() -> Self {
        let mut registry = AttributeRegistry {
            attributes: BTreeMap::new(),
        };

        registry.register_core_attributes();
        registry
    }

    fn register_core_attributes(&mut self) {
        // ====================================================================
        // DIMENSIONAL ATTRIBUTES
        // ====================================================================

        self.register(
            AttributeDefinition::new("attr:height", "height")
                .with_keys(&["Height", "height", "Altura", "h"])
                .with_description("Section or element height"),
        );

        self.register(
            AttributeDefinition::new("attr:width", "width")
                .with_keys(&["Width", "width", "Anchura", "Ancho", "b"])
                .with_description("Section or element width"),
        );

        self.register(
            AttributeDefinition::new("attr:depth", "depth")
                .with_keys(&["Depth", "depth", "Profundidad", "Canto"]),
        );

        self.register(
            AttributeDefinition::new("attr:length", "length")
                .with_keys(&["Length", "length", "Longitud", "Largo"]),
        );

        self.register(
            AttributeDefinition::new("attr:thickness", "thickness")
                .with_keys(&["Thickness", "thickness", "Grosor", "Espesor"]),
        );

        // ====================================================================
        // MATERIAL ATTRIBUTES
        // ====================================================================

        self.register(
            AttributeDefinition::new("attr:material", "material")
                .with_keys(&["Material", "material"]),
        );

        self.register(
            AttributeDefinition::new("attr:structural_material", "structural material")
                .with_model_keys(&["StructuralMaterial", "Material estructural"])
                .with_budget_keys(&["Material estructural", "StructuralMaterial"]),
        );

        // ====================================================================
        // THERMAL ATTRIBUTES
        // ====================================================================

        self.register(
            AttributeDefinition::new("attr:thermal_resistance", "thermal resistance")
                .with_model_keys(&["ThermalResistance", "Resistencia térmica (R)"])
                .with_budget_keys(&["Resistencia térmica (R)", "ThermalResistance"]),
        );

        self.register(
            AttributeDefinition::new("attr:heat_transfer_coefficient", "heat transfer coefficient")
                .with_model_keys(&[
                    "HeatTransferCoefficient",
                    "ThermalTransmittance",
                    "Coeficiente de transferencia de calor (U)",
                ])
                .with_budget_keys(&[
                    "Coeficiente de transferencia de calor (U)",
                    "HeatTransferCoefficient",
                    "ThermalTransmittance",
                ]),
        );

        // ====================================================================
        // PAIR-LEVEL ATTRIBUTES (unit, counts, type name)
        // ====================================================================

        self.register(
            AttributeDefinition::new("attr:unit", "unit")
                .with_keys(&["Unit", "unit", "Unidad"])
                .with_description("Unit of measure; budget side falls back to BudgetItem.unit"),
        );

        self.register(
            AttributeDefinition::new("attr:count", "count")
                .with_model_keys(&["Count", "InstanceCount", "instance_count"])
                .with_budget_keys(&["quantity", "Quantity", "Cantidad"])
                .with_description("Instances in the model vs. budgeted quantity"),
        );

        self.register(
            AttributeDefinition::new("attr:type_name", "type name")
                .with_budget_keys(&["type_name", "TypeName", "Nombre de tipo"]),
        );
    }

    pub fn register(&mut self, attr: AttributeDefinition) {
        self.attributes.insert(attr.id.clone(), attr);
    }

    pub fn get(&self, id: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(id)
    }

    pub fn count(&self) -> usize {
        self.attributes.len()
    }

    /// Collect definitions by id, in the given order; unknown ids are skipped.
    pub fn select(&self, ids: &[&str]) -> Vec<AttributeDefinition> {
        ids.iter().filter_map(|id| self.get(id).cloned()).collect()
    }

    /// Pair-level ids are always registered; the fallback keeps this infallible.
    fn builtin(&self, id: &str) -> AttributeDefinition {
        self.get(id)
            .cloned()
            .unwrap_or_else(|| AttributeDefinition::new(id, id.trim_start_matches("attr:")))
    }
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// ATTRIBUTE SETS
// ============================================================================

const SPATIAL_IDS: &[&str] = &[
    "attr:height",
    "attr:width",
    "attr:depth",
    "attr:length",
    "attr:thickness",
];

const MATERIAL_THERMAL_IDS: &[&str] = &[
    "attr:material",
    "attr:structural_material",
    "attr:thermal_resistance",
    "attr:heat_transfer_coefficient",
];

/// Ordered list of attributes compared for every matched pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSet {
    pub name: String,
    pub attributes: Vec<AttributeDefinition>,
}

impl AttributeSet {
    /// height, width, depth, length, thickness
    pub fn spatial() -> Self {
        let registry = AttributeRegistry::new();
        AttributeSet {
            name: "spatial".to_string(),
            attributes: registry.select(SPATIAL_IDS),
        }
    }

    /// Spatial set plus material and thermal attributes
    pub fn full() -> Self {
        let registry = AttributeRegistry::new();
        let mut attributes = registry.select(SPATIAL_IDS);
        attributes.extend(registry.select(MATERIAL_THERMAL_IDS));
        AttributeSet {
            name: "full".to_string(),
            attributes,
        }
    }

    pub fn custom(name: impl Into<String>, attributes: Vec<AttributeDefinition>) -> Self {
        AttributeSet {
            name: name.into(),
            attributes,
        }
    }

    /// Resolve a preset by name ("spatial" or "full", case-insensitive)
    pub fn by_name(name: &str) -> ReconResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "spatial" => Ok(Self::spatial()),
            "full" => Ok(Self::full()),
            _ => Err(ReconError::UnknownAttributeSet(name.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn covers_budget_key(&self, key: &str) -> bool {
        self.attributes.iter().any(|a| a.covers_budget_key(key))
    }
}

/// Pair-level attributes used by the unit, count and type-name checks.
#[derive(Debug, Clone)]
pub struct PairAttributes {
    pub unit: AttributeDefinition,
    pub count: AttributeDefinition,
    pub type_name: AttributeDefinition,
}

impl PairAttributes {
    pub fn new() -> Self {
        let registry = AttributeRegistry::new();
        PairAttributes {
            unit: registry.builtin("attr:unit"),
            count: registry.builtin("attr:count"),
            type_name: registry.builtin("attr:type_name"),
        }
    }

    /// Keys consumed by pair-level checks; skipped by shared-property comparison.
    pub fn covers_budget_key(&self, key: &str) -> bool {
        self.unit.covers_budget_key(key)
            || self.count.covers_budget_key(key)
            || self.type_name.covers_budget_key(key)
    }
}

impl Default for PairAttributes {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
