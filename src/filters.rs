// 🚫 Ignore Filter - Keep non-comparable model elements out of matching
// Views, sheets, rooms, areas, openings and the like never have a budget line.

use crate::records::ModelElement;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Spanish terms (project info, zones, rooms, openings, MEP)
pub const IGNORE_TERMS_ES: &[&str] = &[
    "información",
    "plano",
    "vista",
    "zona de",
    "climatización",
    "topografía",
    "habitaciones",
    "áreas",
    "ocupacion",
    "sup.libre",
    "sup.construida",
    "almacén",
    "salón",
    "cocina",
    "aseo",
    "archivo",
    "circulación",
    "área de trabajo",
    "sala de reuniones",
    "dep. limpieza",
    "aberturas",
    "hueco",
    "corte",
    "líneas",
    "materiales",
    "tubería",
    "segmentos",
];

/// English terms
pub const IGNORE_TERMS_EN: &[&str] = &[
    "project info",
    "sheet",
    "view",
    "rooms",
    "areas",
    "opening",
    "void",
    "lines",
    "materials",
    "pipe",
    "system panel",
    "empty panel",
];

// ============================================================================
// IGNORE FILTER
// ============================================================================

/// Case-insensitive substring filter over an element's tag and name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct IgnoreFilter {
    /// Include the built-in Spanish/English term lists
    pub use_default_terms: bool,

    /// Extra terms supplied by the caller
    pub custom_terms: Vec<String>,
}

impl IgnoreFilter {
    pub fn new() -> Self {
        IgnoreFilter {
            use_default_terms: true,
            custom_terms: Vec::new(),
        }
    }

    /// Only the given terms, without the defaults
    pub fn with_terms_only(terms: &[&str]) -> Self {
        IgnoreFilter {
            use_default_terms: false,
            custom_terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Builder: add a custom term
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.custom_terms.push(term.into());
        self
    }

    /// True when `code` or `description` contains any active term.
    pub fn is_ignored(&self, code: Option<&str>, description: Option<&str>) -> bool {
        let mut text = String::new();
        if let Some(code) = code {
            text.push_str(code);
            text.push(' ');
        }
        if let Some(description) = description {
            text.push_str(description);
        }

        let text = fold(&text);
        if text.trim().is_empty() {
            return false;
        }

        self.terms().any(|term| {
            let term = fold(term);
            !term.is_empty() && text.contains(&term)
        })
    }

    pub fn matches_element(&self, element: &ModelElement) -> bool {
        self.is_ignored(element.tag(), Some(element.display_name()))
    }

    fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        let (es, en): (&[&str], &[&str]) = if self.use_default_terms {
            (IGNORE_TERMS_ES, IGNORE_TERMS_EN)
        } else {
            (&[], &[])
        };

        es.iter()
            .chain(en.iter())
            .copied()
            .chain(self.custom_terms.iter().map(String::as_str))
    }
}

impl Default for IgnoreFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn fold(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_views_are_ignored() {
        let filter = IgnoreFilter::new();
        assert!(filter.is_ignored(None, Some("Project Info")));
        assert!(filter.is_ignored(None, Some("Vista de plano")));
        assert!(filter.is_ignored(None, Some("Sheet 1")));
    }

    #[test]
    fn test_rooms_are_ignored() {
        let filter = IgnoreFilter::new();
        assert!(filter.is_ignored(None, Some("Habitaciones")));
        assert!(filter.is_ignored(None, Some("Zona de climatización")));
        assert!(filter.is_ignored(None, Some("ÁREAS")));
    }

    #[test]
    fn test_openings_are_ignored() {
        let filter = IgnoreFilter::new();
        assert!(filter.is_ignored(None, Some("Opening")));
        assert!(filter.is_ignored(None, Some("Hueco de ventana")));
        assert!(filter.is_ignored(None, Some("Void cut")));
    }

    #[test]
    fn test_building_elements_are_kept() {
        let filter = IgnoreFilter::new();
        assert!(!filter.is_ignored(None, Some("Pilar rectangular hormigón")));
        assert!(!filter.is_ignored(None, Some("Muro de ladrillo")));
        assert!(!filter.is_ignored(None, Some("Ventana de aluminio")));
        assert!(!filter.is_ignored(Some("350147"), Some("Jácena metálica")));
        assert!(!filter.is_ignored(None, None));
    }

    #[test]
    fn test_code_is_checked_too() {
        let filter = IgnoreFilter::new();
        assert!(filter.is_ignored(Some("sheet_01"), Some("Normal description")));
    }

    #[test]
    fn test_custom_terms() {
        let filter = IgnoreFilter::with_terms_only(&["mobiliario"]);
        assert!(filter.is_ignored(None, Some("Mobiliario de oficina")));
        assert!(!filter.is_ignored(None, Some("Project Info")));

        let filter = IgnoreFilter::new().with_term("Furniture");
        assert!(filter.is_ignored(None, Some("Office furniture")));
        assert!(filter.is_ignored(None, Some("Sheet 2")));
    }

    #[test]
    fn test_matches_element_uses_tag_and_name() {
        let filter = IgnoreFilter::new();
        let element = ModelElement::new("g1", "Project Information");
        assert!(filter.matches_element(&element));

        let element = ModelElement::new("g2", "Pilar 600x600").with_tag("350147");
        assert!(!filter.matches_element(&element));
    }
}
