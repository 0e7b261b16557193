use super::catalog::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Physical parameters of one chemical species (or isotope) as consumed by BCA codes.
///
/// Densities are atomic number densities in atoms/Å³ and all energies are in eV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementData {
    pub symbol: String,
    /// Display names keyed by locale (e.g. `en`, `de`).
    pub name: BTreeMap<String, String>,
    #[serde(rename = "atomic_nr")]
    pub atomic_number: u32,
    pub period: u32,
    pub group: u32,
    pub atomic_mass: f64,
    pub atomic_density: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass_density: Option<f64>,
    pub surface_binding_energy: f64,
    pub displacement_energy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dissociation_heat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub melt_enthalpy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vaporization_energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formation_enthalpy: Option<f64>,
}

impl ElementData {
    /// Joins the names of the requested locales with `/`.
    ///
    /// The locale list uses the `|` separated form, e.g. `"en|de"`.
    /// Unknown locales are skipped; when none match, the symbol is returned.
    pub fn display_name(&self, locales: &str) -> String {
        let names: Vec<&str> = locales
            .split('|')
            .map(str::trim)
            .filter_map(|locale| self.name.get(locale).map(String::as_str))
            .collect();
        if names.is_empty() {
            self.symbol.clone()
        } else {
            names.join("/")
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.symbol.to_lowercase().contains(needle)
            || self
                .name
                .values()
                .any(|name| name.to_lowercase().contains(needle))
    }

    pub(crate) fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        !needle.is_empty() && self.matches(&needle)
    }
}

/// A set of replacement values for the overridable scalars of an element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    pub atomic_mass: Option<f64>,
    pub atomic_density: Option<f64>,
    pub mass_density: Option<f64>,
    pub surface_binding_energy: Option<f64>,
    pub displacement_energy: Option<f64>,
    pub cutoff_energy: Option<f64>,
    pub dissociation_heat: Option<f64>,
    pub melt_enthalpy: Option<f64>,
    pub vaporization_energy: Option<f64>,
    pub formation_enthalpy: Option<f64>,
}

impl ElementPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(&self, data: &mut ElementData) {
        if let Some(v) = self.atomic_mass {
            data.atomic_mass = v;
        }
        if let Some(v) = self.atomic_density {
            data.atomic_density = v;
        }
        if let Some(v) = self.surface_binding_energy {
            data.surface_binding_energy = v;
        }
        if let Some(v) = self.displacement_energy {
            data.displacement_energy = v;
        }
        let optional = [
            (self.mass_density, &mut data.mass_density),
            (self.cutoff_energy, &mut data.cutoff_energy),
            (self.dissociation_heat, &mut data.dissociation_heat),
            (self.melt_enthalpy, &mut data.melt_enthalpy),
            (self.vaporization_energy, &mut data.vaporization_energy),
            (self.formation_enthalpy, &mut data.formation_enthalpy),
        ];
        for (value, slot) in optional {
            if value.is_some() {
                *slot = value;
            }
        }
    }
}

/// An element as used inside a configuration.
///
/// An overridden element owns a copy of the pristine reference data it was derived
/// from. Overriding an overridden element is rejected, so there is never more than
/// one level of nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ElementRecord", into = "ElementRecord")]
pub enum Element {
    Pristine(ElementData),
    Overridden {
        data: ElementData,
        original: ElementData,
    },
}

impl Element {
    pub fn data(&self) -> &ElementData {
        match self {
            Element::Pristine(data) | Element::Overridden { data, .. } => data,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.data().symbol
    }

    pub fn is_modified(&self) -> bool {
        matches!(self, Element::Overridden { .. })
    }

    pub fn original(&self) -> Option<&ElementData> {
        match self {
            Element::Pristine(_) => None,
            Element::Overridden { original, .. } => Some(original),
        }
    }

    /// The reference values: the original for an overridden element, the data otherwise.
    pub fn reference(&self) -> &ElementData {
        self.original().unwrap_or_else(|| self.data())
    }

    /// Returns `true` when the selected field differs from the reference value.
    pub fn differs<T: PartialEq>(&self, field: impl Fn(&ElementData) -> T) -> bool {
        field(self.data()) != field(self.reference())
    }

    /// Creates a modified copy of a pristine element.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidOverride`] if `self` is already overridden.
    pub fn with_override(&self, patch: &ElementPatch) -> Result<Element, CatalogError> {
        match self {
            Element::Overridden { data, .. } => Err(CatalogError::InvalidOverride {
                symbol: data.symbol.clone(),
            }),
            Element::Pristine(base) => {
                let mut data = base.clone();
                patch.apply(&mut data);
                Ok(Element::Overridden {
                    data,
                    original: base.clone(),
                })
            }
        }
    }

    /// Returns the pristine element. Reverting a pristine element is a no-op.
    pub fn revert(&self) -> Element {
        Element::Pristine(self.reference().clone())
    }
}

impl From<ElementData> for Element {
    fn from(data: ElementData) -> Self {
        Element::Pristine(data)
    }
}

#[derive(Serialize, Deserialize)]
struct ElementRecord {
    #[serde(flatten)]
    data: ElementData,
    #[serde(default)]
    modified: bool,
    #[serde(default)]
    original: Option<OriginalRecord>,
}

/// The `original` object of a record. It carries plain values only; the two
/// marker fields exist to reject a nested override.
#[derive(Serialize, Deserialize)]
struct OriginalRecord {
    #[serde(flatten)]
    data: ElementData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    modified: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original: Option<serde_json::Value>,
}

impl TryFrom<ElementRecord> for Element {
    type Error = CatalogError;

    fn try_from(record: ElementRecord) -> Result<Self, Self::Error> {
        let original = match record.original {
            Some(OriginalRecord {
                data,
                modified: None,
                original: None,
            }) => Some(data),
            Some(_) => {
                return Err(CatalogError::InconsistentRecord {
                    symbol: record.data.symbol,
                    reason: "original values nest another original",
                });
            }
            None => None,
        };
        match (record.modified, original) {
            (true, Some(original)) => Ok(Element::Overridden {
                data: record.data,
                original,
            }),
            (true, None) => Err(CatalogError::InconsistentRecord {
                symbol: record.data.symbol,
                reason: "modified element carries no original values",
            }),
            (false, Some(original)) if original != record.data => {
                Err(CatalogError::InconsistentRecord {
                    symbol: record.data.symbol,
                    reason: "unmodified element differs from its original values",
                })
            }
            (false, _) => Ok(Element::Pristine(record.data)),
        }
    }
}

impl From<Element> for ElementRecord {
    fn from(element: Element) -> Self {
        match element {
            Element::Pristine(data) => ElementRecord {
                data,
                modified: false,
                original: None,
            },
            Element::Overridden { data, original } => ElementRecord {
                data,
                modified: true,
                original: Some(OriginalRecord {
                    data: original,
                    modified: None,
                    original: None,
                }),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn argon() -> ElementData {
        ElementData {
            symbol: "Ar".to_string(),
            name: BTreeMap::from([
                ("en".to_string(), "Argon".to_string()),
                ("de".to_string(), "Argon".to_string()),
            ]),
            atomic_number: 18,
            period: 3,
            group: 18,
            atomic_mass: 39.948,
            atomic_density: 0.02497,
            mass_density: None,
            surface_binding_energy: 0.0,
            displacement_energy: 5.0,
            cutoff_energy: None,
            dissociation_heat: None,
            melt_enthalpy: None,
            vaporization_energy: None,
            formation_enthalpy: None,
        }
    }

    #[test]
    fn override_keeps_original_and_marks_modified() {
        let base = Element::Pristine(argon());
        let patch = ElementPatch {
            surface_binding_energy: Some(1.5),
            cutoff_energy: Some(0.2),
            ..Default::default()
        };

        let modified = base.with_override(&patch).unwrap();

        assert!(modified.is_modified());
        assert_eq!(modified.data().surface_binding_energy, 1.5);
        assert_eq!(modified.data().cutoff_energy, Some(0.2));
        assert_eq!(modified.original(), Some(&argon()));
        assert!(modified.differs(|d| d.surface_binding_energy));
        assert!(!modified.differs(|d| d.atomic_mass));
    }

    #[test]
    fn second_override_layer_is_rejected() {
        let once = Element::Pristine(argon())
            .with_override(&ElementPatch {
                atomic_mass: Some(40.0),
                ..Default::default()
            })
            .unwrap();

        let result = once.with_override(&ElementPatch::default());

        assert!(matches!(
            result,
            Err(CatalogError::InvalidOverride { symbol }) if symbol == "Ar"
        ));
    }

    #[test]
    fn revert_is_idempotent() {
        let modified = Element::Pristine(argon())
            .with_override(&ElementPatch {
                displacement_energy: Some(12.0),
                ..Default::default()
            })
            .unwrap();

        let reverted = modified.revert();
        assert_eq!(reverted, Element::Pristine(argon()));
        assert_eq!(reverted.revert(), reverted);
    }

    #[test]
    fn display_name_joins_requested_locales() {
        let mut data = argon();
        data.name.insert("de".to_string(), "Argon (de)".to_string());

        assert_eq!(data.display_name("en|de"), "Argon/Argon (de)");
        assert_eq!(data.display_name("de"), "Argon (de)");
        assert_eq!(data.display_name("fr"), "Ar");
    }

    #[test]
    fn json_form_round_trips_both_variants() {
        let pristine = Element::Pristine(argon());
        let modified = pristine
            .with_override(&ElementPatch {
                atomic_density: Some(0.03),
                ..Default::default()
            })
            .unwrap();

        for element in [pristine, modified] {
            let json = serde_json::to_string(&element).unwrap();
            let back: Element = serde_json::from_str(&json).unwrap();
            assert_eq!(back, element);
        }
    }

    #[test]
    fn inconsistent_json_record_is_rejected() {
        let mut value = serde_json::to_value(Element::Pristine(argon())).unwrap();
        value["modified"] = serde_json::Value::Bool(true);

        let result: Result<Element, _> = serde_json::from_value(value);

        assert!(result.is_err());
    }

    #[test]
    fn nested_original_is_rejected() {
        let modified = Element::Pristine(argon())
            .with_override(&ElementPatch {
                atomic_density: Some(0.03),
                ..Default::default()
            })
            .unwrap();
        let mut value = serde_json::to_value(&modified).unwrap();
        value["original"]["modified"] = serde_json::Value::Bool(true);
        value["original"]["original"] = serde_json::to_value(argon()).unwrap();

        let result: Result<Element, _> = serde_json::from_value(value);

        let message = result.unwrap_err().to_string();
        assert!(message.contains("nest"), "{message}");
    }
}
