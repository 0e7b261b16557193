use super::element::{Element, ElementData};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const BUILTIN_CATALOG: &str = include_str!("../../../data/elements.toml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    element: Vec<ElementData>,
}

/// Lookup table of reference element parameters, keyed by symbol.
///
/// The catalog keeps the order in which elements were declared so that listings
/// and searches are deterministic.
#[derive(Debug, Clone, Default)]
pub struct ElementCatalog {
    elements: Vec<ElementData>,
    by_symbol: HashMap<String, usize>,
}

impl ElementCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.to_string_lossy())
    }

    /// The catalog bundled with the library.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG, "<builtin>")
    }

    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content).map_err(|e| CatalogError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        Self::from_elements(file.element)
    }

    pub fn from_elements(
        elements: impl IntoIterator<Item = ElementData>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for element in elements {
            if catalog.by_symbol.contains_key(&element.symbol) {
                return Err(CatalogError::DuplicateSymbol(element.symbol));
            }
            catalog
                .by_symbol
                .insert(element.symbol.clone(), catalog.elements.len());
            catalog.elements.push(element);
        }
        Ok(catalog)
    }

    /// Returns a pristine element for `symbol`.
    pub fn lookup(&self, symbol: &str) -> Result<Element, CatalogError> {
        self.get(symbol)
            .cloned()
            .map(Element::Pristine)
            .ok_or_else(|| CatalogError::NotFound(symbol.to_string()))
    }

    pub fn get(&self, symbol: &str) -> Option<&ElementData> {
        self.by_symbol.get(symbol).map(|&i| &self.elements[i])
    }

    pub fn by_atomic_number(&self, atomic_number: u32) -> Option<&ElementData> {
        self.elements
            .iter()
            .find(|e| e.atomic_number == atomic_number)
    }

    /// All entries sharing an atomic number, e.g. `H`, `D` and `T`.
    pub fn isotopes(&self, atomic_number: u32) -> Vec<&ElementData> {
        self.elements
            .iter()
            .filter(|e| e.atomic_number == atomic_number)
            .collect()
    }

    /// Case-insensitive search over symbols and names in every locale.
    pub fn matching(&self, query: &str) -> Vec<&ElementData> {
        self.elements
            .iter()
            .filter(|e| e.matches_query(query))
            .collect()
    }

    pub fn display_name(&self, symbol: &str, locales: &str) -> Result<String, CatalogError> {
        self.get(symbol)
            .map(|e| e.display_name(locales))
            .ok_or_else(|| CatalogError::NotFound(symbol.to_string()))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.symbol.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementData> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Element '{0}' not found in catalog")]
    NotFound(String),
    #[error("Element '{symbol}' is already overridden; only one override layer is permitted")]
    InvalidOverride { symbol: String },
    #[error("Inconsistent element record for '{symbol}': {reason}")]
    InconsistentRecord {
        symbol: String,
        reason: &'static str,
    },
    #[error("Duplicate element symbol '{0}' in catalog")]
    DuplicateSymbol(String),
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const SMALL_CATALOG: &str = r#"
[[element]]
symbol = "H"
name = { en = "Hydrogen", de = "Wasserstoff" }
atomic_nr = 1
period = 1
group = 1
atomic_mass = 1.008
atomic_density = 0.0424
surface_binding_energy = 1.1
displacement_energy = 5.0

[[element]]
symbol = "D"
name = { en = "Deuterium", de = "Deuterium" }
atomic_nr = 1
period = 1
group = 1
atomic_mass = 2.014
atomic_density = 0.0424
surface_binding_energy = 1.1
displacement_energy = 5.0

[[element]]
symbol = "Si"
name = { en = "Silicon", de = "Silizium" }
atomic_nr = 14
period = 3
group = 14
atomic_mass = 28.085
atomic_density = 0.04977
mass_density = 2.33
surface_binding_energy = 4.72
displacement_energy = 13.0
"#;

    #[test]
    fn load_reads_catalog_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("elements.toml");
        File::create(&path)
            .unwrap()
            .write_all(SMALL_CATALOG.as_bytes())
            .unwrap();

        let catalog = ElementCatalog::load(&path).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.symbols().collect::<Vec<_>>(), vec!["H", "D", "Si"]);
        assert_eq!(catalog.get("Si").unwrap().mass_density, Some(2.33));
    }

    #[test]
    fn lookup_of_unknown_symbol_fails_with_not_found() {
        let catalog = ElementCatalog::from_toml_str(SMALL_CATALOG, "test").unwrap();

        let result = catalog.lookup("Xx");

        assert!(matches!(result, Err(CatalogError::NotFound(s)) if s == "Xx"));
    }

    #[test]
    fn lookup_returns_pristine_element() {
        let catalog = ElementCatalog::from_toml_str(SMALL_CATALOG, "test").unwrap();

        let si = catalog.lookup("Si").unwrap();

        assert!(!si.is_modified());
        assert_eq!(si.data().atomic_number, 14);
    }

    #[test]
    fn isotopes_share_atomic_number() {
        let catalog = ElementCatalog::from_toml_str(SMALL_CATALOG, "test").unwrap();

        let symbols: Vec<_> = catalog
            .isotopes(1)
            .into_iter()
            .map(|e| e.symbol.as_str())
            .collect();

        assert_eq!(symbols, vec!["H", "D"]);
        assert_eq!(catalog.by_atomic_number(14).unwrap().symbol, "Si");
    }

    #[test]
    fn matching_searches_all_locales() {
        let catalog = ElementCatalog::from_toml_str(SMALL_CATALOG, "test").unwrap();

        assert_eq!(catalog.matching("silizium").len(), 1);
        assert_eq!(catalog.matching("h").len(), 1);
        assert!(catalog.matching("  ").is_empty());
        assert_eq!(catalog.display_name("H", "en|de").unwrap(), "Hydrogen/Wasserstoff");
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        let doubled = format!("{SMALL_CATALOG}\n{}", &SMALL_CATALOG[SMALL_CATALOG.find("[[element]]\nsymbol = \"Si\"").unwrap()..]);

        let result = ElementCatalog::from_toml_str(&doubled, "test");

        assert!(matches!(result, Err(CatalogError::DuplicateSymbol(s)) if s == "Si"));
    }

    #[test]
    fn load_reports_io_and_toml_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            ElementCatalog::load(&missing),
            Err(CatalogError::Io { .. })
        ));

        let broken = dir.path().join("broken.toml");
        File::create(&broken)
            .unwrap()
            .write_all(b"[[element]]\nsymbol = ")
            .unwrap();
        assert!(matches!(
            ElementCatalog::load(&broken),
            Err(CatalogError::Toml { .. })
        ));
    }

    #[test]
    fn builtin_catalog_parses() {
        let catalog = ElementCatalog::builtin().unwrap();

        assert!(catalog.get("Ar").is_some());
        assert!(catalog.get("W").is_some());
        assert_eq!(catalog.isotopes(1).len(), 3);
    }
}
