use crate::error::{CliError, Result};
use bcadeck::backends::sdtrimsp::SdTrimSpVersion;
use bcadeck::{ElementCatalog, SimulationCode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_FLOAT_PRECISION: usize = 4;

/// The settings file as written by the user; every field is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialSettings {
    catalog: Option<PathBuf>,
    default_code: Option<SimulationCode>,
    sdtrimsp_version: Option<SdTrimSpVersion>,
    float_precision: Option<usize>,
}

impl PartialSettings {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading settings from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut partial: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if let Some(catalog) = partial.catalog.take() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            partial.catalog = Some(base.join(catalog));
        }
        Ok(partial)
    }

    pub fn resolve(self) -> Result<Settings> {
        let float_precision = self.float_precision.unwrap_or(DEFAULT_FLOAT_PRECISION);
        if float_precision > 16 {
            return Err(CliError::Settings(format!(
                "`float-precision` must be at most 16, got {float_precision}"
            )));
        }
        Ok(Settings {
            catalog: self.catalog,
            default_code: self.default_code.unwrap_or(SimulationCode::SdTrimSp),
            sdtrimsp_version: self.sdtrimsp_version.unwrap_or_default(),
            float_precision,
        })
    }
}

/// Effective front-end settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Element catalog used to resolve decks; the bundled one when unset.
    pub catalog: Option<PathBuf>,
    pub default_code: SimulationCode,
    pub sdtrimsp_version: SdTrimSpVersion,
    /// Digits after the decimal point in console tables.
    pub float_precision: usize,
}

impl Settings {
    /// Reads the settings file when one is given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => PartialSettings::from_file(path)?.resolve(),
            None => PartialSettings::default().resolve(),
        }
    }

    pub fn element_catalog(&self) -> Result<ElementCatalog> {
        let catalog = match &self.catalog {
            Some(path) => ElementCatalog::load(path),
            None => ElementCatalog::builtin(),
        };
        catalog.map_err(|e| CliError::Core(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_apply_without_a_file() {
        let settings = Settings::load(None).unwrap();

        assert_eq!(settings.default_code, SimulationCode::SdTrimSp);
        assert_eq!(settings.sdtrimsp_version, SdTrimSpVersion::V6_01);
        assert_eq!(settings.float_precision, 4);
        assert!(settings.element_catalog().unwrap().get("W").is_some());
    }

    #[test]
    fn reads_kebab_case_fields_and_resolves_catalog_next_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bcadeck.toml");
        fs::write(
            &path,
            "catalog = \"elements.toml\"\ndefault-code = \"TRIDYN\"\nsdtrimsp-version = \"6.09\"\nfloat-precision = 6\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.catalog, Some(dir.path().join("elements.toml")));
        assert_eq!(settings.default_code, SimulationCode::Tridyn);
        assert_eq!(settings.sdtrimsp_version, SdTrimSpVersion::V6_09);
        assert_eq!(settings.float_precision, 6);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bcadeck.toml");
        fs::write(&path, "float_precision = 3\n").unwrap();

        assert!(matches!(
            Settings::load(Some(&path)),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn excessive_precision_is_rejected() {
        let partial = PartialSettings {
            float_precision: Some(40),
            ..Default::default()
        };

        assert!(matches!(partial.resolve(), Err(CliError::Settings(_))));
    }

    #[test]
    fn missing_catalog_file_is_reported() {
        let settings = Settings {
            catalog: Some(PathBuf::from("/nonexistent/elements.toml")),
            ..Settings::load(None).unwrap()
        };

        assert!(matches!(settings.element_catalog(), Err(CliError::Core(_))));
    }
}
