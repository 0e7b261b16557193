use super::model::{
    BeamArguments, Configuration, ParticleRow, Settings, StructureLayer, TargetArguments,
};
use super::options::SimulationCode;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct General {
    title: String,
    simulation: SimulationCode,
}

/// The persisted JSON layout of a [`Configuration`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ConfigDocument {
    general: General,
    #[serde(default)]
    beam_arguments: BeamArguments,
    #[serde(default)]
    beam_rows: Vec<ParticleRow>,
    #[serde(default)]
    target_arguments: TargetArguments,
    #[serde(default)]
    target_rows: Vec<ParticleRow>,
    #[serde(default)]
    structure: Vec<StructureLayer>,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    additional: Vec<String>,
}

impl From<ConfigDocument> for Configuration {
    fn from(doc: ConfigDocument) -> Self {
        let mut config = Configuration {
            title: doc.general.title,
            simulation: doc.general.simulation,
            beam_arguments: doc.beam_arguments,
            beam_rows: doc.beam_rows,
            target_arguments: doc.target_arguments,
            target_rows: doc.target_rows,
            structure: doc.structure,
            settings: doc.settings,
            additional: doc.additional,
        };
        config.renumber();
        if config.structure.is_empty() {
            config.structure.push(config.default_layer());
        }
        config
    }
}

impl From<Configuration> for ConfigDocument {
    fn from(config: Configuration) -> Self {
        Self {
            general: General {
                title: config.title,
                simulation: config.simulation,
            },
            beam_arguments: config.beam_arguments,
            beam_rows: config.beam_rows,
            target_arguments: config.target_arguments,
            target_rows: config.target_rows,
            structure: config.structure,
            settings: config.settings,
            additional: config.additional,
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

impl Configuration {
    /// Reads a configuration document from `path`.
    ///
    /// Missing target dimensions fall back to their defaults, an empty structure is
    /// replaced by a single layer built from the target abundances, and row indices
    /// are renumbered.
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let content = std::fs::read_to_string(path).map_err(|e| PersistenceError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let config = Self::from_json_origin(&content, &path.to_string_lossy())?;
        debug!(path = %path.display(), title = %config.title, "Loaded configuration");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        let json = self.to_json_origin(&path.to_string_lossy())?;
        std::fs::write(path, json).map_err(|e| PersistenceError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self, PersistenceError> {
        Self::from_json_origin(content, "<string>")
    }

    /// Serializes the configuration with a four-space indent.
    pub fn to_json_string(&self) -> Result<String, PersistenceError> {
        self.to_json_origin("<string>")
    }

    fn from_json_origin(content: &str, origin: &str) -> Result<Self, PersistenceError> {
        serde_json::from_str(content).map_err(|e| PersistenceError::Json {
            path: origin.to_string(),
            source: e,
        })
    }

    fn to_json_origin(&self, origin: &str) -> Result<String, PersistenceError> {
        let json_error = |e| PersistenceError::Json {
            path: origin.to_string(),
            source: e,
        };
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer).map_err(json_error)?;
        buffer.push(b'\n');
        String::from_utf8(buffer).map_err(|e| PersistenceError::Io {
            path: origin.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::model::tests::four_row_config;
    use crate::core::config::model::{DEFAULT_LAYER_NAME, DEFAULT_SEGMENTS, DEFAULT_THICKNESS};
    use crate::core::config::options::{InelasticLossModel, Mode};
    use crate::core::elements::catalog::ElementCatalog;
    use crate::core::elements::element::ElementPatch;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_is_lossless() {
        let mut config = four_row_config(SimulationCode::Tridyn);
        let catalog = ElementCatalog::builtin().unwrap();
        config.target_rows[0].element = catalog
            .lookup("Si")
            .unwrap()
            .with_override(&ElementPatch {
                surface_binding_energy: Some(4.0),
                ..Default::default()
            })
            .unwrap();
        config.beam_rows[1].options.inelastic_loss_model = Some(InelasticLossModel::OenRobinson);
        config.settings.mode = Mode::Dynamic;
        config.settings.options.histories = Some(5000);
        config
            .settings
            .options
            .extra
            .insert("future_key".to_string(), serde_json::json!([1, 2]));
        config.additional = vec!["rand 12345".to_string()];
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        config.save(&path).unwrap();
        let loaded = Configuration::load(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn document_uses_general_section_and_four_space_indent() {
        let config = four_row_config(SimulationCode::SdTrimSp);

        let json = config.to_json_string().unwrap();

        assert!(json.starts_with("{\n    \"general\": {\n        \"title\": \"Ar and Ne on Si\""));
        assert!(json.contains("\"simulation\": \"SDTrimSP\""));
        assert!(json.contains("\"optional\": {"));
    }

    #[test]
    fn minimal_document_gets_defaults() {
        let catalog = ElementCatalog::builtin().unwrap();
        let argon = serde_json::to_value(catalog.lookup("Ar").unwrap()).unwrap();
        let silicon = serde_json::to_value(catalog.lookup("Si").unwrap()).unwrap();
        let doc = serde_json::json!({
            "general": { "title": "minimal", "simulation": "TRIDYN" },
            "beam_rows": [
                { "index": 7, "symbol": "Ar", "element": argon, "abundance": 1.0,
                  "energy": 1000.0, "angle": 0.0 }
            ],
            "target_rows": [
                { "index": 9, "symbol": "Si", "element": silicon, "abundance": 1.0,
                  "optional": { "unknown": true } }
            ],
            "settings": { "mode": "STATIC" }
        });

        let config = Configuration::from_json_str(&doc.to_string()).unwrap();

        assert_eq!(config.target_arguments.thickness, DEFAULT_THICKNESS);
        assert_eq!(config.target_arguments.segments, DEFAULT_SEGMENTS);
        assert_eq!(config.structure.len(), 1);
        assert_eq!(config.structure[0].name, DEFAULT_LAYER_NAME);
        assert_eq!(config.structure[0].abundances, vec![1.0]);
        assert_eq!(config.beam_rows[0].index, 1);
        assert_eq!(config.target_rows[0].index, 2);
        assert_eq!(config.target_rows[0].max_atomic_fraction, 1.0);
        assert!(config.target_rows[0].options.extra.contains_key("unknown"));
    }

    #[test]
    fn load_reports_io_and_json_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Configuration::load(&dir.path().join("missing.json")),
            Err(PersistenceError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ \"general\": ").unwrap();
        assert!(matches!(
            Configuration::load(&broken),
            Err(PersistenceError::Json { .. })
        ));
    }
}
