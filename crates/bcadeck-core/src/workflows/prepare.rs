use crate::core::config::model::Configuration;
use crate::core::config::validation::ValidationIssue;
use crate::core::io::deck::Deck;
use crate::core::io::traits::Backend;
use crate::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// A deck written to disk together with the warnings raised while compiling it.
#[derive(Debug, Clone)]
pub struct PreparedDeck {
    pub deck: Deck,
    pub warnings: Vec<ValidationIssue>,
    pub files: Vec<PathBuf>,
}

/// Compiles `config` with `backend` and writes the deck files into `output_dir`.
///
/// The directory is created when missing; existing deck files are overwritten.
///
/// # Errors
///
/// Returns [`Error::Compile`] when validation fails or an option has no native
/// value, and [`Error::Io`] when a file cannot be written.
#[instrument(skip_all, name = "prepare_workflow")]
pub fn run(config: &Configuration, backend: &dyn Backend, output_dir: &Path) -> Result<PreparedDeck, Error> {
    info!(
        title = %config.title,
        backend = %backend.label(),
        "Compiling configuration"
    );
    let (deck, warnings) = backend.compile(config)?;
    for issue in &warnings {
        warn!(field = %issue.field, "{}", issue.message);
    }

    let files = deck.write_to_dir(output_dir).map_err(|e| Error::Io {
        path: output_dir.to_string_lossy().to_string(),
        source: e,
    })?;
    info!(
        files = files.len(),
        dir = %output_dir.display(),
        "Deck written"
    );
    Ok(PreparedDeck {
        deck,
        warnings,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::registry::backend_for;
    use crate::core::config::model::tests::four_row_config;
    use crate::core::config::options::SimulationCode;
    use crate::error::CompileError;
    use tempfile::tempdir;

    #[test]
    fn writes_every_deck_file() {
        let config = four_row_config(SimulationCode::SdTrimSp);
        let dir = tempdir().unwrap();

        let prepared = run(&config, backend_for(SimulationCode::SdTrimSp), dir.path()).unwrap();

        assert_eq!(
            prepared.files,
            vec![dir.path().join("tri.inp"), dir.path().join("layer.inp")]
        );
        assert_eq!(
            std::fs::read_to_string(&prepared.files[0]).unwrap(),
            prepared.deck.input.text
        );
    }

    #[test]
    fn unknown_additional_key_is_only_a_warning_for_sdtrimsp() {
        let mut config = four_row_config(SimulationCode::SdTrimSp);
        config.additional = vec!["future_key = 1".to_string()];
        let dir = tempdir().unwrap();

        let prepared = run(&config, backend_for(SimulationCode::SdTrimSp), dir.path()).unwrap();

        assert_eq!(prepared.warnings.len(), 1);
        assert!(prepared.deck.input.text.contains("    future_key = 1\n"));
    }

    #[test]
    fn invalid_configuration_writes_nothing() {
        let mut config = four_row_config(SimulationCode::Tridyn);
        config.additional = vec!["thrd = 2".to_string()];
        let dir = tempdir().unwrap();
        let target = dir.path().join("deck");

        let result = run(&config, backend_for(SimulationCode::Tridyn), &target);

        assert!(matches!(
            result,
            Err(Error::Compile(CompileError::InvalidConfiguration { .. }))
        ));
        assert!(!target.exists());
    }
}
