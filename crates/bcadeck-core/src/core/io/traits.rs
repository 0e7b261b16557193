use super::deck::Deck;
use crate::core::config::model::Configuration;
use crate::core::config::options::SimulationCode;
use crate::core::config::validation::{ValidationIssue, has_errors, validate};
use crate::core::elements::catalog::ElementCatalog;
use crate::core::result::model::SimulationResult;
use crate::error::{CompileError, DeckError, ReportError};
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

/// Identity of a simulation code implementation.
pub trait SimulationBackend: Send + Sync {
    fn code(&self) -> SimulationCode;

    /// Human-readable name including the deck dialect, e.g. `SDTrimSP 6.01`.
    fn label(&self) -> String;
}

/// Renders a configuration into the input deck of one code.
pub trait DeckCompiler: SimulationBackend {
    /// Renders a configuration that is already known to be valid.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnsupportedOption`] when a setting has no native
    /// representation in this code.
    fn render(&self, config: &Configuration) -> Result<Deck, CompileError>;

    /// Checks free-form additional lines against the code's parameter table.
    fn check_additional(&self, lines: &[String]) -> Vec<ValidationIssue>;

    /// Validates `config` and renders it.
    ///
    /// # Return
    ///
    /// Returns the deck together with every warning-level issue found.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidConfiguration`] carrying all issues when any
    /// of them has error severity.
    fn compile(&self, config: &Configuration) -> Result<(Deck, Vec<ValidationIssue>), CompileError> {
        let mut issues = validate(config);
        issues.extend(self.check_additional(&config.additional));
        if has_errors(&issues) {
            return Err(CompileError::InvalidConfiguration { issues });
        }
        let deck = self.render(config)?;
        Ok((deck, issues))
    }
}

/// Reads a deck of one code back into a configuration.
pub trait DeckReader: SimulationBackend {
    /// Parses deck text. Elements are resolved against `catalog`; parameters that
    /// differ from the catalog produce overridden elements.
    fn read_deck(&self, deck: &Deck, catalog: &ElementCatalog) -> Result<Configuration, DeckError>;

    /// Name of the layer file that belongs to the input file at `input`.
    fn layer_file_for(&self, input: &Path) -> Option<std::path::PathBuf>;

    /// Reads the input file at `path`, together with its layer file when one exists.
    fn read_deck_path(&self, path: &Path, catalog: &ElementCatalog) -> Result<Configuration, DeckError> {
        let read = |p: &Path| {
            std::fs::read_to_string(p).map_err(|e| DeckError::Io {
                path: p.to_string_lossy().to_string(),
                source: e,
            })
        };
        let file_name = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        };
        let input = super::deck::DeckFile::new(file_name(path), read(path)?);
        let layers = match self.layer_file_for(path) {
            Some(layer_path) if layer_path.exists() => Some(super::deck::DeckFile::new(
                file_name(&layer_path),
                read(&layer_path)?,
            )),
            _ => None,
        };
        self.read_deck(&Deck { input, layers }, catalog)
    }
}

/// Scans the report of one code into a [`SimulationResult`].
pub trait ReportParser: SimulationBackend {
    /// Conventional file name of the report for a deck with the given title.
    fn report_file_name(&self, title: &str) -> String;

    /// Parses a report from a buffered reader, one block at a time.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::UnrecognizedFormat`] when no known block is found.
    /// Malformed blocks are recorded as partial-parse issues instead.
    fn read_from(&self, reader: &mut dyn BufRead) -> Result<SimulationResult, ReportError>;

    fn parse(&self, text: &str) -> Result<SimulationResult, ReportError> {
        self.read_from(&mut Cursor::new(text))
    }

    fn read_from_path(&self, path: &Path) -> Result<SimulationResult, ReportError> {
        let file = File::open(path).map_err(|e| ReportError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let mut reader = BufReader::new(file);
        self.read_from(&mut reader)
    }
}

/// A complete code implementation.
pub trait Backend: DeckCompiler + DeckReader + ReportParser {}

impl<T: DeckCompiler + DeckReader + ReportParser> Backend for T {}
