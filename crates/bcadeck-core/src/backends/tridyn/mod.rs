//! TRIDYN: keyed line deck (`<name>.in`, `<name>.lay`) and `<name>_out.dat` report.

mod deck;
mod lookup;
mod params;
mod reader;
mod report;

use crate::core::config::model::Configuration;
use crate::core::config::options::SimulationCode;
use crate::core::config::validation::ValidationIssue;
use crate::core::elements::catalog::ElementCatalog;
use crate::core::io::deck::Deck;
use crate::core::io::traits::{DeckCompiler, DeckReader, ReportParser, SimulationBackend};
use crate::core::result::model::SimulationResult;
use crate::error::{CompileError, DeckError, ReportError};
use std::io::BufRead;
use std::path::{Path, PathBuf};

pub const INPUT_EXTENSION: &str = "in";
pub const LAYER_EXTENSION: &str = "lay";
pub const REPORT_SUFFIX: &str = "_out.dat";

const STEM_WIDTH: usize = 10;

/// File stem TRIDYN derives from a title: its alphanumeric characters, padded
/// with `_` to ten characters.
pub fn file_stem(title: &str) -> String {
    let stem: String = title.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    format!("{stem:_<STEM_WIDTH$}")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tridyn;

impl SimulationBackend for Tridyn {
    fn code(&self) -> SimulationCode {
        SimulationCode::Tridyn
    }

    fn label(&self) -> String {
        "TRIDYN 2022".to_string()
    }
}

impl DeckCompiler for Tridyn {
    fn render(&self, config: &Configuration) -> Result<Deck, CompileError> {
        deck::render(config)
    }

    fn check_additional(&self, lines: &[String]) -> Vec<ValidationIssue> {
        params::check_additional(lines)
    }
}

impl DeckReader for Tridyn {
    fn read_deck(&self, deck: &Deck, catalog: &ElementCatalog) -> Result<Configuration, DeckError> {
        reader::read(deck, catalog)
    }

    fn layer_file_for(&self, input: &Path) -> Option<PathBuf> {
        Some(input.with_extension(LAYER_EXTENSION))
    }
}

impl ReportParser for Tridyn {
    fn report_file_name(&self, title: &str) -> String {
        format!("{}{REPORT_SUFFIX}", file_stem(title))
    }

    fn read_from(&self, reader: &mut dyn BufRead) -> Result<SimulationResult, ReportError> {
        report::parse(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_keeps_alphanumerics_and_pads() {
        assert_eq!(file_stem("He on W"), "HeonW_____");
        assert_eq!(file_stem("Ar+ 1keV -> Si(100) long"), "Ar1keVSi100long");
        assert_eq!(file_stem(""), "__________");
    }

    #[test]
    fn file_names_follow_the_stem() {
        assert_eq!(Tridyn.report_file_name("He on W"), "HeonW______out.dat");
        assert_eq!(
            Tridyn.layer_file_for(Path::new("/runs/HeonW_____.in")),
            Some(PathBuf::from("/runs/HeonW_____.lay"))
        );
    }
}
