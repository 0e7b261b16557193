//! SDTrimSP: Fortran namelist deck and `output.dat` report.

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
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const INPUT_FILE: &str = "tri.inp";
pub const LAYER_FILE: &str = "layer.inp";
pub const REPORT_FILE: &str = "output.dat";

/// Deck dialect. 6.06 decks are read and written like 6.01 decks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SdTrimSpVersion {
    #[default]
    #[serde(rename = "6.01", alias = "6.06")]
    V6_01,
    #[serde(rename = "6.09")]
    V6_09,
}

impl SdTrimSpVersion {
    pub fn name(self) -> &'static str {
        match self {
            SdTrimSpVersion::V6_01 => "6.01",
            SdTrimSpVersion::V6_09 => "6.09",
        }
    }
}

impl fmt::Display for SdTrimSpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SdTrimSpVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "6.01" | "6.06" => Ok(SdTrimSpVersion::V6_01),
            "6.09" => Ok(SdTrimSpVersion::V6_09),
            other => Err(format!("unsupported SDTrimSP version '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SdTrimSp {
    version: SdTrimSpVersion,
}

impl SdTrimSp {
    pub const fn new(version: SdTrimSpVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> SdTrimSpVersion {
        self.version
    }
}

impl SimulationBackend for SdTrimSp {
    fn code(&self) -> SimulationCode {
        SimulationCode::SdTrimSp
    }

    fn label(&self) -> String {
        format!("SDTrimSP {}", self.version)
    }
}

impl DeckCompiler for SdTrimSp {
    fn render(&self, config: &Configuration) -> Result<Deck, CompileError> {
        deck::render(config, self.version)
    }

    fn check_additional(&self, lines: &[String]) -> Vec<ValidationIssue> {
        params::check_additional(lines)
    }
}

impl DeckReader for SdTrimSp {
    fn read_deck(&self, deck: &Deck, catalog: &ElementCatalog) -> Result<Configuration, DeckError> {
        reader::read(deck, catalog, self.version)
    }

    fn layer_file_for(&self, input: &Path) -> Option<PathBuf> {
        Some(input.with_file_name(LAYER_FILE))
    }
}

impl ReportParser for SdTrimSp {
    fn report_file_name(&self, _title: &str) -> String {
        REPORT_FILE.to_string()
    }

    fn read_from(&self, reader: &mut dyn BufRead) -> Result<SimulationResult, ReportError> {
        report::parse(reader)
    }
}
