use crate::core::config::options::SimulationCode;
use crate::core::config::persistence::PersistenceError;
use crate::core::config::validation::ValidationIssue;
use crate::core::elements::catalog::CatalogError;
use crate::core::result::export::ExportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Configuration is invalid: {}", summarize(.issues))]
    InvalidConfiguration { issues: Vec<ValidationIssue> },

    #[error("{code} has no native value for {option} '{value}'")]
    UnsupportedOption {
        code: SimulationCode,
        option: &'static str,
        value: String,
    },

    #[error("Value of '{key}' does not fit in a 64-bit count")]
    CountOverflow { key: &'static str },
}

fn summarize(issues: &[ValidationIssue]) -> String {
    let errors: Vec<String> = issues
        .iter()
        .filter(|issue| issue.is_error())
        .map(ToString::to_string)
        .collect();
    match errors.len() {
        0 => "no errors".to_string(),
        1 => errors[0].clone(),
        n => format!("{n} errors, first: {}", errors[0]),
    }
}

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("Deck parse error at line {line}: {details}")]
    Parse { line: usize, details: String },

    #[error("Deck is missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("Unknown value {value} for deck key '{key}'")]
    UnknownValue { key: &'static str, value: i64 },

    #[error("Deck key '{key}' has {found} entries, expected {expected}")]
    Length {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("Deck declares a layer file but none was supplied")]
    MissingLayerFile,

    #[error("Element lookup failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{}", unrecognized(.code))]
    UnrecognizedFormat { code: Option<SimulationCode> },

    #[error("Failed to read report: {0}")]
    Read(#[from] std::io::Error),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

fn unrecognized(code: &Option<SimulationCode>) -> String {
    match code {
        Some(code) => format!("Report is not a recognized {code} report"),
        None => "Report does not match any supported simulation code".to_string(),
    }
}

/// Any failure the library can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Deck(#[from] DeckError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
