pub mod compare;
pub mod compile;
pub mod elements;
pub mod parse;
pub mod read_deck;
pub mod validate;

use crate::error::{CliError, Result};
use bcadeck::Configuration;
use std::path::Path;
use tracing::info;

fn load_configuration(path: &Path) -> Result<Configuration> {
    info!("Loading configuration from {:?}", path);
    Configuration::load(path).map_err(|e| CliError::Core(e.into()))
}
