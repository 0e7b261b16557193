use bcadeck::SimulationCode;
use bcadeck::backends::sdtrimsp::SdTrimSpVersion;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "bcadeck - Compile ion-beam experiments into SDTrimSP and TRIDYN input decks and evaluate their reports.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used to parse reports.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Path to a settings file in TOML format.
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a configuration and list every issue found.
    Validate(ValidateArgs),
    /// Write the input deck of a configuration.
    Compile(CompileArgs),
    /// Read an input deck back into a configuration.
    ReadDeck(ReadDeckArgs),
    /// Parse simulation reports and summarize their results.
    Parse(ParseArgs),
    /// Compare the results of two reports species by species.
    Compare(CompareArgs),
    /// List or search the element catalog.
    Elements(ElementsArgs),
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the configuration file (JSON).
    #[arg(required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Also check the additional lines against the parameter table of this code.
    /// Defaults to the code stored in the configuration.
    #[arg(long, value_name = "CODE")]
    pub code: Option<SimulationCode>,
}

/// Arguments for the `compile` subcommand.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Path to the configuration file (JSON).
    #[arg(required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Directory the deck files are written into.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Compile for this code instead of the one stored in the configuration.
    #[arg(long, value_name = "CODE")]
    pub code: Option<SimulationCode>,

    /// SDTrimSP deck dialect, overriding the settings file.
    #[arg(long, value_name = "VERSION")]
    pub sdtrimsp_version: Option<SdTrimSpVersion>,
}

/// Arguments for the `read-deck` subcommand.
#[derive(Args, Debug)]
pub struct ReadDeckArgs {
    /// Path to the main input file of the deck (tri.inp or <name>.in).
    #[arg(required = true, value_name = "PATH")]
    pub deck: PathBuf,

    /// Code that wrote the deck. Defaults to `default-code` from the settings.
    #[arg(long, value_name = "CODE")]
    pub code: Option<SimulationCode>,

    /// Layer file of the deck. Defaults to the conventional file next to the input.
    #[arg(long, value_name = "PATH")]
    pub layers: Option<PathBuf>,

    /// Path of the configuration file (JSON) to write.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}

/// Arguments for the `parse` subcommand.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Report files to parse.
    #[arg(required = true, num_args(1..), value_name = "PATH")]
    pub reports: Vec<PathBuf>,

    /// Parse with this code instead of detecting it per report.
    #[arg(long, value_name = "CODE")]
    pub code: Option<SimulationCode>,

    /// Export one row per component of every parsed report to a CSV file.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Print the parsed results as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `compare` subcommand.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Report of the reference run.
    #[arg(required = true, value_name = "PATH")]
    pub left: PathBuf,

    /// Report of the run compared against the reference.
    #[arg(required = true, value_name = "PATH")]
    pub right: PathBuf,

    /// Parse both reports with this code instead of detecting it.
    #[arg(long, value_name = "CODE")]
    pub code: Option<SimulationCode>,
}

/// Arguments for the `elements` subcommand.
#[derive(Args, Debug)]
pub struct ElementsArgs {
    /// Case-insensitive search over symbols and names. Lists everything when omitted.
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Locales of the printed names, separated by '|'.
    #[arg(long, default_value = "en", value_name = "LOCALES")]
    pub locale: String,
}
