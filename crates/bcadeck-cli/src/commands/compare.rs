use crate::cli::CompareArgs;
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::utils::table::comparison_table;
use bcadeck::core::result::compare::compare;
use bcadeck::workflows::evaluate::evaluate;
use tracing::info;

pub fn run(args: CompareArgs, settings: &Settings) -> Result<()> {
    let read = |path: &std::path::Path| {
        evaluate(path, args.code).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    };
    let left = read(&args.left)?;
    let right = read(&args.right)?;
    info!(left = %left.code(), right = %right.code(), "Comparing reports");

    let comparison = compare(&left, &right);
    println!("{} vs {}", args.left.display(), args.right.display());
    print!("{}", comparison_table(&comparison, settings.float_precision));
    Ok(())
}
