use crate::cli::ParseArgs;
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use crate::utils::table::result_table;
use bcadeck::SimulationResult;
use bcadeck::core::result::export::export_csv;
use bcadeck::workflows::evaluate::{self, Evaluated};
use bcadeck::workflows::progress::ProgressReporter;
use serde::Serialize;
use tracing::{error, info};

#[derive(Serialize)]
struct JsonEntry<'a> {
    source: String,
    result: &'a SimulationResult,
}

fn parse_all(args: &ParseArgs, handler: &CliProgressHandler) -> Vec<Evaluated> {
    let reporter = ProgressReporter::with_callback(handler.get_callback());
    info!("Parsing {} report(s)...", args.reports.len());
    evaluate::run(&args.reports, args.code, &reporter)
}

pub fn run(args: ParseArgs, settings: &Settings) -> Result<()> {
    let handler = if args.json {
        CliProgressHandler::with_draw_target(indicatif::ProgressDrawTarget::hidden())
    } else {
        CliProgressHandler::new()
    };
    let evaluated = parse_all(&args, &handler);
    write_outputs(&args, settings, &evaluated)
}

fn write_outputs(args: &ParseArgs, settings: &Settings, evaluated: &[Evaluated]) -> Result<()> {
    let mut parsed: Vec<(String, &SimulationResult)> = Vec::new();
    for item in evaluated {
        let source = item.path.display().to_string();
        match &item.outcome {
            Ok(result) => parsed.push((source, result)),
            Err(e) => error!("{source}: {e}"),
        }
    }

    if args.json {
        let entries: Vec<JsonEntry> = parsed
            .iter()
            .map(|(source, result)| JsonEntry {
                source: source.clone(),
                result,
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries).map_err(|e| CliError::Other(e.into()))?;
        println!("{json}");
    } else {
        for (source, result) in &parsed {
            println!("{}", result_table(source, result, settings.float_precision));
        }
    }

    if let Some(path) = &args.csv {
        let rows: Vec<(&str, &SimulationResult)> =
            parsed.iter().map(|(s, r)| (s.as_str(), *r)).collect();
        export_csv(path, &rows).map_err(|e| CliError::Core(e.into()))?;
        info!("CSV written to {:?}", path);
    }

    let failed = evaluated.len() - parsed.len();
    if failed > 0 {
        return Err(CliError::BatchFailed {
            failed,
            total: evaluated.len(),
        });
    }
    Ok(())
}
