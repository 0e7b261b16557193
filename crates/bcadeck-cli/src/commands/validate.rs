use super::load_configuration;
use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};
use bcadeck::backend_for;
use bcadeck::core::config::validation::{has_errors, validate};
use tracing::info;

pub fn run(args: ValidateArgs) -> Result<()> {
    let config = load_configuration(&args.config)?;
    let code = args.code.unwrap_or(config.simulation);

    let mut issues = validate(&config);
    issues.extend(backend_for(code).check_additional(&config.additional));
    info!(issues = issues.len(), code = %code, "Validation finished");

    for issue in &issues {
        println!("{issue}");
    }
    if has_errors(&issues) {
        return Err(CliError::Invalid(issues));
    }
    println!(
        "✓ '{}' is valid for {code} ({} warning(s))",
        config.title,
        issues.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcadeck::core::config::model::{ParticleRow, StructureLayer};
    use bcadeck::{Configuration, ElementCatalog, SimulationCode};
    use tempfile::tempdir;

    fn helium_on_tungsten() -> Configuration {
        let catalog = ElementCatalog::builtin().unwrap();
        let mut config = Configuration::new("He on W", SimulationCode::SdTrimSp);
        config.add_beam_row(ParticleRow::beam(catalog.lookup("He").unwrap(), 1.0, 1000.0, 0.0));
        config.add_target_row(ParticleRow::target(catalog.lookup("W").unwrap(), 1.0));
        config.structure = vec![StructureLayer {
            name: "Bulk".to_string(),
            thickness: 2000.0,
            segments: 200,
            abundances: vec![1.0],
        }];
        config
    }

    #[test]
    fn valid_configuration_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        helium_on_tungsten().save(&path).unwrap();

        assert!(run(ValidateArgs { config: path, code: None }).is_ok());
    }

    #[test]
    fn errors_fail_the_command() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut config = helium_on_tungsten();
        config.structure[0].abundances = vec![1.5];
        config.save(&path).unwrap();

        assert!(matches!(
            run(ValidateArgs { config: path, code: None }),
            Err(CliError::Invalid(_))
        ));
    }

    #[test]
    fn additional_lines_are_checked_for_the_requested_code() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut config = helium_on_tungsten();
        config.additional = vec!["future_key = 1".to_string()];
        config.save(&path).unwrap();

        assert!(run(ValidateArgs { config: path.clone(), code: None }).is_ok());
        assert!(matches!(
            run(ValidateArgs {
                config: path,
                code: Some(SimulationCode::Tridyn)
            }),
            Err(CliError::Invalid(_))
        ));
    }
}
