use super::load_configuration;
use crate::cli::CompileArgs;
use crate::config::Settings;
use crate::error::Result;
use bcadeck::backend_with_version;
use bcadeck::workflows::prepare;
use tracing::info;

pub fn run(args: CompileArgs, settings: &Settings) -> Result<()> {
    let mut config = load_configuration(&args.config)?;
    if let Some(code) = args.code {
        config.simulation = code;
    }
    let version = args.sdtrimsp_version.unwrap_or(settings.sdtrimsp_version);
    let backend = backend_with_version(config.simulation, version);

    let prepared = prepare::run(&config, backend, &args.output)?;
    info!(
        warnings = prepared.warnings.len(),
        "Compilation finished"
    );

    for issue in &prepared.warnings {
        println!("{issue}");
    }
    for file in &prepared.files {
        println!("✓ Wrote {}", file.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use bcadeck::SimulationCode;
    use bcadeck::backends::sdtrimsp::SdTrimSpVersion;
    use bcadeck::core::config::model::{ParticleRow, StructureLayer};
    use bcadeck::{Configuration, ElementCatalog};
    use tempfile::tempdir;

    fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
        let catalog = ElementCatalog::builtin().unwrap();
        let mut config = Configuration::new("Ar on Si", SimulationCode::SdTrimSp);
        config.add_beam_row(ParticleRow::beam(catalog.lookup("Ar").unwrap(), 1.0, 500.0, 0.0));
        config.add_target_row(ParticleRow::target(catalog.lookup("Si").unwrap(), 1.0));
        config.structure = vec![StructureLayer {
            name: "Bulk".to_string(),
            thickness: 2000.0,
            segments: 200,
            abundances: vec![1.0],
        }];
        let path = dir.join("run.json");
        config.save(&path).unwrap();
        path
    }

    #[test]
    fn writes_sdtrimsp_deck() {
        let dir = tempdir().unwrap();
        let config = write_config(dir.path());
        let output = dir.path().join("deck");

        run(
            CompileArgs {
                config,
                output: output.clone(),
                code: None,
                sdtrimsp_version: None,
            },
            &Settings::load(None).unwrap(),
        )
        .unwrap();

        let deck = std::fs::read_to_string(output.join("tri.inp")).unwrap();
        assert!(deck.starts_with("Ar on Si"));
        assert!(!output.join("layer.inp").exists());
    }

    #[test]
    fn code_override_selects_tridyn() {
        let dir = tempdir().unwrap();
        let config = write_config(dir.path());
        let output = dir.path().join("deck");

        run(
            CompileArgs {
                config,
                output: output.clone(),
                code: Some(SimulationCode::Tridyn),
                sdtrimsp_version: Some(SdTrimSpVersion::V6_09),
            },
            &Settings::load(None).unwrap(),
        )
        .unwrap();

        assert!(output.join("AronSi____.in").exists());
    }

    #[test]
    fn missing_configuration_is_an_error() {
        let dir = tempdir().unwrap();

        let result = run(
            CompileArgs {
                config: dir.path().join("absent.json"),
                output: dir.path().join("deck"),
                code: None,
                sdtrimsp_version: None,
            },
            &Settings::load(None).unwrap(),
        );

        assert!(matches!(result, Err(CliError::Core(_))));
    }
}
