use crate::cli::ReadDeckArgs;
use crate::config::Settings;
use crate::error::{CliError, Result};
use bcadeck::backend_for;
use bcadeck::core::io::deck::{Deck, DeckFile};
use std::path::Path;
use tracing::info;

fn deck_file(path: &Path) -> Result<DeckFile> {
    let text = std::fs::read_to_string(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(DeckFile::new(name, text))
}

pub fn run(args: ReadDeckArgs, settings: &Settings) -> Result<()> {
    let code = args.code.unwrap_or(settings.default_code);
    let backend = backend_for(code);
    let catalog = settings.element_catalog()?;
    info!(code = %backend.code(), deck = ?args.deck, "Reading deck");

    let config = match &args.layers {
        Some(layers) => {
            let deck = Deck {
                input: deck_file(&args.deck)?,
                layers: Some(deck_file(layers)?),
            };
            backend.read_deck(&deck, &catalog)
        }
        None => backend.read_deck_path(&args.deck, &catalog),
    }
    .map_err(|e| CliError::FileParsing {
        path: args.deck.clone(),
        source: e.into(),
    })?;

    config
        .save(&args.output)
        .map_err(|e| CliError::Core(e.into()))?;
    println!(
        "✓ '{}' ({} beam, {} target row(s), {} layer(s)) written to {}",
        config.title,
        config.beam_rows.len(),
        config.target_rows.len(),
        config.structure.len(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcadeck::core::config::model::{ParticleRow, StructureLayer};
    use bcadeck::{Configuration, ElementCatalog, SimulationCode};
    use tempfile::tempdir;

    fn layered(code: SimulationCode) -> Configuration {
        let catalog = ElementCatalog::builtin().unwrap();
        let mut config = Configuration::new("D on WO", code);
        config.add_beam_row(ParticleRow::beam(catalog.lookup("D").unwrap(), 1.0, 200.0, 0.0));
        config.add_target_row(ParticleRow::target(catalog.lookup("W").unwrap(), 0.5));
        config.add_target_row(ParticleRow::target(catalog.lookup("O").unwrap(), 0.5));
        config.structure = vec![
            StructureLayer {
                name: "Oxide".to_string(),
                thickness: 500.0,
                segments: 50,
                abundances: vec![0.25, 0.75],
            },
            StructureLayer {
                name: "Bulk".to_string(),
                thickness: 1500.0,
                segments: 150,
                abundances: vec![1.0, 0.0],
            },
        ];
        config
    }

    #[test]
    fn conventional_layer_file_is_found() {
        let dir = tempdir().unwrap();
        let config = layered(SimulationCode::Tridyn);
        let (deck, _) = backend_for(SimulationCode::Tridyn).compile(&config).unwrap();
        let files = deck.write_to_dir(dir.path()).unwrap();
        let output = dir.path().join("read.json");

        run(
            ReadDeckArgs {
                deck: files[0].clone(),
                code: Some(SimulationCode::Tridyn),
                layers: None,
                output: output.clone(),
            },
            &Settings::load(None).unwrap(),
        )
        .unwrap();

        let read = Configuration::load(&output).unwrap();
        assert_eq!(read.structure.len(), 2);
        assert_eq!(read.target_rows.len(), 2);
    }

    #[test]
    fn explicit_layer_file_and_default_code() {
        let dir = tempdir().unwrap();
        let config = layered(SimulationCode::SdTrimSp);
        let (deck, _) = backend_for(SimulationCode::SdTrimSp).compile(&config).unwrap();
        let input = dir.path().join("input.txt");
        let layers = dir.path().join("layers.txt");
        std::fs::write(&input, &deck.input.text).unwrap();
        std::fs::write(&layers, &deck.layers.as_ref().unwrap().text).unwrap();
        let output = dir.path().join("read.json");

        run(
            ReadDeckArgs {
                deck: input,
                code: None,
                layers: Some(layers),
                output: output.clone(),
            },
            &Settings::load(None).unwrap(),
        )
        .unwrap();

        let read = Configuration::load(&output).unwrap();
        assert_eq!(read.simulation, SimulationCode::SdTrimSp);
        assert_eq!(read.structure[0].name, "Oxide");
    }

    #[test]
    fn garbage_deck_reports_the_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("tri.inp");
        std::fs::write(&input, "not a deck\n").unwrap();

        let result = run(
            ReadDeckArgs {
                deck: input,
                code: Some(SimulationCode::SdTrimSp),
                layers: None,
                output: dir.path().join("read.json"),
            },
            &Settings::load(None).unwrap(),
        );

        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
