use super::deck::{
    ELEMENT_FIELDS, GLOBAL_DENSITY_KEY, LOG_REFLECTED, LOG_SPUTTERED, OBLIGATORY_HEADER,
    OPTIONAL_HEADER,
};
use super::lookup::{ELST, IDREL};
use super::params::is_numeric_row;
use crate::backends::{DeckComponent, DeckLayer, assemble_configuration};
use crate::core::config::model::{Configuration, DEFAULT_LAYER_NAME};
use crate::core::config::options::{Mode, SimulationCode};
use crate::core::elements::catalog::ElementCatalog;
use crate::core::elements::element::ElementPatch;
use crate::core::io::deck::{Deck, DeckFile};
use crate::core::io::format::{parse_int, parse_number};
use crate::error::DeckError;
use tracing::debug;

/// Keys interpreted by the reader. Any other line becomes an additional line.
const INTERPRETED_KEYS: &[&str] = &[
    "cdat", "geom", "atda", "comp", "irra", "cmpd", "thrd", "pspr", "prec", "coll", "damg",
    "sbem", "mass", "edsp", "efin", "dens", "elst", "exst", "fout", "outp", "edep", "outi",
    "outl", GLOBAL_DENSITY_KEY,
];

/// One `key args...` line.
#[derive(Debug)]
struct Card {
    key: String,
    args: Vec<String>,
    line: usize,
}

impl Card {
    fn invalid(&self, details: String) -> DeckError {
        DeckError::Parse {
            line: self.line,
            details,
        }
    }

    fn arg(&self, position: usize) -> Result<&str, DeckError> {
        self.args.get(position).map(String::as_str).ok_or_else(|| {
            self.invalid(format!("'{}' is missing argument {}", self.key, position + 1))
        })
    }

    fn parsed<T>(&self, position: usize, parse: impl Fn(&str) -> Option<T>) -> Result<T, DeckError> {
        let token = self.arg(position)?;
        parse(token).ok_or_else(|| {
            self.invalid(format!("invalid value '{token}' for '{}'", self.key))
        })
    }

    fn number(&self, position: usize) -> Result<f64, DeckError> {
        self.parsed(position, parse_number)
    }

    fn int(&self, position: usize) -> Result<i64, DeckError> {
        self.parsed(position, parse_int)
    }

    fn count<T: TryFrom<i64>>(&self, position: usize) -> Result<T, DeckError> {
        self.parsed(position, |token| parse_int(token).and_then(|n| T::try_from(n).ok()))
    }

    /// Zero-based position of the one-based component number at `position`.
    fn component(&self, position: usize, ncp: usize) -> Result<usize, DeckError> {
        let index: usize = self.count(position)?;
        if (1..=ncp).contains(&index) {
            Ok(index - 1)
        } else {
            Err(self.invalid(format!("component {index} of '{}' is out of range", self.key)))
        }
    }
}

struct Cards {
    title: String,
    cards: Vec<Card>,
    /// Rows of the surface binding matrix following `sbem`.
    binding_matrix: Vec<(usize, Vec<String>)>,
    additional: Vec<String>,
}

impl Cards {
    fn parse(text: &str) -> Self {
        let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));
        let title = lines
            .next()
            .map(|(_, line)| line.trim().to_string())
            .unwrap_or_default();

        let mut cards = Vec::new();
        let mut binding_matrix = Vec::new();
        let mut additional = Vec::new();
        let mut in_matrix = false;
        for (number, line) in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if in_matrix && is_numeric_row(trimmed) {
                binding_matrix.push((
                    number,
                    trimmed.split_whitespace().map(str::to_string).collect(),
                ));
                continue;
            }
            in_matrix = false;

            let mut tokens = trimmed.split_whitespace();
            let key = tokens.next().unwrap_or_default().to_ascii_lowercase();
            if !INTERPRETED_KEYS.contains(&key.as_str()) {
                if trimmed != OBLIGATORY_HEADER && trimmed != OPTIONAL_HEADER {
                    additional.push(trimmed.to_string());
                }
                continue;
            }
            in_matrix = key == "sbem";
            cards.push(Card {
                key,
                args: tokens.map(str::to_string).collect(),
                line: number,
            });
        }
        Self {
            title,
            cards,
            binding_matrix,
            additional,
        }
    }

    fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Card> {
        self.cards.iter().filter(move |card| card.key == key)
    }

    /// The last card with `key`; later lines override earlier ones.
    fn one(&self, key: &str) -> Option<&Card> {
        self.cards.iter().rev().find(|card| card.key == key)
    }

    fn has(&self, key: &str) -> bool {
        self.one(key).is_some()
    }

    /// Arguments of every card with `key`, concatenated.
    fn words(&self, key: &str) -> Vec<String> {
        self.all(key).flat_map(|card| card.args.iter().cloned()).collect()
    }
}

/// Parses the `.lay` file: one line per segment, a new layer wherever a line
/// carries a name or the composition changes.
fn parse_layers(file: &DeckFile, ncp: usize, thickness: f64) -> Result<Vec<DeckLayer>, DeckError> {
    let mut layers: Vec<DeckLayer> = Vec::new();
    for (number, line) in file.text.lines().enumerate().map(|(i, l)| (i + 1, l)) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < ncp {
            return Err(DeckError::Parse {
                line: number,
                details: format!("expected {ncp} abundances, found {}", tokens.len()),
            });
        }
        let abundances = tokens[..ncp]
            .iter()
            .map(|token| {
                parse_number(token).ok_or_else(|| DeckError::Parse {
                    line: number,
                    details: format!("invalid abundance '{token}'"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let name = tokens[ncp..].join(" ");
        let continued = name.is_empty()
            && layers.last().is_some_and(|layer| layer.abundances == abundances);
        if continued {
            if let Some(layer) = layers.last_mut() {
                layer.segments += 1;
            }
        } else {
            layers.push(DeckLayer {
                name: if name.is_empty() {
                    format!("{DEFAULT_LAYER_NAME} {}", layers.len() + 1)
                } else {
                    name
                },
                thickness: 0.0,
                segments: 1,
                abundances,
            });
        }
    }
    let total: u32 = layers.iter().map(|l| l.segments).sum();
    if total == 0 {
        return Err(DeckError::Parse {
            line: 1,
            details: "layer file holds no segments".to_string(),
        });
    }
    for layer in &mut layers {
        layer.thickness = thickness * f64::from(layer.segments) / f64::from(total);
    }
    Ok(layers)
}

pub(super) fn read(deck: &Deck, catalog: &ElementCatalog) -> Result<Configuration, DeckError> {
    let cards = Cards::parse(&deck.input.text);

    let symbols = cards.words("atda");
    if symbols.is_empty() {
        return Err(DeckError::MissingKey("atda"));
    }
    let ncp = symbols.len();
    let elements = symbols
        .iter()
        .map(|symbol| catalog.lookup(symbol))
        .collect::<Result<Vec<_>, _>>()?;

    let mut patches = vec![ElementPatch::default(); ncp];
    for field in &ELEMENT_FIELDS {
        for card in cards.all(field.key) {
            let i = card.component(0, ncp)?;
            let value = card.number(1)?;
            if (field.get)(elements[i].data()) != Some(value) {
                (field.set)(&mut patches[i], value);
            }
        }
    }
    if cards.has("sbem") {
        if cards.binding_matrix.len() != ncp {
            return Err(DeckError::Length {
                key: "sbem".to_string(),
                expected: ncp,
                found: cards.binding_matrix.len(),
            });
        }
        for (i, (line, row)) in cards.binding_matrix.iter().enumerate() {
            let value = row.get(i).and_then(|token| parse_number(token)).ok_or_else(|| {
                DeckError::Parse {
                    line: *line,
                    details: format!("binding matrix row has no entry {}", i + 1),
                }
            })?;
            if value != elements[i].data().surface_binding_energy {
                patches[i].surface_binding_energy = Some(value);
            }
        }
    }
    let elements = elements
        .into_iter()
        .zip(&patches)
        .map(|(element, patch)| {
            if patch.is_empty() {
                Ok(element)
            } else {
                element.with_override(patch)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let cdat = cards.one("cdat").ok_or(DeckError::MissingKey("cdat"))?;
    let geom = cards.one("geom").ok_or(DeckError::MissingKey("geom"))?;
    let layered = cdat.int(0)? != 0;
    let xmax = geom.number(0)?;
    let nqx: u32 = geom.count(1)?;
    let film = geom.number(2)?;

    let mut beam = vec![None; ncp];
    for card in cards.all("irra") {
        let i = card.component(0, ncp)?;
        beam[i] = Some((card.number(1)?, card.number(2)?, card.number(3)?));
    }
    let mut qumax = vec![(1.0, None); ncp];
    for card in cards.all("exst") {
        let i = card.component(0, ncp)?;
        qumax[i] = (card.number(1)?, Some(card.count::<u32>(2)?));
    }

    let layers = if layered {
        let file = deck.layers.as_ref().ok_or(DeckError::MissingLayerFile)?;
        parse_layers(file, ncp, xmax)?
    } else {
        let comp = match cards.one("comp") {
            Some(card) => {
                if card.args.len() != ncp {
                    return Err(DeckError::Length {
                        key: "comp".to_string(),
                        expected: ncp,
                        found: card.args.len(),
                    });
                }
                (0..ncp).map(|i| card.number(i)).collect::<Result<Vec<_>, _>>()?
            }
            None => vec![0.0; ncp],
        };
        vec![DeckLayer {
            name: DEFAULT_LAYER_NAME.to_string(),
            thickness: xmax,
            segments: nqx,
            abundances: comp,
        }]
    };

    let components: Vec<DeckComponent> = (0..ncp)
        .map(|i| {
            let (energy, angle, fraction) = beam[i].unwrap_or((0.0, 0.0, 0.0));
            DeckComponent {
                element: elements[i].clone(),
                beam_fraction: fraction,
                energy,
                angle,
                max_atomic_fraction: qumax[i].0,
                max_atomic_fraction_action: qumax[i].1,
                inelastic_loss_model: None,
                is_beam: beam[i].is_some(),
                is_target: beam[i].is_none()
                    || layers
                        .iter()
                        .any(|layer| layer.abundances.get(i).is_some_and(|&a| a > 0.0)),
            }
        })
        .collect();

    let mut config =
        assemble_configuration(cards.title.clone(), SimulationCode::Tridyn, &components, layers);
    config.target_arguments.thickness = xmax;
    config.target_arguments.segments = nqx;
    config.target_arguments.options.film_thickness = (film != 0.0).then_some(film);
    config.target_arguments.options.global_density = cards
        .one(GLOBAL_DENSITY_KEY)
        .map(|card| card.number(0))
        .transpose()?;

    let settings = &mut config.settings;
    settings.fluence = cdat.number(1)?;
    settings.mode = IDREL.decode(cdat.int(2)?)?;
    let coll = cards.one("coll");
    if let Some(card) = coll {
        settings.options.collisions = Some(card.count(0)?);
        if settings.mode == Mode::Static && card.args.len() > 1 && card.number(1)? == -1.0 {
            settings.mode = Mode::StaticNoRecoil;
        }
    }
    if let Some(card) = cards.one("thrd") {
        settings.threads = card.count(0)?;
    }

    let options = &mut settings.options;
    options.precision = cards.one("prec").map(|card| card.number(0)).transpose()?;
    options.projectiles_per_history = cards.one("pspr").map(|card| card.count(0)).transpose()?;
    options.vacancy_level = cards.one("damg").map(|card| card.number(0)).transpose()?;
    options.inelastic_loss_model = cards
        .one("elst")
        .map(|card| card.int(0).and_then(|n| ELST.decode(n)))
        .transpose()?;
    if let Some(card) = cards.one("fout") {
        options.log_frequency = Some(card.count(0)?);
        options.integral_frequency = Some(card.count(1)?);
        options.output_frequency = Some(card.count(2)?);
    }
    options.profile_output = cards.has("outp").then_some(true);
    options.profile_energy = cards.has("edep").then_some(true);
    options.compounds = cards.words("cmpd");
    options.integral_outputs = cards.words("outi");
    let logged = cards.words("outl");
    let logs = |flag: &str| {
        logged
            .iter()
            .any(|output| output.eq_ignore_ascii_case(flag))
            .then_some(true)
    };
    options.log_reflected = logs(LOG_REFLECTED);
    options.log_sputtered = logs(LOG_SPUTTERED);
    options.projectile_outputs = logged;

    config.additional = cards.additional;
    debug!(
        "Read TRIDYN deck '{}' with {} components and {} layers",
        config.title,
        ncp,
        config.structure.len()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::tridyn::deck::render;
    use crate::core::config::model::tests::four_row_config;
    use crate::core::config::validation::{has_errors, validate};

    fn catalog() -> ElementCatalog {
        ElementCatalog::builtin().unwrap()
    }

    fn round_trip(config: &Configuration) -> (Deck, Configuration, Deck) {
        let deck = render(config).unwrap();
        let back = read(&deck, &catalog()).unwrap();
        let again = render(&back).unwrap();
        (deck, back, again)
    }

    fn input_only(text: &str) -> Deck {
        Deck {
            input: DeckFile::new("test______.in", text),
            layers: None,
        }
    }

    #[test]
    fn compiled_deck_reads_back_to_same_deck() {
        let config = four_row_config(SimulationCode::Tridyn);

        let (deck, back, again) = round_trip(&config);

        assert_eq!(deck, again);
        assert_eq!(back.beam_rows.len(), 2);
        assert_eq!(back.target_rows.len(), 2);
        assert_eq!(back.beam_rows[0].energy, Some(500.0));
        assert_eq!(back.beam_rows[1].angle, Some(30.0));
        assert_eq!(back.structure.len(), 2);
        assert_eq!(back.structure[0].name, "Oxide");
        assert_eq!(back.structure[0].thickness, 1000.0);
        assert_eq!(back.structure[1].segments, 100);
        assert_eq!(back.structure[1].abundances, vec![1.0, 0.0]);
        assert!(!has_errors(&validate(&back)));
    }

    #[test]
    fn settings_and_overrides_round_trip() {
        let mut config = four_row_config(SimulationCode::Tridyn);
        config.structure.truncate(1);
        config.structure[0].thickness = 2000.0;
        config.structure[0].segments = 200;
        config.settings.mode = Mode::StaticNoRecoil;
        config.settings.threads = 4;
        config.settings.options.log_sputtered = Some(true);
        config.settings.options.profile_energy = Some(true);
        config.settings.options.vacancy_level = Some(0.2);
        config.target_rows[1].max_atomic_fraction = 0.6;
        config.target_arguments.options.global_density = Some(0.07);
        config.additional = vec!["rand 7".to_string(), "outi dens".to_string()];
        let silicon = config.target_rows[0].element.clone();
        config.target_rows[0].element = silicon
            .with_override(&ElementPatch {
                surface_binding_energy: Some(4.0),
                displacement_energy: Some(12.0),
                ..Default::default()
            })
            .unwrap();

        let (deck, back, again) = round_trip(&config);

        assert_eq!(deck, again);
        assert_eq!(back.settings.mode, Mode::StaticNoRecoil);
        assert_eq!(back.settings.threads, 4);
        assert_eq!(back.settings.options.log_sputtered, Some(true));
        assert_eq!(back.settings.options.integral_outputs, vec!["dens".to_string()]);
        assert_eq!(back.target_rows[1].max_atomic_fraction, 0.6);
        assert_eq!(back.target_arguments.options.global_density, Some(0.07));
        assert_eq!(back.additional, vec!["rand 7".to_string()]);
        let si = &back.target_rows[0].element;
        assert!(si.is_modified());
        assert_eq!(si.data().surface_binding_energy, 4.0);
        assert_eq!(si.data().displacement_energy, 12.0);
        assert!(!back.target_rows[1].element.is_modified());
    }

    #[test]
    fn hand_written_deck_is_understood() {
        let text = "\
He on W
cdat 0 5.0E+00 1
geom 1.0E+03 100 0.0
atda He W
comp 0.0 1.0
irra 1 2.0E+02 0.0 1.0
# seed
rand 3
";
        let config = read(&input_only(text), &catalog()).unwrap();

        assert_eq!(config.title, "He on W");
        assert_eq!(config.settings.mode, Mode::Dynamic);
        assert_eq!(config.settings.fluence, 5.0);
        assert_eq!(config.beam_rows[0].symbol, "He");
        assert_eq!(config.beam_rows[0].energy, Some(200.0));
        assert_eq!(config.target_rows[0].symbol, "W");
        assert_eq!(config.target_arguments.thickness, 1000.0);
        assert_eq!(config.additional, vec!["# seed".to_string(), "rand 3".to_string()]);
    }

    #[test]
    fn malformed_decks_are_rejected() {
        let catalog = catalog();
        assert!(matches!(
            read(&input_only("t\ncdat 0 1.0 0\n"), &catalog),
            Err(DeckError::MissingKey("atda"))
        ));

        let bad_index = "t\ncdat 0 1.0 0\ngeom 10.0 10 0.0\natda He\nirra 2 1.0 0.0 1.0\n";
        assert!(matches!(
            read(&input_only(bad_index), &catalog),
            Err(DeckError::Parse { line: 5, .. })
        ));

        let short_comp = "t\ncdat 0 1.0 0\ngeom 10.0 10 0.0\natda He W\ncomp 1.0\n";
        assert!(matches!(
            read(&input_only(short_comp), &catalog),
            Err(DeckError::Length { expected: 2, found: 1, .. })
        ));

        let config = four_row_config(SimulationCode::Tridyn);
        let mut deck = render(&config).unwrap();
        deck.layers = None;
        assert!(matches!(read(&deck, &catalog), Err(DeckError::MissingLayerFile)));
    }

    #[test]
    fn unknown_native_value_is_reported() {
        let text = "t\ncdat 0 1.0 0\ngeom 10.0 10 0.0\natda He\nirra 1 1.0 0.0 1.0\nelst 9\n";

        assert!(matches!(
            read(&input_only(text), &catalog()),
            Err(DeckError::UnknownValue { key: "elst", value: 9 })
        ));
    }
}
