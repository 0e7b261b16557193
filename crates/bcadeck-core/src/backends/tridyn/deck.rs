use super::lookup::{self, ANGLE_MODE, ELST, ENERGY_MODE, IDREL};
use super::{INPUT_EXTENSION, LAYER_EXTENSION, file_stem};
use crate::backends::{ComponentVectors, FRACTION_DIGITS};
use crate::core::config::model::{Component, Configuration};
use crate::core::config::options::{InelasticLossModel, Mode, SimulationCode};
use crate::core::elements::element::{ElementData, ElementPatch};
use crate::core::io::deck::{Deck, DeckFile};
use crate::core::io::format::format_sci;
use crate::error::CompileError;
use itertools::Itertools;
use std::fmt::Display;

const CODE: SimulationCode = SimulationCode::Tridyn;
const DIGITS: usize = FRACTION_DIGITS as usize;

pub(super) const OBLIGATORY_HEADER: &str = "# obligatory control parameters";
pub(super) const OPTIONAL_HEADER: &str = "# optional control parameters";
pub(super) const GLOBAL_DENSITY_KEY: &str = "#gdns";

/// Output flags TRIDYN adds to the `outl` list for logged trajectories.
pub(super) const LOG_REFLECTED: &str = "scat";
pub(super) const LOG_SPUTTERED: &str = "sput";

/// Keys whose arguments are merged from additional lines into the generated line.
pub(super) const LIST_KEYS: [&str; 3] = ["cmpd", "outi", "outl"];

/// An element parameter written as `<key> <component> <value>` when overridden.
pub(super) struct ElementField {
    pub key: &'static str,
    pub get: fn(&ElementData) -> Option<f64>,
    pub set: fn(&mut ElementPatch, f64),
}

pub(super) const ELEMENT_FIELDS: [ElementField; 4] = [
    ElementField {
        key: "mass",
        get: |d| Some(d.atomic_mass),
        set: |p, v| p.atomic_mass = Some(v),
    },
    ElementField {
        key: "edsp",
        get: |d| Some(d.displacement_energy),
        set: |p, v| p.displacement_energy = Some(v),
    },
    ElementField {
        key: "efin",
        get: |d| d.cutoff_energy,
        set: |p, v| p.cutoff_energy = Some(v),
    },
    ElementField {
        key: "dens",
        get: |d| Some(d.atomic_density),
        set: |p, v| p.atomic_density = Some(v),
    },
];

fn sci(value: f64) -> String {
    format_sci(value, DIGITS)
}

/// Line writer for the keyed TRIDYN input.
struct Cards {
    lines: Vec<String>,
}

impl Cards {
    fn card<T: Display>(&mut self, key: &str, args: impl IntoIterator<Item = T>) {
        let args = args.into_iter().join(" ");
        if args.is_empty() {
            self.lines.push(key.to_string());
        } else {
            self.lines.push(format!("{key} {args}"));
        }
    }

    fn raw(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Additional lines split into merged list arguments and verbatim lines.
#[derive(Default)]
struct Additional<'a> {
    lists: [Vec<&'a str>; 3],
    verbatim: Vec<&'a str>,
}

impl<'a> Additional<'a> {
    fn split(lines: &'a [String]) -> Self {
        let mut additional = Additional::default();
        for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
            let mut tokens = line.split_whitespace();
            let key = tokens.next().unwrap_or_default().to_ascii_lowercase();
            match LIST_KEYS.iter().position(|k| *k == key) {
                Some(slot) => additional.lists[slot].extend(tokens),
                None => additional.verbatim.push(line),
            }
        }
        additional
    }
}

/// Appends `extra` to `base`, keeping the first occurrence of every entry.
fn merged<'a>(base: impl IntoIterator<Item = &'a str>, extra: &[&'a str]) -> Vec<&'a str> {
    base.into_iter().chain(extra.iter().copied()).unique().collect()
}

/// Mean of two surface binding energies, or zero when either is unset.
fn pair_binding(a: f64, b: f64) -> f64 {
    if a != 0.0 && b != 0.0 { (a + b) / 2.0 } else { 0.0 }
}

/// The single `elst` model of a run: the settings value and every model named
/// by a row must map to TRIDYN and agree.
fn global_inelastic_model(
    settings: Option<InelasticLossModel>,
    components: &[Component<'_>],
) -> Result<InelasticLossModel, CompileError> {
    let models: Vec<InelasticLossModel> = settings
        .into_iter()
        .chain(components.iter().filter_map(Component::inelastic_loss_model))
        .unique()
        .collect();
    for &model in &models {
        ELST.encode(CODE, model)?;
    }
    match models.as_slice() {
        [] => Ok(lookup::DEFAULT_INELASTIC),
        [model] => Ok(*model),
        _ => Err(CompileError::UnsupportedOption {
            code: CODE,
            option: ELST.option,
            value: models.iter().join(", "),
        }),
    }
}

pub(super) fn render(config: &Configuration) -> Result<Deck, CompileError> {
    ENERGY_MODE.encode(CODE, config.beam_arguments.kinetic_energy_mode)?;
    ANGLE_MODE.encode(CODE, config.beam_arguments.angle_mode)?;

    let components = config.components();
    let vectors = ComponentVectors::new(config);
    let settings = &config.settings;
    let options = &settings.options;
    let additional = Additional::split(&config.additional);
    let layered = config.structure.len() > 1;

    let title = config.title.lines().next().unwrap_or_default().trim();
    let heading = match options.comment.as_deref().map(str::trim) {
        Some(comment) if !comment.is_empty() => format!("{title} {comment}"),
        _ => title.to_string(),
    };
    let mut deck = Cards {
        lines: vec![heading, OBLIGATORY_HEADER.to_string()],
    };

    deck.card(
        "cdat",
        [
            u8::from(layered).to_string(),
            sci(settings.fluence),
            IDREL.encode(CODE, settings.mode)?.to_string(),
        ],
    );
    deck.card(
        "geom",
        [
            sci(config.target_arguments.thickness),
            config.target_arguments.segments.to_string(),
            sci(config.target_arguments.options.film_thickness.unwrap_or(0.0)),
        ],
    );
    deck.card("atda", components.iter().map(Component::symbol));
    if !layered {
        let surface = vectors
            .layers
            .first()
            .cloned()
            .unwrap_or_else(|| vec![0.0; components.len()]);
        deck.card("comp", surface.into_iter().map(sci));
    }
    for (component, fraction) in components.iter().zip(&vectors.beam) {
        if component.beam.is_some() {
            deck.card(
                "irra",
                [
                    component.index.to_string(),
                    sci(component.energy()),
                    sci(component.angle()),
                    sci(*fraction),
                ],
            );
        }
    }

    deck.raw(OPTIONAL_HEADER);
    let compounds = merged(options.compounds.iter().map(String::as_str), &additional.lists[0]);
    if !compounds.is_empty() {
        deck.card("cmpd", compounds);
    }
    deck.card("thrd", [settings.threads]);
    match options.precision {
        Some(precision) => deck.card("prec", [sci(precision)]),
        None => {
            let histories = options.histories.unwrap_or(1);
            let per_history = options
                .projectiles_per_history
                .unwrap_or(lookup::DEFAULT_PSEUDO_PROJECTILES);
            let pseudo_projectiles = histories
                .checked_mul(per_history)
                .ok_or(CompileError::CountOverflow { key: "pspr" })?;
            deck.card("pspr", [pseudo_projectiles]);
        }
    }
    deck.card(
        "coll",
        [
            i64::from(options.collisions.unwrap_or(lookup::DEFAULT_COLLISIONS)),
            if settings.mode == Mode::StaticNoRecoil { -1 } else { 0 },
        ],
    );
    deck.card("damg", [sci(options.vacancy_level.unwrap_or(0.0))]);

    if components
        .iter()
        .any(|c| c.element().differs(|d| d.surface_binding_energy))
    {
        deck.raw("sbem");
        let energies: Vec<f64> = components
            .iter()
            .map(|c| c.element().data().surface_binding_energy)
            .collect();
        for &row in &energies {
            deck.raw(energies.iter().map(|&col| sci(pair_binding(row, col))).join(" "));
        }
    }
    for field in &ELEMENT_FIELDS {
        for component in &components {
            if component.element().differs(field.get)
                && let Some(value) = (field.get)(component.element().data())
            {
                deck.card(field.key, [component.index.to_string(), sci(value)]);
            }
        }
    }
    if let Some(density) = config.target_arguments.options.global_density {
        deck.card(GLOBAL_DENSITY_KEY, [sci(density)]);
    }

    let inelastic = global_inelastic_model(options.inelastic_loss_model, &components)?;
    deck.card("elst", [ELST.encode(CODE, inelastic)?]);
    for component in &components {
        let qumax = component.max_atomic_fraction();
        if qumax != 1.0 {
            deck.card(
                "exst",
                [
                    component.index.to_string(),
                    sci(qumax),
                    component
                        .max_atomic_fraction_action()
                        .unwrap_or(lookup::DEFAULT_FRACTION_ACTION)
                        .to_string(),
                    "0".to_string(),
                ],
            );
        }
    }
    deck.card(
        "fout",
        [
            options.log_frequency,
            options.integral_frequency,
            options.output_frequency,
        ]
        .map(|f| f.unwrap_or(lookup::DEFAULT_OUTPUT_FREQUENCY)),
    );
    if options.profile_output.unwrap_or(false) {
        deck.raw("outp");
    }
    if options.profile_energy.unwrap_or(false) {
        deck.raw("edep");
    }
    let integral = merged(
        options.integral_outputs.iter().map(String::as_str),
        &additional.lists[1],
    );
    if !integral.is_empty() {
        deck.card("outi", integral);
    }
    let mut logged: Vec<&str> = options.projectile_outputs.iter().map(String::as_str).collect();
    if options.log_reflected.unwrap_or(false) {
        logged.push(LOG_REFLECTED);
    }
    if options.log_sputtered.unwrap_or(false) {
        logged.push(LOG_SPUTTERED);
    }
    let logged = merged(logged, &additional.lists[2]);
    if !logged.is_empty() {
        deck.card("outl", logged);
    }
    for line in additional.verbatim {
        deck.raw(line);
    }

    let stem = file_stem(&config.title);
    Ok(Deck {
        input: DeckFile::new(format!("{stem}.{INPUT_EXTENSION}"), deck.finish()),
        layers: layered.then(|| {
            DeckFile::new(
                format!("{stem}.{LAYER_EXTENSION}"),
                render_layers(config, &vectors),
            )
        }),
    })
}

/// One line per depth segment; the first line of a layer carries its name.
fn render_layers(config: &Configuration, vectors: &ComponentVectors) -> String {
    let mut lines = Vec::new();
    for (layer, abundances) in config.structure.iter().zip(&vectors.layers) {
        let values = abundances
            .iter()
            .map(|&v| format!("{:>13}", sci(v)))
            .join("  ");
        let values = values.trim_start();
        lines.push(format!("{values}    {}", layer.name));
        for _ in 1..layer.segments {
            lines.push(values.to_string());
        }
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}
