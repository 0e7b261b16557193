use super::lookup::{self, CASE_ALPHA, CASE_E0, IDREL, IINTEGRAL, IPOT};
use super::{INPUT_FILE, LAYER_FILE, SdTrimSpVersion};
use crate::backends::ComponentVectors;
use crate::core::config::model::{Component, Configuration};
use crate::core::config::options::SimulationCode;
use crate::core::elements::element::{ElementData, ElementPatch};
use crate::core::io::deck::{Deck, DeckFile};
use crate::core::io::format::{format_bool, format_fixed, format_sci};
use crate::error::CompileError;
use itertools::Itertools;
use std::fmt::Display;

const CODE: SimulationCode = SimulationCode::SdTrimSp;

pub(super) const SECTION_EXTRA: &str = "extra";

/// An element parameter that is written as a per-component array when overridden.
pub(super) struct ElementArray {
    pub key: &'static str,
    pub get: fn(&ElementData) -> f64,
    pub set: fn(&mut ElementPatch, f64),
}

pub(super) const ELEMENT_ARRAYS: [ElementArray; 4] = [
    ElementArray {
        key: "e_surfb",
        get: |d| d.surface_binding_energy,
        set: |p, v| p.surface_binding_energy = Some(v),
    },
    ElementArray {
        key: "e_displ",
        get: |d| d.displacement_energy,
        set: |p, v| p.displacement_energy = Some(v),
    },
    ElementArray {
        key: "dns0",
        get: |d| d.atomic_density,
        set: |p, v| p.atomic_density = Some(v),
    },
    ElementArray {
        key: "a_mass",
        get: |d| d.atomic_mass,
        set: |p, v| p.atomic_mass = Some(v),
    },
];

/// Line-based writer for the `&TRI_INP` namelist.
struct Namelist {
    lines: Vec<String>,
}

impl Namelist {
    fn new(title: &str) -> Self {
        Self {
            lines: vec![title.to_string(), "&TRI_INP".to_string()],
        }
    }

    fn section(&mut self, name: &str) {
        if self.lines.len() > 2 {
            self.lines.push(String::new());
        }
        self.lines.push(format!("text = \"--- {name} ---\""));
    }

    fn set(&mut self, key: &str, value: impl Display) {
        self.lines.push(format!("    {key} = {value}"));
    }

    fn raw(&mut self, line: &str) {
        self.lines.push(format!("    {line}"));
    }

    fn finish(mut self) -> String {
        self.lines.push("/".to_string());
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

fn list<T>(values: impl IntoIterator<Item = T>, render: impl Fn(T) -> String) -> String {
    values.into_iter().map(render).join(", ")
}

fn fixed_list(values: impl IntoIterator<Item = f64>) -> String {
    list(values, format_fixed)
}

/// Product of particle counts written under `key`.
fn count(key: &'static str, factors: &[u64]) -> Result<u64, CompileError> {
    factors
        .iter()
        .try_fold(1u64, |acc, &factor| acc.checked_mul(factor))
        .ok_or(CompileError::CountOverflow { key })
}

pub(super) fn render(config: &Configuration, version: SdTrimSpVersion) -> Result<Deck, CompileError> {
    let tables = lookup::tables(version);
    let components = config.components();
    let vectors = ComponentVectors::new(config);
    let options = &config.settings.options;
    let title = config.title.lines().next().unwrap_or_default().trim();
    let mut deck = Namelist::new(title);

    deck.section("elements");
    deck.set("ncp", components.len());
    deck.set("symbol", list(&components, |c| format!("\"{}\"", c.symbol())));
    deck.raw(&match config.target_arguments.options.global_density {
        Some(density) => format!("!globaldensity = True, {}", format_fixed(density)),
        None => "!globaldensity = False, 0.0".to_string(),
    });
    let inel0 = components
        .iter()
        .map(|c| {
            let model = c
                .inelastic_loss_model()
                .or(options.inelastic_loss_model)
                .unwrap_or(tables.default_inelastic);
            tables.inel0.encode(CODE, model)
        })
        .collect::<Result<Vec<_>, _>>()?;
    deck.set("inel0", inel0.iter().join(", "));
    for array in &ELEMENT_ARRAYS {
        if components.iter().any(|c| c.element().differs(array.get)) {
            deck.set(
                array.key,
                fixed_list(components.iter().map(|c| (array.get)(c.element().data()))),
            );
        }
    }

    let histories = options.histories.unwrap_or(lookup::DEFAULT_HISTORIES);
    let projectiles = options
        .projectiles_per_history
        .unwrap_or(lookup::DEFAULT_PROJECTILES);
    deck.section("general");
    deck.set("idrel", IDREL.encode(CODE, config.settings.mode)?);
    deck.set("flc", format_fixed(config.settings.fluence));
    deck.set("nh", histories);
    deck.set(
        "idout",
        options.output_interval.unwrap_or(lookup::DEFAULT_OUTPUT_INTERVAL),
    );
    deck.set("nr_pproj", projectiles);
    deck.set(
        "ipot",
        IPOT.encode(
            CODE,
            options.interaction_potential.unwrap_or(lookup::DEFAULT_POTENTIAL),
        )?,
    );
    deck.set(
        "iintegral",
        IINTEGRAL.encode(
            CODE,
            options.integration_method.unwrap_or(lookup::DEFAULT_INTEGRATION),
        )?,
    );
    deck.set(
        "isbv",
        tables.isbv.encode(
            CODE,
            options
                .surface_binding_model
                .unwrap_or(tables.default_surface_binding),
        )?,
    );

    let beam = &config.beam_arguments;
    deck.section("beam");
    deck.set("qubeam", fixed_list(vectors.beam.iter().copied()));
    deck.set("case_e0", CASE_E0.encode(CODE, beam.kinetic_energy_mode)?);
    deck.set("e0", fixed_list(components.iter().map(Component::energy)));
    deck.set("case_alpha", CASE_ALPHA.encode(CODE, beam.angle_mode)?);
    deck.set("alpha0", fixed_list(components.iter().map(Component::angle)));
    if beam.kinetic_energy_mode.is_sweep() || beam.angle_mode.is_sweep() {
        deck.set(
            "number_calc",
            beam.options.sweep.unwrap_or(lookup::DEFAULT_SWEEP_STEPS),
        );
    }

    deck.section("target");
    let surface = vectors
        .layers
        .first()
        .cloned()
        .unwrap_or_else(|| vec![0.0; components.len()]);
    deck.set("qu", fixed_list(surface));
    deck.set(
        "qumax",
        fixed_list(components.iter().map(Component::max_atomic_fraction)),
    );
    deck.set("ttarget", format_fixed(config.target_arguments.thickness));
    deck.set("nqx", config.target_arguments.segments);
    deck.set("iq0", if config.structure.len() > 1 { -1 } else { 0 });

    let log_reflected = options.log_reflected.unwrap_or(false);
    let log_sputtered = options.log_sputtered.unwrap_or(false);
    deck.section("output options");
    deck.set("lparticle_p", format_bool(log_reflected));
    if log_reflected {
        deck.set("ioutput_part(2)", count("ioutput_part(2)", &[histories, projectiles])?);
    }
    deck.set("lparticle_r", format_bool(log_sputtered));
    if log_sputtered {
        deck.set("ioutput_part(5)", count("ioutput_part(5)", &[histories, projectiles, 100])?);
    }
    deck.set("lmatrices", format_bool(options.log_matrix.unwrap_or(false)));

    let additional: Vec<&str> = config
        .additional
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();
    if !additional.is_empty() {
        deck.section(SECTION_EXTRA);
        for line in additional {
            deck.raw(line);
        }
    }

    Ok(Deck {
        input: DeckFile::new(INPUT_FILE, deck.finish()),
        layers: (config.structure.len() > 1)
            .then(|| DeckFile::new(LAYER_FILE, render_layers(config, &vectors))),
    })
}

fn render_layers(config: &Configuration, vectors: &ComponentVectors) -> String {
    let ncp = vectors.beam.len();
    let mut lines = vec![
        "number of    thick-    target composition 2...ncp    name of layer".to_string(),
        format!(
            "layers       ness      {}",
            (2..=ncp).map(|i| format!("qu_{i}")).join("           ")
        ),
    ];
    for (layer, abundances) in config.structure.iter().zip(&vectors.layers) {
        let segments = layer.segments.max(1);
        let values = abundances
            .iter()
            .skip(1)
            .map(|&v| format!("{:>13}", format_sci(v, 5)))
            .join("  ");
        lines.push(format!(
            "{:>6} {:>12}  {}    {}",
            segments,
            format_sci(layer.thickness / f64::from(segments), 5),
            values,
            layer.name
        ));
    }
    lines.push(format!(
        "     0            0    {}    end",
        vec!["          0"; ncp.saturating_sub(1)].join("    ")
    ));
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::model::tests::four_row_config;
    use crate::core::config::options::{InelasticLossModel, KineticEnergyMode};

    const FOUR_ROW_DECK: &str = r#"Ar and Ne on Si
&TRI_INP
text = "--- elements ---"
    ncp = 4
    symbol = "Ar", "Ne", "Si", "O"
    !globaldensity = False, 0.0
    inel0 = 3, 3, 3, 3

text = "--- general ---"
    idrel = 1
    flc = 1.0
    nh = 1000
    idout = 10
    nr_pproj = 100
    ipot = 1
    iintegral = 2
    isbv = 1

text = "--- beam ---"
    qubeam = 0.5, 0.5, 0.0, 0.0
    case_e0 = 0
    e0 = 500.0, 1000.0, 0.0, 0.0
    case_alpha = 0
    alpha0 = 0.0, 30.0, 0.0, 0.0

text = "--- target ---"
    qu = 0.0, 0.0, 0.5, 0.5
    qumax = 1.0, 1.0, 1.0, 1.0
    ttarget = 2000.0
    nqx = 200
    iq0 = -1

text = "--- output options ---"
    lparticle_p = .false.
    lparticle_r = .false.
    lmatrices = .false.
/
"#;

    const FOUR_ROW_LAYERS: &str = "\
number of    thick-    target composition 2...ncp    name of layer
layers       ness      qu_2           qu_3           qu_4
   100  1.00000E+01    0.00000E+00    5.00000E-01    5.00000E-01    Oxide
   100  1.00000E+01    0.00000E+00    1.00000E+00    0.00000E+00    Bulk
     0            0              0              0              0    end
";

    #[test]
    fn four_row_configuration_renders_expected_deck() {
        let config = four_row_config(SimulationCode::SdTrimSp);

        let deck = render(&config, SdTrimSpVersion::V6_01).unwrap();

        assert_eq!(deck.input.name, "tri.inp");
        assert_eq!(deck.input.text, FOUR_ROW_DECK);
        let layers = deck.layers.unwrap();
        assert_eq!(layers.name, "layer.inp");
        assert_eq!(layers.text, FOUR_ROW_LAYERS);
    }

    #[test]
    fn rendering_is_deterministic() {
        let config = four_row_config(SimulationCode::SdTrimSp);

        let first = render(&config, SdTrimSpVersion::V6_09).unwrap();
        let second = render(&config, SdTrimSpVersion::V6_09).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn newer_dialect_uses_its_own_defaults() {
        let config = four_row_config(SimulationCode::SdTrimSp);

        let deck = render(&config, SdTrimSpVersion::V6_09).unwrap();

        assert!(deck.input.text.contains("    inel0 = 7, 7, 7, 7\n"));
        assert!(deck.input.text.contains("    isbv = 8\n"));
    }

    #[test]
    fn modified_elements_emit_parameter_arrays() {
        let mut config = four_row_config(SimulationCode::SdTrimSp);
        let silicon = config.target_rows[0].element.clone();
        config.target_rows[0].element = silicon
            .with_override(&ElementPatch {
                surface_binding_energy: Some(4.0),
                ..Default::default()
            })
            .unwrap();

        let text = render(&config, SdTrimSpVersion::V6_01).unwrap().input.text;

        assert!(text.contains("    e_surfb = "));
        assert!(text.contains(", 4.0, "));
        assert!(!text.contains("e_displ"));
        assert!(!text.contains("a_mass"));
    }

    #[test]
    fn single_layer_has_no_layer_file_and_sweep_sets_number_calc() {
        let mut config = four_row_config(SimulationCode::SdTrimSp);
        config.structure.truncate(1);
        config.structure[0].thickness = 2000.0;
        config.structure[0].segments = 200;
        config.beam_arguments.kinetic_energy_mode = KineticEnergyMode::Sweep;
        config.settings.options.log_reflected = Some(true);
        config.additional = vec!["  tableinp = \"../tables\"".to_string(), String::new()];

        let deck = render(&config, SdTrimSpVersion::V6_01).unwrap();

        assert!(deck.layers.is_none());
        let text = deck.input.text;
        assert!(text.contains("    iq0 = 0\n"));
        assert!(text.contains("    number_calc = 18\n"));
        assert!(text.contains("    lparticle_p = .true.\n    ioutput_part(2) = 100000\n"));
        assert!(text.ends_with("text = \"--- extra ---\"\n    tableinp = \"../tables\"\n/\n"));
    }

    #[test]
    fn oversized_output_counts_are_rejected() {
        let mut config = four_row_config(SimulationCode::SdTrimSp);
        config.settings.options.histories = Some(u64::MAX / 2);
        config.settings.options.projectiles_per_history = Some(1);
        config.settings.options.log_sputtered = Some(true);

        let result = render(&config, SdTrimSpVersion::V6_01);

        assert!(matches!(
            result,
            Err(CompileError::CountOverflow { key: "ioutput_part(5)" })
        ));
    }

    #[test]
    fn unsupported_option_is_rejected() {
        let mut config = four_row_config(SimulationCode::SdTrimSp);
        config.beam_arguments.kinetic_energy_mode = KineticEnergyMode::LinearRamp;

        let result = render(&config, SdTrimSpVersion::V6_01);

        assert!(matches!(
            result,
            Err(CompileError::UnsupportedOption { option: "kinetic_energy_mode", .. })
        ));

        let mut config = four_row_config(SimulationCode::SdTrimSp);
        config.settings.options.inelastic_loss_model =
            Some(InelasticLossModel::LindhardScharffAndZiegler);
        assert!(render(&config, SdTrimSpVersion::V6_01).is_err());
        assert!(render(&config, SdTrimSpVersion::V6_09).is_ok());
    }
}
