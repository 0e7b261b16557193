use super::SdTrimSpVersion;
use super::deck::{ELEMENT_ARRAYS, SECTION_EXTRA};
use super::lookup::{self, CASE_ALPHA, CASE_E0, IDREL, IINTEGRAL, IPOT};
use crate::backends::{DeckComponent, DeckLayer, assemble_configuration};
use crate::core::config::model::{
    Configuration, DEFAULT_LAYER_NAME, DEFAULT_SEGMENTS, DEFAULT_THICKNESS,
};
use crate::core::config::options::SimulationCode;
use crate::core::elements::catalog::ElementCatalog;
use crate::core::elements::element::ElementPatch;
use crate::core::io::deck::{Deck, DeckFile};
use crate::core::io::format::{parse_bool, parse_int, parse_number};
use crate::error::DeckError;
use std::collections::HashMap;
use tracing::debug;

/// Keys the compiler derives from other settings; they are dropped on read.
const DERIVED_KEYS: [&str; 2] = ["ioutput_part(2)", "ioutput_part(5)"];

/// Keys interpreted by the reader. Everything else becomes an additional line.
const INTERPRETED_KEYS: &[&str] = &[
    "ncp", "symbol", "inel0", "e_surfb", "e_displ", "dns0", "a_mass", "idrel", "flc", "nh",
    "idout", "nr_pproj", "ipot", "iintegral", "isbv", "qubeam", "case_e0", "e0", "case_alpha",
    "alpha0", "number_calc", "qu", "qumax", "ttarget", "nqx", "iq0", "lparticle_p",
    "lparticle_r", "lmatrices",
];

#[derive(Debug)]
struct Assignment {
    /// Key as written, used when the line is passed through.
    raw_key: String,
    value: String,
    line: usize,
}

impl Assignment {
    /// Value tokens with quotes stripped and `n*v` repeats expanded.
    fn tokens(&self) -> Result<Vec<String>, DeckError> {
        let mut tokens = Vec::new();
        for token in self
            .value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let token = token.trim_matches(|c| c == '"' || c == '\'');
            match token.split_once('*') {
                Some((count, value)) => {
                    let count = parse_int(count)
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| self.invalid(token))?;
                    tokens.extend(std::iter::repeat_n(value.to_string(), count));
                }
                None => tokens.push(token.to_string()),
            }
        }
        Ok(tokens)
    }

    fn invalid(&self, token: &str) -> DeckError {
        DeckError::Parse {
            line: self.line,
            details: format!("invalid value '{token}' for '{}'", self.raw_key.trim()),
        }
    }
}

/// The parsed `&TRI_INP` namelist.
struct Namelist {
    title: String,
    entries: HashMap<String, Assignment>,
    additional: Vec<String>,
    global_density: Option<f64>,
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

impl Namelist {
    fn parse(text: &str) -> Result<Self, DeckError> {
        let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));
        let title = lines
            .next()
            .map(|(_, line)| line.trim().to_string())
            .unwrap_or_default();

        let mut ordered: Vec<(String, Assignment)> = Vec::new();
        let mut extra = Vec::new();
        let mut global_density = None;
        let mut in_extra = false;
        for (number, line) in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed == "/" || trimmed.eq_ignore_ascii_case("&tri_inp") {
                continue;
            }
            if let Some((key, value)) = trimmed.split_once('=')
                && key.trim().eq_ignore_ascii_case("text")
            {
                in_extra = value.contains(&format!("--- {SECTION_EXTRA} ---"));
                continue;
            }
            if in_extra {
                extra.push(trimmed.to_string());
                continue;
            }
            if let Some(comment) = trimmed.strip_prefix('!') {
                if let Some((key, value)) = comment.split_once('=')
                    && key.trim().eq_ignore_ascii_case("globaldensity")
                {
                    global_density = parse_global_density(value);
                }
                continue;
            }
            match trimmed.split_once('=') {
                Some((key, value)) => ordered.push((
                    normalize_key(key),
                    Assignment {
                        raw_key: key.trim().to_string(),
                        value: value.trim().to_string(),
                        line: number,
                    },
                )),
                None => match ordered.last_mut() {
                    Some((_, previous)) => {
                        previous.value.push(' ');
                        previous.value.push_str(trimmed);
                    }
                    None => {
                        return Err(DeckError::Parse {
                            line: number,
                            details: format!("value '{trimmed}' without a variable"),
                        });
                    }
                },
            }
        }

        let mut additional = Vec::new();
        let mut entries = HashMap::new();
        for (key, assignment) in ordered {
            if DERIVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            if INTERPRETED_KEYS.contains(&key.as_str()) {
                entries.insert(key, assignment);
            } else {
                additional.push(format!("{} = {}", assignment.raw_key, assignment.value));
            }
        }
        additional.extend(extra);

        Ok(Self {
            title,
            entries,
            additional,
            global_density,
        })
    }

    fn tokens(&self, key: &'static str) -> Result<Option<Vec<String>>, DeckError> {
        self.entries.get(key).map(Assignment::tokens).transpose()
    }

    fn scalar<T>(&self, key: &'static str, parse: impl Fn(&str) -> Option<T>) -> Result<Option<T>, DeckError> {
        let Some(assignment) = self.entries.get(key) else {
            return Ok(None);
        };
        let tokens = assignment.tokens()?;
        let token = tokens.first().map(String::as_str).unwrap_or_default();
        parse(token).map(Some).ok_or_else(|| assignment.invalid(token))
    }

    fn int(&self, key: &'static str) -> Result<Option<i64>, DeckError> {
        self.scalar(key, parse_int)
    }

    fn count<T: TryFrom<i64>>(&self, key: &'static str) -> Result<Option<T>, DeckError> {
        self.scalar(key, |token| parse_int(token).and_then(|n| T::try_from(n).ok()))
    }

    fn float(&self, key: &'static str) -> Result<Option<f64>, DeckError> {
        self.scalar(key, parse_number)
    }

    fn flag(&self, key: &'static str) -> Result<Option<bool>, DeckError> {
        self.scalar(key, parse_bool)
    }

    /// A per-component array of exactly `len` entries.
    fn array<T>(
        &self,
        key: &'static str,
        len: usize,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<Vec<T>>, DeckError> {
        let Some(assignment) = self.entries.get(key) else {
            return Ok(None);
        };
        let tokens = assignment.tokens()?;
        if tokens.len() != len {
            return Err(DeckError::Length {
                key: key.to_string(),
                expected: len,
                found: tokens.len(),
            });
        }
        tokens
            .iter()
            .map(|token| parse(token).ok_or_else(|| assignment.invalid(token)))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn floats(&self, key: &'static str, len: usize) -> Result<Option<Vec<f64>>, DeckError> {
        self.array(key, len, parse_number)
    }
}

fn parse_global_density(value: &str) -> Option<f64> {
    let (flag, density) = value.split_once(',')?;
    if parse_bool(flag)? {
        parse_number(density)
    } else {
        None
    }
}

/// Parses `layer.inp` into layers in component space.
fn parse_layers(file: &DeckFile, ncp: usize) -> Result<Vec<DeckLayer>, DeckError> {
    let mut layers = Vec::new();
    for (number, line) in file.text.lines().enumerate().skip(2).map(|(i, l)| (i + 1, l)) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let invalid = |details: String| DeckError::Parse { line: number, details };
        let segments = parse_int(tokens[0])
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| invalid(format!("invalid segment count '{}'", tokens[0])))?;
        if segments == 0 {
            break;
        }
        let columns = ncp.saturating_sub(1);
        if tokens.len() < 2 + columns {
            return Err(invalid(format!(
                "expected {} values, found {}",
                2 + columns,
                tokens.len()
            )));
        }
        let per_segment = parse_number(tokens[1])
            .ok_or_else(|| invalid(format!("invalid thickness '{}'", tokens[1])))?;
        let mut others = Vec::with_capacity(columns);
        for token in &tokens[2..2 + columns] {
            others.push(parse_number(token).ok_or_else(|| invalid(format!("invalid abundance '{token}'")))?);
        }
        let first = (1.0 - others.iter().sum::<f64>()).max(0.0);
        let name = tokens[2 + columns..].join(" ");
        layers.push(DeckLayer {
            name: if name.is_empty() {
                format!("{DEFAULT_LAYER_NAME} {}", layers.len() + 1)
            } else {
                name
            },
            thickness: per_segment * f64::from(segments),
            segments,
            abundances: std::iter::once(first).chain(others).collect(),
        });
    }
    Ok(layers)
}

pub(super) fn read(
    deck: &Deck,
    catalog: &ElementCatalog,
    version: SdTrimSpVersion,
) -> Result<Configuration, DeckError> {
    let tables = lookup::tables(version);
    let namelist = Namelist::parse(&deck.input.text)?;

    let ncp: usize = namelist.count("ncp")?.ok_or(DeckError::MissingKey("ncp"))?;
    let symbols = namelist.tokens("symbol")?.ok_or(DeckError::MissingKey("symbol"))?;
    if symbols.len() != ncp {
        return Err(DeckError::Length {
            key: "symbol".to_string(),
            expected: ncp,
            found: symbols.len(),
        });
    }

    let mut elements = Vec::with_capacity(ncp);
    let mut patches = vec![ElementPatch::default(); ncp];
    for symbol in &symbols {
        elements.push(catalog.lookup(symbol)?);
    }
    for array in &ELEMENT_ARRAYS {
        if let Some(values) = namelist.floats(array.key, ncp)? {
            for ((element, patch), value) in elements.iter().zip(&mut patches).zip(values) {
                if value != (array.get)(element.data()) {
                    (array.set)(patch, value);
                }
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

    let zeros = || vec![0.0; ncp];
    let qubeam = namelist.floats("qubeam", ncp)?.ok_or(DeckError::MissingKey("qubeam"))?;
    let qu = namelist.floats("qu", ncp)?.unwrap_or_else(zeros);
    let qumax = namelist.floats("qumax", ncp)?.unwrap_or_else(|| vec![1.0; ncp]);
    let e0 = namelist.floats("e0", ncp)?.unwrap_or_else(zeros);
    let alpha0 = namelist.floats("alpha0", ncp)?.unwrap_or_else(zeros);
    let inel0 = namelist
        .array("inel0", ncp, parse_int)?
        .map(|codes| {
            codes
                .into_iter()
                .map(|code| tables.inel0.decode(code))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let ttarget = namelist.float("ttarget")?;
    let nqx: Option<u32> = namelist.count("nqx")?;
    let layers = if namelist.int("iq0")? == Some(-1) {
        let file = deck.layers.as_ref().ok_or(DeckError::MissingLayerFile)?;
        let mut layers = parse_layers(file, ncp)?;
        let total: f64 = layers.iter().map(|l| l.thickness).sum();
        if let Some(ttarget) = ttarget
            && total > 0.0
        {
            for layer in &mut layers {
                layer.thickness *= ttarget / total;
            }
        }
        layers
    } else {
        vec![DeckLayer {
            name: DEFAULT_LAYER_NAME.to_string(),
            thickness: ttarget.unwrap_or(DEFAULT_THICKNESS),
            segments: nqx.unwrap_or(DEFAULT_SEGMENTS),
            abundances: qu.clone(),
        }]
    };

    // A single shared model goes into the settings, mixed models stay per row.
    let shared_inelastic = inel0
        .as_ref()
        .and_then(|models| models.first().filter(|first| models.iter().all(|m| m == *first)))
        .copied();
    let components: Vec<DeckComponent> = (0..ncp)
        .map(|i| DeckComponent {
            element: elements[i].clone(),
            beam_fraction: qubeam[i],
            energy: e0[i],
            angle: alpha0[i],
            max_atomic_fraction: qumax[i],
            max_atomic_fraction_action: None,
            inelastic_loss_model: match (&inel0, shared_inelastic) {
                (Some(models), None) => Some(models[i]),
                _ => None,
            },
            is_beam: qubeam[i] > 0.0,
            is_target: qubeam[i] == 0.0
                || qu[i] > 0.0
                || layers.iter().any(|layer| layer.abundances.get(i).is_some_and(|&a| a > 0.0)),
        })
        .collect();

    let mut config = assemble_configuration(
        namelist.title.clone(),
        SimulationCode::SdTrimSp,
        &components,
        layers,
    );
    if let Some(ttarget) = ttarget {
        config.target_arguments.thickness = ttarget;
    }
    if let Some(nqx) = nqx {
        config.target_arguments.segments = nqx;
    }
    config.target_arguments.options.global_density = namelist.global_density;

    if let Some(idrel) = namelist.int("idrel")? {
        config.settings.mode = IDREL.decode(idrel)?;
    }
    if let Some(flc) = namelist.float("flc")? {
        config.settings.fluence = flc;
    }
    if let Some(case_e0) = namelist.int("case_e0")? {
        config.beam_arguments.kinetic_energy_mode = CASE_E0.decode(case_e0)?;
    }
    if let Some(case_alpha) = namelist.int("case_alpha")? {
        config.beam_arguments.angle_mode = CASE_ALPHA.decode(case_alpha)?;
    }
    config.beam_arguments.options.sweep = namelist.count("number_calc")?;

    let options = &mut config.settings.options;
    options.histories = namelist.count("nh")?;
    options.projectiles_per_history = namelist.count("nr_pproj")?;
    options.output_interval = namelist.count("idout")?;
    options.interaction_potential = namelist.int("ipot")?.map(|n| IPOT.decode(n)).transpose()?;
    options.integration_method = namelist
        .int("iintegral")?
        .map(|n| IINTEGRAL.decode(n))
        .transpose()?;
    options.surface_binding_model = namelist
        .int("isbv")?
        .map(|n| tables.isbv.decode(n))
        .transpose()?;
    options.inelastic_loss_model = shared_inelastic;
    options.log_reflected = namelist.flag("lparticle_p")?;
    options.log_sputtered = namelist.flag("lparticle_r")?;
    options.log_matrix = namelist.flag("lmatrices")?;

    config.additional = namelist.additional;
    debug!(
        "Read SDTrimSP deck '{}' with {} components and {} layers",
        config.title,
        ncp,
        config.structure.len()
    );
    Ok(config)
}
