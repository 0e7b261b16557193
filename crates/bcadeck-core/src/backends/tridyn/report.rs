use crate::core::config::options::SimulationCode;
use crate::core::io::format::{parse_int, parse_number};
use crate::core::io::scan::{Anchor, Block, BlockScanner, Line};
use crate::core::io::table::key_values;
use crate::core::result::model::{Reported, ResultBuilder, SimulationResult, Termination};
use crate::error::ReportError;
use std::collections::BTreeMap;
use std::io::BufRead;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Version,
    InputParameters,
    Projectiles,
    Recoils,
    DepositedEnergy,
    CpuTime,
    NormalTermination,
    ErrorTermination,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Version => "version",
            Kind::InputParameters => "input parameters",
            Kind::Projectiles => "pseudoprojectile statistics",
            Kind::Recoils => "pseudo recoil atom statistics",
            Kind::DepositedEnergy => "deposited energy",
            Kind::CpuTime => "cpu time",
            Kind::NormalTermination | Kind::ErrorTermination => "termination",
        }
    }

    fn is_structural(self) -> bool {
        matches!(
            self,
            Kind::InputParameters | Kind::Projectiles | Kind::Recoils | Kind::DepositedEnergy
        )
    }
}

const ANCHORS: &[Anchor<Kind>] = &[
    Anchor::contains("tridyn", Kind::Version),
    Anchor::prefix("input parameters", Kind::InputParameters),
    Anchor::prefix("pseudoprojectile statistics", Kind::Projectiles).until_blank(),
    Anchor::prefix("pseudo recoil atom statistics", Kind::Recoils).until_blank(),
    Anchor::prefix("deposited energy", Kind::DepositedEnergy).until_blank(),
    Anchor::contains("cpu time", Kind::CpuTime),
    Anchor::contains("normal termination", Kind::NormalTermination),
    Anchor::prefix("error", Kind::ErrorTermination),
];

/// Raw per-component counts that are only turned into results once the whole
/// report has been read.
#[derive(Debug, Default)]
struct Counts {
    launched: BTreeMap<usize, f64>,
    generated: BTreeMap<usize, f64>,
    recoil_transmitted: BTreeMap<usize, f64>,
    /// `(electronic, nuclear)` deposited energy.
    deposited: BTreeMap<usize, (Option<f64>, Option<f64>)>,
}

/// Splits `component N: rest` into `N` and `rest`.
fn component_header(text: &str) -> Option<(usize, &str)> {
    let rest = text.get(..9).filter(|head| head.eq_ignore_ascii_case("component"))?;
    let (index, rest) = text[rest.len()..].split_once(':')?;
    let index = parse_int(index).and_then(|n| usize::try_from(n).ok())?;
    Some((index, rest.trim()))
}

/// Recognizes `<label> = N` sub-block openers such as `irradiation condition = 1`.
fn numbered(label: &'static str) -> impl Fn(&str) -> Option<usize> {
    move |text| {
        let lowered = text.to_lowercase();
        let rest = lowered.strip_prefix(label)?;
        parse_int(rest.trim_start_matches(|c: char| c == '=' || c.is_whitespace()))
            .and_then(|n| usize::try_from(n).ok())
    }
}

/// Walks the body of a block that is divided into numbered sub-blocks.
///
/// `open` recognizes a line that starts a sub-block; every `key = value` pair
/// after it is handed to `value` together with the current component.
fn read_sections(
    builder: &mut ResultBuilder,
    block: &Block<Kind>,
    open: impl Fn(&str) -> Option<usize>,
    mut value: impl FnMut(&mut ResultBuilder, usize, &str, f64) -> bool,
) {
    let mut current = None;
    for Line { number, text } in block.body() {
        if let Some(index) = open(text) {
            current = Some(index);
            continue;
        }
        let Some(index) = current else {
            builder.issue(block.kind.name(), *number, format!("'{text}' outside a component"));
            continue;
        };
        let pairs = key_values(text);
        if pairs.is_empty() {
            builder.issue(block.kind.name(), *number, format!("unexpected line '{text}'"));
        }
        for (key, raw) in pairs {
            match parse_number(&raw) {
                Some(number_value) => {
                    if !value(builder, index, &key, number_value) {
                        debug!(block = block.kind.name(), key = %key, "Skipping unknown quantity");
                    }
                }
                None => builder.issue(
                    block.kind.name(),
                    *number,
                    format!("invalid number '{raw}' for '{key}'"),
                ),
            }
        }
    }
}

fn read_input_parameters(builder: &mut ResultBuilder, block: &Block<Kind>) {
    for Line { number, text } in block.body() {
        if let Some((index, rest)) = component_header(text) {
            let (symbol, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let component = builder.component_mut(index);
            component.symbol = symbol.to_string();
            component.mass = key_values(tail)
                .into_iter()
                .find(|(key, _)| key == "mass")
                .and_then(|(_, value)| parse_number(&value));
            continue;
        }
        for (key, value) in key_values(text) {
            if key == "pseudoprojectiles" {
                match parse_int(&value).and_then(|n| u64::try_from(n).ok()) {
                    Some(n) => builder.metadata_mut().histories = Some(n),
                    None => builder.issue(
                        block.kind.name(),
                        *number,
                        format!("invalid projectile count '{value}'"),
                    ),
                }
            }
        }
    }
}

fn read_block(builder: &mut ResultBuilder, block: &Block<Kind>, counts: &mut Counts) {
    let anchor = &block.anchor().text;
    match block.kind {
        Kind::Version => {
            let lowered = anchor.to_lowercase();
            builder.metadata_mut().version = lowered
                .split_whitespace()
                .skip_while(|token| !token.starts_with("tridyn"))
                .nth(1)
                .map(str::to_string);
        }
        Kind::InputParameters => read_input_parameters(builder, block),
        Kind::Projectiles => read_sections(
            builder,
            block,
            numbered("irradiation condition"),
            |builder, index, key, value| {
                let component = builder.component_mut(index);
                match key {
                    "launched" => {
                        component.balance.incident = Reported::Value(value);
                        counts.launched.insert(index, value);
                    }
                    "implanted" => component.balance.deposited = Reported::Value(value),
                    "mean depth" => component.implantation.mean = Reported::Value(value),
                    "scattered" => component.balance.reflected = Reported::Value(value),
                    "transmitted" => component.balance.transmitted = Reported::Value(value),
                    _ => return false,
                }
                true
            },
        ),
        Kind::Recoils => read_sections(
            builder,
            block,
            |text| component_header(text).map(|(index, _)| index),
            |builder, index, key, value| {
                match key {
                    "generated" => {
                        counts.generated.insert(index, value);
                    }
                    "backsputt." => {
                        builder.component_mut(index).balance.sputtered = Reported::Value(value);
                    }
                    "transmitted" => {
                        counts.recoil_transmitted.insert(index, value);
                    }
                    _ => return false,
                }
                true
            },
        ),
        Kind::DepositedEnergy => read_sections(
            builder,
            block,
            |text| component_header(text).map(|(index, _)| index),
            |builder, index, key, value| {
                builder.component_mut(index);
                let entry = counts.deposited.entry(index).or_default();
                match key {
                    "electronic" => entry.0 = Some(value),
                    "nuclear" => entry.1 = Some(value),
                    _ => return false,
                }
                true
            },
        ),
        Kind::CpuTime => {
            builder.metadata_mut().cpu_seconds = anchor
                .split_whitespace()
                .rev()
                .find_map(parse_number);
        }
        Kind::NormalTermination => builder.metadata_mut().termination = Termination::Normal,
        Kind::ErrorTermination => {
            builder.metadata_mut().termination = Termination::Abnormal(anchor.clone());
        }
    }
}

/// Turns counts into yields and coefficients.
///
/// Yields are per launched pseudoprojectile of all irradiation conditions,
/// coefficients per launched pseudoprojectile of the component itself, and
/// deposited energies per particle of the component.
fn derive(builder: &mut ResultBuilder, counts: &Counts) {
    let total: f64 = counts.launched.values().sum();
    for component in builder.components_mut() {
        let index = component.index;
        let launched = counts.launched.get(&index).copied().unwrap_or(0.0);
        if total > 0.0 {
            component.sputtering_yield = component.balance.sputtered.map(|s| s / total);
            if let Some(transmitted) = counts.recoil_transmitted.get(&index) {
                component.transmission_sputtering_yield = Reported::Value(transmitted / total);
            }
        }
        if launched > 0.0 {
            component.backscattering = component.balance.reflected.map(|r| r / launched);
            component.transmission = component.balance.transmitted.map(|t| t / launched);
        }
        let particles = launched + counts.generated.get(&index).copied().unwrap_or(0.0);
        if let Some(&(electronic, nuclear)) = counts.deposited.get(&index)
            && particles > 0.0
        {
            let loss = if counts.launched.contains_key(&index) {
                &mut component.projectile_energy_loss
            } else {
                &mut component.recoil_energy_loss
            };
            loss.electronic = electronic.map(|e| e / particles).into();
            loss.nuclear = nuclear.map(|n| n / particles).into();
        }
    }
}

#[instrument(skip_all, name = "tridyn_report")]
pub(super) fn parse(reader: &mut dyn BufRead) -> Result<SimulationResult, ReportError> {
    let mut builder = ResultBuilder::new(SimulationCode::Tridyn);
    let mut counts = Counts::default();
    let mut recognized = false;
    for block in BlockScanner::new(reader, ANCHORS) {
        let block = block?;
        recognized |= block.kind.is_structural();
        read_block(&mut builder, &block, &mut counts);
    }
    if !recognized {
        return Err(ReportError::UnrecognizedFormat {
            code: Some(SimulationCode::Tridyn),
        });
    }
    derive(&mut builder, &counts);
    let result = builder.finish();
    debug!(
        components = result.components().len(),
        issues = result.issues().len(),
        "Parsed TRIDYN report"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HELIUM_ON_TUNGSTEN: &str = "
 TRIDYN 2022  (Moeller)
 HeonW_____  He on W

 input parameters:
 components =  2
 component 1: He   mass =  4.0026
 component 2: W    mass =  183.84
 pseudoprojectiles =  100000

 pseudoprojectile statistics:
 irradiation condition =  1
 launched =  1.0000E+05
 implanted =  9.6000E+04   mean depth =  4.1200E+01
 scattered =  4.0000E+03
 transmitted =  0.0000E+00

 pseudo recoil atom statistics:
 component 1:
 generated =  2.0000E+03
 backsputt. =  1.5000E+03
 transmitted =  0.0000E+00
 component 2:
 generated =  3.5000E+05
 backsputt. =  2.5000E+03
 transmitted =  0.0000E+00

 deposited energy (eV):
 component 1:
 electronic =  1.0200E+07
 nuclear =  5.1000E+06
 component 2:
 electronic =  3.5000E+06
 nuclear =  7.0000E+06

 cpu time =  12.5 s
 normal termination
";

    fn parse_text(text: &str) -> Result<SimulationResult, ReportError> {
        parse(&mut Cursor::new(text))
    }

    #[test]
    fn yields_are_per_launched_pseudoprojectile() {
        let result = parse_text(HELIUM_ON_TUNGSTEN).unwrap();

        let tungsten = result.component_by_symbol("W").unwrap();
        assert!((tungsten.sputtering_yield.value().unwrap() - 0.025).abs() < 1e-12);
        assert_eq!(tungsten.transmission_sputtering_yield, Reported::Value(0.0));
        assert!((result.total_sputtering_yield().value().unwrap() - 0.04).abs() < 1e-12);
        assert!(result.is_complete(), "{:?}", result.issues());
    }

    #[test]
    fn projectile_statistics_become_coefficients() {
        let result = parse_text(HELIUM_ON_TUNGSTEN).unwrap();

        let helium = result.component(1).unwrap();
        assert_eq!(helium.symbol, "He");
        assert_eq!(helium.mass, Some(4.0026));
        assert_eq!(helium.balance.incident, Reported::Value(1.0e5));
        assert_eq!(helium.implantation.mean, Reported::Value(41.2));
        assert!((helium.backscattering.value().unwrap() - 0.04).abs() < 1e-12);
        assert_eq!(helium.transmission, Reported::Value(0.0));
        assert_eq!(result.component(2).unwrap().backscattering, Reported::NotReported);
    }

    #[test]
    fn deposited_energy_is_split_by_role() {
        let result = parse_text(HELIUM_ON_TUNGSTEN).unwrap();

        let helium = result.component(1).unwrap();
        assert_eq!(helium.projectile_energy_loss.electronic, Reported::Value(100.0));
        assert_eq!(helium.recoil_energy_loss.electronic, Reported::NotReported);
        let tungsten = result.component(2).unwrap();
        assert_eq!(tungsten.recoil_energy_loss.nuclear, Reported::Value(20.0));
        assert_eq!(tungsten.projectile_energy_loss.nuclear, Reported::NotReported);
    }

    #[test]
    fn metadata_is_collected() {
        let result = parse_text(HELIUM_ON_TUNGSTEN).unwrap();

        let metadata = result.metadata();
        assert_eq!(metadata.code, SimulationCode::Tridyn);
        assert_eq!(metadata.version.as_deref(), Some("2022"));
        assert_eq!(metadata.histories, Some(100_000));
        assert_eq!(metadata.cpu_seconds, Some(12.5));
        assert_eq!(metadata.termination, Termination::Normal);
    }

    #[test]
    fn malformed_values_are_partial_not_fatal() {
        let text = "
 pseudoprojectile statistics:
 launched =  1.0E+05
 irradiation condition =  1
 launched =  1.0E+05
 scattered =  lots
";

        let result = parse_text(text).unwrap();

        let lines: Vec<usize> = result.issues().iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![3, 6]);
        assert_eq!(result.issues()[0].block, "pseudoprojectile statistics");
        assert_eq!(result.component(1).unwrap().balance.incident, Reported::Value(1.0e5));
    }

    #[test]
    fn statistics_blocks_end_at_the_first_blank_line() {
        let text = HELIUM_ON_TUNGSTEN.replace(
            " nuclear =  7.0000E+06\n",
            " nuclear =  7.0000E+06\n\n energy balance checked against the launched total\n sum =  9.9000E+09\n",
        );

        let result = parse_text(&text).unwrap();

        assert!(result.is_complete(), "{:?}", result.issues());
        let tungsten = result.component(2).unwrap();
        assert_eq!(tungsten.recoil_energy_loss.nuclear, Reported::Value(20.0));
        assert_eq!(tungsten.recoil_energy_loss.electronic, Reported::Value(10.0));
    }

    #[test]
    fn foreign_text_is_unrecognized() {
        let text = " SDTrimSP: VERSION 6.01\n cpu time (s): 1.0\n normal termination\n";

        assert!(matches!(
            parse_text(text),
            Err(ReportError::UnrecognizedFormat {
                code: Some(SimulationCode::Tridyn)
            })
        ));
    }
}
