use super::lookup::IDREL;
use crate::core::config::options::SimulationCode;
use crate::core::io::format::{parse_int, parse_number};
use crate::core::io::scan::{Anchor, Block, BlockScanner};
use crate::core::io::table::{RowKey, Table, named_values};
use crate::core::result::model::{
    BalanceUnit, ComponentResult, Reported, ResultBuilder, SimulationResult, Termination,
};
use crate::error::ReportError;
use std::io::BufRead;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Version,
    Banner,
    Elements,
    Histories,
    Beam,
    Particles,
    ArealDensities,
    ProjectileEnergyLoss,
    RecoilEnergyLoss,
    Implantation,
    Reflection,
    TransmissionSputtering,
    Sputtering,
    Transmission,
    CpuTime,
    ElapsedTime,
    NormalTermination,
    ErrorTermination,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Version => "version",
            Kind::Banner => "banner",
            Kind::Elements => "elements",
            Kind::Histories => "histories",
            Kind::Beam => "beam",
            Kind::Particles => "particles",
            Kind::ArealDensities => "areal densities",
            Kind::ProjectileEnergyLoss => "energy losses (projectiles)",
            Kind::RecoilEnergyLoss => "energy losses (recoils)",
            Kind::Implantation => "implantation",
            Kind::Reflection => "reflection",
            Kind::TransmissionSputtering => "transmission sputtering",
            Kind::Sputtering => "sputtering",
            Kind::Transmission => "transmission",
            Kind::CpuTime => "cpu time",
            Kind::ElapsedTime => "elapsed time",
            Kind::NormalTermination | Kind::ErrorTermination => "termination",
        }
    }

    /// Whether the block identifies a report as SDTrimSP output on its own.
    fn is_structural(self) -> bool {
        !matches!(
            self,
            Kind::Version
                | Kind::CpuTime
                | Kind::ElapsedTime
                | Kind::NormalTermination
                | Kind::ErrorTermination
        )
    }
}

const ANCHORS: &[Anchor<Kind>] = &[
    Anchor::contains("sdtrimsp", Kind::Version),
    Anchor::contains("input data", Kind::Banner),
    Anchor::contains("output data", Kind::Banner),
    Anchor::contains("a-mass", Kind::Elements),
    Anchor::contains("q-beam", Kind::Beam),
    Anchor::prefix("nh ", Kind::Histories),
    Anchor::prefix("projectiles / implanted", Kind::Particles),
    Anchor::prefix("areal densities and fluences", Kind::ArealDensities),
    Anchor::prefix("energy losses (projectiles", Kind::ProjectileEnergyLoss),
    Anchor::prefix("energy losses (recoils", Kind::RecoilEnergyLoss),
    Anchor::prefix("implantation data (projectiles", Kind::Implantation),
    Anchor::prefix("reflection data (backsc", Kind::Reflection),
    Anchor::prefix("transmission sputtering", Kind::TransmissionSputtering),
    Anchor::prefix("sputtering data", Kind::Sputtering),
    Anchor::prefix("transmission data", Kind::Transmission),
    Anchor::contains("cpu time", Kind::CpuTime),
    Anchor::contains("elapsed time", Kind::ElapsedTime),
    Anchor::contains("normal termination", Kind::NormalTermination),
    Anchor::prefix("error", Kind::ErrorTermination),
];

/// Last numeric token of a line, e.g. the seconds of `cpu time (s): 1.2E+01`.
fn trailing_number(text: &str) -> Option<f64> {
    text.split_whitespace().rev().find_map(parse_number)
}

/// Positional columns of tables that may be printed without a `cpt` header.
fn fallback_columns(kind: Kind) -> &'static [&'static str] {
    match kind {
        Kind::ProjectileEnergyLoss | Kind::RecoilEnergyLoss => &["nuclear", "electronic"],
        Kind::Implantation => &["mean", "std-dev", "skewness", "kurtosis"],
        Kind::Reflection => &["coefficient", "energy-coeff"],
        Kind::Transmission => &["coefficient"],
        Kind::Sputtering | Kind::TransmissionSputtering => &["yield"],
        _ => &[],
    }
}

/// Parses a table block, recording malformed rows and an empty body as issues.
///
/// Rows keyed by symbol are matched to the components already known from the
/// element table; an unknown symbol becomes the next component.
fn table(builder: &mut ResultBuilder, block: &Block<Kind>) -> Table {
    let mut table = Table::parse_with(&block.lines, fallback_columns(block.kind));
    table.resolve_symbols(|symbol| builder.index_of_symbol(symbol));
    for (line, details) in table.errors() {
        builder.issue(block.kind.name(), *line, details.clone());
    }
    if table.is_empty() && table.placeholder().is_none() && table.errors().is_empty() {
        builder.issue(block.kind.name(), block.start_line(), "block has no rows");
    }
    for (index, row) in table.component_rows() {
        if let Some(symbol) = &row.symbol {
            let component = builder.component_mut(index);
            if component.symbol.is_empty() {
                component.symbol = symbol.clone();
            }
        }
    }
    table
}

/// Writes one column of a table into every component that has a row for it.
fn fill(
    builder: &mut ResultBuilder,
    table: &Table,
    column: &str,
    slot: impl Fn(&mut ComponentResult) -> &mut Reported,
) {
    for (index, row) in table.component_rows() {
        if let Some(value) = table.row_value(row, column) {
            *slot(builder.component_mut(index)) = Reported::Value(value);
        }
    }
}

/// Applies a placeholder marker to every known component, or fills the column.
fn fill_or_mark(
    builder: &mut ResultBuilder,
    table: &Table,
    column: &str,
    marker: Reported,
    slot: impl Fn(&mut ComponentResult) -> &mut Reported,
) {
    if table.placeholder().is_some() && table.is_empty() {
        if builder.component_count() == 0 {
            builder.component_mut(1);
        }
        for component in builder.components_mut() {
            *slot(component) = marker;
        }
    } else {
        fill(builder, table, column, slot);
    }
}

/// State carried across blocks and settled once the report has been read.
#[derive(Default)]
struct Pending {
    areal: Option<Table>,
    /// Start line of the projectile energy-loss block.
    projectile_losses: Option<usize>,
    /// Start line of the recoil energy-loss block.
    recoil_losses: Option<usize>,
}

fn read_block(builder: &mut ResultBuilder, block: &Block<Kind>, pending: &mut Pending) {
    let anchor = &block.anchor().text;
    match block.kind {
        Kind::Version => {
            let lowered = anchor.to_lowercase();
            let version = lowered
                .split_whitespace()
                .skip_while(|token| !token.starts_with("version"))
                .nth(1)
                .map(str::to_string);
            if version.is_some() {
                builder.metadata_mut().version = version;
            }
        }
        Kind::Banner => {}
        Kind::Elements => {
            let table = table(builder, block);
            for (index, row) in table.component_rows() {
                builder.component_mut(index).mass = table.row_value(row, "a-mass");
            }
        }
        Kind::Histories => match named_values(&block.lines, "nh") {
            Some(pairs) => {
                for (name, value) in pairs {
                    let metadata = builder.metadata_mut();
                    match name.as_str() {
                        "nh" => metadata.histories = parse_int(&value).and_then(|n| u64::try_from(n).ok()),
                        "nr_pproj" => {
                            metadata.projectiles_per_history =
                                parse_int(&value).and_then(|n| u64::try_from(n).ok());
                        }
                        "idrel" => {
                            metadata.mode = parse_int(&value).and_then(|n| IDREL.decode(n).ok());
                        }
                        _ => {}
                    }
                }
            }
            None => builder.issue(block.kind.name(), block.start_line(), "history counts missing"),
        },
        Kind::Beam => {
            let table = table(builder, block);
            for (index, row) in table.component_rows() {
                builder.component_mut(index).beam_fraction = table.row_value(row, "q-beam");
            }
        }
        Kind::Particles => {
            let table = table(builder, block);
            fill(builder, &table, "projectiles", |c| &mut c.balance.incident);
            fill(builder, &table, "backscattered", |c| &mut c.balance.reflected);
            fill(builder, &table, "implanted", |c| &mut c.balance.deposited);
            fill(builder, &table, "transmitted", |c| &mut c.balance.transmitted);
        }
        Kind::ArealDensities => {
            let table = table(builder, block);
            builder.metadata_mut().balance_unit = BalanceUnit::ArealDensity;
            fill(builder, &table, "incident", |c| &mut c.balance.incident);
            fill(builder, &table, "reflected", |c| &mut c.balance.reflected);
            fill(builder, &table, "reemitted", |c| &mut c.balance.reemitted);
            fill(builder, &table, "sputtered", |c| &mut c.balance.sputtered);
            fill(builder, &table, "deposited", |c| &mut c.balance.deposited);
            pending.areal = Some(table);
        }
        Kind::ProjectileEnergyLoss => {
            let table = table(builder, block);
            fill(builder, &table, "nuclear", |c| &mut c.projectile_energy_loss.nuclear);
            fill(builder, &table, "electronic", |c| &mut c.projectile_energy_loss.electronic);
            pending.projectile_losses = Some(block.start_line());
        }
        Kind::RecoilEnergyLoss => {
            let table = table(builder, block);
            fill(builder, &table, "nuclear", |c| &mut c.recoil_energy_loss.nuclear);
            fill(builder, &table, "electronic", |c| &mut c.recoil_energy_loss.electronic);
            pending.recoil_losses = Some(block.start_line());
        }
        Kind::Implantation => {
            let table = table(builder, block);
            fill(builder, &table, "mean", |c| &mut c.implantation.mean);
            fill(builder, &table, "std-dev", |c| &mut c.implantation.std_dev);
            fill(builder, &table, "skewness", |c| &mut c.implantation.skewness);
            fill(builder, &table, "kurtosis", |c| &mut c.implantation.kurtosis);
        }
        Kind::Reflection => {
            let table = table(builder, block);
            fill_or_mark(builder, &table, "coefficient", Reported::Absent, |c| &mut c.backscattering);
            fill(builder, &table, "energy-coeff", |c| &mut c.energy_backscattering);
            if let Some(total) = table.value(RowKey::Total, "coefficient") {
                builder.set_total_backscattering(Reported::Value(total));
            }
        }
        Kind::Sputtering => {
            let table = table(builder, block);
            fill_or_mark(builder, &table, "yield", Reported::NotApplicable, |c| &mut c.sputtering_yield);
            if let Some(total) = table.value(RowKey::Total, "yield") {
                builder.set_total_sputtering_yield(Reported::Value(total));
            }
        }
        Kind::TransmissionSputtering => {
            let table = table(builder, block);
            fill_or_mark(builder, &table, "yield", Reported::Absent, |c| {
                &mut c.transmission_sputtering_yield
            });
        }
        Kind::Transmission => {
            let table = table(builder, block);
            fill_or_mark(builder, &table, "coefficient", Reported::Absent, |c| &mut c.transmission);
        }
        Kind::CpuTime => builder.metadata_mut().cpu_seconds = trailing_number(anchor),
        Kind::ElapsedTime => builder.metadata_mut().elapsed_seconds = trailing_number(anchor),
        Kind::NormalTermination => builder.metadata_mut().termination = Termination::Normal,
        Kind::ErrorTermination => {
            builder.metadata_mut().termination = Termination::Abnormal(anchor.clone());
        }
    }
}

/// Derives sputtering yields from the areal-density balance where the report
/// printed no yield table: sputtered amount over the total incident amount.
fn yields_from_balance(builder: &mut ResultBuilder, areal: &Table) {
    let incident: f64 = areal
        .component_rows()
        .filter_map(|(_, row)| areal.row_value(row, "incident"))
        .sum();
    if incident <= 0.0 {
        return;
    }
    for component in builder.components_mut() {
        if !component.sputtering_yield.is_reported() {
            component.sputtering_yield = component.balance.sputtered.map(|s| s / incident);
        }
    }
}

/// Turns energy-loss totals into losses per incident projectile.
///
/// Projectile losses of a species are divided by the `nh · nr_pproj · q-beam`
/// projectiles of that species and are zero for species outside the beam.
/// Recoil losses are divided by all `nh · nr_pproj` projectiles. A beam species
/// without a `q-beam` row counts for an equal share.
fn normalize_energy_losses(builder: &mut ResultBuilder, pending: &Pending) {
    if pending.projectile_losses.is_none() && pending.recoil_losses.is_none() {
        return;
    }
    let metadata = builder.metadata_mut();
    let (Some(histories), Some(per_history)) = (metadata.histories, metadata.projectiles_per_history)
    else {
        for (line, kind) in [
            (pending.projectile_losses, Kind::ProjectileEnergyLoss),
            (pending.recoil_losses, Kind::RecoilEnergyLoss),
        ] {
            if let Some(line) = line {
                builder.issue(kind.name(), line, "history counts missing, losses kept as totals");
            }
        }
        return;
    };
    let projectiles = histories as f64 * per_history as f64;
    if projectiles <= 0.0 {
        return;
    }
    let equal_share = 1.0 / builder.component_count().max(1) as f64;
    for component in builder.components_mut() {
        let fraction = component.beam_fraction.unwrap_or(equal_share);
        let loss = &mut component.projectile_energy_loss;
        if fraction > 0.0 {
            loss.nuclear = loss.nuclear.map(|v| v / (projectiles * fraction));
            loss.electronic = loss.electronic.map(|v| v / (projectiles * fraction));
        } else {
            loss.nuclear = loss.nuclear.map(|_| 0.0);
            loss.electronic = loss.electronic.map(|_| 0.0);
        }
        let recoil = &mut component.recoil_energy_loss;
        recoil.nuclear = recoil.nuclear.map(|v| v / projectiles);
        recoil.electronic = recoil.electronic.map(|v| v / projectiles);
    }
}

#[instrument(skip_all, name = "sdtrimsp_report")]
pub(super) fn parse(reader: &mut dyn BufRead) -> Result<SimulationResult, ReportError> {
    let mut builder = ResultBuilder::new(SimulationCode::SdTrimSp);
    let mut recognized = false;
    let mut pending = Pending::default();
    for block in BlockScanner::new(reader, ANCHORS) {
        let block = block?;
        recognized |= block.kind.is_structural();
        read_block(&mut builder, &block, &mut pending);
    }
    if !recognized {
        return Err(ReportError::UnrecognizedFormat {
            code: Some(SimulationCode::SdTrimSp),
        });
    }
    if let Some(areal) = &pending.areal {
        yields_from_balance(&mut builder, areal);
    }
    normalize_energy_losses(&mut builder, &pending);
    let result = builder.finish();
    debug!(
        components = result.components().len(),
        issues = result.issues().len(),
        "Parsed SDTrimSP report"
    );
    Ok(result)
}
