use crate::core::config::options::{Mode, SimulationCode};
use serde::{Serialize, Serializer};
use tracing::warn;

/// A scalar extracted from a report, or the reason it is missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Reported {
    Value(f64),
    /// The report printed a placeholder, e.g. "no backward sputtering".
    NotApplicable,
    /// The report states the quantity does not exist, e.g. "no transmission".
    Absent,
    /// The block carrying the quantity never appeared.
    #[default]
    NotReported,
}

impl Reported {
    pub fn value(self) -> Option<f64> {
        match self {
            Reported::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_value(self) -> bool {
        matches!(self, Reported::Value(_))
    }

    pub fn is_reported(self) -> bool {
        self != Reported::NotReported
    }

    /// Keeps `self` unless it was never reported.
    pub fn or(self, other: Reported) -> Reported {
        if self.is_reported() { self } else { other }
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Reported {
        match self {
            Reported::Value(v) => Reported::Value(f(v)),
            other => other,
        }
    }
}

impl From<Option<f64>> for Reported {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Reported::NotReported, Reported::Value)
    }
}

impl Serialize for Reported {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reported::Value(v) => serializer.serialize_f64(*v),
            Reported::NotApplicable => serializer.serialize_str("n/a"),
            Reported::Absent => serializer.serialize_str("absent"),
            Reported::NotReported => serializer.serialize_none(),
        }
    }
}

/// Where the particles of one component ended up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ParticleBalance {
    pub incident: Reported,
    pub reflected: Reported,
    pub reemitted: Reported,
    pub sputtered: Reported,
    pub deposited: Reported,
    pub transmitted: Reported,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EnergyLoss {
    pub nuclear: Reported,
    pub electronic: Reported,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DepthStatistics {
    pub mean: Reported,
    pub std_dev: Reported,
    pub skewness: Reported,
    pub kurtosis: Reported,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComponentResult {
    /// One-based component index as used in the deck.
    pub index: usize,
    pub symbol: String,
    pub mass: Option<f64>,
    pub beam_fraction: Option<f64>,
    pub balance: ParticleBalance,
    /// Backward sputtering yield, in atoms per incident projectile.
    pub sputtering_yield: Reported,
    pub transmission_sputtering_yield: Reported,
    pub backscattering: Reported,
    pub energy_backscattering: Reported,
    pub transmission: Reported,
    pub projectile_energy_loss: EnergyLoss,
    pub recoil_energy_loss: EnergyLoss,
    pub implantation: DepthStatistics,
}

impl ComponentResult {
    fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum Termination {
    Normal,
    Abnormal(String),
    #[default]
    Unknown,
}

/// Unit of the particle-balance quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceUnit {
    /// Areal densities normalized to the fluence.
    ArealDensity,
    #[default]
    Particles,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub code: SimulationCode,
    pub version: Option<String>,
    pub title: Option<String>,
    pub mode: Option<Mode>,
    pub histories: Option<u64>,
    pub projectiles_per_history: Option<u64>,
    pub cpu_seconds: Option<f64>,
    pub elapsed_seconds: Option<f64>,
    pub termination: Termination,
    pub balance_unit: BalanceUnit,
}

/// A block that could not be fully read. Parsing continues after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialParse {
    pub block: String,
    pub line: usize,
    pub details: String,
}

/// The code-independent outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    metadata: RunMetadata,
    components: Vec<ComponentResult>,
    total_sputtering_yield: Reported,
    total_backscattering: Reported,
    issues: Vec<PartialParse>,
}

impl SimulationResult {
    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn code(&self) -> SimulationCode {
        self.metadata.code
    }

    pub fn components(&self) -> &[ComponentResult] {
        &self.components
    }

    pub fn component(&self, index: usize) -> Option<&ComponentResult> {
        self.components.iter().find(|c| c.index == index)
    }

    pub fn component_by_symbol(&self, symbol: &str) -> Option<&ComponentResult> {
        self.components.iter().find(|c| c.symbol == symbol)
    }

    pub fn total_sputtering_yield(&self) -> Reported {
        self.total_sputtering_yield
    }

    pub fn total_backscattering(&self) -> Reported {
        self.total_backscattering
    }

    pub fn issues(&self) -> &[PartialParse] {
        &self.issues
    }

    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    /// Sputtered mass per incident projectile, in amu.
    pub fn sputtered_mass_yield(&self) -> Reported {
        let mut total = None;
        for component in &self.components {
            if let (Some(y), Some(mass)) = (component.sputtering_yield.value(), component.mass) {
                *total.get_or_insert(0.0) += y * mass;
            }
        }
        match (total, self.total_sputtering_yield) {
            (Some(total), _) => Reported::Value(total),
            (None, Reported::Value(_)) => Reported::NotReported,
            (None, marker) => marker,
        }
    }
}

/// Folds per-component yields into a total: values add up, otherwise the first
/// marker is kept.
fn fold_yields<'a>(yields: impl Iterator<Item = &'a Reported>) -> Reported {
    let mut total = Reported::NotReported;
    for &y in yields {
        total = match (total, y) {
            (Reported::Value(a), Reported::Value(b)) => Reported::Value(a + b),
            (Reported::Value(a), _) => Reported::Value(a),
            (_, Reported::Value(b)) => Reported::Value(b),
            (current, next) => current.or(next),
        };
    }
    total
}

/// Accumulates parsed values while a report is scanned.
pub(crate) struct ResultBuilder {
    metadata: RunMetadata,
    components: Vec<ComponentResult>,
    total_sputtering_yield: Reported,
    total_backscattering: Reported,
    issues: Vec<PartialParse>,
}

impl ResultBuilder {
    pub(crate) fn new(code: SimulationCode) -> Self {
        Self {
            metadata: RunMetadata {
                code,
                version: None,
                title: None,
                mode: None,
                histories: None,
                projectiles_per_history: None,
                cpu_seconds: None,
                elapsed_seconds: None,
                termination: Termination::Unknown,
                balance_unit: BalanceUnit::Particles,
            },
            components: Vec::new(),
            total_sputtering_yield: Reported::NotReported,
            total_backscattering: Reported::NotReported,
            issues: Vec::new(),
        }
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut RunMetadata {
        &mut self.metadata
    }

    pub(crate) fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Returns the component with one-based `index`, creating it and any gap before it.
    pub(crate) fn component_mut(&mut self, index: usize) -> &mut ComponentResult {
        let index = index.max(1);
        while self.components.len() < index {
            let next = self.components.len() + 1;
            self.components.push(ComponentResult::new(next));
        }
        &mut self.components[index - 1]
    }

    pub(crate) fn components_mut(&mut self) -> impl Iterator<Item = &mut ComponentResult> {
        self.components.iter_mut()
    }

    /// One-based index of the component with `symbol`, appending a new
    /// component when none matches.
    pub(crate) fn index_of_symbol(&mut self, symbol: &str) -> usize {
        if let Some(position) = self
            .components
            .iter()
            .position(|c| c.symbol.eq_ignore_ascii_case(symbol))
        {
            return position + 1;
        }
        let index = self.components.len() + 1;
        self.component_mut(index).symbol = symbol.to_string();
        index
    }

    pub(crate) fn set_total_sputtering_yield(&mut self, value: Reported) {
        self.total_sputtering_yield = value;
    }

    pub(crate) fn set_total_backscattering(&mut self, value: Reported) {
        self.total_backscattering = value;
    }

    pub(crate) fn issue(&mut self, block: &str, line: usize, details: impl Into<String>) {
        let details = details.into();
        warn!(block, line, details = %details, "Partial parse");
        self.issues.push(PartialParse {
            block: block.to_string(),
            line,
            details,
        });
    }

    pub(crate) fn finish(self) -> SimulationResult {
        let total_sputtering_yield = self
            .total_sputtering_yield
            .or(fold_yields(self.components.iter().map(|c| &c.sputtering_yield)));
        let total_backscattering = self
            .total_backscattering
            .or(balance_backscattering(&self.components));
        SimulationResult {
            metadata: self.metadata,
            components: self.components,
            total_sputtering_yield,
            total_backscattering,
            issues: self.issues,
        }
    }
}

/// Total reflected over total incident, or the folded coefficients when the
/// balance is incomplete.
fn balance_backscattering(components: &[ComponentResult]) -> Reported {
    let reflected: Vec<f64> = components
        .iter()
        .filter_map(|c| c.balance.reflected.value())
        .collect();
    let incident: f64 = components
        .iter()
        .filter_map(|c| c.balance.incident.value())
        .sum();
    if !reflected.is_empty() && incident > 0.0 {
        Reported::Value(reflected.iter().sum::<f64>() / incident)
    } else {
        fold_yields(components.iter().map(|c| &c.backscattering))
    }
}
