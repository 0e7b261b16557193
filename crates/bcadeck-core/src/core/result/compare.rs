use super::model::{ComponentResult, Reported, SimulationResult};
use serde::Serialize;

/// Difference of one quantity between two runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Delta {
    pub left: Reported,
    pub right: Reported,
}

impl Delta {
    fn new(left: Reported, right: Reported) -> Self {
        Self { left, right }
    }

    /// `right - left`, when both sides carry a value.
    pub fn difference(&self) -> Option<f64> {
        Some(self.right.value()? - self.left.value()?)
    }

    /// Difference relative to the left value.
    pub fn relative(&self) -> Option<f64> {
        let left = self.left.value()?;
        (left != 0.0).then(|| self.difference().map(|d| d / left)).flatten()
    }
}

/// Per-species comparison of two results. Species are matched by symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesComparison {
    pub symbol: String,
    pub sputtering_yield: Delta,
    pub backscattering: Delta,
    pub transmission: Delta,
    pub mean_depth: Delta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub species: Vec<SpeciesComparison>,
    pub total_sputtering_yield: Delta,
    pub total_backscattering: Delta,
}

/// Lines up two results species by species, in the order of first appearance.
///
/// A species missing on one side compares against [`Reported::NotReported`].
pub fn compare(left: &SimulationResult, right: &SimulationResult) -> Comparison {
    let mut symbols: Vec<&str> = Vec::new();
    for component in left.components().iter().chain(right.components()) {
        if !symbols.contains(&component.symbol.as_str()) {
            symbols.push(&component.symbol);
        }
    }
    let species = symbols
        .into_iter()
        .map(|symbol| {
            let l = left.component_by_symbol(symbol);
            let r = right.component_by_symbol(symbol);
            let pick = |f: fn(&ComponentResult) -> Reported| {
                Delta::new(l.map(f).unwrap_or_default(), r.map(f).unwrap_or_default())
            };
            SpeciesComparison {
                symbol: symbol.to_string(),
                sputtering_yield: pick(|c| c.sputtering_yield),
                backscattering: pick(|c| c.backscattering),
                transmission: pick(|c| c.transmission),
                mean_depth: pick(|c| c.implantation.mean),
            }
        })
        .collect();
    Comparison {
        species,
        total_sputtering_yield: Delta::new(
            left.total_sputtering_yield(),
            right.total_sputtering_yield(),
        ),
        total_backscattering: Delta::new(left.total_backscattering(), right.total_backscattering()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::options::SimulationCode;
    use crate::core::result::model::ResultBuilder;

    fn result(code: SimulationCode, entries: &[(&str, Reported)]) -> SimulationResult {
        let mut builder = ResultBuilder::new(code);
        for (i, (symbol, y)) in entries.iter().enumerate() {
            let c = builder.component_mut(i + 1);
            c.symbol = symbol.to_string();
            c.sputtering_yield = *y;
        }
        builder.finish()
    }

    #[test]
    fn species_are_matched_by_symbol() {
        let sdtrimsp = result(
            SimulationCode::SdTrimSp,
            &[("Ar", Reported::NotApplicable), ("Si", Reported::Value(0.8))],
        );
        let tridyn = result(SimulationCode::Tridyn, &[("Si", Reported::Value(1.0)), ("Ar", Reported::Value(0.0))]);

        let comparison = compare(&sdtrimsp, &tridyn);

        assert_eq!(comparison.species[0].symbol, "Ar");
        assert_eq!(comparison.species[0].sputtering_yield.difference(), None);
        let si = &comparison.species[1];
        assert!((si.sputtering_yield.difference().unwrap() - 0.2).abs() < 1e-12);
        assert!((si.sputtering_yield.relative().unwrap() - 0.25).abs() < 1e-12);
        let total = comparison.total_sputtering_yield.difference().unwrap();
        assert!((total - 0.2).abs() < 1e-12);
    }

    #[test]
    fn missing_species_compare_against_not_reported() {
        let left = result(SimulationCode::SdTrimSp, &[("W", Reported::Value(0.5))]);
        let right = result(SimulationCode::SdTrimSp, &[("Mo", Reported::Value(0.5))]);

        let comparison = compare(&left, &right);

        assert_eq!(comparison.species.len(), 2);
        assert_eq!(comparison.species[1].sputtering_yield.left, Reported::NotReported);
    }
}
