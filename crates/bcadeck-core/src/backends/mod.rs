//! # Backends Module
//!
//! One implementation per supported simulation code. Each backend renders
//! [`Configuration`]s into the code's input deck, reads such decks back, and parses
//! the code's report into the unified result model.
//!
//! ## Architecture
//!
//! - **SDTrimSP** ([`sdtrimsp`]) - Fortran namelist deck (`tri.inp`, `layer.inp`) and `output.dat` report
//! - **TRIDYN** ([`tridyn`]) - keyed line deck (`<name>.in`, `<name>.lay`) and `<name>_out.dat` report
//! - **Selection** ([`registry`]) - lookup by [`SimulationCode`] and report auto-detection
//!
//! Adding a code means adding a module that implements the traits of
//! [`crate::core::io::traits`] and listing it in the registry; shared code never
//! branches on the code identifier.

pub(crate) mod native;
pub mod registry;
pub mod sdtrimsp;
pub mod tridyn;

use crate::core::config::model::{Configuration, ParticleRow, StructureLayer};
use crate::core::config::options::{InelasticLossModel, SimulationCode};
use crate::core::elements::element::Element;
use crate::core::io::format::normalize_fractions;

pub(crate) const FRACTION_DIGITS: i32 = 5;

/// One deck component as recovered by a deck reader.
#[derive(Debug, Clone)]
pub(crate) struct DeckComponent {
    pub element: Element,
    pub beam_fraction: f64,
    pub energy: f64,
    pub angle: f64,
    pub max_atomic_fraction: f64,
    pub max_atomic_fraction_action: Option<u32>,
    pub inelastic_loss_model: Option<InelasticLossModel>,
    pub is_beam: bool,
    pub is_target: bool,
}

/// A layer in component space: one abundance per deck component.
#[derive(Debug, Clone)]
pub(crate) struct DeckLayer {
    pub name: String,
    pub thickness: f64,
    pub segments: u32,
    pub abundances: Vec<f64>,
}

/// Splits deck components back into beam rows, target rows and layers.
///
/// A component that is both beam and target yields one row in each section and
/// switches element grouping on.
pub(crate) fn assemble_configuration(
    title: String,
    code: SimulationCode,
    components: &[DeckComponent],
    layers: Vec<DeckLayer>,
) -> Configuration {
    let mut config = Configuration::new(title, code);
    let mut target_columns = Vec::new();
    for (position, component) in components.iter().enumerate() {
        let mut row = ParticleRow::beam(
            component.element.clone(),
            component.beam_fraction,
            component.energy,
            component.angle,
        )
        .with_max_atomic_fraction(component.max_atomic_fraction);
        row.options.inelastic_loss_model = component.inelastic_loss_model;
        row.options.max_atomic_fraction_action = component.max_atomic_fraction_action;
        if component.is_beam {
            config.beam_rows.push(row.clone());
        }
        if component.is_target {
            row.energy = None;
            row.angle = None;
            config.target_rows.push(row);
            target_columns.push(position);
        }
    }
    if components.iter().any(|c| c.is_beam && c.is_target) {
        config.settings.options.group_elements = Some(true);
    }

    config.structure = layers
        .into_iter()
        .map(|layer| StructureLayer {
            name: layer.name,
            thickness: layer.thickness,
            segments: layer.segments,
            abundances: target_columns
                .iter()
                .map(|&column| layer.abundances.get(column).copied().unwrap_or(0.0))
                .collect(),
        })
        .collect();

    let first_layer: Vec<f64> = config
        .structure
        .first()
        .map(|layer| layer.abundances.clone())
        .unwrap_or_default();
    let shares = normalize_fractions(&first_layer, FRACTION_DIGITS);
    for (row, share) in config.target_rows.iter_mut().zip(shares) {
        row.abundance = share;
    }
    config.target_arguments.thickness = config.layer_thickness_sum();
    config.target_arguments.segments =
        u32::try_from(config.layer_segment_sum()).unwrap_or(u32::MAX);
    config.renumber();
    config
}

/// Builds the per-component beam, target and layer vectors of a deck.
pub(crate) struct ComponentVectors {
    pub beam: Vec<f64>,
    /// One vector per layer, in component space.
    pub layers: Vec<Vec<f64>>,
}

impl ComponentVectors {
    pub(crate) fn new(config: &Configuration) -> Self {
        let components = config.components();
        let beam = normalize_fractions(
            &components.iter().map(|c| c.beam_fraction()).collect::<Vec<_>>(),
            FRACTION_DIGITS,
        );
        let layers = config
            .structure
            .iter()
            .map(|layer| {
                let raw: Vec<f64> = components.iter().map(|c| c.layer_abundance(layer)).collect();
                normalize_fractions(&raw, FRACTION_DIGITS)
            })
            .collect();
        Self { beam, layers }
    }
}
