use super::options::{
    AngleMode, InelasticLossModel, IntegrationMethod, InteractionPotential, KineticEnergyMode,
    Mode, SimulationCode, SurfaceBindingModel,
};
use super::persistence::ConfigDocument;
use crate::core::elements::element::Element;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Keys a backend does not know about. They are persisted but never interpreted.
pub type ExtraOptions = BTreeMap<String, Value>;

pub const DEFAULT_THICKNESS: f64 = 2000.0;
pub const DEFAULT_SEGMENTS: u32 = 200;
pub const DEFAULT_LAYER_NAME: &str = "Layer";

fn default_thickness() -> f64 {
    DEFAULT_THICKNESS
}

fn default_segments() -> u32 {
    DEFAULT_SEGMENTS
}

fn default_one() -> f64 {
    1.0
}

fn default_threads() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeamOptions {
    /// Number of sweep steps when the energy or angle mode is a sweep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep: Option<u32>,
    #[serde(flatten)]
    pub extra: ExtraOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamArguments {
    pub kinetic_energy_mode: KineticEnergyMode,
    pub angle_mode: AngleMode,
    #[serde(default, rename = "optional")]
    pub options: BeamOptions,
}

impl Default for BeamArguments {
    fn default() -> Self {
        Self {
            kinetic_energy_mode: KineticEnergyMode::Fixed,
            angle_mode: AngleMode::Fixed,
            options: BeamOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inelastic_loss_model: Option<InelasticLossModel>,
    /// What the code does when the maximum atomic fraction is exceeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_atomic_fraction_action: Option<u32>,
    #[serde(flatten)]
    pub extra: ExtraOptions,
}

/// One beam or target species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRow {
    pub index: usize,
    pub symbol: String,
    pub element: Element,
    pub abundance: f64,
    #[serde(default = "default_one")]
    pub max_atomic_fraction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, rename = "optional")]
    pub options: RowOptions,
}

impl ParticleRow {
    pub fn beam(element: Element, abundance: f64, energy: f64, angle: f64) -> Self {
        Self {
            index: 0,
            symbol: element.symbol().to_string(),
            element,
            abundance,
            max_atomic_fraction: 1.0,
            energy: Some(energy),
            angle: Some(angle),
            options: RowOptions::default(),
        }
    }

    pub fn target(element: Element, abundance: f64) -> Self {
        Self {
            index: 0,
            symbol: element.symbol().to_string(),
            element,
            abundance,
            max_atomic_fraction: 1.0,
            energy: None,
            angle: None,
            options: RowOptions::default(),
        }
    }

    pub fn with_max_atomic_fraction(mut self, fraction: f64) -> Self {
        self.max_atomic_fraction = fraction;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_density: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub film_thickness: Option<f64>,
    #[serde(flatten)]
    pub extra: ExtraOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetArguments {
    #[serde(default = "default_thickness")]
    pub thickness: f64,
    #[serde(default = "default_segments")]
    pub segments: u32,
    #[serde(default, rename = "optional")]
    pub options: TargetOptions,
}

impl Default for TargetArguments {
    fn default() -> Self {
        Self {
            thickness: DEFAULT_THICKNESS,
            segments: DEFAULT_SEGMENTS,
            options: TargetOptions::default(),
        }
    }
}

/// A contiguous depth segment of the 1-D target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureLayer {
    pub name: String,
    pub thickness: f64,
    pub segments: u32,
    /// One entry per target row, in target-row order.
    pub abundances: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histories: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "projectiles")]
    pub projectiles_per_history: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "histories_between_out")]
    pub output_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_potential: Option<InteractionPotential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_method: Option<IntegrationMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_binding_model: Option<SurfaceBindingModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inelastic_loss_model: Option<InelasticLossModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collisions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vacancy_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_elements: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_reflected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_sputtered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_matrix: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_output: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_energy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integral_frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integral_outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projectile_outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compounds: Vec<String>,
    #[serde(flatten)]
    pub extra: ExtraOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub mode: Mode,
    #[serde(default = "default_one")]
    pub fluence: f64,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(default, rename = "optional")]
    pub options: SettingsOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Static,
            fluence: 1.0,
            threads: 1,
            options: SettingsOptions::default(),
        }
    }
}

/// The code-agnostic description of one irradiation experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfigDocument", into = "ConfigDocument")]
pub struct Configuration {
    pub title: String,
    pub simulation: SimulationCode,
    pub beam_arguments: BeamArguments,
    pub beam_rows: Vec<ParticleRow>,
    pub target_arguments: TargetArguments,
    pub target_rows: Vec<ParticleRow>,
    pub structure: Vec<StructureLayer>,
    pub settings: Settings,
    pub additional: Vec<String>,
}

/// One entry of the per-component list a deck is built from.
///
/// A component normally wraps a single row. With element grouping enabled a beam
/// row and a target row of the same species share one component.
#[derive(Debug, Clone, Copy)]
pub struct Component<'a> {
    pub index: usize,
    pub beam: Option<&'a ParticleRow>,
    /// The target row together with its column in the layer abundance vectors.
    pub target: Option<(usize, &'a ParticleRow)>,
    row: &'a ParticleRow,
}

impl<'a> Component<'a> {
    fn primary(&self) -> &'a ParticleRow {
        self.target.map_or(self.row, |(_, row)| row)
    }

    fn first_row(&self) -> &'a ParticleRow {
        self.beam.unwrap_or(self.row)
    }

    pub fn symbol(&self) -> &'a str {
        &self.primary().symbol
    }

    pub fn element(&self) -> &'a Element {
        &self.primary().element
    }

    pub fn beam_fraction(&self) -> f64 {
        self.beam.map_or(0.0, |row| row.abundance)
    }

    pub fn energy(&self) -> f64 {
        self.beam.and_then(|row| row.energy).unwrap_or(0.0)
    }

    pub fn angle(&self) -> f64 {
        self.beam.and_then(|row| row.angle).unwrap_or(0.0)
    }

    pub fn max_atomic_fraction(&self) -> f64 {
        self.first_row().max_atomic_fraction
    }

    pub fn inelastic_loss_model(&self) -> Option<InelasticLossModel> {
        self.beam
            .and_then(|row| row.options.inelastic_loss_model)
            .or_else(|| self.target.and_then(|(_, row)| row.options.inelastic_loss_model))
    }

    pub fn max_atomic_fraction_action(&self) -> Option<u32> {
        self.first_row().options.max_atomic_fraction_action
    }

    /// Abundance of this component in `layer`; zero for beam-only components.
    pub fn layer_abundance(&self, layer: &StructureLayer) -> f64 {
        self.target
            .and_then(|(column, _)| layer.abundances.get(column).copied())
            .unwrap_or(0.0)
    }

    pub fn is_target(&self) -> bool {
        self.target.is_some()
    }
}

impl Configuration {
    pub fn new(title: impl Into<String>, simulation: SimulationCode) -> Self {
        Self {
            title: title.into(),
            simulation,
            beam_arguments: BeamArguments::default(),
            beam_rows: Vec::new(),
            target_arguments: TargetArguments::default(),
            target_rows: Vec::new(),
            structure: Vec::new(),
            settings: Settings::default(),
            additional: Vec::new(),
        }
    }

    /// Appends a beam row and returns its assigned index.
    pub fn add_beam_row(&mut self, row: ParticleRow) -> usize {
        self.beam_rows.push(ParticleRow {
            index: 0,
            ..row
        });
        self.renumber();
        self.beam_rows.last().map_or(0, |r| r.index)
    }

    /// Appends a target row, extending every layer with a zero abundance.
    pub fn add_target_row(&mut self, row: ParticleRow) -> usize {
        self.target_rows.push(ParticleRow {
            index: 0,
            energy: None,
            angle: None,
            ..row
        });
        for layer in &mut self.structure {
            layer.abundances.push(0.0);
        }
        self.renumber();
        self.target_rows.last().map_or(0, |r| r.index)
    }

    /// Removes the row with `index` from either section and renumbers the rest.
    pub fn remove_row(&mut self, index: usize) -> Option<ParticleRow> {
        let removed = if let Some(pos) = self.beam_rows.iter().position(|r| r.index == index) {
            Some(self.beam_rows.remove(pos))
        } else if let Some(pos) = self.target_rows.iter().position(|r| r.index == index) {
            for layer in &mut self.structure {
                if pos < layer.abundances.len() {
                    layer.abundances.remove(pos);
                }
            }
            Some(self.target_rows.remove(pos))
        } else {
            None
        };
        if removed.is_some() {
            self.renumber();
        }
        removed
    }

    /// Reassigns indices: beam rows 1..nb, then target rows nb+1..n, in section order.
    ///
    /// Rows never move inside their section, so layer abundance columns stay aligned.
    pub fn renumber(&mut self) {
        let rows = self.beam_rows.iter_mut().chain(self.target_rows.iter_mut());
        for (rank, row) in rows.enumerate() {
            row.index = rank + 1;
        }
    }

    /// Beam rows followed by target rows.
    pub fn rows(&self) -> impl Iterator<Item = &ParticleRow> {
        self.beam_rows.iter().chain(self.target_rows.iter())
    }

    pub fn group_elements(&self) -> bool {
        self.settings.options.group_elements.unwrap_or(false)
    }

    /// Derives the ordered component list a deck is rendered from.
    pub fn components(&self) -> Vec<Component<'_>> {
        let mut rows: Vec<(usize, &ParticleRow, Option<usize>)> = self
            .beam_rows
            .iter()
            .map(|r| (r.index, r, None))
            .chain(
                self.target_rows
                    .iter()
                    .enumerate()
                    .map(|(col, r)| (r.index, r, Some(col))),
            )
            .collect();
        rows.sort_by_key(|(index, _, column)| (*index, column.is_some()));

        let grouping = self.group_elements();
        let mut components: Vec<Component<'_>> = Vec::with_capacity(rows.len());
        for (_, row, column) in rows {
            let (beam, target) = match column {
                None => (Some(row), None),
                Some(col) => (None, Some((col, row))),
            };
            if grouping {
                let partner = components.iter_mut().find(|c| {
                    c.symbol() == row.symbol
                        && if column.is_some() {
                            c.target.is_none()
                        } else {
                            c.beam.is_none()
                        }
                });
                if let Some(partner) = partner {
                    partner.beam = partner.beam.or(beam);
                    partner.target = partner.target.or(target);
                    continue;
                }
            }
            components.push(Component {
                index: components.len() + 1,
                beam,
                target,
                row,
            });
        }
        components
    }

    /// A single layer spanning the whole target with the target-row abundances.
    pub fn default_layer(&self) -> StructureLayer {
        StructureLayer {
            name: DEFAULT_LAYER_NAME.to_string(),
            thickness: self.target_arguments.thickness,
            segments: self.target_arguments.segments,
            abundances: self.target_rows.iter().map(|r| r.abundance).collect(),
        }
    }

    pub fn layer_thickness_sum(&self) -> f64 {
        self.structure.iter().map(|l| l.thickness).sum()
    }

    pub fn layer_segment_sum(&self) -> u64 {
        self.structure.iter().map(|l| u64::from(l.segments)).sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::elements::catalog::ElementCatalog;

    /// Two beam rows, two target rows and two 1000 Å layers.
    pub(crate) fn four_row_config(code: SimulationCode) -> Configuration {
        let catalog = ElementCatalog::builtin().unwrap();
        let mut config = Configuration::new("Ar and Ne on Si", code);
        config.add_beam_row(ParticleRow::beam(catalog.lookup("Ar").unwrap(), 0.5, 500.0, 0.0));
        config.add_beam_row(ParticleRow::beam(catalog.lookup("Ne").unwrap(), 0.5, 1000.0, 30.0));
        config.add_target_row(ParticleRow::target(catalog.lookup("Si").unwrap(), 0.5));
        config.add_target_row(ParticleRow::target(catalog.lookup("O").unwrap(), 0.5));
        config.structure = vec![
            StructureLayer {
                name: "Oxide".to_string(),
                thickness: 1000.0,
                segments: 100,
                abundances: vec![0.5, 0.5],
            },
            StructureLayer {
                name: "Bulk".to_string(),
                thickness: 1000.0,
                segments: 100,
                abundances: vec![1.0, 0.0],
            },
        ];
        config
    }

    #[test]
    fn rows_get_contiguous_indices() {
        let config = four_row_config(SimulationCode::SdTrimSp);

        let indices: Vec<_> = config.rows().map(|r| r.index).collect();

        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn removing_target_row_drops_its_layer_column() {
        let mut config = four_row_config(SimulationCode::SdTrimSp);

        let removed = config.remove_row(3).unwrap();

        assert_eq!(removed.symbol, "Si");
        assert_eq!(config.structure[0].abundances, vec![0.5]);
        assert_eq!(config.structure[1].abundances, vec![0.0]);
        assert_eq!(config.rows().map(|r| r.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(config.remove_row(42).is_none());
    }

    #[test]
    fn removing_beam_row_renumbers_targets() {
        let mut config = four_row_config(SimulationCode::SdTrimSp);

        config.remove_row(1);

        assert_eq!(config.beam_rows[0].index, 1);
        assert_eq!(config.target_rows[0].index, 2);
        assert_eq!(config.target_rows[1].index, 3);
    }

    #[test]
    fn adding_target_row_extends_layers() {
        let mut config = four_row_config(SimulationCode::SdTrimSp);
        let catalog = ElementCatalog::builtin().unwrap();

        let index = config.add_target_row(ParticleRow::target(catalog.lookup("W").unwrap(), 0.0));

        assert_eq!(index, 5);
        assert!(config.structure.iter().all(|l| l.abundances.len() == 3));
    }

    #[test]
    fn late_beam_row_is_numbered_before_targets() {
        let mut config = four_row_config(SimulationCode::SdTrimSp);
        let catalog = ElementCatalog::builtin().unwrap();

        let index = config.add_beam_row(ParticleRow::beam(catalog.lookup("He").unwrap(), 0.0, 100.0, 0.0));

        assert_eq!(index, 3);
        assert_eq!(config.target_rows[0].index, 4);
        assert_eq!(config.target_rows[1].index, 5);
    }

    #[test]
    fn components_follow_index_order() {
        let config = four_row_config(SimulationCode::SdTrimSp);

        let components = config.components();

        let symbols: Vec<_> = components.iter().map(|c| c.symbol()).collect();
        assert_eq!(symbols, vec!["Ar", "Ne", "Si", "O"]);
        assert_eq!(components.iter().map(|c| c.index).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(components[2].layer_abundance(&config.structure[0]), 0.5);
        assert_eq!(components[0].layer_abundance(&config.structure[0]), 0.0);
    }

    #[test]
    fn grouping_merges_beam_and_target_of_same_species() {
        let catalog = ElementCatalog::builtin().unwrap();
        let mut config = Configuration::new("self", SimulationCode::SdTrimSp);
        config.add_beam_row(ParticleRow::beam(catalog.lookup("W").unwrap(), 1.0, 2000.0, 0.0));
        config.add_target_row(ParticleRow::target(catalog.lookup("W").unwrap(), 1.0));
        config.settings.options.group_elements = Some(true);

        let components = config.components();

        assert_eq!(components.len(), 1);
        assert!(components[0].beam.is_some());
        assert!(components[0].is_target());

        config.settings.options.group_elements = None;
        assert_eq!(config.components().len(), 2);
    }
}
