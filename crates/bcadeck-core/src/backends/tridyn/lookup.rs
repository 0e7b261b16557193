use crate::backends::native::NativeMap;
use crate::core::config::options::{AngleMode, InelasticLossModel, KineticEnergyMode, Mode};

pub(super) const DEFAULT_PSEUDO_PROJECTILES: u64 = 1_000_000;
pub(super) const DEFAULT_COLLISIONS: u32 = 1;
pub(super) const DEFAULT_INELASTIC: InelasticLossModel =
    InelasticLossModel::LindhardScharffAndOenRobinson;
pub(super) const DEFAULT_OUTPUT_FREQUENCY: u32 = 100;
/// Action when the maximum atomic fraction is exceeded.
pub(super) const DEFAULT_FRACTION_ACTION: u32 = 3;

/// Both static modes share `idrel = 0`; recoil suppression is a `coll` flag.
pub(super) const IDREL: NativeMap<Mode> = NativeMap {
    option: "mode",
    key: "cdat",
    entries: &[
        (Mode::Static, 0),
        (Mode::Dynamic, 1),
        (Mode::StaticNoRecoil, 0),
    ],
};

pub(super) const ELST: NativeMap<InelasticLossModel> = NativeMap {
    option: "inelastic_loss_model",
    key: "elst",
    entries: &[
        (InelasticLossModel::LindhardScharff, 1),
        (InelasticLossModel::OenRobinson, 2),
        (InelasticLossModel::LindhardScharffAndOenRobinson, 3),
    ],
};

/// Only mono-energetic beams are written; `irrd` distributions are not emitted.
pub(super) const ENERGY_MODE: NativeMap<KineticEnergyMode> = NativeMap {
    option: "kinetic_energy_mode",
    key: "irrd",
    entries: &[(KineticEnergyMode::Fixed, 0)],
};

/// Only fixed incidence is written; `angd` distributions are not emitted.
pub(super) const ANGLE_MODE: NativeMap<AngleMode> = NativeMap {
    option: "angle_mode",
    key: "angd",
    entries: &[(AngleMode::Fixed, 0)],
};
