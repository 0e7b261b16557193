use super::SdTrimSpVersion;
use crate::backends::native::NativeMap;
use crate::core::config::options::{
    AngleMode, InelasticLossModel, IntegrationMethod, InteractionPotential, KineticEnergyMode,
    Mode, SurfaceBindingModel,
};

pub(super) const DEFAULT_HISTORIES: u64 = 1000;
pub(super) const DEFAULT_PROJECTILES: u64 = 100;
pub(super) const DEFAULT_OUTPUT_INTERVAL: u64 = 10;
pub(super) const DEFAULT_SWEEP_STEPS: u32 = 18;
pub(super) const DEFAULT_POTENTIAL: InteractionPotential = InteractionPotential::Krc;
pub(super) const DEFAULT_INTEGRATION: IntegrationMethod = IntegrationMethod::GaussLegendre;

pub(super) const IDREL: NativeMap<Mode> = NativeMap {
    option: "mode",
    key: "idrel",
    entries: &[
        (Mode::StaticNoRecoil, -1),
        (Mode::Dynamic, 0),
        (Mode::Static, 1),
    ],
};

pub(super) const CASE_E0: NativeMap<KineticEnergyMode> = NativeMap {
    option: "kinetic_energy_mode",
    key: "case_e0",
    entries: &[
        (KineticEnergyMode::Fixed, 0),
        (KineticEnergyMode::File, 1),
        (KineticEnergyMode::MaxwellianVelocityDistribution, 2),
        (KineticEnergyMode::MaxwellianEnergyDistribution, 3),
        (KineticEnergyMode::Sweep, 5),
        (KineticEnergyMode::FileEnergyAngle, 6),
    ],
};

pub(super) const CASE_ALPHA: NativeMap<AngleMode> = NativeMap {
    option: "angle_mode",
    key: "case_alpha",
    entries: &[
        (AngleMode::Fixed, 0),
        (AngleMode::RandomDistribution, 1),
        (AngleMode::CosDistribution1, 2),
        (AngleMode::CosDistribution2, 3),
        (AngleMode::File, 4),
        (AngleMode::Sweep, 5),
        (AngleMode::FileEnergyAngle, 6),
    ],
};

const INEL0_6_01: NativeMap<InelasticLossModel> = NativeMap {
    option: "inelastic_loss_model",
    key: "inel0",
    entries: &[
        (InelasticLossModel::LindhardScharff, 1),
        (InelasticLossModel::OenRobinson, 2),
        (InelasticLossModel::LindhardScharffAndOenRobinson, 3),
        (InelasticLossModel::Hydrogen, 4),
        (InelasticLossModel::Helium, 5),
        (InelasticLossModel::Ziegler, 6),
    ],
};

const INEL0_6_09: NativeMap<InelasticLossModel> = NativeMap {
    option: "inelastic_loss_model",
    key: "inel0",
    entries: &[
        (InelasticLossModel::LindhardScharff, 1),
        (InelasticLossModel::OenRobinson, 2),
        (InelasticLossModel::LindhardScharffAndOenRobinson, 3),
        (InelasticLossModel::Hydrogen, 4),
        (InelasticLossModel::Helium, 5),
        (InelasticLossModel::Ziegler, 6),
        (InelasticLossModel::LindhardScharffAndZiegler, 7),
    ],
};

pub(super) const IPOT: NativeMap<InteractionPotential> = NativeMap {
    option: "interaction_potential",
    key: "ipot",
    entries: &[
        (InteractionPotential::Krc, 1),
        (InteractionPotential::Moliere, 2),
        (InteractionPotential::Zbl, 3),
        (InteractionPotential::NakagawaYamamura, 4),
        (InteractionPotential::SiSi, 5),
        (InteractionPotential::Power, 6),
    ],
};

pub(super) const IINTEGRAL: NativeMap<IntegrationMethod> = NativeMap {
    option: "integration_method",
    key: "iintegral",
    entries: &[
        (IntegrationMethod::Magic, 0),
        (IntegrationMethod::GaussMehler, 1),
        (IntegrationMethod::GaussLegendre, 2),
    ],
};

const ISBV_6_01: NativeMap<SurfaceBindingModel> = NativeMap {
    option: "surface_binding_model",
    key: "isbv",
    entries: &[
        (SurfaceBindingModel::ElementSpecific, 1),
        (SurfaceBindingModel::Average, 2),
        (SurfaceBindingModel::ElementPairs, 3),
        (SurfaceBindingModel::SolidSolid, 4),
        (SurfaceBindingModel::SolidGas, 5),
        (SurfaceBindingModel::File, 6),
        (SurfaceBindingModel::Electronegativity, 7),
    ],
};

const ISBV_6_09: NativeMap<SurfaceBindingModel> = NativeMap {
    option: "surface_binding_model",
    key: "isbv",
    entries: &[
        (SurfaceBindingModel::ElementSpecific, 1),
        (SurfaceBindingModel::Average, 2),
        (SurfaceBindingModel::ElementPairs, 3),
        (SurfaceBindingModel::Compounds, 5),
        (SurfaceBindingModel::File, 6),
        (SurfaceBindingModel::Electronegativity, 7),
        (SurfaceBindingModel::Table, 8),
    ],
};

/// Native tables and defaults that differ between deck dialects.
pub(super) struct DialectTables {
    pub inel0: NativeMap<InelasticLossModel>,
    pub isbv: NativeMap<SurfaceBindingModel>,
    pub default_inelastic: InelasticLossModel,
    pub default_surface_binding: SurfaceBindingModel,
}

pub(super) const fn tables(version: SdTrimSpVersion) -> DialectTables {
    match version {
        SdTrimSpVersion::V6_01 => DialectTables {
            inel0: INEL0_6_01,
            isbv: ISBV_6_01,
            default_inelastic: InelasticLossModel::LindhardScharffAndOenRobinson,
            default_surface_binding: SurfaceBindingModel::ElementSpecific,
        },
        SdTrimSpVersion::V6_09 => DialectTables {
            inel0: INEL0_6_09,
            isbv: ISBV_6_09,
            default_inelastic: InelasticLossModel::LindhardScharffAndZiegler,
            default_surface_binding: SurfaceBindingModel::Table,
        },
    }
}
