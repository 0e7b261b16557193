use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a unit-variant enum whose persisted name is fixed per variant.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| format!("unknown {} '{}'", stringify!($name), s))
            }
        }
    };
}

named_enum! {
    /// Identifier of a supported simulation code.
    pub enum SimulationCode {
        SdTrimSp => "SDTrimSP",
        Tridyn => "TRIDYN",
    }
}

named_enum! {
    /// Whether the target composition evolves during the run.
    pub enum Mode {
        Static => "STATIC",
        Dynamic => "DYNAMIC",
        /// Static run in which recoils are not followed.
        StaticNoRecoil => "STATIC_NO_RECOIL",
    }
}

named_enum! {
    pub enum KineticEnergyMode {
        Fixed => "FIXED",
        File => "FILE",
        Sweep => "SWEEP",
        MaxwellianVelocityDistribution => "MAXWELLIAN_VELOCITY_DISTRIBUTION",
        MaxwellianEnergyDistribution => "MAXWELLIAN_ENERGY_DISTRIBUTION",
        FileEnergyAngle => "FILE_ENERGY_ANGLE",
        LinearRamp => "LINEAR_RAMP",
    }
}

named_enum! {
    pub enum AngleMode {
        Fixed => "FIXED",
        File => "FILE",
        Sweep => "SWEEP",
        RandomDistribution => "RANDOM_DISTRIBUTION",
        CosDistribution1 => "COS_DISTRIBUTION_1",
        CosDistribution2 => "COS_DISTRIBUTION_2",
        FileEnergyAngle => "FILE_ENERGY_ANGLE",
        Gaussian2d => "GAUSSIAN_2D",
        Cos2d => "COS_2D",
        Parabolic1d => "PARABOLIC_1D",
    }
}

named_enum! {
    /// Electronic stopping model.
    pub enum InelasticLossModel {
        LindhardScharff => "LINDHARD_SCHARFF",
        OenRobinson => "OEN_ROBINSON",
        LindhardScharffAndOenRobinson => "LINDHARD_SCHARFF_AND_OEN_ROBINSON",
        Hydrogen => "HYDROGEN",
        Helium => "HELIUM",
        Ziegler => "ZIEGLER",
        LindhardScharffAndZiegler => "LINDHARD_SCHARFF_AND_ZIEGLER",
    }
}

named_enum! {
    pub enum InteractionPotential {
        Krc => "KRC",
        Moliere => "MOLIERE",
        Zbl => "ZBL",
        NakagawaYamamura => "NAKAGAWA_YAMAMURA",
        SiSi => "SI_SI",
        Power => "POWER",
    }
}

named_enum! {
    pub enum IntegrationMethod {
        Magic => "MAGIC",
        GaussMehler => "GAUSS_MEHLER",
        GaussLegendre => "GAUSS_LEGENDRE",
    }
}

named_enum! {
    pub enum SurfaceBindingModel {
        ElementSpecific => "ELEMENT_SPECIFIC",
        Average => "AVERAGE",
        ElementPairs => "ELEMENT_PAIRS",
        SolidSolid => "SOLID_SOLID",
        SolidGas => "SOLID_GAS",
        File => "FILE",
        Electronegativity => "ELECTRONEGATIVITY",
        Compounds => "COMPOUNDS",
        Table => "TABLE",
    }
}

impl KineticEnergyMode {
    pub fn is_sweep(self) -> bool {
        self == KineticEnergyMode::Sweep
    }
}

impl AngleMode {
    pub fn is_sweep(self) -> bool {
        self == AngleMode::Sweep
    }
}
