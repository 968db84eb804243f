use crate::models::ModelError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

pub(crate) use str_enum;

str_enum!(Rank {
    Endangered => "Endangered",
    Threatened => "Threatened",
    Sensitive => "Sensitive",
});

impl Rank {
    /// Deliverables are split into these three, in this order. Records
    /// whose rank never matched anything fall into an implicit Other
    /// bucket and are not staged.
    pub const ALL: [Rank; 3] = [Rank::Endangered, Rank::Threatened, Rank::Sensitive];

    /// Single-letter tag used in the Wildlife Observations feature-class
    /// names (`..._E_ident` and friends).
    pub fn initial(&self) -> &'static str {
        match self {
            Rank::Endangered => "E",
            Rank::Threatened => "T",
            Rank::Sensitive => "S",
        }
    }
}

str_enum!(Accuracy {
    TenthMile => "1/10 mile",
    FifthMile => "1/5 mile",
    EightyMeters => "80 meters",
    SpecificArea => "specific area",
});

impl Accuracy {
    /// The only positional-accuracy categories the CNDDB selection keeps.
    pub const ALL: [Accuracy; 4] = [
        Accuracy::TenthMile,
        Accuracy::FifthMile,
        Accuracy::EightyMeters,
        Accuracy::SpecificArea,
    ];
}
