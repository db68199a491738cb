use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};
use std::{error, fmt};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! features {
    ($($name:ident),* $(,)?) => {
        /// A single term of the evaluation function
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
        pub enum Feature {
            $($name),*
        }

        impl Feature {
            pub const ALL: &'static [Feature] = &[$(Feature::$name),*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Feature::$name => stringify!($name)),*
                }
            }

            pub fn from_name(name: &str) -> Option<Feature> {
                match name {
                    $(stringify!($name) => Some(Feature::$name),)*
                    _ => None,
                }
            }
        }
    };
}

features!(
    Tempo,
    TopFlat,
    EndgameFlat,
    Standing,
    Capstone,
    Flat,
    Captured,
    HardTopCap,
    CapMobility,
    HardFlatCaptive,
    SoftFlatCaptive,
    HardStandingCaptive,
    SoftStandingCaptive,
    HardCapstoneCaptive,
    SoftCapstoneCaptive,
    Liberties,
    GroupLiberties,
    Groups0,
    Groups1,
    Groups2,
    Groups3,
    Groups4,
    Groups5,
    Groups6,
    Groups7,
    Concentration,
    Potential,
    Threat,
    EmptyControl,
    FlatControl,
    Center,
    CenterControl,
    ThrowMine,
    ThrowTheirs,
    ThrowEmpty,
);

pub const NUM_FEATURES: usize = Feature::ALL.len();

impl Feature {
    /// The group feature for a bounding box of `extent` squares, clamped to the table
    pub fn group(extent: u8) -> Feature {
        const GROUPS: [Feature; 8] = [
            Feature::Groups0,
            Feature::Groups1,
            Feature::Groups2,
            Feature::Groups3,
            Feature::Groups4,
            Feature::Groups5,
            Feature::Groups6,
            Feature::Groups7,
        ];
        GROUPS[(extent as usize).min(7)]
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UnknownFeature {
    pub name: String,
}

impl fmt::Display for UnknownFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown feature: {:?}", self.name)
    }
}

impl error::Error for UnknownFeature {}

/// Weight of each evaluation feature
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Weights {
    values: [i64; NUM_FEATURES],
}

impl Default for Weights {
    fn default() -> Self {
        Weights::default_for_size(5)
    }
}

impl Weights {
    pub fn zero() -> Self {
        Weights {
            values: [0; NUM_FEATURES],
        }
    }

    pub fn default_for_size(size: u8) -> Self {
        use Feature::*;
        let mut weights = Weights::zero();
        for (feature, value) in [
            (Tempo, 50),
            (TopFlat, 400),
            (EndgameFlat, 800),
            (Standing, 200),
            (Capstone, 300),
            (HardTopCap, 100),
            (CapMobility, 10),
            (HardFlatCaptive, 200),
            (SoftFlatCaptive, -200),
            (HardStandingCaptive, 300),
            (SoftStandingCaptive, -100),
            (HardCapstoneCaptive, 250),
            (SoftCapstoneCaptive, -100),
            (Groups3, 100),
            (Groups4, 300),
            (Concentration, 10),
            (Potential, 100),
            (Threat, 300),
            (EmptyControl, 20),
            (FlatControl, 50),
            (Center, 40),
            (CenterControl, 10),
        ] {
            weights[feature] = value;
        }
        if size >= 6 {
            for (feature, value) in [
                (SoftStandingCaptive, -150),
                (SoftCapstoneCaptive, -150),
                (Groups5, 500),
                (ThrowMine, 10),
                (ThrowTheirs, 50),
                (ThrowEmpty, 40),
            ] {
                weights[feature] = value;
            }
        }
        weights
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, i64)> + '_ {
        Feature::ALL
            .iter()
            .map(move |&feature| (feature, self[feature]))
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        // Serializing a map of strings to integers cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Index<Feature> for Weights {
    type Output = i64;

    fn index(&self, feature: Feature) -> &i64 {
        &self.values[feature as usize]
    }
}

impl IndexMut<Feature> for Weights {
    fn index_mut(&mut self, feature: Feature) -> &mut i64 {
        &mut self.values[feature as usize]
    }
}

impl fmt::Debug for Weights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().filter(|(_, value)| *value != 0))
            .finish()
    }
}

impl Serialize for Weights {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<&str, i64> = self
            .iter()
            .filter(|(_, value)| *value != 0)
            .map(|(feature, value)| (feature.name(), value))
            .collect();
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Weights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, i64>::deserialize(deserializer)?;
        let mut weights = Weights::zero();
        for (name, value) in map {
            let feature = Feature::from_name(&name)
                .ok_or_else(|| D::Error::custom(UnknownFeature { name }))?;
            weights[feature] = value;
        }
        Ok(weights)
    }
}
