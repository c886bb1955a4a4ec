use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
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

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
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

str_enum!(Category {
    Blood => "blood",
    Lipid => "lipid",
    Metabolic => "metabolic",
    Thyroid => "thyroid",
});

str_enum!(Stratum {
    Male => "male",
    Female => "female",
});

str_enum!(TrendDirection {
    Increasing => "increasing",
    Decreasing => "decreasing",
    Stable => "stable",
});

str_enum!(AnomalySeverity {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(RangeStatus {
    Low => "low",
    Normal => "normal",
    High => "high",
});

impl Category {
    /// Scoring order. Also the iteration order of every per-category map.
    pub const ALL: [Category; 4] = [
        Category::Blood,
        Category::Metabolic,
        Category::Lipid,
        Category::Thyroid,
    ];

    /// Fixed contribution of this category to the composite health score.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Blood => 0.30,
            Self::Metabolic => 0.25,
            Self::Lipid => 0.25,
            Self::Thyroid => 0.20,
        }
    }
}

impl Stratum {
    /// Used whenever a stratified range is requested without a stratum.
    pub const DEFAULT: Stratum = Stratum::Male;
}

/// Look-back window for trend queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "6m")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMonth => "1m",
            Self::SixMonths => "6m",
            Self::OneYear => "1y",
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            Self::OneMonth => 30,
            Self::SixMonths => 180,
            Self::OneYear => 365,
        }
    }

    /// Anything other than `1m` or `6m` (including nothing) means one year.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("1m") => Self::OneMonth,
            Some("6m") => Self::SixMonths,
            _ => Self::OneYear,
        }
    }
}
