use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Indian climatological season, keyed by calendar month.
///
/// The label written to tables and the multiplier used by the synthetic
/// generator both come from this one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Summer,
    Monsoon,
    #[serde(rename = "Post-Monsoon")]
    PostMonsoon,
}

impl Season {
    pub const ALL: [Self; 4] = [Self::Winter, Self::Summer, Self::Monsoon, Self::PostMonsoon];

    /// Maps a 1-based month. Out-of-range input is treated as the nearest
    /// valid month.
    pub const fn from_month(month: u8) -> Self {
        match month {
            0..=2 | 11.. => Self::Winter,
            3..=5 => Self::Summer,
            6..=9 => Self::Monsoon,
            _ => Self::PostMonsoon,
        }
    }

    /// Relative pollution multiplier for the season.
    pub const fn factor(self) -> f64 {
        match self {
            Self::Winter => 1.4,
            Self::Summer => 1.1,
            Self::Monsoon => 0.7,
            Self::PostMonsoon => 1.2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Winter => "Winter",
            Self::Summer => "Summer",
            Self::Monsoon => "Monsoon",
            Self::PostMonsoon => "Post-Monsoon",
        }
    }
}

impl Display for Season {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
