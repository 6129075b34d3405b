//! Climate-region presets and hemisphere seasons

use crate::wind::Quadrant;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateRegion {
    AtlanticEurope,
    #[default]
    Mediterranean,
    ContinentalEurope,
    Scandinavia,
    NorthAmericaEast,
    NorthAmericaWest,
    Australia,
    Custom,
}

/// Wind quadrants that bring settled (`fair`) or unsettled (`foul`)
/// weather in a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindPattern {
    pub fair: [Quadrant; 2],
    pub foul: [Quadrant; 2],
}

impl WindPattern {
    /// -1 for a fair quadrant, +1 for a foul one
    #[must_use]
    pub fn bias(&self, quadrant: Quadrant) -> i8 {
        if self.fair.contains(&quadrant) {
            -1
        } else if self.foul.contains(&quadrant) {
            1
        } else {
            0
        }
    }
}

/// MSLP thresholds (hPa) below which rain gets progressively more likely
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureProfile {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl ClimateRegion {
    pub const ALL: [ClimateRegion; 8] = [
        ClimateRegion::AtlanticEurope,
        ClimateRegion::Mediterranean,
        ClimateRegion::ContinentalEurope,
        ClimateRegion::Scandinavia,
        ClimateRegion::NorthAmericaEast,
        ClimateRegion::NorthAmericaWest,
        ClimateRegion::Australia,
        ClimateRegion::Custom,
    ];

    #[must_use]
    pub fn wind_pattern(self) -> WindPattern {
        use Quadrant::{E, N, S, W};
        let (fair, foul) = match self {
            ClimateRegion::AtlanticEurope => ([E, N], [W, S]),
            ClimateRegion::Mediterranean => ([N, E], [S, W]),
            ClimateRegion::ContinentalEurope => ([E, N], [W, S]),
            ClimateRegion::Scandinavia => ([E, N], [S, W]),
            ClimateRegion::NorthAmericaEast => ([N, W], [S, E]),
            ClimateRegion::NorthAmericaWest => ([E, N], [W, S]),
            ClimateRegion::Australia => ([S, E], [N, W]),
            ClimateRegion::Custom => ([N, E], [S, W]),
        };
        WindPattern { fair, foul }
    }

    #[must_use]
    pub fn pressure_profile(self) -> PressureProfile {
        let (low, medium, high) = match self {
            ClimateRegion::AtlanticEurope => (1005.0, 1012.0, 1020.0),
            ClimateRegion::Mediterranean | ClimateRegion::NorthAmericaWest => {
                (1008.0, 1015.0, 1022.0)
            }
            ClimateRegion::Scandinavia => (1000.0, 1010.0, 1018.0),
            ClimateRegion::ContinentalEurope
            | ClimateRegion::NorthAmericaEast
            | ClimateRegion::Australia
            | ClimateRegion::Custom => (1005.0, 1013.0, 1020.0),
        };
        PressureProfile { low, medium, high }
    }
}

impl fmt::Display for ClimateRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ClimateRegion::AtlanticEurope => "Atlantic Europe",
            ClimateRegion::Mediterranean => "Mediterranean",
            ClimateRegion::ContinentalEurope => "Continental Europe",
            ClimateRegion::Scandinavia => "Scandinavia",
            ClimateRegion::NorthAmericaEast => "North America East",
            ClimateRegion::NorthAmericaWest => "North America West",
            ClimateRegion::Australia => "Australia",
            ClimateRegion::Custom => "Custom",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hemisphere {
    #[default]
    Northern,
    Southern,
}

impl Hemisphere {
    /// Winter half-year for a calendar month (1-12)
    #[must_use]
    pub fn is_winter(self, month: u32) -> bool {
        match self {
            Hemisphere::Northern => month <= 3 || month >= 10,
            Hemisphere::Southern => (4..=9).contains(&month),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_region_has_disjoint_wind_sets() {
        for region in ClimateRegion::ALL {
            let pattern = region.wind_pattern();
            for q in pattern.fair {
                assert!(!pattern.foul.contains(&q), "{region}");
            }
        }
    }

    #[test]
    fn test_australia_is_mirrored() {
        let pattern = ClimateRegion::Australia.wind_pattern();
        assert_eq!(pattern.bias(Quadrant::N), 1);
        assert_eq!(pattern.bias(Quadrant::S), -1);
    }

    #[test]
    fn test_seasons_flip_between_hemispheres() {
        assert!(Hemisphere::Northern.is_winter(1));
        assert!(!Hemisphere::Southern.is_winter(1));
        assert!(Hemisphere::Southern.is_winter(7));
        assert!(!Hemisphere::Northern.is_winter(7));
    }

    #[test]
    fn test_region_deserializes_from_snake_case() {
        let region: ClimateRegion = serde_json::from_str("\"north_america_east\"").unwrap();
        assert_eq!(region, ClimateRegion::NorthAmericaEast);
    }
}
