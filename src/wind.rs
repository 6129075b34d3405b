//! Beaufort force, direction buckets and circular direction smoothing

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper speed bound (m/s, exclusive) of Beaufort forces 0 through 11
const BEAUFORT_LIMITS_MS: [f64; 12] = [
    0.3, 1.6, 3.4, 5.5, 8.0, 10.8, 13.9, 17.2, 20.8, 24.5, 28.5, 32.7,
];

const BEAUFORT_DESCRIPTIONS: [&str; 13] = [
    "Calm",
    "Light Air",
    "Light Breeze",
    "Gentle Breeze",
    "Moderate Breeze",
    "Fresh Breeze",
    "Strong Breeze",
    "Near Gale",
    "Gale",
    "Strong Gale",
    "Storm",
    "Violent Storm",
    "Hurricane",
];

const CARDINAL_16: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Beaufort {
    pub force: u8,
    pub description: &'static str,
}

impl Beaufort {
    #[must_use]
    pub fn from_speed(speed_ms: f64) -> Self {
        let force = BEAUFORT_LIMITS_MS
            .iter()
            .position(|limit| speed_ms < *limit)
            .unwrap_or(BEAUFORT_LIMITS_MS.len());
        Self {
            force: force as u8,
            description: BEAUFORT_DESCRIPTIONS[force],
        }
    }
}

/// 90° sectors centred on the cardinal points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    N,
    E,
    S,
    W,
}

impl Quadrant {
    #[must_use]
    pub fn from_direction(degrees: f64) -> Self {
        let d = normalize_degrees(degrees);
        if !(45.0..315.0).contains(&d) {
            Quadrant::N
        } else if d < 135.0 {
            Quadrant::E
        } else if d < 225.0 {
            Quadrant::S
        } else {
            Quadrant::W
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Quadrant::N => "N",
            Quadrant::E => "E",
            Quadrant::S => "S",
            Quadrant::W => "W",
        };
        f.write_str(label)
    }
}

/// 16-point compass label
#[must_use]
pub fn cardinal16(degrees: f64) -> &'static str {
    let index = ((normalize_degrees(degrees) + 11.25) / 22.5) as usize % 16;
    CARDINAL_16[index]
}

fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360
    if d >= 360.0 { 0.0 } else { d }
}

/// Smoothed direction as a unit vector, `x = sin θ`, `y = cos θ`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindVector {
    pub x: f64,
    pub y: f64,
}

impl WindVector {
    #[must_use]
    pub fn from_degrees(degrees: f64) -> Self {
        let rad = degrees.to_radians();
        Self {
            x: rad.sin(),
            y: rad.cos(),
        }
    }

    #[must_use]
    pub fn degrees(&self) -> f64 {
        normalize_degrees(self.x.atan2(self.y).to_degrees())
    }
}

/// Component-wise EMA over direction. The state is renormalized after every
/// step so it stays on the unit circle.
#[derive(Debug, Clone, PartialEq)]
pub struct WindSmoother {
    alpha: f64,
    state: Option<WindVector>,
}

impl WindSmoother {
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    #[must_use]
    pub fn with_seed(alpha: f64, seed: Option<WindVector>) -> Self {
        let state = seed.and_then(|v| {
            let norm = v.x.hypot(v.y);
            (norm.is_finite() && norm > f64::EPSILON).then(|| WindVector {
                x: v.x / norm,
                y: v.y / norm,
            })
        });
        Self { alpha, state }
    }

    /// Fold in a direction sample and return the smoothed direction in degrees
    pub fn update(&mut self, degrees: f64) -> f64 {
        let sample = WindVector::from_degrees(degrees);
        let next = match self.state {
            None => sample,
            Some(prev) => {
                let x = self.alpha * sample.x + (1.0 - self.alpha) * prev.x;
                let y = self.alpha * sample.y + (1.0 - self.alpha) * prev.y;
                let norm = x.hypot(y);
                // exactly opposite directions cancel out
                if norm > 1e-9 {
                    WindVector {
                        x: x / norm,
                        y: y / norm,
                    }
                } else {
                    sample
                }
            }
        };
        self.state = Some(next);
        next.degrees()
    }

    #[must_use]
    pub fn current(&self) -> Option<f64> {
        self.state.map(|v| v.degrees())
    }

    #[must_use]
    pub fn export(&self) -> Option<WindVector> {
        self.state
    }
}
