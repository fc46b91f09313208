//! Easing functions for smooth brightness transitions.
//!
//! All functions are pure maps `[0,1] -> [0,1]` with `f(0)=0`, `f(1)=1`,
//! monotonically non-decreasing.

use crate::error::EasingError;
use std::f64::consts::PI;

/// Thirteen named easing curves plus the linear baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Easing {
    Linear,
    InSine,
    OutSine,
    InOutSine,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
}

/// Default easing used when a command does not specify one.
pub const DEFAULT_EASING: Easing = Easing::InOutSine;

impl Easing {
    /// Evaluates the easing curve at progress `t` (expected `0.0..=1.0`).
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::InSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::OutSine => (t * PI / 2.0).sin(),
            Easing::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::InQuad => t * t,
            Easing::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::InCubic => t.powi(3),
            Easing::OutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::InOutCubic => {
                if t < 0.5 {
                    4.0 * t.powi(3)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::InQuart => t.powi(4),
            Easing::OutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::InOutQuart => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
        }
    }

    /// Looks up an easing by its name from the command surface. Unknown
    /// names fail loudly rather than silently falling back to a default.
    pub fn by_name(name: &str) -> Result<Self, EasingError> {
        match name {
            "linear" => Ok(Easing::Linear),
            "ease_in_sine" => Ok(Easing::InSine),
            "ease_out_sine" => Ok(Easing::OutSine),
            "ease_in_out_sine" => Ok(Easing::InOutSine),
            "ease_in_quad" => Ok(Easing::InQuad),
            "ease_out_quad" => Ok(Easing::OutQuad),
            "ease_in_out_quad" => Ok(Easing::InOutQuad),
            "ease_in_cubic" => Ok(Easing::InCubic),
            "ease_out_cubic" => Ok(Easing::OutCubic),
            "ease_in_out_cubic" => Ok(Easing::InOutCubic),
            "ease_in_quart" => Ok(Easing::InQuart),
            "ease_out_quart" => Ok(Easing::OutQuart),
            "ease_in_out_quart" => Ok(Easing::InOutQuart),
            other => Err(EasingError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 13] = [
        Easing::Linear,
        Easing::InSine,
        Easing::OutSine,
        Easing::InOutSine,
        Easing::InQuad,
        Easing::OutQuad,
        Easing::InOutQuad,
        Easing::InCubic,
        Easing::OutCubic,
        Easing::InOutCubic,
        Easing::InQuart,
        Easing::OutQuart,
        Easing::InOutQuart,
    ];

    #[test]
    fn endpoints_are_exact() {
        for easing in ALL {
            assert!((easing.apply(0.0) - 0.0).abs() < 1e-9, "{easing:?} f(0)");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9, "{easing:?} f(1)");
        }
    }

    #[test]
    fn monotonically_non_decreasing() {
        for easing in ALL {
            let mut previous = easing.apply(0.0);
            for i in 1..=100 {
                let t = i as f64 / 100.0;
                let value = easing.apply(t);
                assert!(value + 1e-9 >= previous, "{easing:?} decreased at t={t}");
                previous = value;
            }
        }
    }

    #[test]
    fn unknown_easing_name_fails() {
        assert_eq!(
            Easing::by_name("ease_bounce"),
            Err(EasingError("ease_bounce".to_string()))
        );
    }

    #[test]
    fn default_is_in_out_sine() {
        assert_eq!(DEFAULT_EASING, Easing::InOutSine);
    }
}
