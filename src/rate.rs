//! Speed slider to playback rate mapping.
//!
//! The lower half of the slider covers slow playback linearly up to 1.0x, the
//! upper half climbs in steps of 0.14 up to 8.0x. Both halves meet at the
//! centre position so the reset control can hard-code it.

use crate::constants::{SPEED_SLIDER_DEFAULT, SPEED_SLIDER_MAX};

const FAST_STEP: f64 = 0.14;

/// Map a speed slider position (0..=100) to a playback rate multiplier.
///
/// Positions above 100 are treated as 100.
pub fn map_slider_to_rate(slider: u8) -> f64 {
    let slider = slider.min(SPEED_SLIDER_MAX);
    let centre = SPEED_SLIDER_DEFAULT;

    if slider < centre {
        f64::from(slider) / f64::from(centre)
    } else {
        1.0 + f64::from(slider - centre) * FAST_STEP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(map_slider_to_rate(0), 0.0);
        assert_eq!(map_slider_to_rate(50), 1.0);
        assert!((map_slider_to_rate(100) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_lower_half_is_linear() {
        assert_eq!(map_slider_to_rate(25), 0.5);
        assert_eq!(map_slider_to_rate(49), 0.98);
    }

    #[test]
    fn test_continuous_at_centre() {
        let below = map_slider_to_rate(49);
        let at = map_slider_to_rate(50);
        let above = map_slider_to_rate(51);
        assert!(at - below < 0.05);
        assert!(above - at < 0.15);
    }

    #[test]
    fn test_monotonic() {
        let rates: Vec<f64> = (0..=100).map(map_slider_to_rate).collect();
        for pair in rates.windows(2) {
            assert!(pair[1] >= pair[0], "{} then {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_out_of_range_clamps() {
        assert_eq!(map_slider_to_rate(200), map_slider_to_rate(100));
    }
}
