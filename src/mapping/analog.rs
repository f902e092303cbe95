//! Analog stick and trigger mapping
//!
//! Both mappers truncate toward zero instead of rounding, so a full deflection
//! can land on 126 rather than 127 depending on the hardware's maximum.

use crate::output::MAX_VALUE;

const SCALE: f32 = MAX_VALUE as f32;
const TRIGGER_SCALE: f32 = 63.5;

/// Values of the four unidirectional channels of one stick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickValues {
    pub right: u8,
    pub left: u8,
    pub up: u8,
    pub down: u8,
}

/// Split one axis reading into its (positive, negative) halves
fn split_axis(raw: f32, deadzone: f32) -> (u8, u8) {
    let raw = raw.clamp(-1.0, 1.0);
    if raw.is_nan() || raw.abs() < deadzone {
        return (0, 0);
    }
    let positive = (raw.max(0.0) * SCALE) as u8;
    let negative = ((-raw).max(0.0) * SCALE) as u8;
    (positive.min(MAX_VALUE), negative.min(MAX_VALUE))
}

/// Map one stick's raw readings to its four direction channels.
///
/// The vertical axis uses the hardware convention: a negative `raw_y` is the
/// stick pushed up and drives `up`, a positive one drives `down`.
pub fn map_axis(raw_x: f32, raw_y: f32, deadzone: f32) -> StickValues {
    let (right, left) = split_axis(raw_x, deadzone);
    let (down, up) = split_axis(raw_y, deadzone);
    StickValues {
        right,
        left,
        up,
        down,
    }
}

/// Map a trigger reading (-1.0 at rest, 1.0 fully pressed).
///
/// Anything at or below `rest_threshold` is released; the margin above -1.0
/// absorbs idle jitter.
pub fn map_trigger(raw: f32, rest_threshold: f32) -> u8 {
    let raw = raw.clamp(-1.0, 1.0);
    if raw > rest_threshold {
        (((raw + 1.0) * TRIGGER_SCALE) as u8).min(MAX_VALUE)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DZ: f32 = 0.15;

    #[test]
    fn test_half_right() {
        let v = map_axis(0.5, 0.0, DZ);
        assert_eq!(
            v,
            StickValues {
                right: 63,
                left: 0,
                up: 0,
                down: 0
            }
        );
    }

    #[test]
    fn test_inside_deadzone_is_zero() {
        assert_eq!(map_axis(0.10, -0.149, DZ), StickValues::default());
        assert_eq!(map_axis(-0.14, 0.0, DZ), StickValues::default());
    }

    #[test]
    fn test_deadzone_boundary_is_not_filtered() {
        // 0.15 * 127 = 19.05
        assert_eq!(map_axis(DZ, 0.0, DZ).right, 19);
        assert_eq!(map_axis(-DZ, 0.0, DZ).left, 19);
    }

    #[test]
    fn test_vertical_axis_is_inverted() {
        let up = map_axis(0.0, -1.0, DZ);
        assert_eq!(up.up, 127);
        assert_eq!(up.down, 0);

        let down = map_axis(0.0, 0.5, DZ);
        assert_eq!(down.down, 63);
        assert_eq!(down.up, 0);
    }

    #[test]
    fn test_truncates_toward_zero() {
        // 0.999 * 127 = 126.873
        assert_eq!(map_axis(0.999, 0.0, DZ).right, 126);
        assert_eq!(map_axis(-0.999, 0.0, DZ).left, 126);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(map_axis(1.7, -3.0, DZ).right, 127);
        assert_eq!(map_axis(1.7, -3.0, DZ).up, 127);
        assert_eq!(map_trigger(4.0, -0.8), 127);
    }

    #[test]
    fn test_opposed_pair_is_exclusive_and_monotonic() {
        let mut last = 0;
        for step in 15..=100 {
            let m = step as f32 / 100.0;
            let pos = map_axis(m, 0.0, DZ);
            let neg = map_axis(-m, 0.0, DZ);
            assert!(pos.right > 0 && pos.left == 0);
            assert!(neg.left > 0 && neg.right == 0);
            assert_eq!(pos.right, neg.left);
            assert!(pos.right >= last);
            last = pos.right;
        }
    }

    #[test]
    fn test_nan_reads_as_rest() {
        assert_eq!(map_axis(f32::NAN, f32::NAN, DZ), StickValues::default());
        assert_eq!(map_trigger(f32::NAN, -0.8), 0);
    }

    #[test]
    fn test_trigger_mapping() {
        assert_eq!(map_trigger(-1.0, -0.8), 0);
        assert_eq!(map_trigger(-0.85, -0.8), 0);
        assert_eq!(map_trigger(-0.8, -0.8), 0);
        // (0.5) * 63.5 = 31.75
        assert_eq!(map_trigger(-0.5, -0.8), 31);
        assert_eq!(map_trigger(0.0, -0.8), 63);
        assert_eq!(map_trigger(1.0, -0.8), 127);
    }
}
