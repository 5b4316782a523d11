//! Fixed-point scaling at the wire boundary.
//!
//! Internally the probe works in `f32` counts and ratios; every fractional
//! quantity crosses the wire as an unsigned integer with a per-field scale.

/// Threshold ratios travel as thousandths.
pub const RATIO_SCALE: f32 = 1000.0;
/// Standard-deviation multipliers travel as hundredths.
pub const MULTIPLIER_SCALE: f32 = 100.0;
/// Averages and tare travel as milli-counts.
pub const COUNTS_SCALE: f32 = 1000.0;

/// Scale and round `x`, clamping to the `u32` range. Non-finite and negative
/// values map to 0.
#[inline]
pub fn quantize_u32(x: f32, scale: f32) -> u32 {
    if !x.is_finite() {
        return 0;
    }
    let scaled = (x * scale).round();
    if scaled <= 0.0 {
        0
    } else if scaled >= u32::MAX as f32 {
        u32::MAX
    } else {
        scaled as u32
    }
}

#[inline]
pub fn ratio_to_wire(x: f32) -> u32 {
    quantize_u32(x, RATIO_SCALE)
}

#[inline]
pub fn multiplier_to_wire(x: f32) -> u32 {
    quantize_u32(x, MULTIPLIER_SCALE)
}

#[inline]
pub fn counts_to_wire(x: f32) -> u32 {
    quantize_u32(x, COUNTS_SCALE)
}

#[inline]
pub fn ratio_from_wire(raw: u32) -> f32 {
    raw as f32 / RATIO_SCALE
}

#[inline]
pub fn multiplier_from_wire(raw: u32) -> f32 {
    raw as f32 / MULTIPLIER_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_per_field() {
        assert_eq!(ratio_to_wire(0.1), 100);
        assert_eq!(multiplier_to_wire(5.0), 500);
        assert_eq!(counts_to_wire(103.75), 103_750);
    }

    #[test]
    fn degenerate_values_map_to_zero_or_saturate() {
        assert_eq!(ratio_to_wire(f32::NAN), 0);
        assert_eq!(ratio_to_wire(f32::INFINITY), 0);
        assert_eq!(ratio_to_wire(-0.2), 0);
        assert_eq!(counts_to_wire(1.0e12), u32::MAX);
    }

    #[test]
    fn from_wire_inverts_scale() {
        assert_eq!(ratio_from_wire(250), 0.25);
        assert_eq!(multiplier_from_wire(350), 3.5);
    }
}
