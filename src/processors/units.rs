// pixie-crop/src/processors/units.rs
use crate::core::{Unit, DEFAULT_DPI};

const MM_PER_INCH: f64 = 25.4;

// Absorbs float noise such as 2.9999999999 so truncation lands on 3.
const TRUNCATION_EPSILON: f64 = 1e-9;

/// Converts lengths between device pixels and physical units.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitConverter;

impl UnitConverter {
    pub fn new() -> Self {
        Self
    }

    /// DPI used for a conversion; absent or non-positive values mean 96.
    pub fn effective_dpi(dpi: Option<f64>) -> f64 {
        match dpi {
            Some(d) if d > 0.0 && d.is_finite() => d,
            _ => DEFAULT_DPI,
        }
    }

    /// Converts `value` in `unit` to whole pixels, truncating toward zero.
    pub fn to_pixels(&self, value: f64, unit: Unit, dpi: Option<f64>) -> i64 {
        let pixels = value * Self::pixels_per_unit(unit, Self::effective_dpi(dpi));
        (pixels + TRUNCATION_EPSILON.copysign(pixels)).trunc() as i64
    }

    /// Converts a pixel count back into `unit`.
    pub fn from_pixels(&self, pixels: i64, unit: Unit, dpi: Option<f64>) -> f64 {
        pixels as f64 / Self::pixels_per_unit(unit, Self::effective_dpi(dpi))
    }

    /// Same as [`from_pixels`](Self::from_pixels), rounded to two decimals.
    pub fn display(&self, pixels: i64, unit: Unit, dpi: Option<f64>) -> f64 {
        (self.from_pixels(pixels, unit, dpi) * 100.0).round() / 100.0
    }

    fn pixels_per_unit(unit: Unit, dpi: f64) -> f64 {
        match unit {
            Unit::Px => 1.0,
            Unit::Mm => dpi / MM_PER_INCH,
            Unit::Cm => 10.0 * dpi / MM_PER_INCH,
            Unit::In => dpi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pixels_are_identity() {
        let converter = UnitConverter::new();
        assert_eq!(converter.to_pixels(640.0, Unit::Px, Some(300.0)), 640);
        assert_eq!(converter.from_pixels(640, Unit::Px, Some(300.0)), 640.0);
    }

    #[test]
    fn test_physical_units_truncate() {
        let converter = UnitConverter::new();
        // 210 * 96 / 25.4 = 793.70...
        assert_eq!(converter.to_pixels(210.0, Unit::Mm, Some(96.0)), 793);
        assert_eq!(converter.to_pixels(297.0, Unit::Mm, Some(96.0)), 1122);
        assert_eq!(converter.to_pixels(2.54, Unit::Cm, Some(100.0)), 100);
        assert_eq!(converter.to_pixels(8.5, Unit::In, Some(300.0)), 2550);
    }

    #[test]
    fn test_missing_or_invalid_dpi_defaults_to_96() {
        let converter = UnitConverter::new();
        assert_eq!(converter.to_pixels(1.0, Unit::In, None), 96);
        assert_eq!(converter.to_pixels(1.0, Unit::In, Some(0.0)), 96);
        assert_eq!(converter.to_pixels(1.0, Unit::In, Some(-72.0)), 96);
    }

    #[test]
    fn test_display_rounds_to_hundredths() {
        let converter = UnitConverter::new();
        assert_eq!(converter.display(96, Unit::Mm, None), 25.4);
        assert_eq!(converter.display(100, Unit::Cm, None), 2.65);
    }

    proptest! {
        #[test]
        fn prop_round_trip_within_one_pixel(
            pixels in 0i64..200_000,
            dpi in 1.0f64..2400.0,
            unit_index in 0usize..4,
        ) {
            let unit = [Unit::Px, Unit::Mm, Unit::Cm, Unit::In][unit_index];
            let converter = UnitConverter::new();
            let physical = converter.from_pixels(pixels, unit, Some(dpi));
            let back = converter.to_pixels(physical, unit, Some(dpi));
            prop_assert!((back - pixels).abs() <= 1, "{} -> {}", pixels, back);
        }
    }
}
