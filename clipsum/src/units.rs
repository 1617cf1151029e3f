//! Unit conversions applied after geodesic measurement.
//!
//! Geodesic measures come back in square meters and meters; the summary
//! tables report acres and linear feet.

use crate::backend::FieldExpression;

/// Square meters in one acre.
pub const SQUARE_METERS_PER_ACRE: f64 = 4046.85642;

/// Feet in one meter.
pub const FEET_PER_METER: f64 = 3.28084;

/// Convert square meters to acres.
pub fn square_meters_to_acres(square_meters: f64) -> f64 {
    AREA_TO_ACRES.apply(square_meters)
}

/// Convert meters to feet.
pub fn meters_to_feet(meters: f64) -> f64 {
    LENGTH_TO_FEET.apply(meters)
}

/// Field recompute turning a geodesic area into acres.
pub const AREA_TO_ACRES: FieldExpression = FieldExpression::DivideBy(SQUARE_METERS_PER_ACRE);

/// Field recompute turning a geodesic length into feet.
pub const LENGTH_TO_FEET: FieldExpression = FieldExpression::MultiplyBy(FEET_PER_METER);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_acre_is_exact() {
        assert_eq!(square_meters_to_acres(4046.85642), 1.0);
    }

    #[test]
    fn test_hundred_meters_in_feet() {
        assert!((meters_to_feet(100.0) - 328.084).abs() < 1e-9);
    }

    #[test]
    fn test_zero_is_zero() {
        assert_eq!(square_meters_to_acres(0.0), 0.0);
        assert_eq!(meters_to_feet(0.0), 0.0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_acres_scale_linearly(area in 0.0..1.0e9_f64, k in 1.0..100.0_f64) {
                let a = square_meters_to_acres(area * k);
                let b = square_meters_to_acres(area) * k;
                prop_assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
            }

            #[test]
            fn test_feet_roundtrip(meters in 0.0..1.0e7_f64) {
                let back = meters_to_feet(meters) / FEET_PER_METER;
                prop_assert!((back - meters).abs() <= 1e-9 * meters.max(1.0));
            }
        }
    }
}
