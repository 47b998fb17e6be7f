//! Water level derivation from distance readings.
//!
//! A tank sensor reports the distance from its mounting point down to the
//! water surface. Combined with the tank geometry this converts into a
//! fill percentage and an absolute volume, both rounded for display.

use thiserror::Error;

/// Static tank configuration as registered for a sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankGeometry {
    /// Total tank volume in liters.
    pub capacity: f64,
    /// Physical tank height in centimeters.
    pub height: f64,
    /// Distance from the sensor to the surface when the tank is full,
    /// in centimeters.
    pub water_distance: f64,
}

/// Display-ready water level derived from a single reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterLevel {
    /// Current volume in liters.
    pub current_level: f64,
    /// Fill percentage, 0-100.
    pub percentage: f64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("measurable span is zero: full-level distance equals tank height")]
    ZeroSpan,
    #[error("non-finite input: {0}")]
    NonFinite(&'static str),
}

/// Convert a raw distance reading into a clamped, rounded water level.
///
/// The reading is the sensor-to-surface distance in centimeters. Noise may
/// push it outside `[water_distance, height]`; out-of-range results are
/// clamped rather than rejected. A geometry whose `water_distance` equals
/// its `height` has no measurable span and is reported as [`LevelError::ZeroSpan`].
pub fn water_level(geometry: TankGeometry, reading: f64) -> Result<WaterLevel, LevelError> {
    if !geometry.capacity.is_finite() {
        return Err(LevelError::NonFinite("capacity"));
    }
    if !geometry.height.is_finite() {
        return Err(LevelError::NonFinite("height"));
    }
    if !geometry.water_distance.is_finite() {
        return Err(LevelError::NonFinite("water_distance"));
    }
    if !reading.is_finite() {
        return Err(LevelError::NonFinite("reading"));
    }

    let actual_water_height = geometry.height - reading;
    let max_water_height = geometry.height - geometry.water_distance;
    if max_water_height == 0.0 {
        return Err(LevelError::ZeroSpan);
    }

    let percentage = ((actual_water_height / max_water_height) * 100.0).clamp(0.0, 100.0);
    let current_level = ((percentage / 100.0) * geometry.capacity).max(0.0);

    Ok(WaterLevel {
        current_level: round_one_decimal(current_level),
        percentage: round_one_decimal(percentage),
    })
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(capacity: f64, height: f64, water_distance: f64) -> TankGeometry {
        TankGeometry {
            capacity,
            height,
            water_distance,
        }
    }

    #[test]
    fn full_tank_reads_one_hundred_percent() {
        let level = water_level(geometry(100.0, 100.0, 10.0), 10.0).expect("level");

        assert_eq!(level.percentage, 100.0);
        assert_eq!(level.current_level, 100.0);
    }

    #[test]
    fn empty_tank_reads_zero_percent() {
        let level = water_level(geometry(100.0, 100.0, 10.0), 100.0).expect("level");

        assert_eq!(level.percentage, 0.0);
        assert_eq!(level.current_level, 0.0);
    }

    #[test]
    fn partial_fill_rounds_to_one_decimal() {
        let level = water_level(geometry(200.0, 150.0, 20.0), 60.0).expect("level");

        assert_eq!(level.percentage, 69.2);
        assert_eq!(level.current_level, 138.5);
    }

    #[test]
    fn reading_below_full_distance_clamps_to_full() {
        let level = water_level(geometry(100.0, 100.0, 10.0), 2.0).expect("level");

        assert_eq!(level.percentage, 100.0);
        assert_eq!(level.current_level, 100.0);
    }

    #[test]
    fn reading_beyond_tank_height_clamps_to_empty() {
        let level = water_level(geometry(100.0, 100.0, 10.0), 140.0).expect("level");

        assert_eq!(level.percentage, 0.0);
        assert_eq!(level.current_level, 0.0);
    }

    #[test]
    fn percentage_stays_in_range_for_noisy_readings() {
        let tank = geometry(500.0, 120.0, 15.0);

        for reading in [-50.0, 0.0, 15.0, 60.0, 120.0, 400.0] {
            let level = water_level(tank, reading).expect("level");
            assert!((0.0..=100.0).contains(&level.percentage));
            assert!((0.0..=tank.capacity).contains(&level.current_level));
        }
    }

    #[test]
    fn identical_inputs_yield_identical_outputs() {
        let tank = geometry(350.0, 180.0, 25.0);

        let first = water_level(tank, 77.3).expect("level");
        let second = water_level(tank, 77.3).expect("level");

        assert_eq!(first, second);
    }

    #[test]
    fn zero_span_geometry_is_an_error() {
        let result = water_level(geometry(100.0, 50.0, 50.0), 30.0);

        assert_eq!(result, Err(LevelError::ZeroSpan));
    }

    #[test]
    fn non_finite_reading_is_an_error() {
        let tank = geometry(100.0, 100.0, 10.0);

        assert_eq!(
            water_level(tank, f64::NAN),
            Err(LevelError::NonFinite("reading"))
        );
        assert_eq!(
            water_level(tank, f64::INFINITY),
            Err(LevelError::NonFinite("reading"))
        );
    }

    #[test]
    fn non_finite_geometry_is_an_error() {
        let result = water_level(geometry(f64::NAN, 100.0, 10.0), 50.0);

        assert_eq!(result, Err(LevelError::NonFinite("capacity")));
    }

    #[test]
    fn outputs_are_never_nan() {
        // water_distance above height gives a negative span; the raw ratio
        // goes negative and clamping floors it at zero.
        let level = water_level(geometry(100.0, 100.0, 120.0), 50.0).expect("level");

        assert!(level.percentage.is_finite());
        assert_eq!(level.percentage, 0.0);
        assert_eq!(level.current_level, 0.0);
    }
}
