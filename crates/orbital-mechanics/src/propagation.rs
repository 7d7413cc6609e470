//! Simplified closed-form propagation
//!
//! ```text
//! T   = 86400 / n                         (s)
//! a   = (μ·(T/2π)²)^(1/3)                 (km)
//! alt = clamp(a − R⊕, 200, 50000)         (km)
//! v   = √(μ / (R⊕ + alt))                 (km/s)
//! lon = (Ω + M + f·360·n) mod 360 → [-180, 180]
//! lat = i · sin(M + f·360) · 0.5
//! ```
//!
//! where `f` is the fraction of the UTC day elapsed at the query time. The
//! ground track is a visualization aid only; altitude tracks SGP4 to within
//! tens of kilometres for near-circular orbits, lat/lon do not.

use crate::{finite_or, OrbitalElements, PhysicalConstants, Result, SECONDS_PER_DAY};
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_ALTITUDE_KM: f64 = 200.0;
pub const MAX_ALTITUDE_KM: f64 = 50_000.0;
pub const DEFAULT_ALTITUDE_KM: f64 = 400.0;
pub const DEFAULT_SPEED_KM_S: f64 = 7.66;

/// Instantaneous geodetic position. Always finite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// Degrees, [-90, 90]
    pub latitude: f64,
    /// Degrees, [-180, 180]
    pub longitude: f64,
    /// Kilometres, [200, 50000]
    pub altitude_km: f64,
    pub speed_km_s: f64,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// Build a position, substituting the per-field default for any
    /// non-finite value and clamping into range.
    pub fn sanitized(
        latitude: f64,
        longitude: f64,
        altitude_km: f64,
        speed_km_s: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let speed = finite_or(speed_km_s, DEFAULT_SPEED_KM_S, "speed_km_s");
        Self {
            latitude: finite_or(latitude, 0.0, "latitude").clamp(-90.0, 90.0),
            longitude: finite_or(longitude, 0.0, "longitude").clamp(-180.0, 180.0),
            altitude_km: finite_or(altitude_km, DEFAULT_ALTITUDE_KM, "altitude_km")
                .clamp(MIN_ALTITUDE_KM, MAX_ALTITUDE_KM),
            speed_km_s: if speed > 0.0 { speed } else { DEFAULT_SPEED_KM_S },
            timestamp,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.altitude_km.is_finite()
            && self.speed_km_s.is_finite()
    }
}

/// Fraction of the UTC day elapsed at `at`, in [0, 1)
pub fn day_fraction(at: DateTime<Utc>) -> f64 {
    let secs = at.num_seconds_from_midnight() as f64;
    let nanos = f64::from(at.nanosecond().min(999_999_999)) / 1e9;
    (secs + nanos) / SECONDS_PER_DAY
}

/// Source of positions for catalog objects.
///
/// The catalog depends on this seam so alternate models can be swapped in;
/// implementations may fail, and the catalog skips failed objects.
pub trait Propagator: Send + Sync {
    fn propagate(&self, elements: &OrbitalElements, at: DateTime<Utc>) -> Result<Position>;
}

/// The closed-form model described in the module docs
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplifiedPropagator {
    constants: PhysicalConstants,
}

impl SimplifiedPropagator {
    pub fn new(constants: PhysicalConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    /// Altitude (km) from mean motion via Kepler's third law, clamped to
    /// [200, 50000]; 400 km when any intermediate is non-finite.
    pub fn altitude_km(&self, mean_motion_rev_day: f64) -> f64 {
        if !(mean_motion_rev_day.is_finite() && mean_motion_rev_day > 0.0) {
            return DEFAULT_ALTITUDE_KM;
        }
        let period = self.constants.period_from_mean_motion(mean_motion_rev_day);
        let sma = self.constants.semi_major_axis_from_period(period);
        let altitude = sma - self.constants.earth_radius_km;

        finite_or(altitude, DEFAULT_ALTITUDE_KM, "altitude_km").clamp(MIN_ALTITUDE_KM, MAX_ALTITUDE_KM)
    }

    /// Circular speed (km/s) at `altitude_km`; 7.66 km/s when non-finite
    pub fn speed_km_s(&self, altitude_km: f64) -> f64 {
        finite_or(self.constants.circular_speed(altitude_km), DEFAULT_SPEED_KM_S, "speed_km_s")
    }

    /// Pure function of `(elements, at)`
    pub fn position_at(&self, elements: &OrbitalElements, at: DateTime<Utc>) -> Position {
        let f = day_fraction(at);
        let raan = elements.raan_deg();
        let mean_anomaly = elements.mean_anomaly_deg();
        let mean_motion = elements.mean_motion_rev_day();

        let altitude = self.altitude_km(mean_motion);
        let speed = self.speed_km_s(altitude);

        let mut longitude = (raan + mean_anomaly + f * 360.0 * mean_motion).rem_euclid(360.0);
        if longitude > 180.0 {
            longitude -= 360.0;
        }

        let latitude =
            elements.inclination_deg() * (mean_anomaly + f * 360.0).to_radians().sin() * 0.5;

        Position::sanitized(latitude, longitude, altitude, speed, at)
    }
}

impl Propagator for SimplifiedPropagator {
    fn propagate(&self, elements: &OrbitalElements, at: DateTime<Utc>) -> Result<Position> {
        Ok(self.position_at(elements, at))
    }
}

/// [`SimplifiedPropagator::position_at`] with the default physical constants
pub fn position_at(elements: &OrbitalElements, at: DateTime<Utc>) -> Position {
    SimplifiedPropagator::default().position_at(elements, at)
}
