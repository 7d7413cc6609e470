//! Orbital Mechanics Library
//!
//! TLE element decoding, simplified closed-form propagation and the tracked
//! object catalog feeding the debris-watch risk engine.
//!
//! The propagator here is a coarse visualization model (Kepler's third law for
//! altitude, a time-phased anomaly for the ground track). It is not SGP4 and
//! ignores every perturbation; see the tests in [`propagation`] for the error
//! bound against SGP4 on a real ISS element set.
//!
//! Every public operation degrades to a documented default instead of failing
//! on malformed numbers, so a single corrupted catalog entry can never stall
//! live visualization.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;
use tracing::debug;

pub mod catalog;
pub mod propagation;
pub mod tle;

pub use catalog::{
    Catalog, CatalogSnapshot, FillerRequest, ObjectClass, ObjectPosition, ObjectProfile,
    RiskLevel, TrackedObject,
};
pub use propagation::{
    position_at, Position, Propagator, SimplifiedPropagator, DEFAULT_ALTITUDE_KM, DEFAULT_SPEED_KM_S,
    MAX_ALTITUDE_KM, MIN_ALTITUDE_KM,
};
pub use tle::{parse_tle, OrbitalElements, TleHeader, TleRecord};

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Propagation failed: {0}")]
    PropagationFailed(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// Mean Earth radius used by the simplified model (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Earth gravitational parameter μ (km³/s²)
pub const MU_EARTH_KM3_S2: f64 = 398_600.4418;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Upper altitude bound of low Earth orbit (km)
pub const LEO_CEILING_KM: f64 = 2_000.0;
/// Lower altitude bound of the geostationary band (km), GEO 35,786 km minus 200 km
pub const GEO_FLOOR_KM: f64 = 35_586.0;

/// Physical constants consumed by propagation and planning.
///
/// Injectable so tests can run against alternate constants. Partial JSON
/// overrides only the keys present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicalConstants {
    pub earth_radius_km: f64,
    pub mu_km3_s2: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            earth_radius_km: EARTH_RADIUS_KM,
            mu_km3_s2: MU_EARTH_KM3_S2,
        }
    }
}

impl PhysicalConstants {
    /// Orbital period (s) for a mean motion in revolutions per day
    pub fn period_from_mean_motion(&self, mean_motion_rev_day: f64) -> f64 {
        SECONDS_PER_DAY / mean_motion_rev_day
    }

    /// Kepler's third law: a = (μ·(T/2π)²)^(1/3)
    pub fn semi_major_axis_from_period(&self, period_s: f64) -> f64 {
        (self.mu_km3_s2 * (period_s / (2.0 * PI)).powi(2)).cbrt()
    }

    /// T = 2π·√(a³/μ)
    pub fn period_from_semi_major_axis(&self, semi_major_axis_km: f64) -> f64 {
        2.0 * PI * (semi_major_axis_km.powi(3) / self.mu_km3_s2).sqrt()
    }

    /// Circular orbit speed (km/s) at an altitude above the mean radius
    pub fn circular_speed(&self, altitude_km: f64) -> f64 {
        (self.mu_km3_s2 / (self.earth_radius_km + altitude_km)).sqrt()
    }
}

/// Altitude band of an orbiting object
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum OrbitRegion {
    Leo,
    Meo,
    Geo,
}

impl OrbitRegion {
    pub const ALL: [OrbitRegion; 3] = [OrbitRegion::Leo, OrbitRegion::Meo, OrbitRegion::Geo];

    /// Assign the band for an altitude in km
    pub fn from_altitude(altitude_km: f64) -> Self {
        if altitude_km < LEO_CEILING_KM {
            OrbitRegion::Leo
        } else if altitude_km < GEO_FLOOR_KM {
            OrbitRegion::Meo
        } else {
            OrbitRegion::Geo
        }
    }
}

/// Return `value` when finite, otherwise log and substitute `fallback`.
pub fn finite_or(value: f64, fallback: f64, field: &'static str) -> f64 {
    if value.is_finite() {
        value
    } else {
        debug!(field, value, fallback, "non-finite value replaced");
        fallback
    }
}
