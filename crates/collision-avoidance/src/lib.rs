//! Collision Avoidance Library
//!
//! Conjunction screening over propagated trajectories, miss-distance risk
//! classification, collision-probability estimation and avoidance maneuver
//! planning.
//!
//! ```text
//! CatalogSnapshot ──► ConjunctionSource ──► RiskAnalyzer ──► RiskReport
//!                          │                      ▲
//!                          └─ PredictionModel ────┘
//! ConjunctionEvent / Threat ──► TrajectoryPlanner ──► ManeuverPlan / Strategy
//! ```
//!
//! None of the analysis or planning operations fail on malformed numbers:
//! inputs are sanitized and every numeric output is finite.

use chrono::{DateTime, Duration, Utc};
use orbital_mechanics::OrbitalError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod planner;
pub mod prediction;
pub mod risk;
pub mod screening;

pub use planner::{ManeuverPlan, ManeuverType, PlannerConfig, Spacecraft, Strategy, Threat, TrajectoryPlanner};
pub use prediction::{HeuristicModel, Prediction, PredictionInput, PredictionModel, ProbabilityLevel};
pub use risk::{RiskAnalyzer, RiskReport, RiskThresholds};
pub use screening::{ClosestApproachSearch, ConjunctionSource, ScreeningConfig, SyntheticConjunctions};

#[derive(Error, Debug)]
pub enum CollisionError {
    #[error("Object not found: {0}")]
    ObjectNotFound(u32),
    #[error(transparent)]
    Orbital(#[from] OrbitalError),
}

pub type Result<T> = std::result::Result<T, CollisionError>;

/// Miss-distance tier of a conjunction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Safe,
    Watch,
    Alert,
}

/// A predicted close approach between two tracked objects.
///
/// Produced fresh by each screening pass; the analyzer keeps only a bounded
/// list of recent events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConjunctionEvent {
    pub id: String,
    pub primary_object: u32,
    pub secondary_object: u32,
    /// Time of closest approach
    pub tca: DateTime<Utc>,
    pub miss_distance_km: f64,
    pub relative_velocity_km_s: f64,
    pub collision_probability: f64,
    pub risk_tier: RiskTier,
    /// Altitude of the primary at TCA
    pub altitude_km: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_size_m: Option<f64>,
}

impl ConjunctionEvent {
    /// Hours from `now` until TCA (negative once passed)
    pub fn hours_until(&self, now: DateTime<Utc>) -> f64 {
        (self.tca - now).num_milliseconds() as f64 / 3_600_000.0
    }
}

/// Longest offset from "now" the engine will represent (about a century)
pub const MAX_HORIZON_HOURS: f64 = 876_000.0;

/// `at` shifted by `hours`, clamped to ±[`MAX_HORIZON_HOURS`]; non-finite
/// offsets shift by nothing.
pub fn shift_hours(at: DateTime<Utc>, hours: f64) -> DateTime<Utc> {
    let hours = orbital_mechanics::finite_or(hours, 0.0, "offset_hours").clamp(-MAX_HORIZON_HOURS, MAX_HORIZON_HOURS);
    at + Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

/// Sort events by descending collision probability
pub(crate) fn rank_by_probability(events: &mut [ConjunctionEvent]) {
    events.sort_by(|a, b| b.collision_probability.total_cmp(&a.collision_probability));
}

/// Assign `CONJ-001…` ids in the current order
pub(crate) fn assign_ids(events: &mut [ConjunctionEvent]) {
    for (i, event) in events.iter_mut().enumerate() {
        event.id = format!("CONJ-{:03}", i + 1);
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    pub fn event(miss_km: f64, probability: f64, hours: i64) -> ConjunctionEvent {
        ConjunctionEvent {
            id: String::new(),
            primary_object: 25544,
            secondary_object: 34454,
            tca: now() + Duration::hours(hours),
            miss_distance_km: miss_km,
            relative_velocity_km_s: 10.0,
            collision_probability: probability,
            risk_tier: RiskTier::Safe,
            altitude_km: 420.0,
            object_size_m: Some(0.15),
        }
    }
}
