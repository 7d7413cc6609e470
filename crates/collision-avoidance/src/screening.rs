//! Conjunction discovery
//!
//! [`ClosestApproachSearch`] screens candidate pairs over a look-ahead
//! window:
//!
//! 1. Sample every object's propagated position each `step_seconds` and
//!    convert it to Earth-centred Cartesian coordinates.
//! 2. Take the sample with the smallest separation per pair.
//! 3. Refine the minimum by golden-section search over the two bracketing
//!    steps.
//! 4. Difference the relative position around TCA for relative velocity.
//!
//! An object whose propagation fails is dropped from the pass; a failed
//! detection never surfaces as an error, it just reports no conjunction.
//!
//! [`SyntheticConjunctions`] produces seeded placeholder events for demos
//! and tests.

use crate::prediction::{PredictionInput, PredictionModel};
use crate::risk::RiskThresholds;
use crate::{assign_ids, rank_by_probability, shift_hours, ConjunctionEvent, RiskTier};
use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use orbital_mechanics::{
    finite_or, CatalogSnapshot, ObjectClass, PhysicalConstants, Position, Propagator, TrackedObject,
    DEFAULT_ALTITUDE_KM,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on samples per object per pass
pub const MAX_SAMPLES: usize = 10_000;
/// Longest look-ahead window (30 days)
pub const MAX_WINDOW_HOURS: f64 = 720.0;

/// Golden ratio conjugate, (√5 − 1) / 2
const INV_PHI: f64 = 0.618_033_988_749_894_9;
const REFINE_TOLERANCE_S: f64 = 0.5;
const REFINE_MAX_ITERATIONS: usize = 48;
/// Half-width of the central difference for relative velocity (s)
const VELOCITY_STEP_S: f64 = 1.0;

/// Produces the conjunctions for one analysis pass
pub trait ConjunctionSource: Send + Sync {
    fn conjunctions(
        &self,
        snapshot: &CatalogSnapshot,
        propagator: &dyn Propagator,
        start: DateTime<Utc>,
    ) -> Vec<ConjunctionEvent>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreeningConfig {
    /// Look-ahead window
    pub window_hours: f64,
    /// Coarse sampling interval
    pub step_seconds: f64,
    /// Also screen debris against debris
    pub screen_debris_pairs: bool,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            window_hours: 24.0,
            step_seconds: 60.0,
            screen_debris_pairs: false,
        }
    }
}

impl ScreeningConfig {
    /// Window length in seconds, at most 30 days; 24 h when not a positive
    /// finite number
    pub fn window_seconds(&self) -> f64 {
        let hours = finite_or(self.window_hours, 24.0, "window_hours");
        if hours > 0.0 {
            hours.min(MAX_WINDOW_HOURS) * 3600.0
        } else {
            24.0 * 3600.0
        }
    }

    /// Sampling step in seconds, widened so a pass stays under [`MAX_SAMPLES`]
    pub fn step(&self) -> f64 {
        let step = finite_or(self.step_seconds, 60.0, "step_seconds");
        let step = if step >= 1.0 { step } else { 60.0 };
        step.max(self.window_seconds() / MAX_SAMPLES as f64)
    }

    /// Number of samples including both window ends
    pub fn sample_count(&self) -> usize {
        (self.window_seconds() / self.step()).floor() as usize + 1
    }

    fn wants_pair(&self, a: &TrackedObject, b: &TrackedObject) -> bool {
        self.screen_debris_pairs || a.class() == ObjectClass::Satellite || b.class() == ObjectClass::Satellite
    }
}

/// Geodetic position to Earth-centred Cartesian (km)
pub fn to_cartesian(position: &Position, earth_radius_km: f64) -> Vector3<f64> {
    let r = earth_radius_km + position.altitude_km;
    let lat = position.latitude.to_radians();
    let lon = position.longitude.to_radians();
    Vector3::new(r * lat.cos() * lon.cos(), r * lat.cos() * lon.sin(), r * lat.sin())
}

fn offset(start: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    shift_hours(start, seconds / 3600.0)
}

/// Deterministic pairwise closest-approach search
pub struct ClosestApproachSearch {
    config: ScreeningConfig,
    thresholds: RiskThresholds,
    constants: PhysicalConstants,
    model: Arc<dyn PredictionModel>,
}

impl ClosestApproachSearch {
    pub fn new(config: ScreeningConfig, thresholds: RiskThresholds, model: Arc<dyn PredictionModel>) -> Self {
        Self {
            config,
            thresholds,
            constants: PhysicalConstants::default(),
            model,
        }
    }

    pub fn with_constants(mut self, constants: PhysicalConstants) -> Self {
        self.constants = constants;
        self
    }

    pub fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    fn locate(
        &self,
        propagator: &dyn Propagator,
        object: &TrackedObject,
        at: DateTime<Utc>,
    ) -> Option<(Position, Vector3<f64>)> {
        match propagator.propagate(&object.elements, at) {
            Ok(p) => {
                let p = Position::sanitized(p.latitude, p.longitude, p.altitude_km, p.speed_km_s, at);
                Some((p, to_cartesian(&p, self.constants.earth_radius_km)))
            }
            Err(e) => {
                debug!(id = object.id, error = %e, "propagation failed during refinement");
                None
            }
        }
    }

    fn trajectory(
        &self,
        propagator: &dyn Propagator,
        object: &TrackedObject,
        start: DateTime<Utc>,
    ) -> Option<Vec<Vector3<f64>>> {
        let step = self.config.step();
        let mut samples = Vec::with_capacity(self.config.sample_count());
        for k in 0..self.config.sample_count() {
            let at = offset(start, k as f64 * step);
            match propagator.propagate(&object.elements, at) {
                Ok(p) => {
                    let p = Position::sanitized(p.latitude, p.longitude, p.altitude_km, p.speed_km_s, at);
                    samples.push(to_cartesian(&p, self.constants.earth_radius_km));
                }
                Err(e) => {
                    warn!(id = object.id, name = %object.name, error = %e, "object dropped from screening");
                    return None;
                }
            }
        }
        Some(samples)
    }

    fn separation(
        &self,
        propagator: &dyn Propagator,
        a: &TrackedObject,
        b: &TrackedObject,
        start: DateTime<Utc>,
        t: f64,
    ) -> Option<Vector3<f64>> {
        let at = offset(start, t);
        let (_, ra) = self.locate(propagator, a, at)?;
        let (_, rb) = self.locate(propagator, b, at)?;
        Some(ra - rb)
    }

    /// Minimum of |r_a − r_b| on `[lo, hi]` seconds after `start`
    fn refine(
        &self,
        propagator: &dyn Propagator,
        a: &TrackedObject,
        b: &TrackedObject,
        start: DateTime<Utc>,
        mut lo: f64,
        mut hi: f64,
    ) -> Option<(f64, f64)> {
        let distance = |t: f64| self.separation(propagator, a, b, start, t).map(|v| v.norm());

        let mut x1 = hi - INV_PHI * (hi - lo);
        let mut x2 = lo + INV_PHI * (hi - lo);
        let mut f1 = distance(x1)?;
        let mut f2 = distance(x2)?;

        for _ in 0..REFINE_MAX_ITERATIONS {
            if hi - lo <= REFINE_TOLERANCE_S {
                break;
            }
            if f1 <= f2 {
                hi = x2;
                x2 = x1;
                f2 = f1;
                x1 = hi - INV_PHI * (hi - lo);
                f1 = distance(x1)?;
            } else {
                lo = x1;
                x1 = x2;
                f1 = f2;
                x2 = lo + INV_PHI * (hi - lo);
                f2 = distance(x2)?;
            }
        }

        Some(if f1 <= f2 { (x1, f1) } else { (x2, f2) })
    }

    fn screen_pair(
        &self,
        propagator: &dyn Propagator,
        a: &TrackedObject,
        b: &TrackedObject,
        ta: &[Vector3<f64>],
        tb: &[Vector3<f64>],
        start: DateTime<Utc>,
    ) -> Option<ConjunctionEvent> {
        let (k, coarse) = ta
            .iter()
            .zip(tb)
            .map(|(ra, rb)| (ra - rb).norm())
            .enumerate()
            .min_by(|x, y| x.1.total_cmp(&y.1))?;

        let step = self.config.step();
        let window = self.config.window_seconds();
        if !coarse.is_finite() {
            return None;
        }

        let lo = (k as f64 - 1.0).max(0.0) * step;
        let hi = ((k as f64 + 1.0) * step).min(window);
        let (t, refined) = match self.refine(propagator, a, b, start, lo, hi) {
            Some((t, d)) if d <= coarse => (t, d),
            _ => (k as f64 * step, coarse),
        };

        if refined > self.thresholds.safe_km {
            return None;
        }

        let relative_velocity = match (
            self.separation(propagator, a, b, start, t + VELOCITY_STEP_S),
            self.separation(propagator, a, b, start, t - VELOCITY_STEP_S),
        ) {
            (Some(ahead), Some(behind)) => (ahead - behind).norm() / (2.0 * VELOCITY_STEP_S),
            _ => 0.0,
        };

        let (primary, secondary) = if a.class() == ObjectClass::Satellite || b.class() != ObjectClass::Satellite {
            (a, b)
        } else {
            (b, a)
        };
        let tca = offset(start, t);
        let altitude_km = self
            .locate(propagator, primary, tca)
            .map_or(DEFAULT_ALTITUDE_KM, |(p, _)| p.altitude_km);

        let mut event = ConjunctionEvent {
            id: String::new(),
            primary_object: primary.id,
            secondary_object: secondary.id,
            tca,
            miss_distance_km: finite_or(refined, coarse, "miss_distance_km").max(0.0),
            relative_velocity_km_s: finite_or(relative_velocity, 0.0, "relative_velocity_km_s"),
            collision_probability: 0.0,
            risk_tier: RiskTier::Safe,
            altitude_km,
            object_size_m: secondary.size_estimate_m.or(primary.size_estimate_m),
        };
        event.risk_tier = self.thresholds.classify(event.miss_distance_km);
        event.collision_probability = self.model.predict(&PredictionInput::from_event(&event)).probability;
        Some(event)
    }
}

impl ConjunctionSource for ClosestApproachSearch {
    fn conjunctions(
        &self,
        snapshot: &CatalogSnapshot,
        propagator: &dyn Propagator,
        start: DateTime<Utc>,
    ) -> Vec<ConjunctionEvent> {
        let objects = snapshot.objects();
        let trajectories: Vec<Option<Vec<Vector3<f64>>>> = objects
            .par_iter()
            .map(|o| self.trajectory(propagator, o, start))
            .collect();

        let pairs: Vec<(usize, usize)> = (0..objects.len())
            .flat_map(|i| (i + 1..objects.len()).map(move |j| (i, j)))
            .filter(|&(i, j)| self.config.wants_pair(&objects[i], &objects[j]))
            .collect();

        let mut events: Vec<ConjunctionEvent> = pairs
            .par_iter()
            .filter_map(|&(i, j)| {
                let ta = trajectories[i].as_deref()?;
                let tb = trajectories[j].as_deref()?;
                self.screen_pair(propagator, &objects[i], &objects[j], ta, tb, start)
            })
            .collect();

        rank_by_probability(&mut events);
        assign_ids(&mut events);

        info!(
            objects = objects.len(),
            pairs = pairs.len(),
            samples = self.config.sample_count(),
            conjunctions = events.len(),
            "closest-approach screening complete"
        );
        events
    }
}

/// Seeded placeholder events between random catalog pairs
pub struct SyntheticConjunctions {
    seed: u64,
    thresholds: RiskThresholds,
    model: Arc<dyn PredictionModel>,
}

impl SyntheticConjunctions {
    pub fn new(seed: u64, thresholds: RiskThresholds, model: Arc<dyn PredictionModel>) -> Self {
        Self {
            seed,
            thresholds,
            model,
        }
    }
}

impl ConjunctionSource for SyntheticConjunctions {
    fn conjunctions(
        &self,
        snapshot: &CatalogSnapshot,
        propagator: &dyn Propagator,
        start: DateTime<Utc>,
    ) -> Vec<ConjunctionEvent> {
        let objects = snapshot.objects();
        if objects.len() < 2 {
            return Vec::new();
        }

        let mut rng = Pcg64Mcg::seed_from_u64(self.seed);
        let count = rng.gen_range(2..=6);

        let mut events: Vec<ConjunctionEvent> = (0..count)
            .map(|_| {
                let i = rng.gen_range(0..objects.len());
                let j = (i + rng.gen_range(1..objects.len())) % objects.len();
                let (primary, secondary) = (&objects[i], &objects[j]);

                let tca = offset(start, rng.gen_range(1.0..48.0) * 3600.0);
                let altitude_km = propagator
                    .propagate(&primary.elements, tca)
                    .map_or(DEFAULT_ALTITUDE_KM, |p| finite_or(p.altitude_km, DEFAULT_ALTITUDE_KM, "altitude_km"));

                let mut event = ConjunctionEvent {
                    id: String::new(),
                    primary_object: primary.id,
                    secondary_object: secondary.id,
                    tca,
                    miss_distance_km: rng.gen_range(0.1..15.0),
                    relative_velocity_km_s: rng.gen_range(5.0..15.0),
                    collision_probability: 0.0,
                    risk_tier: RiskTier::Safe,
                    altitude_km,
                    object_size_m: secondary.size_estimate_m,
                };
                event.risk_tier = self.thresholds.classify(event.miss_distance_km);
                event.collision_probability = self.model.predict(&PredictionInput::from_event(&event)).probability;
                event
            })
            .collect();

        rank_by_probability(&mut events);
        assign_ids(&mut events);
        debug!(count = events.len(), seed = self.seed, "synthetic conjunctions generated");
        events
    }
}
