//! Collision probability models
//!
//! [`HeuristicModel`] is the deterministic production model:
//!
//! ```text
//! P = clamp( (1/(1+d)) · (v/15) · 0.1 · f_alt · f_size , 0, 1 )
//! ```
//!
//! with `d` the miss distance (km) and `v` the relative velocity (km/s).
//! [`JitteredModel`] adds seeded noise to the confidence and exists for
//! dashboard demos and tests only.

use crate::ConjunctionEvent;
use orbital_mechanics::finite_or;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

pub const MODEL_VERSION: &str = "heuristic-1.0";

/// Relative velocity normalising the velocity factor (km/s)
const REFERENCE_VELOCITY_KM_S: f64 = 15.0;
const BASE_SCALE: f64 = 0.1;
const BASE_CONFIDENCE: f64 = 0.85;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ProbabilityLevel {
    pub fn from_probability(p: f64) -> Self {
        match p {
            p if p > 0.1 => ProbabilityLevel::Critical,
            p if p > 0.01 => ProbabilityLevel::High,
            p if p > 0.001 => ProbabilityLevel::Medium,
            _ => ProbabilityLevel::Low,
        }
    }
}

/// Features of one close approach
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PredictionInput {
    pub miss_distance_km: f64,
    pub relative_velocity_km_s: f64,
    pub altitude_km: f64,
    pub object_size_m: f64,
}

impl PredictionInput {
    /// Defaults for missing features: 10 km, 7.5 km/s, 500 km, 0.5 m
    pub fn from_event(event: &ConjunctionEvent) -> Self {
        Self {
            miss_distance_km: finite_or(event.miss_distance_km, 10.0, "miss_distance_km"),
            relative_velocity_km_s: finite_or(event.relative_velocity_km_s, 7.5, "relative_velocity_km_s"),
            altitude_km: finite_or(event.altitude_km, 500.0, "altitude_km"),
            object_size_m: event.object_size_m.map_or(0.5, |s| finite_or(s, 0.5, "object_size_m")),
        }
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.relative_velocity_km_s.powi(2)
    }

    fn sanitized(&self) -> Self {
        Self {
            miss_distance_km: finite_or(self.miss_distance_km, 10.0, "miss_distance_km").max(0.0),
            relative_velocity_km_s: finite_or(self.relative_velocity_km_s, 7.5, "relative_velocity_km_s").abs(),
            altitude_km: finite_or(self.altitude_km, 500.0, "altitude_km"),
            object_size_m: finite_or(self.object_size_m, 0.5, "object_size_m").max(0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub probability: f64,
    pub confidence: f64,
    pub risk_level: ProbabilityLevel,
    pub contributing_factors: Vec<String>,
    pub model_version: String,
}

/// Prediction keyed by the conjunction it scores
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConjunctionPrediction {
    pub conjunction_id: String,
    #[serde(flatten)]
    pub prediction: Prediction,
}

pub trait PredictionModel: Send + Sync {
    fn predict(&self, input: &PredictionInput) -> Prediction;

    fn predict_batch(&self, events: &[ConjunctionEvent]) -> Vec<ConjunctionPrediction> {
        events
            .iter()
            .map(|e| ConjunctionPrediction {
                conjunction_id: e.id.clone(),
                prediction: self.predict(&PredictionInput::from_event(e)),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicModel;

impl HeuristicModel {
    pub fn probability(input: &PredictionInput) -> f64 {
        let distance_factor = 1.0 / (1.0 + input.miss_distance_km);
        let velocity_factor = input.relative_velocity_km_s / REFERENCE_VELOCITY_KM_S;
        let p = distance_factor
            * velocity_factor
            * BASE_SCALE
            * altitude_factor(input.altitude_km)
            * size_factor(input.object_size_m);

        finite_or(p, 0.0, "collision_probability").clamp(0.0, 1.0)
    }

    pub fn confidence(input: &PredictionInput) -> f64 {
        let mut confidence = BASE_CONFIDENCE;
        if input.miss_distance_km > 20.0 {
            confidence -= 0.10;
        }
        if input.altitude_km > 2000.0 {
            confidence -= 0.05;
        }
        confidence.clamp(0.5, 0.99)
    }
}

impl PredictionModel for HeuristicModel {
    fn predict(&self, input: &PredictionInput) -> Prediction {
        let input = input.sanitized();
        let probability = Self::probability(&input);

        Prediction {
            probability,
            confidence: Self::confidence(&input),
            risk_level: ProbabilityLevel::from_probability(probability),
            contributing_factors: contributing_factors(&input),
            model_version: MODEL_VERSION.to_string(),
        }
    }
}

/// Heuristic model with ±0.05 seeded noise on confidence
pub struct JitteredModel {
    rng: Mutex<Pcg64Mcg>,
}

impl JitteredModel {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(Pcg64Mcg::seed_from_u64(seed)),
        }
    }
}

impl PredictionModel for JitteredModel {
    fn predict(&self, input: &PredictionInput) -> Prediction {
        let mut prediction = HeuristicModel.predict(input);
        let jitter = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(-0.05..0.05);
        prediction.confidence = (prediction.confidence + jitter).clamp(0.5, 0.99);
        prediction.model_version = format!("{}-jittered", MODEL_VERSION);
        prediction
    }
}

fn altitude_factor(altitude_km: f64) -> f64 {
    if (400.0..=600.0).contains(&altitude_km) {
        1.5 // ISS shell, densest traffic
    } else if (200.0..=1000.0).contains(&altitude_km) {
        1.2
    } else if (1000.0..=2000.0).contains(&altitude_km) {
        1.0
    } else {
        0.8
    }
}

fn size_factor(size_m: f64) -> f64 {
    if size_m > 1.0 {
        1.3
    } else if size_m > 0.1 {
        1.0
    } else {
        0.7
    }
}

fn contributing_factors(input: &PredictionInput) -> Vec<String> {
    let mut factors = Vec::new();
    if input.miss_distance_km < 5.0 {
        factors.push("Close approach distance");
    }
    if input.relative_velocity_km_s > 10.0 {
        factors.push("High relative velocity");
    }
    if input.altitude_km < 500.0 {
        factors.push("High-traffic altitude zone");
    }
    if input.object_size_m > 1.0 {
        factors.push("Large object size");
    }
    if input.kinetic_energy() > 50.0 {
        factors.push("High kinetic energy");
    }
    if factors.is_empty() {
        factors.push("Normal orbital parameters");
    }
    factors.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn input(miss: f64, vel: f64, alt: f64, size: f64) -> PredictionInput {
        PredictionInput {
            miss_distance_km: miss,
            relative_velocity_km_s: vel,
            altitude_km: alt,
            object_size_m: size,
        }
    }

    #[test]
    fn test_probability_formula() {
        // (1/2) · (15/15) · 0.1 · 1.5 · 1.0 = 0.075
        let p = HeuristicModel.predict(&input(1.0, 15.0, 500.0, 0.5));
        assert!((p.probability - 0.075).abs() < 1e-12);
        assert_eq!(p.risk_level, ProbabilityLevel::High);
        assert_eq!(p.confidence, 0.85);
    }

    #[test]
    fn test_probability_decreases_with_distance() {
        let near = HeuristicModel::probability(&input(0.5, 10.0, 800.0, 0.5));
        let far = HeuristicModel::probability(&input(30.0, 10.0, 800.0, 0.5));
        assert!(near > far);
    }

    #[test]
    fn test_levels() {
        assert_eq!(ProbabilityLevel::from_probability(0.2), ProbabilityLevel::Critical);
        assert_eq!(ProbabilityLevel::from_probability(0.05), ProbabilityLevel::High);
        assert_eq!(ProbabilityLevel::from_probability(0.005), ProbabilityLevel::Medium);
        assert_eq!(ProbabilityLevel::from_probability(0.0005), ProbabilityLevel::Low);
        assert_eq!(ProbabilityLevel::from_probability(0.1), ProbabilityLevel::High);
    }

    #[test]
    fn test_confidence_penalties() {
        let far_high = HeuristicModel.predict(&input(25.0, 5.0, 20_000.0, 0.5));
        assert!((far_high.confidence - 0.70).abs() < 1e-12);
    }

    #[test]
    fn test_contributing_factors() {
        let p = HeuristicModel.predict(&input(1.0, 12.0, 450.0, 2.0));
        assert!(p.contributing_factors.contains(&"Close approach distance".to_string()));
        assert!(p.contributing_factors.contains(&"High relative velocity".to_string()));
        assert!(p.contributing_factors.contains(&"High-traffic altitude zone".to_string()));
        assert!(p.contributing_factors.contains(&"Large object size".to_string()));
        assert!(p.contributing_factors.contains(&"High kinetic energy".to_string()));

        let quiet = HeuristicModel.predict(&input(30.0, 3.0, 1500.0, 0.5));
        assert_eq!(quiet.contributing_factors, vec!["Normal orbital parameters".to_string()]);
    }

    #[test]
    fn test_non_finite_input_is_safe() {
        let p = HeuristicModel.predict(&input(f64::NAN, f64::INFINITY, f64::NAN, f64::NAN));
        assert!(p.probability.is_finite());
        assert!((0.0..=1.0).contains(&p.probability));
        assert!(p.confidence.is_finite());
    }

    #[test]
    fn test_batch_predict_keeps_ids() {
        let mut e = fixtures::event(2.0, 0.0, 3);
        e.id = "CONJ-007".to_string();
        let out = HeuristicModel.predict_batch(&[e]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].conjunction_id, "CONJ-007");
    }

    #[test]
    fn test_jittered_model_seeded() {
        let a = JitteredModel::new(3);
        let b = JitteredModel::new(3);
        let i = input(2.0, 8.0, 700.0, 0.3);
        let pa = a.predict(&i);
        assert_eq!(pa, b.predict(&i));
        assert!((pa.confidence - 0.85).abs() <= 0.05 + 1e-12);
        assert_eq!(pa.probability, HeuristicModel::probability(&i));
    }
}
