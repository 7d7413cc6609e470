//! Avoidance maneuver planning
//!
//! Delta-v sizing, maneuver class selection, rocket-equation fuel estimate
//! and the perturbed post-burn orbit. Every plan is appended to the
//! planner's history, which feeds [`TrajectoryPlanner::statistics`].
//!
//! Axis split per maneuver class (radial / tangential / normal):
//!
//! | Class              | R    | T    | N    |
//! |--------------------|------|------|------|
//! | tangential_boost   | 0.0  | 1.0  | 0.0  |
//! | radial_boost       | 1.0  | 0.0  | 0.0  |
//! | combined_maneuver  | 0.6  | 0.4  | 0.0  |
//! | emergency_radial   | 0.8  | 0.2  | 0.0  |
//! | orbit_change       | 0.5  | 0.4  | 0.1  |

use crate::{shift_hours, CollisionError, ConjunctionEvent, Result};
use chrono::{DateTime, Utc};
use orbital_mechanics::{
    finite_or, CatalogSnapshot, ObjectPosition, PhysicalConstants, DEFAULT_ALTITUDE_KM, DEFAULT_SPEED_KM_S,
    MAX_ALTITUDE_KM, MIN_ALTITUDE_KM,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const PROPELLANT: &str = "hydrazine";
pub const STRATEGY_SEQUENTIAL: &str = "sequential_maneuvers";
/// Most urgent threats planned per multi-threat strategy
pub const MAX_PLANNED_THREATS: usize = 3;

/// Below this many hours to TCA every maneuver is an emergency
const EMERGENCY_HOURS: f64 = 2.0;
/// Sort key and planning horizon for threats without a known TCA
const UNKNOWN_TCA_SORT_HOURS: f64 = 999.0;
const UNKNOWN_TCA_PLAN_HOURS: f64 = 24.0;
/// Estimated separation gained per m/s of delta-v (km)
const SEPARATION_PER_DELTA_V_KM: f64 = 0.5;
/// Altitude change per m/s along the radial and tangential axes (km)
const RADIAL_ALTITUDE_GAIN_KM: f64 = 0.1;
const TANGENTIAL_ALTITUDE_GAIN_KM: f64 = 0.05;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    pub safe_distance_km: f64,
    pub safety_factor: f64,
    pub max_delta_v_m_s: f64,
    /// Base delta-v when no time is left before TCA
    pub emergency_delta_v_m_s: f64,
    pub isp_s: f64,
    pub g0_m_s2: f64,
    pub default_mass_kg: f64,
    pub thrust_acceleration_m_s2: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            safe_distance_km: 5.0,
            safety_factor: 1.2,
            max_delta_v_m_s: 50.0,
            emergency_delta_v_m_s: 10.0,
            isp_s: 220.0,
            g0_m_s2: 9.81,
            default_mass_kg: 1000.0,
            thrust_acceleration_m_s2: 0.01,
        }
    }
}

impl PlannerConfig {
    /// Replace values the planner cannot work with by their defaults.
    ///
    /// Cap, mass, Isp, g0 and thrust must be finite and positive; safe
    /// distance, safety factor and emergency delta-v finite and not negative.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let positive = |value: f64, default: f64, field: &str| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                warn!(field, value, default, "invalid planner parameter, using default");
                default
            }
        };
        let non_negative = |value: f64, default: f64, field: &str| {
            if value.is_finite() && value >= 0.0 {
                value
            } else {
                warn!(field, value, default, "invalid planner parameter, using default");
                default
            }
        };

        Self {
            safe_distance_km: non_negative(self.safe_distance_km, defaults.safe_distance_km, "safe_distance_km"),
            safety_factor: non_negative(self.safety_factor, defaults.safety_factor, "safety_factor"),
            max_delta_v_m_s: positive(self.max_delta_v_m_s, defaults.max_delta_v_m_s, "max_delta_v_m_s"),
            emergency_delta_v_m_s: non_negative(
                self.emergency_delta_v_m_s,
                defaults.emergency_delta_v_m_s,
                "emergency_delta_v_m_s",
            ),
            isp_s: positive(self.isp_s, defaults.isp_s, "isp_s"),
            g0_m_s2: positive(self.g0_m_s2, defaults.g0_m_s2, "g0_m_s2"),
            default_mass_kg: positive(self.default_mass_kg, defaults.default_mass_kg, "default_mass_kg"),
            thrust_acceleration_m_s2: positive(
                self.thrust_acceleration_m_s2,
                defaults.thrust_acceleration_m_s2,
                "thrust_acceleration_m_s2",
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverType {
    TangentialBoost,
    RadialBoost,
    CombinedManeuver,
    EmergencyRadial,
    OrbitChange,
}

impl ManeuverType {
    pub fn select(delta_v_m_s: f64, hours_to_conjunction: f64) -> Self {
        if hours_to_conjunction < EMERGENCY_HOURS {
            ManeuverType::EmergencyRadial
        } else if delta_v_m_s < 1.0 {
            ManeuverType::TangentialBoost
        } else if delta_v_m_s < 5.0 {
            ManeuverType::RadialBoost
        } else if delta_v_m_s < 15.0 {
            ManeuverType::CombinedManeuver
        } else {
            ManeuverType::OrbitChange
        }
    }

    /// (radial, tangential, normal) fractions, summing to 1
    pub fn axis_split(&self) -> (f64, f64, f64) {
        match self {
            ManeuverType::TangentialBoost => (0.0, 1.0, 0.0),
            ManeuverType::RadialBoost => (1.0, 0.0, 0.0),
            ManeuverType::CombinedManeuver => (0.6, 0.4, 0.0),
            ManeuverType::EmergencyRadial => (0.8, 0.2, 0.0),
            ManeuverType::OrbitChange => (0.5, 0.4, 0.1),
        }
    }
}

/// Delta-v per local orbital axis (m/s)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DeltaVComponents {
    pub radial: f64,
    pub tangential: f64,
    pub normal: f64,
}

impl DeltaVComponents {
    pub fn split(delta_v_m_s: f64, maneuver_type: ManeuverType) -> Self {
        let (r, t, n) = maneuver_type.axis_split();
        Self {
            radial: delta_v_m_s * r,
            tangential: delta_v_m_s * t,
            normal: delta_v_m_s * n,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelEstimate {
    pub fuel_mass_kg: f64,
    pub percentage_of_total: f64,
    pub propellant_type: String,
}

/// Orbit after the burn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NewOrbit {
    pub altitude_km: f64,
    pub speed_km_s: f64,
    pub period_minutes: f64,
    pub altitude_change_km: f64,
    /// Post-burn circular speed minus the pre-burn speed
    pub speed_change_km_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManeuverPlan {
    pub maneuver_id: String,
    pub satellite_id: u32,
    pub threat_id: String,
    pub maneuver_type: ManeuverType,
    pub delta_v_m_s: f64,
    pub delta_v_components: DeltaVComponents,
    pub fuel: FuelEstimate,
    pub execution_time: DateTime<Utc>,
    pub duration_s: f64,
    pub new_orbit: NewOrbit,
    pub safety_margin_km: f64,
    pub confidence: f64,
    pub risk_reduction_pct: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEntry {
    pub sequence: usize,
    pub maneuver_id: String,
    pub execution_time: DateTime<Utc>,
    pub duration_s: f64,
    pub delta_v_m_s: f64,
}

/// Sequential plan against the most urgent threats
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Strategy {
    pub strategy: String,
    pub threat_count: usize,
    /// Ascending time to closest approach
    pub planned_maneuvers: Vec<ManeuverPlan>,
    pub total_delta_v_m_s: f64,
    pub total_fuel_kg: f64,
    pub execution_timeline: Vec<TimelineEntry>,
    pub overall_confidence: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ManeuverStatistics {
    pub total_maneuvers: usize,
    pub average_delta_v_m_s: f64,
    pub total_fuel_used_kg: f64,
    pub maneuver_types: BTreeMap<ManeuverType, usize>,
    pub average_confidence: f64,
    pub average_risk_reduction_pct: f64,
}

/// The maneuvering object's current state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Spacecraft {
    pub id: u32,
    pub altitude_km: f64,
    pub speed_km_s: f64,
    /// Falls back to the planner's default mass
    pub mass_kg: Option<f64>,
}

impl Spacecraft {
    /// Build from the object's current position and its catalog entry
    pub fn locate(id: u32, positions: &[ObjectPosition], snapshot: &CatalogSnapshot) -> Result<Self> {
        let position = positions
            .iter()
            .find(|p| p.id == id && !p.synthetic)
            .ok_or(CollisionError::ObjectNotFound(id))?;

        Ok(Self {
            id,
            altitude_km: position.position.altitude_km,
            speed_km_s: position.position.speed_km_s,
            mass_kg: snapshot.get(id).and_then(|o| o.mass_kg()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Threat {
    pub id: String,
    pub miss_distance_km: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_tca_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_km: Option<f64>,
}

impl Threat {
    pub fn from_event(event: &ConjunctionEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: event.id.clone(),
            miss_distance_km: event.miss_distance_km,
            time_to_tca_hours: Some(event.hours_until(now)),
            altitude_km: Some(event.altitude_km),
        }
    }

    fn urgency(&self) -> f64 {
        self.time_to_tca_hours
            .filter(|h| h.is_finite())
            .unwrap_or(UNKNOWN_TCA_SORT_HOURS)
    }
}

/// Rocket equation: m · (exp(Δv / (Isp·g0)) − 1)
pub fn fuel_mass_kg(delta_v_m_s: f64, mass_kg: f64, isp_s: f64, g0_m_s2: f64) -> f64 {
    mass_kg * (delta_v_m_s / (isp_s * g0_m_s2)).exp_m1()
}

pub struct TrajectoryPlanner {
    config: PlannerConfig,
    constants: PhysicalConstants,
    history: Vec<ManeuverPlan>,
}

impl Default for TrajectoryPlanner {
    fn default() -> Self {
        Self::new(PlannerConfig::default(), PhysicalConstants::default())
    }
}

impl TrajectoryPlanner {
    pub fn new(config: PlannerConfig, constants: PhysicalConstants) -> Self {
        Self {
            config: config.sanitized(),
            constants,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Required delta-v (m/s), capped at the configured maximum.
    ///
    /// A negative or non-finite miss distance counts as 0 km; a non-finite
    /// or non-positive time uses the emergency base delta-v.
    pub fn delta_v(&self, miss_distance_km: f64, hours_to_conjunction: f64) -> f64 {
        let cfg = &self.config;
        let miss = finite_or(miss_distance_km, 0.0, "miss_distance_km").max(0.0);
        let hours = finite_or(hours_to_conjunction, 0.0, "hours_to_conjunction");

        let required_m = (cfg.safe_distance_km - miss).max(0.0) * 1000.0;
        let available_s = hours * 3600.0;
        let base = if available_s > 0.0 {
            required_m / available_s
        } else {
            cfg.emergency_delta_v_m_s
        };

        finite_or(base * cfg.safety_factor, cfg.max_delta_v_m_s, "delta_v")
            .clamp(0.0, cfg.max_delta_v_m_s)
    }

    /// Propellant for `delta_v_m_s`; a non-positive mass uses the default
    /// mass and a negative delta-v counts as none.
    pub fn fuel_estimate(&self, delta_v_m_s: f64, mass_kg: f64) -> FuelEstimate {
        let mass_kg = if mass_kg.is_finite() && mass_kg > 0.0 {
            mass_kg
        } else {
            self.config.default_mass_kg
        };
        let delta_v_m_s = finite_or(delta_v_m_s, 0.0, "delta_v").max(0.0);
        let fuel = finite_or(
            fuel_mass_kg(delta_v_m_s, mass_kg, self.config.isp_s, self.config.g0_m_s2),
            0.0,
            "fuel_mass_kg",
        );
        FuelEstimate {
            fuel_mass_kg: fuel,
            percentage_of_total: finite_or(fuel / mass_kg * 100.0, 0.0, "fuel_percentage"),
            propellant_type: PROPELLANT.to_string(),
        }
    }

    /// Orbit after the burn. Both the starting altitude and the result are
    /// kept within the catalog altitude range.
    pub fn new_orbit(&self, spacecraft: &Spacecraft, delta_v_m_s: f64, maneuver_type: ManeuverType) -> NewOrbit {
        let (radial, tangential, _) = maneuver_type.axis_split();
        let start = finite_or(spacecraft.altitude_km, DEFAULT_ALTITUDE_KM, "altitude_km")
            .clamp(MIN_ALTITUDE_KM, MAX_ALTITUDE_KM);
        let pre_burn_speed = finite_or(spacecraft.speed_km_s, DEFAULT_SPEED_KM_S, "speed_km_s").max(0.0);

        let raw_change = delta_v_m_s * (radial * RADIAL_ALTITUDE_GAIN_KM + tangential * TANGENTIAL_ALTITUDE_GAIN_KM);
        let altitude = finite_or(start + raw_change, DEFAULT_ALTITUDE_KM, "new_altitude_km")
            .clamp(MIN_ALTITUDE_KM, MAX_ALTITUDE_KM);
        let change = altitude - start;
        let speed = finite_or(self.constants.circular_speed(altitude), DEFAULT_SPEED_KM_S, "new_speed_km_s");
        let period_s = self
            .constants
            .period_from_semi_major_axis(self.constants.earth_radius_km + altitude);

        NewOrbit {
            altitude_km: altitude,
            speed_km_s: speed,
            period_minutes: finite_or(period_s / 60.0, 0.0, "period_minutes"),
            altitude_change_km: change,
            speed_change_km_s: speed - pre_burn_speed,
        }
    }

    pub fn confidence(hours_to_conjunction: f64, delta_v_m_s: f64) -> f64 {
        let mut confidence: f64 = 0.95;
        if hours_to_conjunction < 2.0 {
            confidence -= 0.15;
        } else if hours_to_conjunction < 6.0 {
            confidence -= 0.05;
        }
        if delta_v_m_s > 20.0 {
            confidence -= 0.10;
        } else if delta_v_m_s > 10.0 {
            confidence -= 0.05;
        }
        confidence.clamp(0.5, 0.99)
    }

    fn estimated_miss_km(miss_distance_km: f64, delta_v_m_s: f64) -> f64 {
        miss_distance_km + delta_v_m_s * SEPARATION_PER_DELTA_V_KM
    }

    /// Reduction (%) of the 1/(d+1) risk proxy after the burn
    pub fn risk_reduction_pct(miss_distance_km: f64, delta_v_m_s: f64) -> f64 {
        let before = 1.0 / (miss_distance_km + 1.0);
        let after = 1.0 / (Self::estimated_miss_km(miss_distance_km, delta_v_m_s) + 1.0);
        finite_or((before - after) / before * 100.0, 0.0, "risk_reduction_pct").max(0.0)
    }

    pub fn plan_maneuver(&mut self, spacecraft: &Spacecraft, threat: &Threat, hours_to_conjunction: f64) -> ManeuverPlan {
        self.plan_maneuver_at(spacecraft, threat, hours_to_conjunction, Utc::now())
    }

    pub fn plan_maneuver_at(
        &mut self,
        spacecraft: &Spacecraft,
        threat: &Threat,
        hours_to_conjunction: f64,
        now: DateTime<Utc>,
    ) -> ManeuverPlan {
        let hours = finite_or(hours_to_conjunction, 0.0, "hours_to_conjunction");
        let miss = finite_or(threat.miss_distance_km, 0.0, "miss_distance_km").max(0.0);
        let mass = spacecraft
            .mass_kg
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(self.config.default_mass_kg);

        let delta_v = self.delta_v(miss, hours);
        let maneuver_type = ManeuverType::select(delta_v, hours);

        let plan = ManeuverPlan {
            maneuver_id: format!("MAN-{:05}", self.history.len() + 1),
            satellite_id: spacecraft.id,
            threat_id: threat.id.clone(),
            maneuver_type,
            delta_v_m_s: delta_v,
            delta_v_components: DeltaVComponents::split(delta_v, maneuver_type),
            fuel: self.fuel_estimate(delta_v, mass),
            execution_time: shift_hours(now, hours.max(0.0) * 0.5),
            duration_s: delta_v / self.config.thrust_acceleration_m_s2,
            new_orbit: self.new_orbit(spacecraft, delta_v, maneuver_type),
            safety_margin_km: (Self::estimated_miss_km(miss, delta_v) - self.config.safe_distance_km).max(0.0),
            confidence: Self::confidence(hours, delta_v),
            risk_reduction_pct: Self::risk_reduction_pct(miss, delta_v),
            created_at: now,
        };

        info!(
            maneuver = %plan.maneuver_id,
            satellite = plan.satellite_id,
            threat = %plan.threat_id,
            kind = ?plan.maneuver_type,
            delta_v = plan.delta_v_m_s,
            fuel_kg = plan.fuel.fuel_mass_kg,
            "maneuver planned"
        );
        self.history.push(plan.clone());
        plan
    }

    pub fn plan_multi_threat(&mut self, spacecraft: &Spacecraft, threats: &[Threat]) -> Strategy {
        self.plan_multi_threat_at(spacecraft, threats, Utc::now())
    }

    /// Plan against the three most urgent threats in ascending TCA order
    pub fn plan_multi_threat_at(&mut self, spacecraft: &Spacecraft, threats: &[Threat], now: DateTime<Utc>) -> Strategy {
        let mut ordered: Vec<&Threat> = threats.iter().collect();
        ordered.sort_by(|a, b| a.urgency().total_cmp(&b.urgency()));

        let planned_maneuvers: Vec<ManeuverPlan> = ordered
            .into_iter()
            .take(MAX_PLANNED_THREATS)
            .map(|t| {
                let hours = t
                    .time_to_tca_hours
                    .filter(|h| h.is_finite())
                    .unwrap_or(UNKNOWN_TCA_PLAN_HOURS);
                self.plan_maneuver_at(spacecraft, t, hours, now)
            })
            .collect();

        let execution_timeline = planned_maneuvers
            .iter()
            .enumerate()
            .map(|(i, m)| TimelineEntry {
                sequence: i + 1,
                maneuver_id: m.maneuver_id.clone(),
                execution_time: m.execution_time,
                duration_s: m.duration_s,
                delta_v_m_s: m.delta_v_m_s,
            })
            .collect();

        let overall_confidence = if planned_maneuvers.is_empty() {
            0.0
        } else {
            planned_maneuvers.iter().map(|m| m.confidence).sum::<f64>() / planned_maneuvers.len() as f64
        };

        Strategy {
            strategy: STRATEGY_SEQUENTIAL.to_string(),
            threat_count: threats.len(),
            total_delta_v_m_s: planned_maneuvers.iter().map(|m| m.delta_v_m_s).sum(),
            total_fuel_kg: planned_maneuvers.iter().map(|m| m.fuel.fuel_mass_kg).sum(),
            planned_maneuvers,
            execution_timeline,
            overall_confidence,
            created_at: now,
        }
    }

    /// Plans created within the last `hours`, optionally for one satellite
    pub fn history(&self, satellite_id: Option<u32>, hours: f64, now: DateTime<Utc>) -> Vec<&ManeuverPlan> {
        let hours = finite_or(hours, 24.0, "history_hours").max(0.0);
        let cutoff = shift_hours(now, -hours);
        self.history
            .iter()
            .filter(|m| m.created_at > cutoff)
            .filter(|m| satellite_id.map_or(true, |id| m.satellite_id == id))
            .collect()
    }

    pub fn statistics(&self) -> ManeuverStatistics {
        if self.history.is_empty() {
            return ManeuverStatistics::default();
        }
        let n = self.history.len() as f64;

        let mut maneuver_types = BTreeMap::new();
        for m in &self.history {
            *maneuver_types.entry(m.maneuver_type).or_insert(0) += 1;
        }

        ManeuverStatistics {
            total_maneuvers: self.history.len(),
            average_delta_v_m_s: self.history.iter().map(|m| m.delta_v_m_s).sum::<f64>() / n,
            total_fuel_used_kg: self.history.iter().map(|m| m.fuel.fuel_mass_kg).sum(),
            maneuver_types,
            average_confidence: self.history.iter().map(|m| m.confidence).sum::<f64>() / n,
            average_risk_reduction_pct: self.history.iter().map(|m| m.risk_reduction_pct).sum::<f64>() / n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{event, now};
    use chrono::Duration;

    fn iss() -> Spacecraft {
        Spacecraft {
            id: 25544,
            altitude_km: 420.0,
            speed_km_s: 7.66,
            mass_kg: Some(420_000.0),
        }
    }

    fn threat(id: &str, miss: f64, hours: Option<f64>) -> Threat {
        Threat {
            id: id.to_string(),
            miss_distance_km: miss,
            time_to_tca_hours: hours,
            altitude_km: None,
        }
    }

    #[test]
    fn test_delta_v_formula() {
        let p = TrajectoryPlanner::default();
        // (4000 m / 3600 s) · 1.2
        assert!((p.delta_v(1.0, 1.0) - 4000.0 / 3600.0 * 1.2).abs() < 1e-12);
        assert_eq!(p.delta_v(5.0, 3.0), 0.0);
        assert_eq!(p.delta_v(8.0, 3.0), 0.0);
    }

    #[test]
    fn test_delta_v_emergency_and_cap() {
        let p = TrajectoryPlanner::default();
        assert!((p.delta_v(1.0, 0.0) - 12.0).abs() < 1e-12);
        assert!((p.delta_v(1.0, -3.0) - 12.0).abs() < 1e-12);
        assert!((p.delta_v(1.0, f64::NAN) - 12.0).abs() < 1e-12);
        assert_eq!(p.delta_v(0.0, 0.001), 50.0);
        assert_eq!(p.delta_v(f64::NAN, 0.001), 50.0);
    }

    #[test]
    fn test_maneuver_type_selection() {
        assert_eq!(ManeuverType::select(30.0, 1.5), ManeuverType::EmergencyRadial);
        assert_eq!(ManeuverType::select(0.5, 10.0), ManeuverType::TangentialBoost);
        assert_eq!(ManeuverType::select(1.0, 10.0), ManeuverType::RadialBoost);
        assert_eq!(ManeuverType::select(5.0, 10.0), ManeuverType::CombinedManeuver);
        assert_eq!(ManeuverType::select(15.0, 10.0), ManeuverType::OrbitChange);
    }

    #[test]
    fn test_axis_splits_sum_to_one() {
        for t in [
            ManeuverType::TangentialBoost,
            ManeuverType::RadialBoost,
            ManeuverType::CombinedManeuver,
            ManeuverType::EmergencyRadial,
            ManeuverType::OrbitChange,
        ] {
            let (r, tg, n) = t.axis_split();
            assert!((r + tg + n - 1.0).abs() < 1e-12);
        }
        let c = DeltaVComponents::split(10.0, ManeuverType::CombinedManeuver);
        assert!((c.radial - 6.0).abs() < 1e-12);
        assert!((c.tangential - 4.0).abs() < 1e-12);
        assert_eq!(c.normal, 0.0);
    }

    #[test]
    fn test_fuel_rocket_equation() {
        assert_eq!(fuel_mass_kg(0.0, 1000.0, 220.0, 9.81), 0.0);
        let fuel = fuel_mass_kg(10.0, 1000.0, 220.0, 9.81);
        let expected = 1000.0 * ((10.0_f64 / (220.0 * 9.81)).exp() - 1.0);
        assert!((fuel - expected).abs() < 1e-9);

        let est = TrajectoryPlanner::default().fuel_estimate(10.0, 1000.0);
        assert!((est.percentage_of_total - fuel / 10.0).abs() < 1e-9);
        assert_eq!(est.propellant_type, "hydrazine");
    }

    #[test]
    fn test_confidence_adjustments() {
        assert!((TrajectoryPlanner::confidence(24.0, 1.0) - 0.95).abs() < 1e-12);
        assert!((TrajectoryPlanner::confidence(4.0, 12.0) - 0.85).abs() < 1e-12);
        assert!((TrajectoryPlanner::confidence(1.0, 25.0) - 0.70).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let config = PlannerConfig {
            max_delta_v_m_s: -1.0,
            default_mass_kg: -1000.0,
            isp_s: 0.0,
            g0_m_s2: f64::NAN,
            safety_factor: -2.0,
            thrust_acceleration_m_s2: f64::INFINITY,
            ..PlannerConfig::default()
        };
        let p = TrajectoryPlanner::new(config, PhysicalConstants::default());
        assert_eq!(*p.config(), PlannerConfig::default());

        let dv = p.delta_v(1.0, 1.0);
        assert!((dv - 4000.0 / 3600.0 * 1.2).abs() < 1e-12);
        assert_eq!(p.delta_v(0.0, 0.001), 50.0);

        let est = p.fuel_estimate(10.0, -1000.0);
        assert!((est.fuel_mass_kg - fuel_mass_kg(10.0, 1000.0, 220.0, 9.81)).abs() < 1e-9);
        assert_eq!(p.fuel_estimate(-5.0, 1000.0).fuel_mass_kg, 0.0);
    }

    #[test]
    fn test_valid_config_kept() {
        let config = PlannerConfig {
            max_delta_v_m_s: 20.0,
            safety_factor: 0.0,
            ..PlannerConfig::default()
        };
        assert_eq!(config.sanitized(), config);
    }

    #[test]
    fn test_new_orbit_clamps_altitude() {
        let p = TrajectoryPlanner::default();
        let sunk = Spacecraft {
            altitude_km: -300.0,
            ..iss()
        };
        let orbit = p.new_orbit(&sunk, 2.0, ManeuverType::RadialBoost);
        assert!((orbit.altitude_km - (MIN_ALTITUDE_KM + 0.2)).abs() < 1e-9);
        assert!((orbit.altitude_change_km - 0.2).abs() < 1e-9);
        assert!(orbit.period_minutes > 80.0);

        let high = Spacecraft {
            altitude_km: MAX_ALTITUDE_KM,
            ..iss()
        };
        let orbit = p.new_orbit(&high, 50.0, ManeuverType::RadialBoost);
        assert_eq!(orbit.altitude_km, MAX_ALTITUDE_KM);
        assert_eq!(orbit.altitude_change_km, 0.0);
    }

    #[test]
    fn test_new_orbit_speed_change_from_pre_burn_speed() {
        let p = TrajectoryPlanner::default();
        let orbit = p.new_orbit(&iss(), 10.0, ManeuverType::RadialBoost);
        assert!((orbit.speed_change_km_s - (orbit.speed_km_s - 7.66)).abs() < 1e-12);

        let unknown_speed = Spacecraft {
            speed_km_s: f64::NAN,
            ..iss()
        };
        let orbit = p.new_orbit(&unknown_speed, 10.0, ManeuverType::RadialBoost);
        assert!((orbit.speed_change_km_s - (orbit.speed_km_s - DEFAULT_SPEED_KM_S)).abs() < 1e-12);
    }

    #[test]
    fn test_plan_maneuver_fields() {
        let mut p = TrajectoryPlanner::default();
        let plan = p.plan_maneuver_at(&iss(), &threat("CONJ-001", 1.0, None), 1.0, now());

        assert_eq!(plan.maneuver_id, "MAN-00001");
        assert_eq!(plan.satellite_id, 25544);
        assert_eq!(plan.threat_id, "CONJ-001");
        assert_eq!(plan.maneuver_type, ManeuverType::EmergencyRadial);
        assert!((plan.delta_v_m_s - 4.0 / 3.6 * 1.2).abs() < 1e-9);
        assert_eq!(plan.execution_time, now() + Duration::minutes(30));
        assert!((plan.duration_s - plan.delta_v_m_s / 0.01).abs() < 1e-9);
        assert!((plan.confidence - 0.80).abs() < 1e-12);

        let expected_change = plan.delta_v_m_s * (0.8 * 0.1 + 0.2 * 0.05);
        assert!((plan.new_orbit.altitude_change_km - expected_change).abs() < 1e-12);
        assert!((plan.new_orbit.altitude_km - (420.0 + expected_change)).abs() < 1e-12);
        assert!(plan.new_orbit.period_minutes > 90.0 && plan.new_orbit.period_minutes < 95.0);
        assert!(plan.risk_reduction_pct > 0.0);
        assert_eq!(plan.safety_margin_km, 0.0);

        let second = p.plan_maneuver_at(&iss(), &threat("CONJ-002", 3.0, None), 12.0, now());
        assert_eq!(second.maneuver_id, "MAN-00002");
    }

    #[test]
    fn test_plan_defaults_for_bad_input() {
        let mut p = TrajectoryPlanner::default();
        let craft = Spacecraft {
            id: 1,
            altitude_km: f64::NAN,
            speed_km_s: f64::NAN,
            mass_kg: Some(-5.0),
        };
        let plan = p.plan_maneuver_at(&craft, &threat("X", f64::NAN, None), f64::INFINITY, now());

        assert!((plan.delta_v_m_s - 12.0).abs() < 1e-12);
        assert_eq!(plan.maneuver_type, ManeuverType::EmergencyRadial);
        assert_eq!(plan.execution_time, now());
        let json = serde_json::to_value(&plan).unwrap();
        assert!(json["new_orbit"]["altitude_km"].as_f64().unwrap().is_finite());
        assert!(plan.fuel.fuel_mass_kg > 0.0);
    }

    #[test]
    fn test_multi_threat_order_and_limit() {
        let mut p = TrajectoryPlanner::default();
        let threats = vec![
            threat("late", 2.0, Some(30.0)),
            threat("unknown", 2.0, None),
            threat("soon", 1.0, Some(3.0)),
            threat("mid", 4.0, Some(10.0)),
            threat("now", 0.5, Some(0.5)),
        ];
        let s = p.plan_multi_threat_at(&iss(), &threats, now());

        assert_eq!(s.strategy, "sequential_maneuvers");
        assert_eq!(s.threat_count, 5);
        let ids: Vec<&str> = s.planned_maneuvers.iter().map(|m| m.threat_id.as_str()).collect();
        assert_eq!(ids, vec!["now", "soon", "mid"]);
        assert_eq!(s.execution_timeline.len(), 3);
        assert_eq!(s.execution_timeline[2].sequence, 3);

        let total: f64 = s.planned_maneuvers.iter().map(|m| m.delta_v_m_s).sum();
        assert!((s.total_delta_v_m_s - total).abs() < 1e-12);
        let mean = s.planned_maneuvers.iter().map(|m| m.confidence).sum::<f64>() / 3.0;
        assert!((s.overall_confidence - mean).abs() < 1e-12);
    }

    #[test]
    fn test_multi_threat_unknown_tca_planned_with_default_horizon() {
        let mut p = TrajectoryPlanner::default();
        let s = p.plan_multi_threat_at(&iss(), &[threat("only", 2.0, None)], now());
        assert_eq!(s.planned_maneuvers[0].execution_time, now() + Duration::hours(12));
    }

    #[test]
    fn test_multi_threat_empty() {
        let mut p = TrajectoryPlanner::default();
        let s = p.plan_multi_threat_at(&iss(), &[], now());
        assert!(s.planned_maneuvers.is_empty());
        assert_eq!(s.total_delta_v_m_s, 0.0);
        assert_eq!(s.overall_confidence, 0.0);
        assert_eq!(p.statistics(), ManeuverStatistics::default());
    }

    #[test]
    fn test_history_and_statistics() {
        let mut p = TrajectoryPlanner::default();
        let other = Spacecraft { id: 48274, ..iss() };
        p.plan_maneuver_at(&iss(), &threat("a", 1.0, None), 1.0, now() - Duration::hours(30));
        p.plan_maneuver_at(&iss(), &threat("b", 2.0, None), 12.0, now());
        p.plan_maneuver_at(&other, &threat("c", 3.0, None), 12.0, now());

        assert_eq!(p.history(None, 24.0, now()).len(), 2);
        assert_eq!(p.history(Some(25544), 24.0, now()).len(), 1);
        assert_eq!(p.history(Some(25544), 48.0, now()).len(), 2);

        let stats = p.statistics();
        assert_eq!(stats.total_maneuvers, 3);
        assert_eq!(stats.maneuver_types[&ManeuverType::EmergencyRadial], 1);
        assert_eq!(stats.maneuver_types.values().sum::<usize>(), 3);
        assert!(stats.average_delta_v_m_s > 0.0);
        assert!((0.5..=0.99).contains(&stats.average_confidence));
    }

    #[test]
    fn test_threat_from_event() {
        let mut e = event(2.5, 0.01, 6);
        e.id = "CONJ-004".to_string();
        let t = Threat::from_event(&e, now());
        assert_eq!(t.id, "CONJ-004");
        assert_eq!(t.miss_distance_km, 2.5);
        assert!((t.time_to_tca_hours.unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_spacecraft_locate() {
        use orbital_mechanics::{Catalog, ObjectProfile, TrackedObject};

        let catalog = Catalog::default();
        catalog.load(vec![TrackedObject::from_tle(
            25544,
            "ISS",
            "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
            "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
            None,
            ObjectProfile::Satellite {
                mission_type: "crewed".to_string(),
                mass_kg: Some(420_000.0),
            },
        )]);
        let positions = catalog.positions_at(now(), None);
        let snap = catalog.snapshot();

        let craft = Spacecraft::locate(25544, &positions, &snap).unwrap();
        assert_eq!(craft.mass_kg, Some(420_000.0));
        assert_eq!(craft.altitude_km, positions[0].position.altitude_km);

        assert!(matches!(
            Spacecraft::locate(1, &positions, &snap),
            Err(CollisionError::ObjectNotFound(1))
        ));
    }
}
