//! Conjunction risk analysis
//!
//! Classifies events by miss distance against fixed thresholds (inclusive):
//!
//! | Miss distance   | Tier  |
//! |-----------------|-------|
//! | d ≤ 5 km        | alert |
//! | 5 < d ≤ 20 km   | watch |
//! | d > 20 km       | safe  |
//!
//! and aggregates tier counts, rolling-window collision probabilities,
//! per-region summaries and a probability-ranked event list.

use crate::prediction::{PredictionInput, PredictionModel};
use crate::{assign_ids, rank_by_probability, ConjunctionEvent, RiskTier};
use chrono::{DateTime, Duration, Utc};
use orbital_mechanics::{finite_or, ObjectPosition, OrbitRegion, RiskLevel, EARTH_RADIUS_KM, MAX_ALTITUDE_KM};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::{debug, info};

/// Recent conjunctions kept in memory
pub const HISTORY_CAPACITY: usize = 100;

/// Relative change below which density is reported stable
const DENSITY_STABLE_BAND: f64 = 0.05;

pub const RECOMMENDED_ACTIONS: [&str; 3] = [
    "Monitor high-risk conjunctions closely",
    "Consider maneuver planning for critical satellites",
    "Update tracking data for unidentified objects",
];

/// Miss-distance thresholds (km)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskThresholds {
    /// Screening radius; approaches beyond it are not reported
    pub safe_km: f64,
    pub watch_km: f64,
    pub alert_km: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            safe_km: 50.0,
            watch_km: 20.0,
            alert_km: 5.0,
        }
    }
}

impl RiskThresholds {
    /// Non-finite distances classify as safe (nothing reportable)
    pub fn classify(&self, miss_distance_km: f64) -> RiskTier {
        if miss_distance_km <= self.alert_km {
            RiskTier::Alert
        } else if miss_distance_km <= self.watch_km {
            RiskTier::Watch
        } else {
            RiskTier::Safe
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierCounts {
    pub safe: usize,
    pub watch: usize,
    pub alert: usize,
}

impl TierCounts {
    fn add(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::Safe => self.safe += 1,
            RiskTier::Watch => self.watch += 1,
            RiskTier::Alert => self.alert += 1,
        }
    }
}

/// Combined probability of at least one collision per window
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ProbabilityWindows {
    pub next_24h: f64,
    pub next_week: f64,
    pub next_month: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegionSummary {
    pub objects: usize,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskReport {
    pub total_objects: usize,
    pub high_risk_objects: usize,
    pub medium_risk_objects: usize,
    pub low_risk_objects: usize,
    pub active_alerts: usize,
    pub risk_zones: TierCounts,
    pub collision_probability: ProbabilityWindows,
    /// Ranked by descending collision probability
    pub critical_conjunctions: Vec<ConjunctionEvent>,
    pub orbital_regions: BTreeMap<OrbitRegion, RegionSummary>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SizeDistribution {
    /// < 10 cm
    pub small: usize,
    /// 10 cm to 1 m
    pub medium: usize,
    /// ≥ 1 m
    pub large: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DensityReport {
    pub altitude_range: String,
    pub objects_per_km3: f64,
    pub total_objects: usize,
    pub size_distribution: SizeDistribution,
    pub trend: Trend,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskForecast {
    pub prediction_window_hours: f64,
    pub predicted_conjunctions: usize,
    pub risk_trend: Trend,
    pub confidence_level: f64,
    pub recommended_actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_risk_time: Option<DateTime<Utc>>,
}

pub struct RiskAnalyzer {
    thresholds: RiskThresholds,
    model: Arc<dyn PredictionModel>,
    history: VecDeque<ConjunctionEvent>,
    last_density: HashMap<(u64, u64), f64>,
}

impl RiskAnalyzer {
    pub fn new(thresholds: RiskThresholds, model: Arc<dyn PredictionModel>) -> Self {
        Self {
            thresholds,
            model,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            last_density: HashMap::new(),
        }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn classify(&self, miss_distance_km: f64) -> RiskTier {
        self.thresholds.classify(miss_distance_km)
    }

    /// Most recent analyzed conjunctions, oldest first
    pub fn recent_conjunctions(&self) -> impl Iterator<Item = &ConjunctionEvent> {
        self.history.iter()
    }

    /// Aggregate a risk report. Synthetic positions are ignored.
    pub fn analyze(
        &mut self,
        conjunctions: Vec<ConjunctionEvent>,
        positions: &[ObjectPosition],
        now: DateTime<Utc>,
    ) -> RiskReport {
        let tracked: Vec<&ObjectPosition> = positions.iter().filter(|p| !p.synthetic).collect();

        let mut events: Vec<ConjunctionEvent> = conjunctions
            .into_iter()
            .map(|mut e| {
                e.miss_distance_km = finite_or(e.miss_distance_km, f64::INFINITY, "miss_distance_km").max(0.0);
                e.collision_probability =
                    finite_or(e.collision_probability, 0.0, "collision_probability").clamp(0.0, 1.0);
                e.relative_velocity_km_s = finite_or(e.relative_velocity_km_s, 0.0, "relative_velocity_km_s");
                e.risk_tier = self.thresholds.classify(e.miss_distance_km);
                e
            })
            .collect();
        // Non-finite miss distances were mapped to ∞ so they classify safe;
        // keep the reported value finite.
        for e in events.iter_mut().filter(|e| e.miss_distance_km.is_infinite()) {
            e.miss_distance_km = self.thresholds.safe_km.max(0.0);
        }
        rank_by_probability(&mut events);

        let mut risk_zones = TierCounts::default();
        for e in &events {
            risk_zones.add(e.risk_tier);
        }

        let count_level = |level: RiskLevel| tracked.iter().filter(|p| p.risk_level == Some(level)).count();

        let report = RiskReport {
            total_objects: tracked.len(),
            high_risk_objects: count_level(RiskLevel::High),
            medium_risk_objects: count_level(RiskLevel::Medium),
            low_risk_objects: count_level(RiskLevel::Low),
            active_alerts: risk_zones.alert,
            risk_zones,
            collision_probability: ProbabilityWindows {
                next_24h: combined_probability(&events, now, Duration::hours(24)),
                next_week: combined_probability(&events, now, Duration::days(7)),
                next_month: combined_probability(&events, now, Duration::days(30)),
            },
            orbital_regions: region_summaries(&tracked, &events),
            critical_conjunctions: events,
            timestamp: now,
        };

        for e in &report.critical_conjunctions {
            if self.history.len() == HISTORY_CAPACITY {
                self.history.pop_front();
            }
            self.history.push_back(e.clone());
        }

        info!(
            objects = report.total_objects,
            conjunctions = report.critical_conjunctions.len(),
            alerts = report.active_alerts,
            p24h = report.collision_probability.next_24h,
            "risk analysis complete"
        );
        report
    }

    /// Object density in the spherical shell `[min_alt_km, max_alt_km)`.
    ///
    /// Trend compares against the previous call for the same band.
    pub fn debris_density(&mut self, min_alt_km: f64, max_alt_km: f64, positions: &[ObjectPosition]) -> DensityReport {
        let altitude_range = format!("{}-{} km", min_alt_km, max_alt_km);
        if !(min_alt_km.is_finite() && max_alt_km.is_finite() && min_alt_km < max_alt_km) {
            debug!(min_alt_km, max_alt_km, "invalid altitude band");
            return DensityReport {
                altitude_range,
                objects_per_km3: 0.0,
                total_objects: 0,
                size_distribution: SizeDistribution::default(),
                trend: Trend::Stable,
            };
        }

        let in_band: Vec<&ObjectPosition> = positions
            .iter()
            .filter(|p| !p.synthetic)
            .filter(|p| {
                let alt = p.position.altitude_km;
                // Propagated altitudes are clamped to the ceiling itself
                min_alt_km <= alt && (alt < max_alt_km || (max_alt_km >= MAX_ALTITUDE_KM && alt <= max_alt_km))
            })
            .collect();

        let mut size_distribution = SizeDistribution::default();
        for size in in_band.iter().filter_map(|p| p.size_estimate_m) {
            if size < 0.1 {
                size_distribution.small += 1;
            } else if size < 1.0 {
                size_distribution.medium += 1;
            } else {
                size_distribution.large += 1;
            }
        }

        let r_in = EARTH_RADIUS_KM + min_alt_km;
        let r_out = EARTH_RADIUS_KM + max_alt_km;
        let volume = 4.0 / 3.0 * PI * (r_out.powi(3) - r_in.powi(3));
        let density = finite_or(in_band.len() as f64 / volume, 0.0, "objects_per_km3");

        let key = (min_alt_km.to_bits(), max_alt_km.to_bits());
        let trend = match self.last_density.insert(key, density) {
            Some(previous) => trend_between(previous, density),
            None => Trend::Stable,
        };

        DensityReport {
            altitude_range,
            objects_per_km3: density,
            total_objects: in_band.len(),
            size_distribution,
            trend,
        }
    }

    /// Forecast over the next `hours_ahead` hours from screened events
    pub fn predict_future_risks(
        &self,
        conjunctions: &[ConjunctionEvent],
        hours_ahead: f64,
        now: DateTime<Utc>,
    ) -> RiskForecast {
        let hours = finite_or(hours_ahead, 24.0, "hours_ahead").max(0.0);
        let in_window: Vec<&ConjunctionEvent> = conjunctions
            .iter()
            .filter(|e| {
                let h = e.hours_until(now);
                (0.0..=hours).contains(&h)
            })
            .collect();

        let half = hours / 2.0;
        let early = in_window.iter().filter(|e| e.hours_until(now) < half).count();
        let late = in_window.len() - early;
        let risk_trend = match late.cmp(&early) {
            std::cmp::Ordering::Greater => Trend::Increasing,
            std::cmp::Ordering::Less => Trend::Decreasing,
            std::cmp::Ordering::Equal => Trend::Stable,
        };

        let confidence_level = if in_window.is_empty() {
            0.0
        } else {
            in_window
                .iter()
                .map(|e| self.model.predict(&PredictionInput::from_event(e)).confidence)
                .sum::<f64>()
                / in_window.len() as f64
        };

        let peak_risk_time = in_window
            .iter()
            .max_by(|a, b| {
                finite_or(a.collision_probability, 0.0, "collision_probability")
                    .total_cmp(&finite_or(b.collision_probability, 0.0, "collision_probability"))
            })
            .map(|e| e.tca);

        RiskForecast {
            prediction_window_hours: hours,
            predicted_conjunctions: in_window.len(),
            risk_trend,
            confidence_level,
            recommended_actions: RECOMMENDED_ACTIONS.iter().map(|s| s.to_string()).collect(),
            peak_risk_time,
        }
    }

    /// Score and rank raw events with this analyzer's model; ids are reassigned
    pub fn score(&self, mut events: Vec<ConjunctionEvent>) -> Vec<ConjunctionEvent> {
        for e in events.iter_mut() {
            e.collision_probability = self.model.predict(&PredictionInput::from_event(e)).probability;
            e.risk_tier = self.thresholds.classify(e.miss_distance_km);
        }
        rank_by_probability(&mut events);
        assign_ids(&mut events);
        events
    }
}

/// 1 − Π(1 − pᵢ) over events with TCA in `[now, now + window]`
fn combined_probability(events: &[ConjunctionEvent], now: DateTime<Utc>, window: Duration) -> f64 {
    let end = now + window;
    let miss_all: f64 = events
        .iter()
        .filter(|e| e.tca >= now && e.tca <= end)
        .map(|e| 1.0 - e.collision_probability)
        .product();
    (1.0 - miss_all).clamp(0.0, 1.0)
}

fn region_summaries(
    tracked: &[&ObjectPosition],
    events: &[ConjunctionEvent],
) -> BTreeMap<OrbitRegion, RegionSummary> {
    let mut regions: BTreeMap<OrbitRegion, RegionSummary> = OrbitRegion::ALL
        .iter()
        .map(|r| (*r, RegionSummary { objects: 0, risk: RiskLevel::Low }))
        .collect();

    for p in tracked {
        if let Some(summary) = regions.get_mut(&OrbitRegion::from_altitude(p.position.altitude_km)) {
            summary.objects += 1;
        }
    }

    for e in events {
        let level = match e.risk_tier {
            RiskTier::Alert => RiskLevel::High,
            RiskTier::Watch => RiskLevel::Medium,
            RiskTier::Safe => continue,
        };
        if let Some(summary) = regions.get_mut(&OrbitRegion::from_altitude(e.altitude_km)) {
            summary.risk = summary.risk.max(level);
        }
    }
    regions
}

fn trend_between(previous: f64, current: f64) -> Trend {
    if previous <= 0.0 {
        return if current > 0.0 { Trend::Increasing } else { Trend::Stable };
    }
    let change = (current - previous) / previous;
    if change > DENSITY_STABLE_BAND {
        Trend::Increasing
    } else if change < -DENSITY_STABLE_BAND {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}
