//! One engine pass over a loaded catalog

use crate::EngineConfig;
use chrono::{DateTime, Utc};
use collision_avoidance::planner::ManeuverStatistics;
use collision_avoidance::prediction::ConjunctionPrediction;
use collision_avoidance::risk::{DensityReport, RiskForecast};
use collision_avoidance::{
    ClosestApproachSearch, ConjunctionSource, HeuristicModel, PredictionModel, RiskAnalyzer, RiskReport, Spacecraft,
    Strategy, SyntheticConjunctions, Threat, TrajectoryPlanner,
};
use orbital_mechanics::{
    Catalog, FillerRequest, ObjectClass, ObjectPosition, GEO_FLOOR_KM, LEO_CEILING_KM, MAX_ALTITUDE_KM,
    MIN_ALTITUDE_KM,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Look-ahead of the risk forecast
pub const FORECAST_HOURS: f64 = 24.0;

/// Altitude bands reported for debris density (km)
pub const DENSITY_BANDS: [(f64, f64); 3] = [
    (MIN_ALTITUDE_KM, LEO_CEILING_KM),
    (LEO_CEILING_KM, GEO_FLOOR_KM),
    (GEO_FLOOR_KM, MAX_ALTITUDE_KM),
];

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub at: Option<DateTime<Utc>>,
    pub filler: Option<FillerRequest>,
    /// Use the seeded placeholder source instead of the closest-approach search
    pub synthetic_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchReport {
    pub generated_at: DateTime<Utc>,
    pub positions: Vec<ObjectPosition>,
    pub risk: RiskReport,
    pub predictions: Vec<ConjunctionPrediction>,
    pub forecast: RiskForecast,
    pub density: Vec<DensityReport>,
    pub strategies: Vec<Strategy>,
    pub maneuver_statistics: ManeuverStatistics,
}

/// Propagate, screen, analyze and plan for every threatened satellite
pub fn run(config: &EngineConfig, catalog: &Catalog, options: &RunOptions) -> WatchReport {
    let at = options.at.unwrap_or_else(Utc::now);
    let snapshot = catalog.snapshot();
    let propagator = catalog.propagator();
    let model: Arc<dyn PredictionModel> = Arc::new(HeuristicModel);

    let positions = catalog.positions_at(at, options.filler);

    let source: Box<dyn ConjunctionSource> = match options.synthetic_seed {
        Some(seed) => {
            info!(seed, "using synthetic conjunction source");
            Box::new(SyntheticConjunctions::new(seed, config.thresholds, Arc::clone(&model)))
        }
        None => Box::new(
            ClosestApproachSearch::new(config.screening, config.thresholds, Arc::clone(&model))
                .with_constants(config.constants),
        ),
    };
    let events = source.conjunctions(&snapshot, propagator.as_ref(), at);

    let mut analyzer = RiskAnalyzer::new(config.thresholds, Arc::clone(&model));
    let predictions = model.predict_batch(&events);
    let forecast = analyzer.predict_future_risks(&events, FORECAST_HOURS, at);
    let density = DENSITY_BANDS
        .iter()
        .map(|&(min, max)| analyzer.debris_density(min, max, &positions))
        .collect();
    let risk = analyzer.analyze(events, &positions, at);

    let mut planner = TrajectoryPlanner::new(config.planner, config.constants);
    let mut strategies = Vec::new();
    for object in snapshot.objects().iter().filter(|o| o.class() == ObjectClass::Satellite) {
        let threats: Vec<Threat> = risk
            .critical_conjunctions
            .iter()
            .filter(|e| e.primary_object == object.id || e.secondary_object == object.id)
            .map(|e| Threat::from_event(e, at))
            .collect();
        if threats.is_empty() {
            continue;
        }

        match Spacecraft::locate(object.id, &positions, &snapshot) {
            Ok(craft) => strategies.push(planner.plan_multi_threat_at(&craft, &threats, at)),
            Err(e) => warn!(id = object.id, error = %e, "no position for threatened satellite"),
        }
    }

    WatchReport {
        generated_at: at,
        positions,
        risk,
        predictions,
        forecast,
        density,
        strategies,
        maneuver_statistics: planner.statistics(),
    }
}
