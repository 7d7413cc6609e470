//! Tracked object catalog
//!
//! Holds the current snapshot of debris and active payloads. A refresh swaps
//! the whole snapshot behind an `Arc`; batch queries that already hold the
//! previous `Arc` keep a consistent view until they finish.
//!
//! Synthetic filler objects (density visualization only) are generated per
//! query from a caller-supplied seed and are always tagged `synthetic`.

use crate::propagation::{Position, Propagator, SimplifiedPropagator};
use crate::tle::{parse_tle, OrbitalElements};
use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// First id handed to synthetic filler objects
pub const FILLER_ID_BASE: u32 = 90_000;
/// Upper bound on filler objects per query
pub const MAX_FILLER: usize = 10_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObjectClass {
    Debris,
    Satellite,
}

/// Static risk tier assigned to debris at catalog load
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];
}

/// Class-specific static attributes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "object_type", rename_all = "snake_case")]
pub enum ObjectProfile {
    Debris {
        risk_level: RiskLevel,
    },
    Satellite {
        mission_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mass_kg: Option<f64>,
    },
}

/// A catalog entry. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedObject {
    pub id: u32,
    pub name: String,
    pub elements: OrbitalElements,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<DateTime<Utc>>,
    /// Characteristic size in metres
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_estimate_m: Option<f64>,
    #[serde(flatten)]
    pub profile: ObjectProfile,
}

impl TrackedObject {
    /// Decode a TLE pair into a catalog entry
    pub fn from_tle(
        id: u32,
        name: impl Into<String>,
        line1: &str,
        line2: &str,
        size_estimate_m: Option<f64>,
        profile: ObjectProfile,
    ) -> Self {
        let record = parse_tle(line1, line2);
        if let Some(norad_id) = record.header.norad_id {
            if norad_id != id {
                debug!(id, norad_id, "catalog id differs from TLE catalog number");
            }
        }

        Self {
            id,
            name: name.into(),
            elements: record.elements,
            epoch: record.header.epoch,
            size_estimate_m: size_estimate_m.filter(|s| s.is_finite() && *s >= 0.0),
            profile,
        }
    }

    pub fn class(&self) -> ObjectClass {
        match self.profile {
            ObjectProfile::Debris { .. } => ObjectClass::Debris,
            ObjectProfile::Satellite { .. } => ObjectClass::Satellite,
        }
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        match self.profile {
            ObjectProfile::Debris { risk_level } => Some(risk_level),
            ObjectProfile::Satellite { .. } => None,
        }
    }

    pub fn mission_type(&self) -> Option<&str> {
        match &self.profile {
            ObjectProfile::Satellite { mission_type, .. } => Some(mission_type),
            ObjectProfile::Debris { .. } => None,
        }
    }

    pub fn mass_kg(&self) -> Option<f64> {
        match self.profile {
            ObjectProfile::Satellite { mass_kg, .. } => mass_kg,
            ObjectProfile::Debris { .. } => None,
        }
    }
}

/// Position record handed to presentation; flattened for JSON
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ObjectPosition {
    pub id: u32,
    pub name: String,
    pub object_type: ObjectClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_estimate_m: Option<f64>,
    pub synthetic: bool,
    #[serde(flatten)]
    pub position: Position,
}

impl ObjectPosition {
    fn tracked(object: &TrackedObject, position: Position) -> Self {
        Self {
            id: object.id,
            name: object.name.clone(),
            object_type: object.class(),
            risk_level: object.risk_level(),
            mission_type: object.mission_type().map(str::to_string),
            size_estimate_m: object.size_estimate_m,
            synthetic: false,
            position,
        }
    }
}

/// Synthetic filler requested alongside a position query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillerRequest {
    pub count: usize,
    pub seed: u64,
}

/// Immutable catalog contents at one load
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    objects: Vec<TrackedObject>,
    loaded_at: Option<DateTime<Utc>>,
}

impl CatalogSnapshot {
    pub fn objects(&self) -> &[TrackedObject] {
        &self.objects
    }

    pub fn get(&self, id: u32) -> Option<&TrackedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}

/// Single-writer / many-reader catalog store
pub struct Catalog {
    snapshot: RwLock<Arc<CatalogSnapshot>>,
    propagator: Arc<dyn Propagator>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(Arc::new(SimplifiedPropagator::default()))
    }
}

impl Catalog {
    pub fn new(propagator: Arc<dyn Propagator>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(CatalogSnapshot::default())),
            propagator,
        }
    }

    /// Replace the snapshot atomically
    pub fn load(&self, objects: Vec<TrackedObject>) {
        let debris = objects.iter().filter(|o| o.class() == ObjectClass::Debris).count();
        let next = Arc::new(CatalogSnapshot {
            loaded_at: Some(Utc::now()),
            objects,
        });
        info!(
            objects = next.len(),
            debris,
            satellites = next.len() - debris,
            "catalog snapshot loaded"
        );

        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// The current snapshot; stays valid across later loads
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn propagator(&self) -> Arc<dyn Propagator> {
        Arc::clone(&self.propagator)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// One position per tracked object plus any requested synthetic filler
    pub fn positions_at(&self, at: DateTime<Utc>, filler: Option<FillerRequest>) -> Vec<ObjectPosition> {
        let snapshot = self.snapshot();
        let mut positions = propagate_all(&snapshot, self.propagator.as_ref(), at);

        if let Some(request) = filler {
            positions.extend(synthetic_filler(request, at));
        }
        positions
    }
}

/// Propagate every object in parallel. Objects whose propagation fails are
/// logged and skipped; the batch always completes.
pub fn propagate_all(
    snapshot: &CatalogSnapshot,
    propagator: &dyn Propagator,
    at: DateTime<Utc>,
) -> Vec<ObjectPosition> {
    snapshot
        .objects()
        .par_iter()
        .filter_map(|object| match propagator.propagate(&object.elements, at) {
            Ok(p) if p.is_finite() => Some(ObjectPosition::tracked(object, p)),
            Ok(p) => {
                debug!(id = object.id, "non-finite position sanitized");
                let p = Position::sanitized(p.latitude, p.longitude, p.altitude_km, p.speed_km_s, at);
                Some(ObjectPosition::tracked(object, p))
            }
            Err(e) => {
                warn!(id = object.id, name = %object.name, error = %e, "skipping object");
                None
            }
        })
        .collect()
}

/// Randomized debris for density visualization, never scored for risk
pub fn synthetic_filler(request: FillerRequest, at: DateTime<Utc>) -> Vec<ObjectPosition> {
    let mut rng = Pcg64Mcg::seed_from_u64(request.seed);
    let count = request.count.min(MAX_FILLER);

    (0..count)
        .map(|i| {
            let position = Position::sanitized(
                rng.gen_range(-60.0..60.0),
                rng.gen_range(-180.0..180.0),
                rng.gen_range(200.0..2000.0),
                rng.gen_range(7.0..8.0),
                at,
            );
            ObjectPosition {
                id: FILLER_ID_BASE + i as u32,
                name: format!("DEBRIS-{:03}", i + 1),
                object_type: ObjectClass::Debris,
                risk_level: Some(RiskLevel::ALL[rng.gen_range(0..RiskLevel::ALL.len())]),
                mission_type: None,
                size_estimate_m: Some(rng.gen_range(0.01..0.5)),
                synthetic: true,
                position,
            }
        })
        .collect()
}
