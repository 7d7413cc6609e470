//! Debris Watch
//!
//! Loads a tracked-object catalog from JSON, runs the orbital risk engine
//! over it and assembles one serializable report:
//!
//! ```text
//! catalog.json ─► loader ─► Catalog ─► positions ─┐
//!                                  └─► ConjunctionSource ─► RiskAnalyzer ─► WatchReport
//!                                                        └─► TrajectoryPlanner ─┘
//! ```
//!
//! Engine parameters come from an optional JSON config file; keys that are
//! absent keep their defaults.

use chrono::{DateTime, Utc};
use collision_avoidance::{PlannerConfig, RiskThresholds, ScreeningConfig};
use orbital_mechanics::PhysicalConstants;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub mod loader;
pub mod pipeline;

pub use pipeline::{run, RunOptions, WatchReport};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Catalog file has no object list")]
    NoObjectList,
    #[error("Invalid timestamp {0:?}: expected RFC 3339")]
    InvalidTimestamp(String),
}

pub type Result<T> = std::result::Result<T, WatchError>;

/// All injectable engine parameters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub constants: PhysicalConstants,
    pub thresholds: RiskThresholds,
    pub screening: ScreeningConfig,
    pub planner: PlannerConfig,
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading engine config from {:?}", path);

        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| WatchError::InvalidTimestamp(value.to_string()))
}
