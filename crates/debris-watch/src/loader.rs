//! Catalog loading from JSON files
//!
//! Accepts either a flat array of records carrying `object_type`, or an
//! object with `debris` and/or `satellites` arrays where the class comes
//! from the key.

use crate::{Result, WatchError};
use orbital_mechanics::{ObjectClass, ObjectProfile, RiskLevel, TleHeader, TrackedObject};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_MISSION: &str = "unknown";

/// Sanitize a tag (alphanumeric, dash, underscore only)
fn sanitize_tag(tag: String) -> String {
    tag.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect()
}

/// Sanitize name (allow more chars but still limit)
fn sanitize_name(name: String) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || " -_.,()/&'".contains(*c))
        .take(256)
        .collect()
}

/// Raw tracked object from JSON
#[derive(Debug, Deserialize)]
struct RawObject {
    norad_id: Option<u32>,
    name: Option<String>,
    line1: Option<String>,
    line2: Option<String>,
    object_type: Option<String>,
    #[serde(alias = "size_estimate")]
    size_estimate_m: Option<f64>,
    risk_level: Option<String>,
    mission_type: Option<String>,
    mass_kg: Option<f64>,
}

/// Container for the split catalog layout
#[derive(Debug, Deserialize)]
struct SplitCatalog {
    debris: Option<Vec<RawObject>>,
    satellites: Option<Vec<RawObject>>,
}

fn parse_class(value: &str) -> Option<ObjectClass> {
    match value.trim().to_ascii_lowercase().as_str() {
        "debris" => Some(ObjectClass::Debris),
        "satellite" | "payload" => Some(ObjectClass::Satellite),
        _ => None,
    }
}

fn parse_risk(value: Option<&str>) -> RiskLevel {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if v == "high" => RiskLevel::High,
        Some(v) if v == "medium" => RiskLevel::Medium,
        Some(v) if v == "low" => RiskLevel::Low,
        other => {
            debug!(risk_level = ?other, "unrecognized risk level, using low");
            RiskLevel::Low
        }
    }
}

fn convert(raw: RawObject, implied: Option<ObjectClass>) -> Option<TrackedObject> {
    let class = match implied {
        Some(class) => class,
        None => parse_class(raw.object_type.as_deref()?)?,
    };
    let line1 = raw.line1?;
    let line2 = raw.line2?;
    let id = raw.norad_id.or_else(|| TleHeader::from_line1(&line1).norad_id)?;
    let name = sanitize_name(raw.name.unwrap_or_else(|| format!("OBJECT {}", id)));

    let profile = match class {
        ObjectClass::Debris => ObjectProfile::Debris {
            risk_level: parse_risk(raw.risk_level.as_deref()),
        },
        ObjectClass::Satellite => ObjectProfile::Satellite {
            mission_type: sanitize_tag(raw.mission_type.unwrap_or_else(|| DEFAULT_MISSION.to_string())),
            mass_kg: raw.mass_kg.filter(|m| m.is_finite() && *m > 0.0),
        },
    };

    Some(TrackedObject::from_tle(id, name, &line1, &line2, raw.size_estimate_m, profile))
}

fn convert_all(raws: Vec<RawObject>, implied: Option<ObjectClass>, objects: &mut Vec<TrackedObject>) -> usize {
    let mut skipped = 0;
    for raw in raws {
        match convert(raw, implied) {
            Some(object) => objects.push(object),
            None => skipped += 1,
        }
    }
    skipped
}

/// Load tracked objects from a catalog JSON file.
///
/// Records missing element lines, a resolvable catalog id or a known class
/// are skipped; malformed element values are left to the parser's defaults.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<TrackedObject>> {
    let path = path.as_ref();
    info!("Loading catalog from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let raw: serde_json::Value = serde_json::from_reader(reader)?;

    let mut objects = Vec::new();
    let skipped = if raw.is_array() {
        let records: Vec<RawObject> = serde_json::from_value(raw)?;
        convert_all(records, None, &mut objects)
    } else {
        let split: SplitCatalog = serde_json::from_value(raw)?;
        if split.debris.is_none() && split.satellites.is_none() {
            return Err(WatchError::NoObjectList);
        }
        convert_all(split.debris.unwrap_or_default(), Some(ObjectClass::Debris), &mut objects)
            + convert_all(split.satellites.unwrap_or_default(), Some(ObjectClass::Satellite), &mut objects)
    };

    info!(
        "Loaded {} tracked objects ({} skipped for missing fields)",
        objects.len(),
        skipped
    );

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ISS_LINE1: &str = "1 25544U 98067A   23320.83333333  .00002182  00000-0  40768-4 0  9992";
    const ISS_LINE2: &str = "2 25544  51.6461 339.7939 0001258  92.8340 267.3124 15.49309239123456";

    fn write(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_flat_array() {
        let json = format!(
            r#"[
                {{"norad_id": 25544, "name": "ISS (ZARYA)", "line1": "{l1}", "line2": "{l2}",
                  "object_type": "satellite", "mission_type": "crewed_station", "mass_kg": 420000}},
                {{"name": "NO LINES", "object_type": "debris"}},
                {{"norad_id": 1, "line1": "{l1}", "line2": "{l2}", "object_type": "comet"}}
            ]"#,
            l1 = ISS_LINE1,
            l2 = ISS_LINE2
        );
        let file = write(&json);

        let objects = load_catalog(file.path()).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id, 25544);
        assert_eq!(objects[0].mission_type(), Some("crewed_station"));
        assert_eq!(objects[0].mass_kg(), Some(420_000.0));
        assert!((objects[0].elements.mean_motion_rev_day() - 15.49309239).abs() < 1e-9);
    }

    #[test]
    fn test_load_split_layout() {
        let json = format!(
            r#"{{
                "debris": [
                    {{"name": "DEB <script>", "line1": "{l1}", "line2": "{l2}",
                      "size_estimate": 0.15, "risk_level": "HIGH"}}
                ],
                "satellites": [
                    {{"norad_id": 44713, "name": "STARLINK-1007", "line1": "{l1}", "line2": "{l2}"}}
                ]
            }}"#,
            l1 = ISS_LINE1,
            l2 = ISS_LINE2
        );
        let file = write(&json);

        let objects = load_catalog(file.path()).unwrap();
        assert_eq!(objects.len(), 2);

        let deb = &objects[0];
        assert_eq!(deb.id, 25544); // from line 1
        assert_eq!(deb.name, "DEB script");
        assert_eq!(deb.class(), ObjectClass::Debris);
        assert_eq!(deb.risk_level(), Some(RiskLevel::High));
        assert_eq!(deb.size_estimate_m, Some(0.15));

        assert_eq!(objects[1].class(), ObjectClass::Satellite);
        assert_eq!(objects[1].mission_type(), Some("unknown"));
    }

    #[test]
    fn test_malformed_elements_use_defaults() {
        let json = r#"[{"norad_id": 7, "line1": "garbage", "line2": "garbage", "object_type": "debris"}]"#;
        let file = write(json);

        let objects = load_catalog(file.path()).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].elements, orbital_mechanics::OrbitalElements::default());
        assert_eq!(objects[0].risk_level(), Some(RiskLevel::Low));
    }

    #[test]
    fn test_load_sample_catalog() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/sample_catalog.json");
        let objects = load_catalog(path).unwrap();

        assert_eq!(objects.len(), 4);
        let debris = objects.iter().filter(|o| o.class() == ObjectClass::Debris).count();
        assert_eq!(debris, 2);
        assert!(objects.iter().any(|o| o.id == 44713 && o.mass_kg() == Some(260.0)));
    }

    #[test]
    fn test_unrecognized_layout() {
        let file = write(r#"{"objects": []}"#);
        assert!(matches!(load_catalog(file.path()), Err(WatchError::NoObjectList)));
    }

    #[test]
    fn test_sanitizers() {
        assert_eq!(sanitize_tag("crewed station;drop".to_string()), "crewedstationdrop");
        assert_eq!(sanitize_name("x".repeat(300)).len(), 256);
        assert_eq!(sanitize_name("ISS (ZARYA)".to_string()), "ISS (ZARYA)");
    }
}
