//! Fixed-width TLE decoding
//!
//! Column layout (0-based, end exclusive) of the NORAD two-line format:
//!
//! | Line | Columns | Field                                   |
//! |------|---------|-----------------------------------------|
//! | 1    | 2..7    | Catalog number                          |
//! | 1    | 18..20  | Epoch year (two digits, 57-99 = 19xx)   |
//! | 1    | 20..32  | Epoch day of year (fractional)          |
//! | 2    | 8..16   | Inclination (deg)                       |
//! | 2    | 17..25  | Right ascension of ascending node (deg) |
//! | 2    | 26..33  | Eccentricity (implied leading "0.")     |
//! | 2    | 34..42  | Argument of perigee (deg)               |
//! | 2    | 43..51  | Mean anomaly (deg)                      |
//! | 2    | 52..63  | Mean motion (rev/day)                   |
//!
//! Decoding never fails. An unparsable or non-finite line-2 field replaces the
//! whole element set with [`OrbitalElements::default`]; finite out-of-range
//! values are clamped or wrapped into their valid range.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

/// Default element set: ISS-like, 51.6° inclination at 15.5 rev/day
pub const DEFAULT_INCLINATION_DEG: f64 = 51.6;
pub const DEFAULT_ECCENTRICITY: f64 = 0.001;
pub const DEFAULT_MEAN_MOTION_REV_DAY: f64 = 15.5;

pub const MAX_ECCENTRICITY: f64 = 0.99;
pub const MIN_MEAN_MOTION_REV_DAY: f64 = 0.1;
pub const MAX_MEAN_MOTION_REV_DAY: f64 = 20.0;

/// Validated orbital elements.
///
/// Only constructible through [`OrbitalElements::new`] or the TLE decoder, so
/// every instance holds finite, in-range values.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct OrbitalElements {
    inclination_deg: f64,
    raan_deg: f64,
    eccentricity: f64,
    arg_perigee_deg: f64,
    mean_anomaly_deg: f64,
    mean_motion_rev_day: f64,
}

impl Default for OrbitalElements {
    fn default() -> Self {
        Self {
            inclination_deg: DEFAULT_INCLINATION_DEG,
            raan_deg: 0.0,
            eccentricity: DEFAULT_ECCENTRICITY,
            arg_perigee_deg: 0.0,
            mean_anomaly_deg: 0.0,
            mean_motion_rev_day: DEFAULT_MEAN_MOTION_REV_DAY,
        }
    }
}

impl OrbitalElements {
    /// Build a validated element set.
    ///
    /// Any non-finite argument yields the default set. Finite values are
    /// clamped (inclination, eccentricity, mean motion) or wrapped into
    /// [0, 360) (angles).
    pub fn new(
        inclination_deg: f64,
        raan_deg: f64,
        eccentricity: f64,
        arg_perigee_deg: f64,
        mean_anomaly_deg: f64,
        mean_motion_rev_day: f64,
    ) -> Self {
        let all = [
            inclination_deg,
            raan_deg,
            eccentricity,
            arg_perigee_deg,
            mean_anomaly_deg,
            mean_motion_rev_day,
        ];
        if !all.iter().all(|v| v.is_finite()) {
            debug!(?all, "non-finite orbital elements, using default set");
            return Self::default();
        }

        Self {
            inclination_deg: inclination_deg.clamp(0.0, 180.0),
            raan_deg: wrap_degrees(raan_deg),
            eccentricity: eccentricity.clamp(0.0, MAX_ECCENTRICITY),
            arg_perigee_deg: wrap_degrees(arg_perigee_deg),
            mean_anomaly_deg: wrap_degrees(mean_anomaly_deg),
            mean_motion_rev_day: mean_motion_rev_day
                .clamp(MIN_MEAN_MOTION_REV_DAY, MAX_MEAN_MOTION_REV_DAY),
        }
    }

    /// Decode line 2 of a TLE, falling back to the default set.
    pub fn from_line2(line2: &str) -> Self {
        match Self::try_from_line2(line2) {
            Some(elements) => elements,
            None => {
                debug!(line2, "malformed TLE line 2, using default element set");
                Self::default()
            }
        }
    }

    fn try_from_line2(line2: &str) -> Option<Self> {
        let inclination = parse_field(line2, 8, 16)?;
        let raan = parse_field(line2, 17, 25)?;
        let eccentricity = parse_implied_decimal(line2, 26, 33)?;
        let arg_perigee = parse_field(line2, 34, 42)?;
        let mean_anomaly = parse_field(line2, 43, 51)?;
        let mean_motion = parse_field(line2, 52, 63)?;

        Some(Self::new(
            inclination,
            raan,
            eccentricity,
            arg_perigee,
            mean_anomaly,
            mean_motion,
        ))
    }

    pub fn inclination_deg(&self) -> f64 {
        self.inclination_deg
    }

    pub fn raan_deg(&self) -> f64 {
        self.raan_deg
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn arg_perigee_deg(&self) -> f64 {
        self.arg_perigee_deg
    }

    pub fn mean_anomaly_deg(&self) -> f64 {
        self.mean_anomaly_deg
    }

    pub fn mean_motion_rev_day(&self) -> f64 {
        self.mean_motion_rev_day
    }
}

/// Identification fields from TLE line 1
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct TleHeader {
    pub norad_id: Option<u32>,
    pub epoch: Option<DateTime<Utc>>,
}

impl TleHeader {
    pub fn from_line1(line1: &str) -> Self {
        let norad_id = field(line1, 2, 7).and_then(|s| s.parse::<u32>().ok());
        let epoch = parse_epoch(line1);
        if norad_id.is_none() || epoch.is_none() {
            debug!(line1, ?norad_id, ?epoch, "incomplete TLE line 1");
        }
        Self { norad_id, epoch }
    }
}

/// A decoded two-line element record
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TleRecord {
    pub header: TleHeader,
    pub elements: OrbitalElements,
}

/// Decode a TLE line pair. Never fails; see the module docs for fallbacks.
pub fn parse_tle(line1: &str, line2: &str) -> TleRecord {
    for (n, line) in [(1, line1), (2, line2)] {
        if !checksum_valid(line) {
            debug!(line_number = n, line, "TLE checksum mismatch");
        }
    }

    TleRecord {
        header: TleHeader::from_line1(line1),
        elements: OrbitalElements::from_line2(line2),
    }
}

/// Modulo-10 checksum over the first 68 columns: digits count their value,
/// '-' counts 1, everything else 0. Column 69 holds the expected digit.
pub fn checksum_valid(line: &str) -> bool {
    let bytes = line.as_bytes();
    if bytes.len() < 69 {
        return false;
    }

    let sum: u32 = bytes[..68]
        .iter()
        .map(|&b| match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'-' => 1,
            _ => 0,
        })
        .sum();

    match bytes[68] {
        d @ b'0'..=b'9' => u32::from(d - b'0') == sum % 10,
        _ => false,
    }
}

/// Wrap an angle into [0, 360)
fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

fn field(line: &str, start: usize, end: usize) -> Option<&str> {
    line.get(start..end).map(str::trim)
}

fn parse_field(line: &str, start: usize, end: usize) -> Option<f64> {
    field(line, start, end)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_implied_decimal(line: &str, start: usize, end: usize) -> Option<f64> {
    let digits = field(line, start, end)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    format!("0.{}", digits).parse::<f64>().ok()
}

fn parse_epoch(line1: &str) -> Option<DateTime<Utc>> {
    let yy: i32 = field(line1, 18, 20)?.parse().ok()?;
    let day: f64 = parse_field(line1, 20, 32)?;
    if !(1.0..367.0).contains(&day) {
        return None;
    }

    let year = if yy < 57 { 2000 + yy } else { 1900 + yy };
    let start = NaiveDate::from_yo_opt(year, 1)?.and_hms_opt(0, 0, 0)?;
    let offset = Duration::milliseconds(((day - 1.0) * MILLIS_PER_DAY).round() as i64);

    Some(DateTime::<Utc>::from_naive_utc_and_offset(start + offset, Utc))
}

const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const ISS_LINE1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_LINE2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    #[test]
    fn test_parse_iss_elements() {
        let record = parse_tle(ISS_LINE1, ISS_LINE2);
        let e = record.elements;

        assert!((e.inclination_deg() - 51.6416).abs() < 1e-9);
        assert!((e.raan_deg() - 247.4627).abs() < 1e-9);
        assert!((e.eccentricity() - 0.0006703).abs() < 1e-12);
        assert!((e.arg_perigee_deg() - 130.5360).abs() < 1e-9);
        assert!((e.mean_anomaly_deg() - 325.0288).abs() < 1e-9);
        assert!((e.mean_motion_rev_day() - 15.72125391).abs() < 1e-9);
    }

    #[test]
    fn test_parse_iss_header() {
        let header = TleHeader::from_line1(ISS_LINE1);
        assert_eq!(header.norad_id, Some(25544));

        let epoch = header.epoch.expect("epoch should decode");
        assert_eq!(epoch.year(), 2008);
        assert_eq!(epoch.ordinal(), 264);
        // .51782528 of a day is 12:25:40.1
        assert_eq!(epoch.hour(), 12);
        assert_eq!(epoch.minute(), 25);
    }

    #[test]
    fn test_checksum() {
        assert!(checksum_valid(ISS_LINE1));
        assert!(checksum_valid(ISS_LINE2));

        let mut corrupted = ISS_LINE2.to_string();
        corrupted.replace_range(68..69, "0");
        assert!(!checksum_valid(&corrupted));
        assert!(!checksum_valid("2 25544"));
    }

    #[test]
    fn test_bad_checksum_still_parses() {
        // Demo catalogs carry wrong checksums; elements must still decode
        let line2 = "2 34454  74.0458 280.8821 0009999 123.4567 236.5432 14.12345678123456";
        let e = OrbitalElements::from_line2(line2);
        assert!((e.inclination_deg() - 74.0458).abs() < 1e-9);
        assert!((e.mean_motion_rev_day() - 14.12345678).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_lines_yield_defaults() {
        let cases = [
            "",
            "garbage",
            "2 25544  51.6416 247.4627 0006703 130.5360 325.0288",
            "2 25544  abcdefg 247.4627 0006703 130.5360 325.0288 15.72125391563537",
            "2 25544  51.6416 247.4627 00-6703 130.5360 325.0288 15.72125391563537",
            "2 25544      NaN 247.4627 0006703 130.5360 325.0288 15.72125391563537",
            "2 25544      inf 247.4627 0006703 130.5360 325.0288 15.72125391563537",
            "2 25544  51.6416 247.4627 0006703 130.5360 325.0288     ñññññ563537",
        ];
        for line in cases {
            assert_eq!(
                OrbitalElements::from_line2(line),
                OrbitalElements::default(),
                "line {:?}",
                line
            );
        }
    }

    #[test]
    fn test_default_element_set() {
        let e = OrbitalElements::default();
        assert_eq!(e.inclination_deg(), 51.6);
        assert_eq!(e.mean_motion_rev_day(), 15.5);
        assert_eq!(e.eccentricity(), 0.001);
        assert_eq!(e.raan_deg(), 0.0);
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let e = OrbitalElements::new(200.0, -30.0, 1.5, 725.0, 360.0, 42.0);
        assert_eq!(e.inclination_deg(), 180.0);
        assert!((e.raan_deg() - 330.0).abs() < 1e-9);
        assert_eq!(e.eccentricity(), MAX_ECCENTRICITY);
        assert!((e.arg_perigee_deg() - 5.0).abs() < 1e-9);
        assert_eq!(e.mean_anomaly_deg(), 0.0);
        assert_eq!(e.mean_motion_rev_day(), MAX_MEAN_MOTION_REV_DAY);

        let slow = OrbitalElements::new(10.0, 0.0, 0.0, 0.0, 0.0, -3.0);
        assert_eq!(slow.mean_motion_rev_day(), MIN_MEAN_MOTION_REV_DAY);
    }

    #[test]
    fn test_tiny_negative_angle_wraps_below_360() {
        let e = OrbitalElements::new(10.0, -1e-20, 0.0, 0.0, 0.0, 15.0);
        assert!(e.raan_deg() < 360.0);
    }

    #[test]
    fn test_non_finite_constructor_yields_defaults() {
        let e = OrbitalElements::new(f64::NAN, 0.0, 0.0, 0.0, 0.0, 15.0);
        assert_eq!(e, OrbitalElements::default());
    }

    #[test]
    fn test_malformed_header_has_no_fields() {
        let header = TleHeader::from_line1("1 ABCDE");
        assert_eq!(header.norad_id, None);
        assert_eq!(header.epoch, None);
    }
}
