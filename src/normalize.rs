//! Fallback-chain normalization of raw feed records.
//!
//! The upstream API is not contractually stable: records have appeared with
//! English, Turkish, and abbreviated field names, numbers encoded as
//! strings, and coordinates either flat or nested in a GeoJSON fragment.
//! Every extractor here walks an ordered chain of candidate fields and
//! degrades to a documented default, so normalization is total — a record
//! can be arbitrarily malformed and still yields exactly one [`Quake`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::models::Quake;

/// Magnitude candidates, first usable wins.
const MAGNITUDE_KEYS: [&str; 4] = ["mag", "magValue", "magnitude", "mw"];

/// Place candidates, first non-empty wins.
const PLACE_KEYS: [&str; 6] = ["title", "lokasyon", "location", "region", "place", "il"];

/// Timestamp candidates, first parseable wins.
const TIME_KEYS: [&str; 6] = ["date", "tarih", "time", "timestamp", "date_time", "datetime"];

/// Identity candidates for change detection.
const IDENTITY_KEYS: [&str; 4] = ["id", "uid", "hash", "timestamp"];

/// Placeholder for records that carry no recognizable location text.
pub const PLACE_UNKNOWN: &str = "—";

/// Fingerprint length for records with no identity field at all.
const FINGERPRINT_CHARS: usize = 40;

/// Normalize one raw record into a [`Quake`].
///
/// Never fails: every missing or malformed field degrades to its default
/// (magnitude 0.0, place "—", coordinates (0, 0), time = `poll_time`).
#[must_use]
pub fn normalize(raw: &Value, poll_time: DateTime<Utc>) -> Quake {
    let lat = number_chain(raw, &["lat", "latitude"]).or_else(|| nested_coordinate(raw, 1));
    let lon = number_chain(raw, &["lon", "longitude"]).or_else(|| nested_coordinate(raw, 0));

    Quake {
        id: identity(raw),
        magnitude: number_chain(raw, &MAGNITUDE_KEYS).unwrap_or(0.0),
        place: string_chain(raw, &PLACE_KEYS)
            .unwrap_or(PLACE_UNKNOWN)
            .to_string(),
        occurred_at: occurred_at(raw).unwrap_or(poll_time),
        latitude: lat.unwrap_or(0.0),
        longitude: lon.unwrap_or(0.0),
        located: lat.is_some() && lon.is_some(),
    }
}

/// Normalize a whole poll response, preserving upstream (newest-first) order.
#[must_use]
pub fn normalize_all(records: &[Value], poll_time: DateTime<Utc>) -> Vec<Quake> {
    records.iter().map(|r| normalize(r, poll_time)).collect()
}

/// Resolve the record's identity for change detection.
///
/// Falls back to a truncated fingerprint of the serialized record when no
/// identity-ish field is present, so two polls of the same record still
/// compare equal.
#[must_use]
pub fn identity(raw: &Value) -> String {
    for key in IDENTITY_KEYS {
        match raw.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }

    raw.to_string().chars().take(FINGERPRINT_CHARS).collect()
}

/// First field in `keys` holding a finite number (JSON number or numeric
/// string). NaN and unparseable strings fall through to the next candidate.
fn number_chain(raw: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| as_number(raw.get(key)?))
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// First field in `keys` holding a non-empty string.
fn string_chain<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| match raw.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    })
}

/// Coordinate from a nested GeoJSON fragment: `geojson.coordinates` is
/// `[lon, lat]`, so callers pass index 0 for longitude, 1 for latitude.
fn nested_coordinate(raw: &Value, index: usize) -> Option<f64> {
    as_number(raw.get("geojson")?.get("coordinates")?.get(index)?)
}

/// Resolve the event time from the first parseable candidate field.
fn occurred_at(raw: &Value) -> Option<DateTime<Utc>> {
    for key in TIME_KEYS {
        let Some(value) = raw.get(key) else { continue };

        // A purely numeric `timestamp` is epoch seconds.
        if key == "timestamp" {
            if let Some(secs) = as_epoch_seconds(value) {
                if let Some(dt) = DateTime::from_timestamp(secs, 0) {
                    return Some(dt);
                }
            }
        }

        if let Value::String(s) = value {
            if let Some(dt) = parse_datetime(s) {
                return Some(dt);
            }
        }
    }
    None
}

fn as_epoch_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

/// Parse a datetime string in the shapes the feed has been seen to use.
/// Naive timestamps are taken as UTC.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y.%m.%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn poll_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_empty_record_yields_defaults() {
        let quake = normalize(&json!({}), poll_time());
        assert!((quake.magnitude - 0.0).abs() < f64::EPSILON);
        assert_eq!(quake.place, PLACE_UNKNOWN);
        assert!((quake.latitude - 0.0).abs() < f64::EPSILON);
        assert!((quake.longitude - 0.0).abs() < f64::EPSILON);
        assert_eq!(quake.occurred_at, poll_time());
        assert!(!quake.located);
    }

    #[test]
    fn test_magnitude_priority_order() {
        // First present candidate wins regardless of later values.
        let quake = normalize(&json!({"mag": 4.2, "magnitude": 9.9}), poll_time());
        assert!((quake.magnitude - 4.2).abs() < 1e-9);

        let quake = normalize(&json!({"magValue": "5.1", "mw": 2.0}), poll_time());
        assert!((quake.magnitude - 5.1).abs() < 1e-9);
    }

    #[test]
    fn test_magnitude_bad_entry_falls_through() {
        let quake = normalize(&json!({"mag": "n/a", "mw": 3.3}), poll_time());
        assert!((quake.magnitude - 3.3).abs() < 1e-9);
    }

    #[test]
    fn test_place_priority_order() {
        let quake = normalize(
            &json!({"lokasyon": "Ege Denizi", "place": "elsewhere"}),
            poll_time(),
        );
        assert_eq!(quake.place, "Ege Denizi");

        // Empty strings do not count as present.
        let quake = normalize(&json!({"title": "", "region": "Aegean Sea"}), poll_time());
        assert_eq!(quake.place, "Aegean Sea");
    }

    #[test]
    fn test_alternate_field_names_normalize_identically() {
        let a = normalize(
            &json!({"latitude": 38.5, "longitude": 27.1, "magnitude": 3.9}),
            poll_time(),
        );
        let b = normalize(&json!({"lat": 38.5, "lon": 27.1, "mag": 3.9}), poll_time());

        assert!((a.latitude - b.latitude).abs() < 1e-9);
        assert!((a.longitude - b.longitude).abs() < 1e-9);
        assert!((a.magnitude - b.magnitude).abs() < 1e-9);
    }

    #[test]
    fn test_nested_geojson_coordinates() {
        // GeoJSON order is [lon, lat].
        let quake = normalize(
            &json!({"geojson": {"coordinates": [27.1, 38.5]}}),
            poll_time(),
        );
        assert!((quake.latitude - 38.5).abs() < 1e-9);
        assert!((quake.longitude - 27.1).abs() < 1e-9);
        assert!(quake.located);
    }

    #[test]
    fn test_flat_coordinates_beat_nested() {
        let quake = normalize(
            &json!({"lat": 40.0, "lon": 29.0, "geojson": {"coordinates": [27.1, 38.5]}}),
            poll_time(),
        );
        assert!((quake.latitude - 40.0).abs() < 1e-9);
        assert!((quake.longitude - 29.0).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_string_coordinates() {
        let quake = normalize(&json!({"lat": "38.5", "lon": "27.1"}), poll_time());
        assert!((quake.latitude - 38.5).abs() < 1e-9);
        assert!(quake.located);
    }

    #[test]
    fn test_zero_is_a_valid_coordinate() {
        // 0 came from the record, so the event counts as located.
        let quake = normalize(&json!({"lat": 0.0, "lon": 27.1}), poll_time());
        assert!(quake.located);
    }

    #[test]
    fn test_time_from_date_string() {
        let quake = normalize(&json!({"date": "2023-02-06 04:17:32"}), poll_time());
        assert_eq!(quake.occurred_at.to_rfc3339(), "2023-02-06T04:17:32+00:00");

        let quake = normalize(&json!({"tarih": "2023.02.06 04:17:32"}), poll_time());
        assert_eq!(quake.occurred_at.to_rfc3339(), "2023-02-06T04:17:32+00:00");
    }

    #[test]
    fn test_numeric_timestamp_is_epoch_seconds() {
        let quake = normalize(&json!({"timestamp": 1_675_656_000}), poll_time());
        assert_eq!(quake.occurred_at.timestamp(), 1_675_656_000);

        let quake = normalize(&json!({"timestamp": "1675656000"}), poll_time());
        assert_eq!(quake.occurred_at.timestamp(), 1_675_656_000);
    }

    #[test]
    fn test_unparseable_time_falls_back_to_poll_time() {
        let quake = normalize(&json!({"date": "yesterdayish"}), poll_time());
        assert_eq!(quake.occurred_at, poll_time());
    }

    #[test]
    fn test_identity_priority_order() {
        assert_eq!(identity(&json!({"id": "a1", "uid": "u1"})), "a1");
        assert_eq!(identity(&json!({"uid": "u1", "hash": "h1"})), "u1");
        assert_eq!(identity(&json!({"hash": "h1"})), "h1");
        assert_eq!(identity(&json!({"timestamp": 1675656000_i64})), "1675656000");
    }

    #[test]
    fn test_identity_empty_id_falls_through() {
        assert_eq!(identity(&json!({"id": "", "uid": "u1"})), "u1");
    }

    #[test]
    fn test_identity_fingerprint_fallback() {
        let record = json!({"mag": 4.2, "place": "somewhere long enough to truncate"});
        let fp = identity(&record);
        assert_eq!(fp.chars().count(), FINGERPRINT_CHARS);
        // Same record fingerprints the same way across polls.
        assert_eq!(fp, identity(&record));
    }

    #[test]
    fn test_normalize_all_preserves_order() {
        let records = vec![json!({"id": "newest"}), json!({"id": "older"})];
        let quakes = normalize_all(&records, poll_time());
        assert_eq!(quakes.len(), 2);
        assert_eq!(quakes[0].id, "newest");
        assert_eq!(quakes[1].id, "older");
    }
}
