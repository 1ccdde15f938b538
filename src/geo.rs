//! Distance-from-user support.
//!
//! Haversine great-circle distance plus the "nearest quake" scan used by
//! the list footer and the map pan.

use std::f64::consts::PI;

use crate::models::Quake;

/// Earth radius in kilometers for haversine calculations.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A user-supplied observation point.
#[derive(Debug, Clone, Copy)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl std::str::FromStr for GeoPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 2 {
            return Err(format!("position requires 2 values (lat,lon), got {}", parts.len()));
        }

        let vals: Result<Vec<f64>, _> = parts.iter().map(|p| p.trim().parse::<f64>()).collect();
        let vals = vals.map_err(|e| format!("invalid number in position: {e}"))?;

        let point = Self {
            lat: vals[0],
            lon: vals[1],
        };

        if point.lat < -90.0 || point.lat > 90.0 {
            return Err(format!("latitude {} out of range [-90, 90]", point.lat));
        }
        if point.lon < -180.0 || point.lon > 180.0 {
            return Err(format!("longitude {} out of range [-180, 180]", point.lon));
        }

        Ok(point)
    }
}

impl GeoPoint {
    /// Distance from this point to a quake's epicenter, in kilometers.
    #[must_use]
    pub fn distance_to(&self, quake: &Quake) -> f64 {
        haversine_distance(self.lat, self.lon, quake.latitude, quake.longitude)
    }
}

/// Calculate the great-circle distance between two points using the
/// haversine formula. Returns distance in kilometers.
#[must_use]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1 * PI / 180.0;
    let lat2_rad = lat2 * PI / 180.0;
    let delta_lat = (lat2 - lat1) * PI / 180.0;
    let delta_lon = (lon2 - lon1) * PI / 180.0;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Find the quake nearest to `from`, skipping events whose coordinates
/// defaulted to (0, 0) — those are "location unknown", not the Gulf of
/// Guinea. Returns the index and the distance in km.
#[must_use]
pub fn nearest(from: GeoPoint, quakes: &[Quake]) -> Option<(usize, f64)> {
    quakes
        .iter()
        .enumerate()
        .filter(|(_, q)| q.located)
        .map(|(i, q)| (i, from.distance_to(q)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Distance column text: "123.4 km" or a placeholder when the user position
/// or the event location is missing.
#[must_use]
pub fn distance_text(position: Option<GeoPoint>, quake: &Quake) -> String {
    match position {
        Some(p) if quake.located => format!("{:.1} km", p.distance_to(quake)),
        _ => "—".to_string(),
    }
}
