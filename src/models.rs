//! Normalized event model.
//!
//! The upstream feed is an uncontrolled JSON array with drifting field
//! names; `normalize` flattens each raw record into this one canonical
//! shape. Nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single normalized earthquake event.
#[derive(Debug, Clone, Serialize)]
pub struct Quake {
    /// Best-effort stable identity (dedupe/transition key).
    ///
    /// Not guaranteed unique or stable across upstream schema changes.
    pub id: String,

    /// Magnitude; 0.0 when the record carried none.
    pub magnitude: f64,

    /// Human-readable location; "—" when the record carried none.
    pub place: String,

    /// When the event occurred; poll time when unparseable.
    pub occurred_at: DateTime<Utc>,

    /// Latitude in degrees; 0.0 when absent.
    pub latitude: f64,

    /// Longitude in degrees; 0.0 when absent.
    pub longitude: f64,

    /// Whether both coordinates came from the record (false = defaulted).
    #[serde(skip)]
    pub located: bool,
}

impl Quake {
    /// Severity tier for this event's magnitude.
    #[must_use]
    pub fn severity(&self) -> Severity {
        Severity::from_magnitude(self.magnitude)
    }

    /// Map marker radius in pixels, scaled by magnitude.
    #[must_use]
    pub fn marker_radius(&self) -> f64 {
        6.0 + self.magnitude.clamp(0.0, 6.0)
    }
}

/// Three-tier magnitude severity scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// magnitude >= 5.0
    Severe,
    /// magnitude >= 3.5
    Moderate,
    /// everything below
    Minor,
}

impl Severity {
    /// Classify a magnitude value.
    #[must_use]
    pub fn from_magnitude(mag: f64) -> Self {
        if mag >= 5.0 {
            Self::Severe
        } else if mag >= 3.5 {
            Self::Moderate
        } else {
            Self::Minor
        }
    }

    /// Short uppercase label for terminal output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Severe => "SEVERE",
            Self::Moderate => "MODERATE",
            Self::Minor => "MINOR",
        }
    }

    /// Map marker hex color.
    #[must_use]
    pub const fn marker_color(self) -> &'static str {
        match self {
            Self::Severe => "#b91c1c",
            Self::Moderate => "#b45309",
            Self::Minor => "#065f46",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_tiers() {
        assert_eq!(Severity::from_magnitude(6.1), Severity::Severe);
        assert_eq!(Severity::from_magnitude(5.0), Severity::Severe);
        assert_eq!(Severity::from_magnitude(4.2), Severity::Moderate);
        assert_eq!(Severity::from_magnitude(3.5), Severity::Moderate);
        assert_eq!(Severity::from_magnitude(3.4), Severity::Minor);
        assert_eq!(Severity::from_magnitude(0.0), Severity::Minor);
    }

    #[test]
    fn test_marker_radius_clamped() {
        let mut quake = Quake {
            id: "q".into(),
            magnitude: 9.5,
            place: "test".into(),
            occurred_at: Utc::now(),
            latitude: 0.0,
            longitude: 0.0,
            located: false,
        };
        assert!((quake.marker_radius() - 12.0).abs() < f64::EPSILON);

        quake.magnitude = -1.0;
        assert!((quake.marker_radius() - 6.0).abs() < f64::EPSILON);
    }
}
