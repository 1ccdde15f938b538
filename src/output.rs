//! Output formatters for normalized events.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use crate::geo::{self, GeoPoint};
use crate::models::{Quake, Severity};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Severity tier colors
const RED: &str = "\x1b[91m";    // severe: mag >= 5.0
const ORANGE: &str = "\x1b[93m"; // moderate: mag >= 3.5
const GREEN: &str = "\x1b[92m";  // minor

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Terminal color for a severity tier.
const fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Severe => RED,
        Severity::Moderate => ORANGE,
        Severity::Minor => GREEN,
    }
}

/// Write events in human-readable format: magnitude badge, place, time,
/// and distance from the user position when one is known.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(
    writer: &mut W,
    quakes: &[Quake],
    position: Option<GeoPoint>,
) -> io::Result<()> {
    for quake in quakes {
        let severity = quake.severity();
        let color = severity_color(severity);
        let time = quake.occurred_at.format("%Y-%m-%d %H:%M");
        let distance = geo::distance_text(position, quake);

        writeln!(
            writer,
            "{color}{BOLD}M {:>4.1}{RESET} {color}{:8}{RESET} │ {time} UTC │ {:>10} │ {}",
            quake.magnitude,
            severity.label(),
            distance,
            quake.place,
        )?;
    }
    Ok(())
}

/// Write the "nearest quake" footer line.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_nearest<W: Write>(
    writer: &mut W,
    position: GeoPoint,
    quakes: &[Quake],
) -> io::Result<()> {
    match geo::nearest(position, quakes) {
        Some((idx, dist)) => {
            let quake = &quakes[idx];
            writeln!(
                writer,
                "{DIM}nearest:{RESET} {} — {dist:.1} km (M {:.1})",
                quake.place, quake.magnitude
            )
        }
        None => writeln!(writer, "{DIM}nearest: no located events{RESET}"),
    }
}

/// Write events as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, quakes: &[Quake]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(quakes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write events as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, quakes: &[Quake]) -> io::Result<()> {
    for quake in quakes {
        let json = serde_json::to_string(quake)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write events in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_events<W: Write>(
    writer: &mut W,
    quakes: &[Quake],
    format: Format,
    position: Option<GeoPoint>,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, quakes, position),
        Format::Json => write_json(writer, quakes),
        Format::Ndjson => write_ndjson(writer, quakes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quake(mag: f64) -> Quake {
        Quake {
            id: "q1".to_string(),
            magnitude: mag,
            place: "Aegean Sea".to_string(),
            occurred_at: Utc::now(),
            latitude: 38.5,
            longitude: 27.1,
            located: true,
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("NDJSON".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_human_line_contains_fields() {
        let mut buf = Vec::new();
        write_human(&mut buf, &[quake(6.1)], None).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.contains("M  6.1"));
        assert!(s.contains("SEVERE"));
        assert!(s.contains("Aegean Sea"));
        assert!(s.contains('—')); // no position, placeholder distance
    }

    #[test]
    fn test_human_distance_column() {
        let position = GeoPoint { lat: 38.42, lon: 27.14 };
        let mut buf = Vec::new();
        write_human(&mut buf, &[quake(2.0)], Some(position)).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.contains("km"));
        assert!(s.contains("MINOR"));
    }

    #[test]
    fn test_ndjson_one_line_per_event() {
        let mut buf = Vec::new();
        write_ndjson(&mut buf, &[quake(1.0), quake(2.0)]).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert_eq!(s.lines().count(), 2);
        let parsed: serde_json::Value = serde_json::from_str(s.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["place"], "Aegean Sea");
    }

    #[test]
    fn test_nearest_footer() {
        let position = GeoPoint { lat: 38.42, lon: 27.14 };
        let mut buf = Vec::new();
        write_nearest(&mut buf, position, &[quake(4.0)]).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.contains("nearest:"));
        assert!(s.contains("Aegean Sea"));
    }
}
