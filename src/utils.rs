/// Utility functions
use crate::domain::AirportPoint;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Known airports for route overlays
const AIRPORTS: &[AirportPoint] = &[
    AirportPoint { code: "TTT", lat: 22.7583, lon: 121.1016 }, // Taitung
    AirportPoint { code: "GNI", lat: 22.6739, lon: 121.4667 }, // Green Island
    AirportPoint { code: "TSA", lat: 25.0694, lon: 121.5525 }, // Taipei Songshan
    AirportPoint { code: "TPE", lat: 25.0777, lon: 121.2321 }, // Taoyuan
    AirportPoint { code: "KHH", lat: 22.5771, lon: 120.3500 }, // Kaohsiung
    AirportPoint { code: "TXG", lat: 24.1863, lon: 120.6515 }, // Taichung
    AirportPoint { code: "HUN", lat: 24.0239, lon: 121.6170 }, // Hualien
    AirportPoint { code: "MZG", lat: 23.5697, lon: 119.6300 }, // Magong
    AirportPoint { code: "KNH", lat: 24.4279, lon: 118.3590 }, // Kinmen
    AirportPoint { code: "LZN", lat: 26.1598, lon: 119.9582 }, // Matsu Nangan
    AirportPoint { code: "RCN", lat: 24.2659, lon: 120.6217 },
    AirportPoint { code: "CYI", lat: 23.4617, lon: 120.3933 }, // Chiayi
    AirportPoint { code: "PIF", lat: 22.7002, lon: 120.4578 }, // Pingtung
    AirportPoint { code: "KYD", lat: 22.0340, lon: 120.7270 }, // Lanyu
    AirportPoint { code: "WOT", lat: 23.3733, lon: 119.5022 }, // Wang-an
    AirportPoint { code: "TTB", lat: 22.7561, lon: 121.0941 },
    AirportPoint { code: "HLG", lat: 22.9994, lon: 121.0000 },
];

/// Look up an airport by IATA code
pub fn airport(code: &str) -> Option<AirportPoint> {
    AIRPORTS.iter().find(|a| a.code == code).copied()
}

/// Calculate distance between two coordinates using Haversine formula
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let rlat1 = lat1.to_radians();
    let rlat2 = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + rlat1.cos() * rlat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    6371.0 * c
}

/// Straight-line waypoints from `from` to `to`, both ends included
pub fn interpolate_path(from: (f64, f64), to: (f64, f64), segments: usize) -> Vec<(f64, f64)> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = i as f64 / segments as f64;
            (from.0 + t * (to.0 - from.0), from.1 + t * (to.1 - from.1))
        })
        .collect()
}

/// Parse an arrival board timestamp.
///
/// Naive timestamps are read as UTC; only differences between them matter.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}
