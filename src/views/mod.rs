/// View models consumed by the two dashboard front-ends
use crate::analysis::{daily_counts, delay_stats, filter_delayed};
use crate::domain::{AirportPoint, DelayStats, FlightRecord, TrendPoint};
use crate::utils::{airport, haversine_km, interpolate_path};
use chrono::Local;
use serde::{Deserialize, Serialize};

const NO_DATA: &str = "No data available.";
const PATH_SEGMENTS: usize = 10;

/// Optional dropdown selections of the dashboard
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DashboardFilter {
    pub airline: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
}

impl DashboardFilter {
    fn matches(&self, record: &FlightRecord) -> bool {
        fn pass(selected: &Option<String>, value: &str) -> bool {
            match selected.as_deref() {
                None | Some("") => true,
                Some(s) => s == value,
            }
        }
        pass(&self.airline, &record.airline_id)
            && pass(&self.departure, &record.departure_airport_id)
            && pass(&self.arrival, &record.arrival_airport_id)
    }
}

/// Animated route overlay for one flight
#[derive(Debug, Clone, Serialize)]
pub struct RouteView {
    pub flight_number: String,
    pub departure: AirportPoint,
    pub arrival: AirportPoint,
    pub path: Vec<[f64; 2]>,
    pub current_position: [f64; 2],
    pub distance_km: f64,
}

/// Everything the reactive dashboard redraws on each refresh
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub airline_options: Vec<String>,
    pub departure_options: Vec<String>,
    pub arrival_options: Vec<String>,
    pub flights: Vec<FlightRecord>,
    pub alerts: String,
    pub routes: Vec<RouteView>,
    pub last_update: String,
}

pub fn build_dashboard(records: &[FlightRecord], filter: &DashboardFilter) -> DashboardView {
    let airline_options = unique(records.iter().map(|r| r.airline_id.as_str()));
    let departure_options = unique(records.iter().map(|r| r.departure_airport_id.as_str()));
    let arrival_options = unique(records.iter().map(|r| r.arrival_airport_id.as_str()));

    let flights: Vec<FlightRecord> = records
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();

    DashboardView {
        airline_options,
        departure_options,
        arrival_options,
        alerts: alert_line(&flights),
        routes: flights.iter().filter_map(route_for).collect(),
        flights,
        last_update: format!(
            "Last updated: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ),
    }
}

/// `No delays`, or one `Flight <n>: <remark>` item per delayed flight
pub fn alert_line(records: &[FlightRecord]) -> String {
    let alerts: Vec<String> = filter_delayed(records)
        .iter()
        .map(|r| format!("Flight {}: {}", r.flight_number, r.arrival_remark))
        .collect();
    if alerts.is_empty() {
        "No delays".to_string()
    } else {
        alerts.join(" | ")
    }
}

/// Route overlay, when both airports are known
pub fn route_for(record: &FlightRecord) -> Option<RouteView> {
    let departure = airport(&record.departure_airport_id)?;
    let arrival = airport(&record.arrival_airport_id)?;

    let path: Vec<[f64; 2]> = interpolate_path(
        (departure.lat, departure.lon),
        (arrival.lat, arrival.lon),
        PATH_SEGMENTS,
    )
    .into_iter()
    .map(|(lat, lon)| [lat, lon])
    .collect();
    let current_position = path[path.len() / 2];

    Some(RouteView {
        flight_number: record.flight_number.clone(),
        departure,
        arrival,
        current_position,
        distance_km: haversine_km(departure.lat, departure.lon, arrival.lat, arrival.lon),
        path,
    })
}

fn unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for v in values {
        if !seen.iter().any(|s| s == v) {
            seen.push(v.to_string());
        }
    }
    seen
}

/// Historical trend page of the analytics dashboard
#[derive(Debug, Clone, Serialize)]
pub struct TrendView {
    pub points: Vec<TrendPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub fn build_trends(history: &[FlightRecord]) -> TrendView {
    TrendView {
        points: daily_counts(history),
        message: history.is_empty().then_some(NO_DATA),
    }
}

/// Delay analysis page of the analytics dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DelayView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DelayStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub fn build_delays(history: &[FlightRecord]) -> DelayView {
    if history.is_empty() {
        return DelayView {
            stats: None,
            message: Some(NO_DATA),
        };
    }
    DelayView {
        stats: Some(delay_stats(history)),
        message: None,
    }
}
