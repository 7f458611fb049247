/// Arrival board domain types
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Remark value the arrival board uses for late flights
pub const DELAYED_REMARK: &str = "Delayed";

/// One row of the airport arrival board.
///
/// Field names match the TDX payload so the same type reads the API response
/// and the CSV cache header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    #[serde(rename = "FlightNumber")]
    pub flight_number: String,
    #[serde(rename = "AirlineID")]
    pub airline_id: String,
    #[serde(rename = "DepartureAirportID")]
    pub departure_airport_id: String,
    #[serde(rename = "ArrivalAirportID")]
    pub arrival_airport_id: String,
    #[serde(rename = "FlightDate", default)]
    pub flight_date: Option<String>,
    #[serde(rename = "ScheduleArrivalTime")]
    pub schedule_arrival_time: String,
    #[serde(rename = "ActualArrivalTime", default)]
    pub actual_arrival_time: Option<String>,
    #[serde(rename = "ArrivalRemark", default, deserialize_with = "null_as_empty")]
    pub arrival_remark: String,
    #[serde(rename = "DepartureLatitude", default)]
    pub departure_latitude: Option<f64>,
    #[serde(rename = "DepartureLongitude", default)]
    pub departure_longitude: Option<f64>,
    #[serde(rename = "ArrivalLatitude", default)]
    pub arrival_latitude: Option<f64>,
    #[serde(rename = "ArrivalLongitude", default)]
    pub arrival_longitude: Option<f64>,
}

impl FlightRecord {
    pub fn is_delayed(&self) -> bool {
        self.arrival_remark == DELAYED_REMARK
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Records returned by one fetch
pub type FlightRecordSet = Vec<FlightRecord>;

/// Bearer token issued by the auth endpoint. May be empty when the
/// response carried no `access_token`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Where a record set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    Cache,
    Network,
}

/// Result of one fetch → persist → notify cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub fetched: usize,
    pub source: FetchSource,
    pub delayed: usize,
    pub notified: usize,
    pub failed_notifications: usize,
    pub history_len: usize,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle held the pipeline
    Skipped,
}

/// Delay distribution bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Delay statistics over a record set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayStats {
    pub total: usize,
    pub with_delay: usize,
    pub mean_minutes: Option<f64>,
    pub min_minutes: Option<f64>,
    pub max_minutes: Option<f64>,
    pub histogram: Vec<HistogramBin>,
}

/// Flights per day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub flights: usize,
}

/// Airport location used for route overlays
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AirportPoint {
    pub code: &'static str,
    pub lat: f64,
    pub lon: f64,
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}
