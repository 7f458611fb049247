/// HTTP request handlers
use crate::analysis::filter_delayed;
use crate::domain::{CycleOutcome, FlightRecord, FlightRecordSet, Health};
use crate::errors::{ApiError, ApiResult};
use crate::services::FlightService;
use crate::views::{
    build_dashboard, build_delays, build_trends, DashboardFilter, DashboardView, DelayView,
    TrendView,
};
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub flight_service: Arc<FlightService>,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

#[derive(Serialize)]
pub struct FlightList {
    pub count: usize,
    pub flights: Vec<FlightRecord>,
}

impl From<Vec<FlightRecord>> for FlightList {
    fn from(flights: Vec<FlightRecord>) -> Self {
        Self {
            count: flights.len(),
            flights,
        }
    }
}

type Reply<T> = Result<Json<SuccessResponse<T>>, ApiError>;

// Pipeline work runs on its own task and outlives a dropped connection
async fn fetch_detached(state: &AppState) -> ApiResult<FlightRecordSet> {
    let service = Arc::clone(&state.flight_service);
    tokio::spawn(async move { service.fetch_flights().await }).await?
}

async fn cycle_detached(state: &AppState) -> ApiResult<CycleOutcome> {
    let service = Arc::clone(&state.flight_service);
    tokio::spawn(async move { service.run_cycle().await }).await?
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Current arrival board
pub async fn get_flights(State(state): State<AppState>) -> Reply<FlightList> {
    let flights = fetch_detached(&state).await?;
    Ok(Json(SuccessResponse::new(flights.into())))
}

/// Delayed flights on the current board
pub async fn get_delayed(State(state): State<AppState>) -> Reply<FlightList> {
    let flights = fetch_detached(&state).await?;
    Ok(Json(SuccessResponse::new(filter_delayed(&flights).into())))
}

/// Run one refresh cycle now
pub async fn trigger_cycle(State(state): State<AppState>) -> Reply<CycleOutcome> {
    let outcome = cycle_detached(&state).await?;
    Ok(Json(SuccessResponse::new(outcome)))
}

/// Everything collected by past cycles
pub async fn get_history(State(state): State<AppState>) -> Reply<FlightList> {
    let history = state.flight_service.get_history().await;
    Ok(Json(SuccessResponse::new(history.into())))
}

/// Reactive dashboard: filters, alerts, chart rows and map routes
pub async fn get_dashboard(
    Query(filter): Query<DashboardFilter>,
    State(state): State<AppState>,
) -> Reply<DashboardView> {
    let flights = fetch_detached(&state).await?;
    Ok(Json(SuccessResponse::new(build_dashboard(&flights, &filter))))
}

/// Analytics page: real-time data
pub async fn analytics_realtime(State(state): State<AppState>) -> Reply<FlightList> {
    get_flights(State(state)).await
}

/// Analytics page: historical trends
pub async fn analytics_trends(State(state): State<AppState>) -> Reply<TrendView> {
    let history = state.flight_service.get_history().await;
    Ok(Json(SuccessResponse::new(build_trends(&history))))
}

/// Analytics page: delay analysis
pub async fn analytics_delays(State(state): State<AppState>) -> Reply<DelayView> {
    let history = state.flight_service.get_history().await;
    Ok(Json(SuccessResponse::new(build_delays(&history))))
}
