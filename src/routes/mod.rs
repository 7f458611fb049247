/// Application routes configuration
use crate::handlers::{
    analytics_delays, analytics_realtime, analytics_trends, get_dashboard, get_delayed,
    get_flights, get_history, health, trigger_cycle, AppState,
};
use axum::{routing::get, Router};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Pipeline endpoints
        .route("/flights", get(get_flights))
        .route("/flights/delayed", get(get_delayed))
        .route("/cycle", get(trigger_cycle))
        .route("/history", get(get_history))
        // Reactive dashboard
        .route("/dashboard", get(get_dashboard))
        // Analytics pages
        .route("/analytics/realtime", get(analytics_realtime))
        .route("/analytics/trends", get(analytics_trends))
        .route("/analytics/delays", get(analytics_delays))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::record;
    use crate::cache::FileCache;
    use crate::clients::{AuthClient, FlightApiClient, HttpClient};
    use crate::repo::HistoryRepo;
    use crate::services::FlightService;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(cache: FileCache) -> Router {
        let http = HttpClient::new(Duration::from_secs(1)).unwrap();
        let service = FlightService::new(
            AuthClient::new(
                http.clone(),
                "http://127.0.0.1:9/token".to_string(),
                "id".to_string(),
                "key".to_string(),
            ),
            FlightApiClient::new(http, "http://127.0.0.1:9/flights".to_string()),
            cache,
            HistoryRepo::new(None),
            None,
        );
        build_router(AppState {
            flight_service: Arc::new(service),
        })
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("cache.csv"), None);
        cache
            .store(&[
                record("AE1", "2024-01-01T10:00", None, "Delayed"),
                record("AE2", "2024-01-01T11:00", None, "On Time"),
            ])
            .await
            .unwrap();

        let json = get_json(app(cache), "/dashboard?airline=AE").await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["flights"].as_array().unwrap().len(), 2);
        assert_eq!(json["alerts"], "Flight AE1: Delayed");
        assert_eq!(json["routes"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_visible_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("missing.csv"), None);

        let json = get_json(app(cache), "/flights").await;
        assert_eq!(json["ok"], false);
        assert!(json["error"]["code"].is_string());
    }

    #[tokio::test]
    async fn test_cycle_then_analytics() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("cache.csv"), None);
        cache
            .store(&[record(
                "AE1",
                "2024-01-01T10:00",
                Some("2024-01-01T10:20"),
                "Delayed",
            )])
            .await
            .unwrap();
        let app = app(cache);

        let empty = get_json(app.clone(), "/analytics/delays").await;
        assert_eq!(empty["message"], "No data available.");

        let cycle = get_json(app.clone(), "/cycle").await;
        assert_eq!(cycle["status"], "completed");
        assert_eq!(cycle["source"], "cache");

        let delays = get_json(app.clone(), "/analytics/delays").await;
        assert_eq!(delays["stats"]["mean_minutes"], 20.0);

        let trends = get_json(app, "/analytics/trends").await;
        assert_eq!(trends["points"][0]["date"], "2024-01-01");
        assert_eq!(trends["points"][0]["flights"], 1);
    }
}
