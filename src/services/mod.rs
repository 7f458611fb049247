/// Flight pipeline service
use crate::analysis::filter_delayed;
use crate::cache::FileCache;
use crate::clients::{AuthClient, FlightApiClient};
use crate::domain::{AccessToken, CycleOutcome, CycleReport, FetchSource, FlightRecordSet};
use crate::errors::{ApiError, ApiResult};
use crate::notifier::{DispatchSummary, Notifier};
use crate::repo::HistoryRepo;
use crate::scheduler::Pipeline;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Blocking wait used for the rate-limit backoff
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Mutable per-process pipeline state
#[derive(Default)]
pub struct Session {
    token: RwLock<Option<AccessToken>>,
}

impl Session {
    pub async fn token(&self) -> Option<AccessToken> {
        self.token.read().await.clone()
    }

    /// Last write wins
    pub async fn set_token(&self, token: AccessToken) {
        *self.token.write().await = Some(token);
    }
}

/// Shared flight pipeline used by the scheduler and every HTTP adapter
pub struct FlightService {
    session: Session,
    auth: AuthClient,
    api: FlightApiClient,
    cache: FileCache,
    history: HistoryRepo,
    notifier: Option<Notifier>,
    pause: Box<dyn Pause>,
    rate_limit_backoff: Duration,
    cycle_guard: Mutex<()>,
}

impl FlightService {
    pub fn new(
        auth: AuthClient,
        api: FlightApiClient,
        cache: FileCache,
        history: HistoryRepo,
        notifier: Option<Notifier>,
    ) -> Self {
        Self {
            session: Session::default(),
            auth,
            api,
            cache,
            history,
            notifier,
            pause: Box::new(TokioPause),
            rate_limit_backoff: Duration::from_secs(60),
            cycle_guard: Mutex::new(()),
        }
    }

    pub fn with_rate_limit_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }

    #[cfg(test)]
    pub fn with_pause(mut self, pause: Box<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Request a fresh token and store it in the session
    pub async fn authenticate(&self) -> ApiResult<AccessToken> {
        let token = self.auth.authenticate().await?;
        self.session.set_token(token.clone()).await;
        info!("Authenticated successfully.");
        Ok(token)
    }

    /// Current arrival board, from the cache when present
    pub async fn fetch_flights(&self) -> ApiResult<FlightRecordSet> {
        match self.load_cached().await? {
            Some(records) => Ok(records),
            None => self.fetch_remote().await,
        }
    }

    async fn load_cached(&self) -> ApiResult<Option<FlightRecordSet>> {
        let cached = self.cache.load().await?;
        if cached.is_some() {
            info!(
                "Loading data from cache {}",
                self.cache.path().display()
            );
        }
        Ok(cached)
    }

    /// GET with the session token as-is; an absent token goes out empty and
    /// is recovered through the 401 path.
    async fn fetch_remote(&self) -> ApiResult<FlightRecordSet> {
        let mut token = self
            .session
            .token()
            .await
            .unwrap_or_else(|| AccessToken(String::new()));
        let mut resp = self.api.fetch(&token).await?;

        if resp.status == StatusCode::UNAUTHORIZED {
            warn!("Token expired. Re-authenticating...");
            token = self.authenticate().await?;
            resp = self.api.fetch(&token).await?;
        }

        if resp.status == StatusCode::TOO_MANY_REQUESTS {
            warn!(
                "Rate limit reached. Waiting for {} seconds...",
                self.rate_limit_backoff.as_secs()
            );
            self.pause.pause(self.rate_limit_backoff).await;
            resp = self.api.fetch(&token).await?;
        }

        if resp.status != StatusCode::OK {
            return Err(ApiError::DataFetch {
                status: resp.status.as_u16(),
                body: resp.body,
            });
        }

        let records: FlightRecordSet = serde_json::from_str(&resp.body)?;
        self.cache.store(&records).await?;
        info!(
            "Fetched {} flights from {}",
            records.len(),
            self.api.api_url()
        );
        Ok(records)
    }

    /// Every record appended so far, oldest first
    pub async fn get_history(&self) -> FlightRecordSet {
        self.history.snapshot().await
    }

    /// Fetch, append to history and notify about delayed flights.
    ///
    /// A cycle that has to go to the network logs in first when the session
    /// holds no token. Returns `Skipped` when another cycle is already running.
    pub async fn run_cycle(&self) -> ApiResult<CycleOutcome> {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            return Ok(CycleOutcome::Skipped);
        };

        let (records, source) = match self.load_cached().await? {
            Some(records) => (records, FetchSource::Cache),
            None => {
                if self.session.token().await.is_none() {
                    self.authenticate().await?;
                }
                (self.fetch_remote().await?, FetchSource::Network)
            }
        };
        let delayed = filter_delayed(&records);

        let history_len = if records.is_empty() {
            self.history.len().await
        } else {
            self.history.append(&records).await
        };

        let dispatch = match (&self.notifier, records.is_empty()) {
            (Some(notifier), false) => notifier.notify_all(&delayed).await,
            _ => DispatchSummary::default(),
        };

        Ok(CycleOutcome::Completed(CycleReport {
            fetched: records.len(),
            source,
            delayed: delayed.len(),
            notified: dispatch.sent,
            failed_notifications: dispatch.failed,
            history_len,
            finished_at: Utc::now(),
        }))
    }
}

#[async_trait]
impl Pipeline for FlightService {
    async fn run_cycle(&self) -> ApiResult<CycleOutcome> {
        FlightService::run_cycle(self).await
    }
}
