/// TDX API clients
use crate::domain::AccessToken;
use crate::errors::{ApiError, ApiResult};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// HTTP client wrapper with common configuration
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("flight-watch/1.0")
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// Client-credentials token exchange against the TDX auth realm
pub struct AuthClient {
    http_client: HttpClient,
    auth_url: String,
    client_id: String,
    client_secret: String,
}

impl AuthClient {
    pub fn new(
        http_client: HttpClient,
        auth_url: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http_client,
            auth_url,
            client_id,
            client_secret,
        }
    }

    /// Exchange the app id/key for a bearer token.
    ///
    /// A 200 response without `access_token` yields an empty token.
    pub async fn authenticate(&self) -> ApiResult<AccessToken> {
        let resp = self
            .http_client
            .get_client()
            .post(&self.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status != StatusCode::OK {
            return Err(ApiError::Authentication {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = serde_json::from_str(&body)?;
        let token = json
            .get("access_token")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(AccessToken(token.to_string()))
    }
}

/// Raw answer from the flight endpoint; status handling is the caller's job
#[derive(Debug)]
pub struct FlightResponse {
    pub status: StatusCode,
    pub body: String,
}

/// TDX arrival board client
pub struct FlightApiClient {
    http_client: HttpClient,
    api_url: String,
}

impl FlightApiClient {
    pub fn new(http_client: HttpClient, api_url: String) -> Self {
        Self {
            http_client,
            api_url,
        }
    }

    /// Get base URL
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// GET the arrival board with a bearer token
    pub async fn fetch(&self, token: &AccessToken) -> ApiResult<FlightResponse> {
        let resp = self
            .http_client
            .get_client()
            .get(&self.api_url)
            .bearer_auth(token.as_str())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        Ok(FlightResponse { status, body })
    }
}
