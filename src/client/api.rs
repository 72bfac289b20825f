//! JSON API the sync layer consumes.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::{Result, SyncError};
use crate::models::{
    AllDataResponse, HistoryDataResponse, SessionSummary, SessionsResponse, Timeslot,
    TimeslotsResponse,
};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Applies to every request, so a hung endpoint cannot stall the controller.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Server round-trips used by the controller and the preloader.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// `GET /api/sessions`
    async fn sessions(&self) -> Result<Vec<SessionSummary>>;

    /// `GET /api/history/timeslots`, in server order.
    async fn timeslots(&self, session_id: &str) -> Result<Vec<Timeslot>>;

    /// `GET /api/history/data`
    async fn history_data(&self, session_id: &str, archived_at: &str)
    -> Result<HistoryDataResponse>;

    /// `GET /api/all-data`
    async fn all_data(&self, session_id: &str) -> Result<AllDataResponse>;
}

/// [`DashboardApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!("failed to build HTTP client with timeout: {err}");
                reqwest::Client::new()
            });
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Uses `APP_BASE_URL`, falling back to the local server.
    pub fn from_env() -> Self {
        let base_url = env::var("APP_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "GET");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| value.get("error")?.as_str().map(str::to_string))
                .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
            return Err(SyncError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

fn ensure_success(success: bool, error: Option<String>) -> Result<()> {
    if success {
        Ok(())
    } else {
        Err(SyncError::Server(
            error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

#[async_trait]
impl DashboardApi for HttpApi {
    async fn sessions(&self) -> Result<Vec<SessionSummary>> {
        let response: SessionsResponse = self.get_json("/api/sessions", &[]).await?;
        ensure_success(response.success, response.error)?;
        Ok(response.sessions)
    }

    async fn timeslots(&self, session_id: &str) -> Result<Vec<Timeslot>> {
        let response: TimeslotsResponse = self
            .get_json("/api/history/timeslots", &[("session_id", session_id)])
            .await?;
        ensure_success(response.success, response.error)?;
        Ok(response.timeslots)
    }

    async fn history_data(
        &self,
        session_id: &str,
        archived_at: &str,
    ) -> Result<HistoryDataResponse> {
        let mut response: HistoryDataResponse = self
            .get_json(
                "/api/history/data",
                &[("session_id", session_id), ("archived_at", archived_at)],
            )
            .await?;
        ensure_success(response.success, response.error.take())?;
        Ok(response)
    }

    async fn all_data(&self, session_id: &str) -> Result<AllDataResponse> {
        let mut response: AllDataResponse = self
            .get_json("/api/all-data", &[("session_id", session_id)])
            .await?;
        ensure_success(response.success, response.error.take())?;
        Ok(response)
    }
}
