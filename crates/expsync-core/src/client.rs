//! HTTP client for the experimentation service metric registry
//!
//! Four operations, all under `<endpoint>/workspaces/<id>/metrics`:
//! validate (POST), full-replace upsert (PATCH), paged listing (GET) and
//! delete (DELETE). Every call carries a bearer token and the service's
//! `application/merge-patch+json` content type.

use crate::error::{Result, SyncError};
use crate::model::Metric;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::error;

/// API version pinned for all calls
pub const API_VERSION: &str = "2024-11-30-preview";

/// Content type the registry expects on every call
const MERGE_PATCH: &str = "application/merge-patch+json";

/// Page bound for the listing fetch
const LIST_PAGE_SIZE: u32 = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one remote (or locally synthesized) metric operation
#[derive(Debug, Clone)]
pub struct ApiOutcome {
    /// Response status; synthesized outcomes carry a local status
    pub status: StatusCode,
    /// Parsed response body, when one was returned
    pub body: Option<Value>,
    /// Local error detail for outcomes that never reached the network
    pub error: Option<String>,
}

impl ApiOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The `result` field of a validation response
    pub fn validation_result(&self) -> Option<&str> {
        self.body.as_ref()?.get("result")?.as_str()
    }

    /// Body rendered for log lines
    pub fn body_text(&self) -> String {
        match &self.body {
            Some(body) => body.to_string(),
            None => "null".to_string(),
        }
    }
}

/// Client for one workspace's metric registry
#[derive(Debug, Clone)]
pub struct MetricsClient {
    http: Client,
    base_url: String,
}

impl MetricsClient {
    /// Create a client rooted at the workspace's metric collection
    pub fn new(endpoint: &str, workspace_id: &str) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = format!(
            "{}/workspaces/{}/metrics",
            endpoint.trim_end_matches('/'),
            workspace_id
        );
        Ok(Self { http, base_url })
    }

    /// `POST .../{id}:validate` with the full metric body
    pub async fn validate_metric(&self, token: &str, metric: &Metric) -> Result<ApiOutcome> {
        let url = format!(
            "{}/{}:validate?api-version={API_VERSION}",
            self.base_url, metric.id
        );
        let payload = serde_json::to_string(metric).map_err(|e| {
            SyncError::Argument(format!("Failed to serialize metric {}: {e}", metric.id))
        })?;
        let response = self
            .request(Method::POST, &url, token)
            .body(payload)
            .send()
            .await?;
        Ok(Self::outcome(response).await)
    }

    /// `PATCH .../{id}` with the metric body minus its identifier
    pub async fn upsert_metric(&self, token: &str, id: &str, body: &Value) -> Result<ApiOutcome> {
        let url = format!("{}/{id}?api-version={API_VERSION}", self.base_url);
        let response = self
            .request(Method::PATCH, &url, token)
            .body(body.to_string())
            .send()
            .await?;
        Ok(Self::outcome(response).await)
    }

    /// `DELETE .../{id}`
    pub async fn delete_metric(&self, token: &str, id: &str) -> Result<ApiOutcome> {
        let url = format!("{}/{id}?api-version={API_VERSION}", self.base_url);
        let response = self.request(Method::DELETE, &url, token).send().await?;
        Ok(Self::outcome(response).await)
    }

    /// `GET .../`: paged listing of remote metric identifiers, following
    /// `nextLink` until the listing is exhausted.
    ///
    /// A non-success status here is fatal: without the full remote picture
    /// the delete phase cannot compute a safe difference.
    pub async fn list_metric_ids(&self, token: &str) -> Result<Vec<String>> {
        let mut url = format!(
            "{}?api-version={API_VERSION}&top={LIST_PAGE_SIZE}",
            self.base_url
        );
        let mut ids = Vec::new();

        loop {
            let response = self.request(Method::GET, &url, token).send().await?;
            let outcome = Self::outcome(response).await;
            if !outcome.is_success() {
                let message = format!(
                    "Failed to get metrics: Status: {}. Message: {}",
                    outcome.status,
                    outcome.body_text()
                );
                error!("{message}");
                return Err(SyncError::Api(message));
            }

            let page = outcome.body.unwrap_or(Value::Null);
            if let Some(entries) = page.get("value").and_then(Value::as_array) {
                ids.extend(
                    entries
                        .iter()
                        .filter_map(|entry| entry.get("id").and_then(Value::as_str))
                        .map(str::to_string),
                );
            }

            match page.get("nextLink").and_then(Value::as_str) {
                Some(next) => url = next.to_string(),
                None => break,
            }
        }

        Ok(ids)
    }

    fn request(&self, method: Method, url: &str, token: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, MERGE_PATCH)
            .header(ACCEPT, "*/*")
    }

    async fn outcome(response: reqwest::Response) -> ApiOutcome {
        let status = response.status();
        let body = response.json::<Value>().await.ok();
        ApiOutcome {
            status,
            body,
            error: None,
        }
    }
}
