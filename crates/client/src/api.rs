//! REST client for the ExperimentHub HTTP endpoints.
//!
//! | Operation          | Request                        |
//! |--------------------|--------------------------------|
//! | list experiments   | `GET    /experiments`          |
//! | create experiment  | `POST   /experiments`          |
//! | list jobs          | `GET    /jobs`                 |
//! | create job         | `POST   /jobs`                 |
//! | cancel job         | `POST   /jobs/{job_id}/cancel` |
//! | delete job         | `DELETE /jobs/{job_id}`        |

use async_trait::async_trait;

use exphub_core::experiment::{CreateExperiment, Experiment};
use exphub_core::form::CreateJobRequest;
use exphub_core::job::Job;

use crate::config::ClientConfig;
use crate::service::{ExperimentService, JobService};

/// HTTP client for one ExperimentHub backend.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    api_url: String,
}

/// Errors from the REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl HttpApi {
    /// * `api_url` - Base HTTP URL without a trailing slash, e.g. `http://host:8000`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling, custom TLS).
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// Build a client honouring the configured request timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config.api_url.clone()))
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`ApiError::Status`] with the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Parse a successful JSON array one row at a time. Rows that do not
    /// decode are logged and skipped.
    async fn parse_rows<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        kind: &'static str,
    ) -> Result<Vec<T>, ApiError> {
        let rows: Vec<serde_json::Value> = Self::parse_response(response).await?;
        Ok(decode_rows(rows, kind))
    }

    /// Assert a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ExperimentService for HttpApi {
    async fn list_experiments(&self) -> Result<Vec<Experiment>, ApiError> {
        let response = self.client.get(self.url("/experiments")).send().await?;
        Self::parse_rows(response, "experiment").await
    }

    async fn create_experiment(&self, request: &CreateExperiment) -> Result<Experiment, ApiError> {
        let response = self
            .client
            .post(self.url("/experiments"))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }
}

#[async_trait]
impl JobService for HttpApi {
    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError> {
        let response = self.client.get(self.url("/jobs")).send().await?;
        Self::parse_rows(response, "job").await
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<Job, ApiError> {
        let response = self
            .client
            .post(self.url("/jobs"))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/jobs/{job_id}/cancel")))
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn delete_job(&self, job_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/jobs/{job_id}")))
            .send()
            .await?;
        Self::check_status(response).await
    }
}

/// Decode each row independently, dropping the ones that fail.
fn decode_rows<T: serde::de::DeserializeOwned>(
    rows: Vec<serde_json::Value>,
    kind: &'static str,
) -> Vec<T> {
    let total = rows.len();
    let decoded: Vec<T> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(kind, index, error = %e, "Skipping malformed row");
                None
            }
        })
        .collect();
    if decoded.len() < total {
        tracing::warn!(kind, total, loaded = decoded.len(), "Some rows were skipped");
    }
    decoded
}
