//! HTTP client for the utilization service.
//!
//! Endpoints:
//! - `GET  /_/healthcheck` answers `{"date": "<ISO-8601>"}`
//! - `POST /api/v1/metrics/{class}/{resource}/latest` with
//!   `{"action": "...", "inflight": n}` answers
//!   `{"bytesTotal": n, "objectsTotal": n, "date": "<ISO-8601>"}`

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use tracing::debug;

use quotagate_core::config::utilization::UtilizationConfig;
use quotagate_core::error::{AppError, ErrorKind};
use quotagate_core::result::AppResult;
use quotagate_core::traits::utilization::UtilizationBackend;
use quotagate_core::types::metric::{
    HealthStatus, MetricsRequestBody, ResourceType, UtilizationMetric,
};

/// Utilization service reached over HTTP.
#[derive(Debug, Clone)]
pub struct ScubaBackend {
    client: Client,
    base_url: Url,
}

impl ScubaBackend {
    /// Create a backend from connection settings.
    pub fn new(config: &UtilizationConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to build utilization HTTP client: {e}"),
                    e,
                )
            })?;

        let base_url = Url::parse(&config.base_url()).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid utilization service address: {e}"),
                e,
            )
        })?;

        Ok(Self { client, base_url })
    }

    /// Build a URL under the service root; each segment is percent-encoded.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::configuration(format!(
                    "Utilization service address cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn metrics_url(&self, resource_type: ResourceType, resource_name: &str) -> AppResult<Url> {
        self.endpoint([
            "api",
            "v1",
            "metrics",
            resource_type.as_str(),
            resource_name,
            "latest",
        ])
    }

    /// Turn non-2xx answers into errors carrying the status code.
    async fn check_status(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::external_service(format!(
            "Utilization service answered {status}: {body}"
        ))
        .with_status(status.as_u16()))
    }
}

fn transport_error(context: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        return AppError::with_source(ErrorKind::Timeout, format!("{context}: {err}"), err)
            .with_status(408);
    }
    let status = err.status().map(|s| s.as_u16());
    let app = AppError::with_source(ErrorKind::ExternalService, format!("{context}: {err}"), err);
    match status {
        Some(code) => app.with_status(code),
        None => app,
    }
}

#[async_trait]
impl UtilizationBackend for ScubaBackend {
    fn backend_type(&self) -> &str {
        "scuba"
    }

    async fn health_check(&self) -> AppResult<HealthStatus> {
        let response = self
            .client
            .get(self.endpoint(["_", "healthcheck"])?)
            .send()
            .await
            .map_err(|e| transport_error("Health check failed", e))?;
        let response = Self::check_status(response).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error("Failed to read health check answer", e))?;
        if body.is_empty() {
            return Ok(HealthStatus::default());
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_latest_metrics(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        body: &MetricsRequestBody,
    ) -> AppResult<UtilizationMetric> {
        let url = self.metrics_url(resource_type, resource_name)?;
        debug!(%url, action = %body.action, inflight = ?body.inflight, "Fetching utilization metrics");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error("Utilization metrics request failed", e))?;
        let response = Self::check_status(response).await?;

        response
            .json::<UtilizationMetric>()
            .await
            .map_err(|e| transport_error("Invalid utilization metrics answer", e))
    }
}
