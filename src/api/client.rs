//! HTTP implementation of the telemetry backend.
//!
//! Read requests retry on transport errors and 5xx responses with a fixed
//! delay. Mutation confirmations are sent exactly once; their failure is
//! handled by the notification store's rollback, not by retrying.

use crate::api::TelemetryBackend;
use crate::api::types::{HealthCheckResponse, PredictionRequest, PredictionResponse, Sensor};
use crate::config::Config;
use crate::error::AppError;
use crate::notifications::Notification;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
    predictions_base_url: Option<String>,
    token: Option<String>,
    user_id: Option<String>,
    retry_count: u32,
    retry_delay: Duration,
}

impl HttpApiClient {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: trim_trailing_slash(&config.api.base_url),
            predictions_base_url: config.predictions_base_url().map(trim_trailing_slash),
            token: config.api.token.clone(),
            user_id: config.api.user_id.clone(),
            retry_count: config.retry_count(),
            retry_delay: config.retry_delay(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn predictions_endpoint(&self, path: &str) -> String {
        let base = self.predictions_base_url.as_deref().unwrap_or(&self.base_url);
        format!("{base}{path}")
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut builder = builder;
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(user_id) = &self.user_id {
            builder = builder.header("x-user-id", user_id);
        }
        builder
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, AppError> {
        let response = self.with_auth(self.http.get(url)).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn get_with_retry<T: DeserializeOwned>(&self, url: String) -> Result<T, AppError> {
        let mut failures = 0;
        loop {
            match self.get_once(&url).await {
                Ok(value) => return Ok(value),
                Err(err) if failures < self.retry_count && is_retryable(&err) => {
                    failures += 1;
                    debug!(url = %url, failures, error = %err, "Read request failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn post_once<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let response = self.with_auth(self.http.post(url).json(body)).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_with_retry<T: DeserializeOwned, B: Serialize>(
        &self,
        url: String,
        body: &B,
    ) -> Result<T, AppError> {
        let mut failures = 0;
        loop {
            match self.post_once(&url, body).await {
                Ok(value) => return Ok(value),
                Err(err) if failures < self.retry_count && is_retryable(&err) => {
                    failures += 1;
                    debug!(url = %url, failures, error = %err, "Read request failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn post_confirmation(&self, url: String) -> Result<(), AppError> {
        let body = serde_json::json!({});
        let response = self.with_auth(self.http.post(&url).json(&body)).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

impl TelemetryBackend for HttpApiClient {
    async fn fetch_health(&self) -> Result<HealthCheckResponse, AppError> {
        self.get_with_retry(self.endpoint("/health")).await
    }

    async fn fetch_sensors(&self) -> Result<Vec<Sensor>, AppError> {
        self.get_with_retry(self.endpoint("/sensors")).await
    }

    async fn fetch_predictions(
        &self,
        sensor_id: &str,
        request: PredictionRequest,
    ) -> Result<PredictionResponse, AppError> {
        let url = self.predictions_endpoint(&format!("/predict/{sensor_id}"));
        self.post_with_retry(url, &request).await
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>, AppError> {
        self.get_with_retry(self.endpoint("/notifications")).await
    }

    async fn fetch_unread_count(&self) -> Result<usize, AppError> {
        self.get_with_retry(self.endpoint("/notifications/unread/count"))
            .await
    }

    async fn fetch_last_unread(&self) -> Result<Option<Notification>, AppError> {
        // Single attempt; the next sync cycle refetches this view.
        self.get_once(&self.endpoint("/notifications/unread/last"))
            .await
    }

    async fn confirm_mark_as_read(&self, id: &str) -> Result<(), AppError> {
        self.post_confirmation(self.endpoint(&format!("/notifications/{id}/read")))
            .await
    }

    async fn confirm_mark_all_as_read(&self) -> Result<(), AppError> {
        self.post_confirmation(self.endpoint("/notifications/mark-all-read"))
            .await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(AppError::Unauthorized);
    }
    if status.is_success() {
        return Ok(response);
    }

    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    };
    let message = match response.text().await {
        Ok(body) => extract_error_message(&body).unwrap_or_else(fallback),
        Err(_) => fallback(),
    };
    Err(AppError::Api {
        status: status.as_u16(),
        message,
    })
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}

fn is_retryable(err: &AppError) -> bool {
    match err {
        AppError::Transport(_) => true,
        AppError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

fn trim_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
