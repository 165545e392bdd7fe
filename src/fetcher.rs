use crate::config::ProviderConfig;
use crate::credentials::CredentialSource;
use crate::error::{AppError, Result};
use crate::models::ForecastResponse;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Issues one forecast request per call. Failures are returned as-is; there is
/// no retry.
pub struct Fetcher {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
}

impl Fetcher {
    pub fn new(config: &ProviderConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("forecast-enrich/0.1.0")
            .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            credentials,
        })
    }

    pub async fn fetch(&self, query: &str, days: i32) -> Result<ForecastResponse> {
        let api_key = self.credentials.api_key().ok_or_else(|| {
            AppError::Config(format!(
                "Weather API key is not configured. Set {} in your .env file.",
                self.credentials.name()
            ))
        })?;

        debug!("Requesting {}-day forecast for '{}'", days, query);

        let days = days.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", api_key.as_str()),
                ("q", query),
                ("days", days.as_str()),
                ("aqi", "no"),
                ("alerts", "no"),
            ])
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(network_error)?;

        if status != StatusCode::OK {
            let message = provider_error_message(status, &body);
            warn!("Forecast request for '{}' failed ({}): {}", query, status, message);
            return Err(AppError::Provider(message));
        }

        let forecast: ForecastResponse = serde_json::from_slice(&body).map_err(|e| {
            warn!("Malformed forecast body for '{}': {}", query, e);
            AppError::Parse("Failed to parse response from weather service.".to_string())
        })?;

        info!(
            "Fetched {} forecast day(s) for {}",
            forecast.forecast.forecastday.len(),
            forecast.location.name
        );
        Ok(forecast)
    }
}

fn network_error(e: reqwest::Error) -> AppError {
    // The URL carries the API key
    let e = e.without_url();
    AppError::Network(format!(
        "Network error while contacting weather service: {}",
        e
    ))
}

/// Pull `error.message` from the provider's `{"error": {"message": ...}}`
/// envelope.
///
/// A body that is not JSON, or whose top level or `error` member is not an
/// object (including `null`), only yields a description of the status.
fn provider_error_message(status: StatusCode, body: &[u8]) -> String {
    let unreadable = || {
        format!(
            "Unexpected error from weather service (status {}).",
            status.as_u16()
        )
    };

    let Ok(Value::Object(envelope)) = serde_json::from_slice::<Value>(body) else {
        return unreadable();
    };

    match envelope.get("error") {
        None => "Unknown error from weather service.".to_string(),
        Some(Value::Object(error)) => match error.get("message") {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Null) | None => "Unknown error from weather service.".to_string(),
            Some(other) => other.to_string(),
        },
        Some(_) => unreadable(),
    }
}
