// 🌐 External sources - country snapshot and exchange rates over HTTP
//
// Every fetch is bounded by an explicit timeout and never retried here.

use crate::country::ExternalCountry;
use crate::rates::RatesPayload;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which external feed a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Countries,
    ExchangeRates,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Countries => write!(f, "countries"),
            SourceKind::ExchangeRates => write!(f, "exchange rates"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("could not decode response: {0}")]
    Decode(String),
}

// ============================================================================
// SOURCE TRAITS
// ============================================================================

#[async_trait]
pub trait CountrySource: Send + Sync {
    /// Short label of the upstream, used in error reports
    fn endpoint(&self) -> &str;

    async fn fetch_countries(&self) -> Result<Vec<ExternalCountry>, SourceError>;
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Short label of the upstream, used in error reports
    fn endpoint(&self) -> &str;

    async fn fetch_rates(&self) -> Result<RatesPayload, SourceError>;
}

// ============================================================================
// HTTP IMPLEMENTATIONS
// ============================================================================

/// Shared GET-and-decode plumbing for both feeds.
#[derive(Debug, Clone)]
struct JsonEndpoint {
    client: reqwest::Client,
    url: String,
    label: String,
    timeout: Duration,
}

impl JsonEndpoint {
    fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        let url = url.into();
        let label = reqwest::Url::parse(&url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string))
            .unwrap_or_else(|| url.clone());

        JsonEndpoint {
            client,
            url,
            label,
            timeout,
        }
    }

    async fn get<T: DeserializeOwned>(&self) -> Result<T, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))
    }

    fn transport_error(&self, error: reqwest::Error) -> SourceError {
        if error.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::Transport(error.to_string())
        }
    }
}

/// Country snapshot source (restcountries v2 shape).
#[derive(Debug, Clone)]
pub struct HttpCountrySource {
    endpoint: JsonEndpoint,
}

impl HttpCountrySource {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        HttpCountrySource {
            endpoint: JsonEndpoint::new(client, url, timeout),
        }
    }
}

#[async_trait]
impl CountrySource for HttpCountrySource {
    fn endpoint(&self) -> &str {
        &self.endpoint.label
    }

    async fn fetch_countries(&self) -> Result<Vec<ExternalCountry>, SourceError> {
        self.endpoint.get().await
    }
}

/// Exchange-rate source (open.er-api shape).
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    endpoint: JsonEndpoint,
}

impl HttpRateSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        HttpRateSource {
            endpoint: JsonEndpoint::new(client, url, timeout),
        }
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn endpoint(&self) -> &str {
        &self.endpoint.label
    }

    async fn fetch_rates(&self) -> Result<RatesPayload, SourceError> {
        self.endpoint.get().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_label_is_host() {
        let source = HttpCountrySource::new(
            reqwest::Client::new(),
            "https://restcountries.com/v2/all?fields=name,capital",
            Duration::from_secs(10),
        );
        assert_eq!(source.endpoint(), "restcountries.com");
    }

    #[test]
    fn test_endpoint_label_falls_back_to_raw_url() {
        let source =
            HttpRateSource::new(reqwest::Client::new(), "not a url", Duration::from_secs(10));
        assert_eq!(source.endpoint(), "not a url");
    }

    #[test]
    fn test_source_kind_display() {
        assert_eq!(SourceKind::Countries.to_string(), "countries");
        assert_eq!(SourceKind::ExchangeRates.to_string(), "exchange rates");
    }

    #[test]
    fn test_timeout_message() {
        let err = SourceError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "request timed out after 10s");
    }
}
