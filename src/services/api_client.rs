use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::ApiSettings;
use crate::core::rate_limit::RateLimiter;
use crate::core::retry::RetryPolicy;
use crate::core::shutdown::ShutdownSignal;
use crate::models::{Action, Candidate, CandidatesResponse, SwipeRequest, SwipeResponse};

/// Errors that can occur when talking to the candidate service
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("network error after {attempts} attempt(s): {source}")]
    Network {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("server error {status} after {attempts} attempt(s)")]
    ServerError { status: u16, attempts: u32 },

    #[error("unexpected status: {status}")]
    UnexpectedStatus { status: u16 },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// HTTP status of the final response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ServerError { status, .. } | ApiError::UnexpectedStatus { status } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Number of attempts spent before giving up on a transient failure.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ApiError::ServerError { attempts, .. } | ApiError::Network { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }
}

/// Operations the dispatch pipeline needs from the remote service
#[async_trait]
pub trait SwipeApi: Send + Sync {
    async fn fetch_candidates(
        &self,
        limit: usize,
        shutdown: &ShutdownSignal,
    ) -> Result<Vec<Candidate>, ApiError>;

    async fn submit_swipe(
        &self,
        candidate_id: &str,
        action: Action,
        shutdown: &ShutdownSignal,
    ) -> Result<SwipeResponse, ApiError>;
}

/// HTTP client for the candidate service
///
/// Every call:
/// - waits for the shared rate limiter (one call per interval across all callers)
/// - carries `Authorization: Bearer <token>` when a token is configured
/// - retries connection failures, timeouts (body reads included), 429 and 5xx with exponential backoff
pub struct ApiClient {
    base_url: Url,
    token: Option<String>,
    client: Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client with default timeouts, limits and retries
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let mut settings = ApiSettings::with_base_url(base_url);
        settings.token = token;
        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(&settings.base_url).map_err(|e| ApiError::InvalidBaseUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl {
                url: settings.base_url.clone(),
                reason: "expected an http(s) URL".to_string(),
            });
        }
        // Relative joins keep any path prefix, e.g. http://host/api/ + candidates
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            base_url,
            token: settings.bearer_token().map(str::to_string),
            client,
            limiter: RateLimiter::new(settings.rate_interval()),
            retry: RetryPolicy::new(settings.retry_count, settings.retry_base()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Fetch up to `limit` candidates
    pub async fn fetch_candidates(
        &self,
        limit: usize,
        shutdown: &ShutdownSignal,
    ) -> Result<Vec<Candidate>, ApiError> {
        let mut url = self.endpoint("candidates")?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());

        tracing::debug!("Fetching candidates from: {}", url);

        let body = self.execute(Method::GET, url, None, shutdown).await?;
        let response: CandidatesResponse = decode(&body)?;
        Ok(response.into_candidates())
    }

    /// Submit one decision
    pub async fn submit_swipe(
        &self,
        candidate_id: &str,
        action: Action,
        shutdown: &ShutdownSignal,
    ) -> Result<SwipeResponse, ApiError> {
        let url = self.endpoint("swipe")?;
        let request = SwipeRequest::new(candidate_id, action);

        tracing::debug!(candidate_id, %action, "Submitting swipe");

        let body = self.execute(Method::POST, url, Some(&request), shutdown).await?;
        decode(&body)
    }

    /// Liveness check against `GET /healthz`
    pub async fn health(&self, shutdown: &ShutdownSignal) -> Result<(), ApiError> {
        let url = self.endpoint("healthz")?;
        self.execute(Method::GET, url, None, shutdown).await?;
        Ok(())
    }

    /// Rate-limited request with retries; returns the body of a 2xx response.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&SwipeRequest>,
        shutdown: &ShutdownSignal,
    ) -> Result<Vec<u8>, ApiError> {
        self.limiter
            .acquire(shutdown)
            .await
            .map_err(|_| ApiError::Cancelled)?;

        let max_attempts = self.retry.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            let mut request = self.client.request(method.clone(), url.clone());
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let attempts = attempt.saturating_add(1);
            let is_last = attempts >= max_attempts;

            match request.send().await {
                Ok(response) if RetryPolicy::is_retryable_status(response.status().as_u16()) => {
                    let status = response.status().as_u16();
                    if is_last {
                        return Err(ApiError::ServerError { status, attempts });
                    }
                    tracing::warn!(%url, attempt, status, "Transient server error, retrying");
                }
                Ok(response) if !response.status().is_success() => {
                    let status = response.status().as_u16();
                    let text = response.text().await.unwrap_or_default();
                    tracing::debug!(%url, status, body = %text.trim(), "Non-success response");
                    return Err(ApiError::UnexpectedStatus { status });
                }
                // The body of a 2xx is part of the attempt: a stalled or
                // truncated read is retried like a failed send.
                Ok(response) => match response.bytes().await {
                    Ok(bytes) => return Ok(bytes.to_vec()),
                    Err(e) if is_last => {
                        return Err(ApiError::Network {
                            attempts,
                            source: e,
                        })
                    }
                    Err(e) => {
                        tracing::warn!(%url, attempt, error = %e, "Reading response body failed, retrying");
                    }
                },
                Err(e) => {
                    if is_last {
                        return Err(ApiError::Network {
                            attempts,
                            source: e,
                        });
                    }
                    tracing::warn!(%url, attempt, error = %e, "Request failed, retrying");
                }
            }

            let delay = self.retry.delay_for(attempt);
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Err(ApiError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt = attempts;
        }
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl SwipeApi for ApiClient {
    async fn fetch_candidates(
        &self,
        limit: usize,
        shutdown: &ShutdownSignal,
    ) -> Result<Vec<Candidate>, ApiError> {
        ApiClient::fetch_candidates(self, limit, shutdown).await
    }

    async fn submit_swipe(
        &self,
        candidate_id: &str,
        action: Action,
        shutdown: &ShutdownSignal,
    ) -> Result<SwipeResponse, ApiError> {
        ApiClient::submit_swipe(self, candidate_id, action, shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new("http://localhost:8080", Some("t1".to_string())).unwrap();
        assert_eq!(client.base_url.as_str(), "http://localhost:8080/");
        assert_eq!(client.token.as_deref(), Some("t1"));
        assert_eq!(client.retry_policy().max_attempts(), 4);
        assert_eq!(client.limiter.interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ApiClient::new("not a url", None).err().unwrap();
        assert!(matches!(err, ApiError::InvalidBaseUrl { .. }));

        let err = ApiClient::new("mailto:bot@example.com", None).err().unwrap();
        assert!(matches!(err, ApiError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_empty_token_sends_no_auth() {
        let client = ApiClient::new("http://localhost:8080", Some(String::new())).unwrap();
        assert!(client.token.is_none());
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let client = ApiClient::new("http://localhost:8080/api/v1", None).unwrap();
        assert_eq!(
            client.endpoint("swipe").unwrap().as_str(),
            "http://localhost:8080/api/v1/swipe"
        );
    }

    #[test]
    fn test_error_accessors() {
        let err = ApiError::ServerError { status: 429, attempts: 4 };
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.attempts(), Some(4));
        assert_eq!(ApiError::UnexpectedStatus { status: 404 }.status(), Some(404));
        assert_eq!(ApiError::Cancelled.status(), None);
    }
}
