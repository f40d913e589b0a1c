//! Estate API client.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use reqwest::{Method, Request, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::{ApiError, ApiResult, classify_reqwest_error};
use super::pipeline::Pipeline;
use super::Envelope;
use crate::config::{ApiConfig, DEFAULT_BASE_URL};
use crate::session::SessionStore;

/// Standard User-Agent header for gatepass API requests.
pub const USER_AGENT: &str = concat!("gatepass/", env!("CARGO_PKG_VERSION"));

/// HTTP client wrapper: one attempt per call, no retries.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    pipeline: Pipeline,
}

impl ApiClient {
    /// Creates a client for the configured API with the session pipeline
    /// (bearer injection, logout on 401).
    pub fn new(config: &ApiConfig, session: &SessionStore) -> Result<Self> {
        let base_url = config.resolve_base_url()?;
        Self::with_pipeline(base_url, config.timeout(), Pipeline::for_session(session))
    }

    /// Creates a client with an explicit pipeline.
    ///
    /// # Panics
    /// - In test builds (`#[cfg(test)]`), panics if `base_url` is the production API.
    /// - At runtime, panics if `GATEPASS_BLOCK_REAL_API=1` and `base_url` is the production API.
    ///
    /// This prevents tests from accidentally making real network requests.
    /// Use `GATEPASS_API_BASE_URL` or config to point to a mock server.
    pub fn with_pipeline(
        base_url: impl Into<String>,
        timeout: Duration,
        pipeline: Pipeline,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        // Compile-time guard for unit tests
        #[cfg(test)]
        if base_url == DEFAULT_BASE_URL {
            panic!(
                "Tests must not use the production estate API!\n\
                 Point the client at a mock server (e.g., wiremock).\n\
                 Found base_url: {base_url}"
            );
        }

        // Runtime guard for integration tests (set GATEPASS_BLOCK_REAL_API=1 in test harness)
        #[cfg(not(test))]
        if std::env::var("GATEPASS_BLOCK_REAL_API").is_ok_and(|v| v == "1")
            && base_url == DEFAULT_BASE_URL
        {
            panic!(
                "GATEPASS_BLOCK_REAL_API=1 but trying to use the production estate API!\n\
                 Set GATEPASS_API_BASE_URL to a mock server.\n\
                 Found base_url: {base_url}"
            );
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            pipeline,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins an endpoint onto the base URL; leading slashes are optional.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Starts a request against `endpoint`. Send it with [`ApiClient::send`]
    /// so the pipeline runs.
    pub fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(endpoint))
            .header(ACCEPT, "application/json")
    }

    /// Sends a request through the pipeline.
    ///
    /// Non-success statuses are turned into [`ApiError`] after every response
    /// stage has run, so a 401 has already cleared the session by the time
    /// the caller sees the error.
    pub async fn send(&self, request: Request) -> ApiResult<Response> {
        let request = self.pipeline.apply_request(request);
        let method = request.method().clone();
        let path = request.url().path().to_string();
        tracing::debug!(%method, %path, "sending request");

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let err = classify_reqwest_error(&e);
                tracing::debug!(%method, %path, kind = %err.kind, "request failed");
                return Err(err);
            }
        };

        let response = self.pipeline.apply_response(response);
        let status = response.status();
        tracing::debug!(%method, %path, status = status.as_u16(), "received response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::http_status(status, &body))
    }

    /// Sends a JSON request and decodes the `{data: ...}` envelope.
    ///
    /// A body that serializes to `null` is not sent.
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> ApiResult<Envelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self.request(method, endpoint);
        if let Some(body) = body {
            let value = serde_json::to_value(body)
                .map_err(|e| ApiError::parse(format!("Failed to encode request: {e}")))?;
            if !value.is_null() {
                builder = builder.json(&value);
            }
        }
        let request = builder.build().map_err(|e| classify_reqwest_error(&e))?;

        let response = self.send(request).await?;
        let bytes = response.bytes().await.map_err(|e| classify_reqwest_error(&e))?;
        let bytes: &[u8] = if bytes.trim_ascii().is_empty() {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(bytes)
            .map_err(|e| ApiError::parse(format!("Failed to parse response from {endpoint}: {e}")))
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<Envelope<T>> {
        self.send_json::<(), T>(Method::GET, endpoint, None).await
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> ApiResult<Envelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, endpoint, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<Envelope<T>> {
        self.send_json::<(), T>(Method::DELETE, endpoint, None).await
    }
}
