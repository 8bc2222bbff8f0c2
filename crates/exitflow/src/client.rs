//! Control API client
//!
//! Talks to the deployed function URL. The URL and auth token come from
//! the environment — the same values `exitflow deploy` prints.

use anyhow::Context;
use exitflow_core::api::{ErrorResponse, HealthResponse, NodesResponse, StartResponse, StopResponse};

pub const ENV_URL: &str = "EXITFLOW_URL";

/// Outcome of a start request: a 409 means a node is already up, which is
/// information, not failure.
pub enum StartOutcome {
    Started(StartResponse),
    AlreadyRunning(String),
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var(ENV_URL).map_err(|_| {
            anyhow::anyhow!(
                "{ENV_URL} environment variable not set\n\n\
                 Hint: run 'exitflow deploy' first, then:\n  export {ENV_URL}=<function url>"
            )
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: std::env::var(exitflow_cloud::ENV_AUTH_TOKEN)
                .ok()
                .filter(|token| !token.is_empty()),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Extract the API's error message from a non-success response.
    async fn fail(response: reqwest::Response) -> anyhow::Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => anyhow::anyhow!(parsed.error),
            Err(_) => anyhow::anyhow!("request failed ({status}): {body}"),
        }
    }

    pub async fn health(&self) -> anyhow::Result<HealthResponse> {
        let response = self
            .request(reqwest::Method::GET, "/")
            .send()
            .await
            .context("failed to contact the control API")?;

        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }
        Ok(response.json().await?)
    }

    pub async fn instances(&self, region: &str) -> anyhow::Result<NodesResponse> {
        let response = self
            .request(reqwest::Method::GET, &format!("/{region}/instances"))
            .send()
            .await
            .context("failed to contact the control API")?;

        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }
        Ok(response.json().await?)
    }

    pub async fn start(&self, region: &str) -> anyhow::Result<StartOutcome> {
        let response = self
            .request(reqwest::Method::POST, &format!("/{region}/start"))
            .send()
            .await
            .context("failed to contact the control API")?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|parsed| parsed.error)
                .unwrap_or(body);
            return Ok(StartOutcome::AlreadyRunning(message));
        }

        if response.status() != reqwest::StatusCode::CREATED {
            return Err(Self::fail(response).await);
        }
        Ok(StartOutcome::Started(response.json().await?))
    }

    pub async fn stop(&self, region: &str) -> anyhow::Result<StopResponse> {
        let response = self
            .request(reqwest::Method::POST, &format!("/{region}/stop"))
            .send()
            .await
            .context("failed to contact the control API")?;

        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }
        Ok(response.json().await?)
    }

    pub async fn cleanup(&self, region: &str) -> anyhow::Result<StopResponse> {
        let response = self
            .request(reqwest::Method::POST, &format!("/{region}/cleanup"))
            .send()
            .await
            .context("failed to contact the control API")?;

        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }
        Ok(response.json().await?)
    }
}
