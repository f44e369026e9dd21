use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::types::{Service, UpstreamError};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Shared request plumbing for the typed service clients.
#[derive(Debug, Clone)]
pub(crate) struct JsonClient {
    http: Client,
    config: ServiceConfig,
    service: Service,
}

impl JsonClient {
    pub fn new(config: ServiceConfig, service: Service) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::new(service, format!("client construction failed: {e}")))?;

        Ok(Self {
            http,
            config,
            service,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    pub async fn post(&self, path: &str, body: &impl Serialize) -> Result<Value, UpstreamError> {
        let mut request = self.http.post(self.url(path)).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::new(self.service, format!("request failed: {e}")))?;
        self.decode(path, response).await
    }

    pub async fn get(&self, path: &str) -> Result<Value, UpstreamError> {
        match self.get_opt(path).await? {
            Some(value) => Ok(value),
            None => Err(UpstreamError::new(
                self.service,
                format!("{path} not found"),
            )),
        }
    }

    /// GET where 404 is an answer rather than a failure.
    pub async fn get_opt(&self, path: &str) -> Result<Option<Value>, UpstreamError> {
        let mut request = self.http.get(self.url(path));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::new(self.service, format!("request failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.decode(path, response).await.map(Some)
    }

    async fn decode(&self, path: &str, response: reqwest::Response) -> Result<Value, UpstreamError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(UpstreamError::new(
                self.service,
                format!("HTTP {status} from {path}: {snippet}"),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| UpstreamError::new(self.service, format!("undecodable response from {path}: {e}")))
    }
}
