use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use logtide_types::{ProviderContext, ProviderKind};

use crate::error::{ProviderError, Result};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// Relative to the base URL so a path prefix on it is kept
const CONNECT_PATH: &str = "api/logs/connect";
const DISCONNECT_PATH: &str = "api/logs/disconnect";
const PROVIDER_PATH: &str = "api/logs/provider";

/// Body of a provider connect call
#[derive(Clone, Debug, Serialize)]
pub struct ConnectRequest {
    pub provider: ProviderKind,

    /// Provider-specific credential payload, forwarded untouched
    pub credentials: Value,
}

/// Operations on the provider link.
///
/// The streaming core never calls these; the host uses them to decide when
/// to start or stop a session.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Link a provider and return its display metadata
    async fn connect(&self, request: &ConnectRequest) -> Result<ProviderContext>;

    /// Unlink the current provider. Follow with a supervisor `stop()`.
    async fn disconnect(&self) -> Result<()>;

    /// The provider currently linked, if any
    async fn linked_provider(&self) -> Result<Option<ProviderContext>>;
}

/// HTTP implementation of [`ProviderApi`]
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: Url,
}

impl ProviderClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the API server (e.g., "http://localhost:8080"
    ///   or "https://gateway/backend")
    /// * `token` - Bearer token sent with every request, if any
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = token {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ProviderError::InvalidToken(e.to_string()))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .default_headers(headers)
            .build()?;

        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        if response.status().is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))
        } else {
            Err(self.extract_error(response).await)
        }
    }

    async fn extract_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        // Prefer an {"error": "..."} or {"message": "..."} body when present
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                ["error", "message"]
                    .iter()
                    .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or(body);

        ProviderError::server(status, message)
    }
}

#[async_trait]
impl ProviderApi for ProviderClient {
    #[instrument(skip(self, request), fields(provider = %request.provider))]
    async fn connect(&self, request: &ConnectRequest) -> Result<ProviderContext> {
        let url = self.endpoint(CONNECT_PATH)?;
        debug!("Linking provider via {}", url);

        let response = self.client.post(url).json(request).send().await?;
        self.handle_response(response).await
    }

    #[instrument(skip(self))]
    async fn disconnect(&self) -> Result<()> {
        let url = self.endpoint(DISCONNECT_PATH)?;
        let response = self.client.post(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    #[instrument(skip(self))]
    async fn linked_provider(&self) -> Result<Option<ProviderContext>> {
        let url = self.endpoint(PROVIDER_PATH)?;
        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let mut body: Value = self.handle_response(response).await?;
        let Some(object) = body.as_object_mut() else {
            return Ok(None);
        };

        let connected = object
            .remove("connected")
            .map(|v| v.as_bool().unwrap_or(false))
            .unwrap_or(true);
        if !connected || !object.contains_key("provider") {
            return Ok(None);
        }

        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}
