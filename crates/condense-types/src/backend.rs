//! HTTP client for the backend's context-management endpoint

use serde::{Deserialize, Serialize};

use crate::{
    api::ApiMessage,
    error::{Error, Result},
    types::Message,
};

/// What the backend should do with the submitted history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManageAction {
    /// Replace the history with a summary
    Summarize,
}

/// Request body for `POST /context/manage`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManageContextRequest {
    messages: Vec<ApiMessage>,
    manage_action: ManageAction,
}

/// Response body from `POST /context/manage`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageContextResponse {
    pub messages: Vec<ApiMessage>,
    #[serde(default)]
    pub token_counts: Vec<u64>,
}

/// Context-management backend client
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: Option<String>,
}

impl BackendClient {
    /// Create a client for a backend base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: None,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("CONDENSE_BACKEND_URL")
            .map_err(|_| Error::InvalidConfig("CONDENSE_BACKEND_URL is not set".into()))?;
        let client = Self::new(base_url);
        Ok(match std::env::var("CONDENSE_SECRET_KEY") {
            Ok(key) => client.with_secret_key(key),
            Err(_) => client,
        })
    }

    /// Authenticate requests with the backend's shared secret
    pub fn with_secret_key(mut self, key: impl Into<String>) -> Self {
        self.secret_key = Some(key.into());
        self
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/context/manage", self.base_url)
    }

    /// Ask the backend to manage the given history
    pub async fn manage_context(
        &self,
        messages: &[Message],
        action: ManageAction,
    ) -> Result<ManageContextResponse> {
        let body = ManageContextRequest {
            messages: messages.iter().map(ApiMessage::from).collect(),
            manage_action: action,
        };
        let url = self.endpoint();

        tracing::debug!(
            "Context manage request: {} ({} messages, {:?})",
            url,
            body.messages.len(),
            action
        );

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.secret_key {
            request = request.header("X-Secret-Key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                text
            };
            return Err(Error::api(status.as_u16(), message));
        }

        let bytes = response.bytes().await?;
        let parsed: ManageContextResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed)
    }
}
