//! HttpRemoteSaveStore - owner-namespaced canvas saves on a hosted backend.
//!
//! Endpoints:
//! - `GET    {base_url}/canvas-saves/{owner_id}` → record, or 404 when absent
//! - `PUT    {base_url}/canvas-saves/{owner_id}` → upsert, returns the stored record
//! - `DELETE {base_url}/canvas-saves/{owner_id}`

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use stackcanvas_core::config::RemoteConfig;
use stackcanvas_core::error::{CanvasError, Result};
use stackcanvas_core::save::{RemoteSaveStore, SaveOrigin, SaveRecord};

#[derive(Clone)]
pub struct HttpRemoteSaveStore {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpRemoteSaveStore {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        }
    }

    /// Builds a store from `[remote]` settings; `None` when no base URL is set.
    pub fn from_config(config: &RemoteConfig) -> Option<Self> {
        let base_url = config.base_url.as_deref()?.trim();
        if base_url.is_empty() {
            return None;
        }
        tracing::info!(
            "[HttpRemoteSaveStore] Using {} (token: {})",
            base_url,
            if config.api_token.is_some() {
                "present"
            } else {
                "none"
            }
        );
        Some(Self::new(base_url, config.api_token.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base_url}/canvas-saves/{owner_id}`, with `owner_id` percent-encoded
    /// as a single path segment.
    fn record_url(&self, owner_id: &str) -> Result<Url> {
        let invalid = |reason: String| {
            CanvasError::remote(format!("Invalid base URL '{}': {}", self.base_url, reason))
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("canvas-saves")
            .push(owner_id);
        Ok(url)
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.api_token {
            request.header("Authorization", format!("Bearer {}", token))
        } else {
            request
        }
    }
}

async fn failure(operation: &str, response: reqwest::Response) -> CanvasError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    CanvasError::remote(format!("{} failed with {}: {}", operation, status, body))
}

fn transport(operation: &str, err: reqwest::Error) -> CanvasError {
    CanvasError::remote(format!("{} failed: {}", operation, err))
}

#[async_trait]
impl RemoteSaveStore for HttpRemoteSaveStore {
    async fn fetch(&self, owner_id: &str) -> Result<Option<SaveRecord>> {
        let request = self.auth_request(self.client.get(self.record_url(owner_id)?));
        let response = request
            .send()
            .await
            .map_err(|e| transport("Fetch remote save", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let record: SaveRecord = response
                    .json()
                    .await
                    .map_err(|e| transport("Decode remote save", e))?;
                Ok(Some(record.with_origin(SaveOrigin::Remote)))
            }
            _ => Err(failure("Fetch remote save", response).await),
        }
    }

    async fn upsert(&self, owner_id: &str, record: &SaveRecord) -> Result<SaveRecord> {
        let mut body = record.clone();
        body.owner_id = Some(owner_id.to_string());

        let request = self.auth_request(self.client.put(self.record_url(owner_id)?).json(&body));
        let response = request
            .send()
            .await
            .map_err(|e| transport("Upsert remote save", e))?;

        if !response.status().is_success() {
            return Err(failure("Upsert remote save", response).await);
        }

        let stored: SaveRecord = response
            .json()
            .await
            .map_err(|e| transport("Decode upserted save", e))?;
        tracing::debug!("[HttpRemoteSaveStore] Upserted save for owner {}", owner_id);
        Ok(stored.with_origin(SaveOrigin::Remote))
    }

    async fn delete(&self, owner_id: &str) -> Result<()> {
        let request = self.auth_request(self.client.delete(self.record_url(owner_id)?));
        let response = request
            .send()
            .await
            .map_err(|e| transport("Delete remote save", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            _ => Err(failure("Delete remote save", response).await),
        }
    }
}
