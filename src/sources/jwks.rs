use jsonwebtoken::jwk::JwkSet;
use reqwest::Client;
use tracing::debug;

use crate::error::KeyRetrievalError;
use crate::sources::FetchKeySet;

/// Key set published by the authority at a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpKeySetSource {
    pub url: String,
    pub client: Client,
}

impl HttpKeySetSource {
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self { url: url.into(), client }
    }
}

impl FetchKeySet for HttpKeySetSource {
    async fn fetch_key_set(&self) -> Result<JwkSet, KeyRetrievalError> {
        debug!(url = %self.url, "fetching json web key set");
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(KeyRetrievalError::Status(response.status()));
        }

        let body = response.text().await?;
        let key_set: JwkSet = serde_json::from_str(&body)
            .map_err(|e| KeyRetrievalError::MalformedKeySet(e.to_string()))?;
        debug!(url = %self.url, keys = key_set.keys.len(), "json web key set received");
        Ok(key_set)
    }
}
