//! JSON-over-HTTP platform client.
//!
//! Speaks to a generic object endpoint: `PUT /objects/{key}` upserts,
//! `GET /objects/{key}/images` returns the cached image state. Every call
//! carries a per-request timeout so one hung remote write cannot stall the
//! batch time-budget check indefinitely.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::remote::platform::{RemoteImageState, RemotePlatform};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Remote platform backed by an HTTP JSON API.
pub struct HttpPlatform {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpPlatform {
    /// Create a client against `base_url` with the default request timeout.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/objects/{}", self.base_url, key)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl RemotePlatform for HttpPlatform {
    async fn upsert(&self, key: &str, payload: &serde_json::Value) -> Result<String> {
        let url = self.object_url(key);
        let response = self
            .request(self.client.put(&url).json(payload))
            .send()
            .await
            .with_context(|| format!("upsert request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("upsert of '{key}' rejected by server"))?;

        let body: serde_json::Value = response
            .json()
            .await
            .context("upsert response is not valid JSON")?;
        match body.get("id").and_then(|v| v.as_str()) {
            Some(id) => Ok(id.to_string()),
            None => bail!("upsert response for '{key}' carries no remote id"),
        }
    }

    async fn lookup(&self, key: &str) -> Result<Option<String>> {
        let url = self.object_url(key);
        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("lookup request to {url} failed"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: serde_json::Value = response
            .error_for_status()
            .with_context(|| format!("lookup of '{key}' rejected by server"))?
            .json()
            .await
            .context("lookup response is not valid JSON")?;
        Ok(body
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    async fn delete(&self, remote_id: &str) -> Result<()> {
        let url = self.object_url(remote_id);
        self.request(self.client.delete(&url))
            .send()
            .await
            .with_context(|| format!("delete request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("delete of '{remote_id}' rejected by server"))?;
        Ok(())
    }

    async fn read_cached_state(&self, key: &str) -> Result<RemoteImageState> {
        let url = format!("{}/images", self.object_url(key));
        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("image state request to {url} failed"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(RemoteImageState::default());
        }
        response
            .error_for_status()
            .with_context(|| format!("image state of '{key}' rejected by server"))?
            .json()
            .await
            .context("image state response is not valid JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let platform = HttpPlatform::new("https://shop.example/api///", None).unwrap();
        assert_eq!(
            platform.object_url("AB-1"),
            "https://shop.example/api/objects/AB-1"
        );
    }
}
