//! HTTP client for the content service
//!
//! Two read-only GET endpoints:
//!
//! - `GET {base}/api/content/{screen_location}/{language}`
//! - `GET {base}/api/dropdowns/{screen_location}/{language}`
//!
//! Non-2xx responses and bodies that do not parse are both fetch failures;
//! the caller never sees anything but a normalised payload or a
//! [`ContentError`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::wire::{ContentPayload, ContentResponse, DropdownPayload, DropdownResponse};
use crate::types::{ContentError, Result};

/// Source of remote content and dropdown payloads.
///
/// The resolvers only depend on this trait, so tests and alternative
/// transports can stand in for the HTTP client.
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn fetch_content(&self, screen_location: &str, language: &str) -> Result<ContentPayload>;

    async fn fetch_dropdowns(&self, screen_location: &str, language: &str) -> Result<DropdownPayload>;
}

/// reqwest-backed [`ContentApi`]
///
/// Only connecting is bounded here. The whole request is bounded by the
/// fetch deduplicator, so a slow response always settles as
/// [`ContentError::Timeout`] with the configured duration.
pub struct HttpContentApi {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl HttpContentApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ContentError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ContentError {
        if err.is_timeout() {
            ContentError::Timeout(self.timeout)
        } else {
            err.into()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn content_url(&self, screen_location: &str, language: &str) -> String {
        format!(
            "{}/api/content/{}/{}",
            self.base_url,
            urlencoding::encode(screen_location),
            urlencoding::encode(language)
        )
    }

    pub fn dropdowns_url(&self, screen_location: &str, language: &str) -> String {
        format!(
            "{}/api/dropdowns/{}/{}",
            self.base_url,
            urlencoding::encode(screen_location),
            urlencoding::encode(language)
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(url = url, error = %e, "Content service returned malformed JSON");
            ContentError::MalformedResponse(e.to_string())
        })
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn fetch_content(&self, screen_location: &str, language: &str) -> Result<ContentPayload> {
        let url = self.content_url(screen_location, language);
        let response: ContentResponse = self.get_json(&url).await?;
        response.into_payload()
    }

    async fn fetch_dropdowns(&self, screen_location: &str, language: &str) -> Result<DropdownPayload> {
        let url = self.dropdowns_url(screen_location, language);
        let response: DropdownResponse = self.get_json(&url).await?;
        response.into_payload()
    }
}
