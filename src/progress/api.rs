//! Remote persistence boundary for tour progress.
//!
//! `ProgressApi` is the seam the store talks through; `HttpProgressApi` speaks
//! the `/guide-progress` REST surface over reqwest.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use secrecy::{ExposeSecret, SecretString};

use crate::config::ProgressApiConfig;
use crate::error::ProgressError;

use super::model::{ProgressMap, ProgressPatch};

/// Backend-agnostic persistence operations.
#[async_trait]
pub trait ProgressApi: Send + Sync {
    /// `GET /guide-progress`
    async fn fetch_all(&self) -> Result<ProgressMap, ProgressError>;

    /// `PATCH /guide-progress/{pageId}`
    async fn patch(&self, page_id: &str, patch: &ProgressPatch) -> Result<(), ProgressError>;

    /// `DELETE /guide-progress/{pageId}`, or the whole collection when `None`.
    async fn delete(&self, page_id: Option<&str>) -> Result<(), ProgressError>;
}

/// reqwest-backed client for the progress REST API.
pub struct HttpProgressApi {
    base_url: Url,
    auth_token: Option<SecretString>,
    client: reqwest::Client,
}

impl HttpProgressApi {
    pub fn new(config: &ProgressApiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            auth_token: config.auth_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Build `{base}/guide-progress[/{pageId}]`, percent-encoding the page id.
    fn endpoint(&self, page_id: Option<&str>) -> Result<Url, ProgressError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| ProgressError::Request {
                operation: "build_url".to_string(),
                reason: format!("{} cannot be used as a base URL", self.base_url),
            })?;
            segments.pop_if_empty().push("guide-progress");
            if let Some(id) = page_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => req.bearer_auth(token.expose_secret()),
            None => req,
        }
    }

    async fn send(&self, operation: &str, req: RequestBuilder) -> Result<Response, ProgressError> {
        let resp = req.send().await.map_err(|e| ProgressError::Request {
            operation: operation.to_string(),
            reason: e.to_string(),
        })?;

        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(ProgressError::Status {
            operation: operation.to_string(),
            status,
            body,
        })
    }
}

#[async_trait]
impl ProgressApi for HttpProgressApi {
    async fn fetch_all(&self) -> Result<ProgressMap, ProgressError> {
        let url = self.endpoint(None)?;
        let resp = self.send("load", self.request(Method::GET, url)).await?;
        resp.json::<ProgressMap>()
            .await
            .map_err(|e| ProgressError::Decode(e.to_string()))
    }

    async fn patch(&self, page_id: &str, patch: &ProgressPatch) -> Result<(), ProgressError> {
        let url = self.endpoint(Some(page_id))?;
        let req = self.request(Method::PATCH, url).json(patch);
        self.send("update", req).await?;
        Ok(())
    }

    async fn delete(&self, page_id: Option<&str>) -> Result<(), ProgressError> {
        let url = self.endpoint(page_id)?;
        self.send("reset", self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
