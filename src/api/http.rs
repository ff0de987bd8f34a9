//! reqwest-backed share service client.

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{ApiEnvelope, ApiError, ApiResult, ShareApi, UploadReceipt, UploadRequest};

/// HTTP client for the share service
#[derive(Debug, Clone)]
pub struct HttpShareApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpShareApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a URL returned by the service against the base URL.
    ///
    /// The service hands out absolute URLs, root-relative paths (`/share/..`)
    /// and dot-relative paths (`./share/..`).
    pub fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if let Some(rest) = url.strip_prefix("./") {
            format!("{}/{}", self.base_url, rest)
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    async fn read_envelope<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> ApiResult<T> {
        let status = resp.status();
        let body = resp.bytes().await.map_err(map_reqwest_error)?;

        match serde_json::from_slice::<ApiEnvelope<T>>(&body) {
            Ok(envelope) => envelope.into_result(),
            Err(e) => {
                warn!(status = %status, error = %e, "Share service returned a non-envelope body");
                Err(ApiError::InvalidResponse(format!("HTTP {}: {}", status, e)))
            }
        }
    }
}

impl ShareApi for HttpShareApi {
    async fn upload(&self, request: UploadRequest) -> ApiResult<UploadReceipt> {
        let url = format!("{}/api/upload", self.base_url);
        let (expire_time, expire_unit) = request.duration.expire_pair();

        let mut form = Form::new()
            .text("expireTime", expire_time.to_string())
            .text("expireUnit", expire_unit.to_string());

        if let Some(file) = request.file {
            debug!(name = %file.file_name, size = file.bytes.len(), "Attaching file");
            form = form.part("file", Part::bytes(file.bytes).file_name(file.file_name));
        }
        if let Some(text) = request.text {
            form = form.text("text", text);
        }
        if let Some(code) = request.code {
            form = form.text("code", code);
        }

        debug!(%url, "Uploading share");
        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        self.read_envelope(resp).await
    }

    async fn resolve_share(&self, code: &str) -> ApiResult<String> {
        let url = format!("{}/api/share/{}", self.base_url, code);
        debug!(%url, "Resolving share code");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let link: String = self.read_envelope(resp).await?;
        Ok(self.absolute_url(&link))
    }

    async fn fetch(&self, url: &str) -> ApiResult<Vec<u8>> {
        let url = self.absolute_url(url);
        debug!(%url, "Fetching file");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }

        let bytes = resp.bytes().await.map_err(map_reqwest_error)?;
        Ok(bytes.to_vec())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ApiError {
    if e.is_decode() {
        ApiError::InvalidResponse(e.to_string())
    } else {
        ApiError::Transport(e.to_string())
    }
}
