//! Client side of the external share service
//!
//! The service stores uploaded content, owns expiry on its side and hands out
//! access codes. This module only speaks its HTTP contract:
//!
//! - `POST /api/upload` (multipart) answers `{code: 1, data: {fileUrl, code}}`
//! - `GET /api/share/{code}` answers `{code: 1, data: "<download url>"}`
//!
//! Any other `code` value is a rejection carrying a human-readable `msg`.

use std::future::Future;

use serde::Deserialize;
use thiserror::Error;

use crate::registry::ShareDuration;

mod http;
pub mod mock;

pub use http::HttpShareApi;

/// Envelope code the service uses for success
pub const SUCCESS_CODE: i64 = 1;

/// Errors from talking to the share service
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The service could not be reached or the connection broke.
    #[error("Share service unavailable: {0}")]
    Transport(String),

    /// The service answered with a failure envelope.
    #[error("{message}")]
    Rejected { code: i64, message: String },

    /// A download answered with a non-success HTTP status.
    #[error("Download failed with HTTP status {0}")]
    Status(u16),

    /// The service answered with something that is not the expected envelope.
    #[error("Unexpected response from share service: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Whether this error means the service was not reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

/// Result type for share service calls
pub type ApiResult<T> = Result<T, ApiError>;

/// `{code, data, msg}` response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    pub data: Option<T>,
    pub msg: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn into_result(self) -> ApiResult<T> {
        if self.code != SUCCESS_CODE {
            return Err(ApiError::Rejected {
                code: self.code,
                message: self
                    .msg
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Share not found or expired".to_string()),
            });
        }

        self.data
            .ok_or_else(|| ApiError::InvalidResponse("success without data".to_string()))
    }
}

/// The single file carried by an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Fields of one upload call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadRequest {
    pub file: Option<UploadFile>,
    pub text: Option<String>,
    /// Custom access code
    pub code: Option<String>,
    pub duration: ShareDuration,
}

/// Successful upload result
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(rename = "fileUrl", default)]
    pub file_url: String,
    pub code: String,
}

/// Operations offered by the share service.
pub trait ShareApi: Send + Sync {
    /// Upload content and obtain its access code.
    fn upload(&self, request: UploadRequest)
        -> impl Future<Output = ApiResult<UploadReceipt>> + Send;

    /// Resolve an access code to a download URL.
    fn resolve_share(&self, code: &str) -> impl Future<Output = ApiResult<String>> + Send;

    /// Fetch the bytes behind a download URL.
    fn fetch(&self, url: &str) -> impl Future<Output = ApiResult<Vec<u8>>> + Send;
}
