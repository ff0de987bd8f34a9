//! Mock share service for testing.
//!
//! Provides an in-process implementation of `ShareApi` that stores uploads in
//! memory and hands out predictable codes and URLs. Supports configurable
//! failure scenarios so fallback paths can be exercised without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{ApiError, ApiResult, ShareApi, UploadReceipt, UploadRequest};

/// Type of failure to simulate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockError {
    /// Every call fails as if the service were unreachable.
    Offline,
    /// Every call is answered with a failure envelope carrying this message.
    Rejected(String),
}

impl MockError {
    fn to_api_error(&self) -> ApiError {
        match self {
            MockError::Offline => ApiError::Transport("connection refused".to_string()),
            MockError::Rejected(message) => ApiError::Rejected {
                code: 0,
                message: message.clone(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    /// code → download URL
    shares: HashMap<String, String>,
    /// download URL → bytes
    blobs: HashMap<String, Vec<u8>>,
    uploads: Vec<UploadRequest>,
    error: Option<MockError>,
}

/// In-memory share service
#[derive(Debug, Default)]
pub struct MockShareApi {
    state: Mutex<MockState>,
    counter: AtomicU64,
    resolve_calls: AtomicU64,
    fetch_calls: AtomicU64,
}

impl MockShareApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service that fails every call with `error`.
    pub fn with_error(error: MockError) -> Self {
        let api = Self::new();
        api.set_error(Some(error));
        api
    }

    /// A service that cannot be reached.
    pub fn offline() -> Self {
        Self::with_error(MockError::Offline)
    }

    /// Change the simulated failure mode.
    pub fn set_error(&self, error: Option<MockError>) {
        if let Ok(mut state) = self.state.lock() {
            state.error = error;
        }
    }

    /// Register a share that exists on the service side only.
    pub fn seed_share(&self, code: &str, url: &str, bytes: &[u8]) {
        if let Ok(mut state) = self.state.lock() {
            state.shares.insert(code.to_string(), url.to_string());
            state.blobs.insert(url.to_string(), bytes.to_vec());
        }
    }

    /// Upload requests received so far.
    pub fn uploads(&self) -> Vec<UploadRequest> {
        self.state
            .lock()
            .map(|s| s.uploads.clone())
            .unwrap_or_default()
    }

    pub fn resolve_calls(&self) -> u64 {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> u64 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> ApiResult<std::sync::MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| ApiError::Transport("mock state poisoned".to_string()))
    }
}

impl ShareApi for MockShareApi {
    async fn upload(&self, request: UploadRequest) -> ApiResult<UploadReceipt> {
        let mut state = self.lock()?;
        if let Some(ref error) = state.error {
            return Err(error.to_api_error());
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let code = request
            .code
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| format!("MOCK{:04}", n));
        let file_url = format!("/share/download?key={}&code={}", n, code);

        let bytes = match (&request.file, &request.text) {
            (Some(file), _) => file.bytes.clone(),
            (None, Some(text)) => text.as_bytes().to_vec(),
            (None, None) => Vec::new(),
        };
        state.blobs.insert(file_url.clone(), bytes);
        state.shares.insert(code.clone(), file_url.clone());
        state.uploads.push(request);

        Ok(UploadReceipt { file_url, code })
    }

    async fn resolve_share(&self, code: &str) -> ApiResult<String> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.lock()?;
        if let Some(ref error) = state.error {
            return Err(error.to_api_error());
        }

        state
            .shares
            .get(code)
            .cloned()
            .ok_or_else(|| ApiError::Rejected {
                code: 0,
                message: "Share not found or expired".to_string(),
            })
    }

    async fn fetch(&self, url: &str) -> ApiResult<Vec<u8>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.lock()?;
        if state.error == Some(MockError::Offline) {
            return Err(MockError::Offline.to_api_error());
        }

        state.blobs.get(url).cloned().ok_or(ApiError::Status(404))
    }
}
