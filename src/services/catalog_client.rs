use crate::models::{
    BackendSettings, Cleaner, OperationError, OperationKind, OperationRequest, OperationResult,
    SelectionEntry,
};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Backend endpoints, relative to the configured base URL
pub const CLEANERS_PATH: &str = "/api/cleaners";
pub const CLEAN_PATH: &str = "/api/clean";
pub const ABORT_PATH: &str = "/api/abort";

/// Call contract of the cleaner backend.
///
/// Every call blocks its caller until the backend answers or the per-request deadline
/// expires, so they must only be awaited on a worker, never on the UI thread.
/// Implementations report faults as [`OperationError`] values and never panic.
pub trait CleanerBackend: Send + Sync + 'static {
    /// Fetch the list of cleaners installed on the backend host
    fn fetch_catalog(&self) -> impl Future<Output = Result<Vec<Cleaner>, OperationError>> + Send;

    /// Dry run: report what a clean of `selection` would remove
    fn preview(
        &self,
        selection: Vec<SelectionEntry>,
    ) -> impl Future<Output = Result<OperationResult, OperationError>> + Send;

    /// Remove the data matched by `selection`
    fn clean(
        &self,
        selection: Vec<SelectionEntry>,
    ) -> impl Future<Output = Result<OperationResult, OperationError>> + Send;

    /// Ask the backend to stop whatever it is running.
    ///
    /// Best effort: an acknowledgement does not mean an in-flight call returns early.
    fn abort(&self) -> impl Future<Output = Result<String, OperationError>> + Send;

    /// Run a dispatched request with the call matching its kind
    fn run(
        &self,
        request: OperationRequest,
    ) -> impl Future<Output = Result<OperationResult, OperationError>> + Send {
        async move {
            match request.kind {
                OperationKind::Preview => self.preview(request.selection).await,
                OperationKind::Clean => self.clean(request.selection).await,
            }
        }
    }
}

/// [`CleanerBackend`] over the backend's JSON HTTP API
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
    preview_path: String,
    timeout: Duration,
}

impl HttpCatalogClient {
    /// Build a client from the backend settings
    ///
    /// # Errors
    /// Fails only if the TLS backend cannot be initialised
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let timeout = settings.request_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            preview_path: settings.preview_path.clone(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, OperationError> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;
        self.read_envelope(&url, response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Envelope<T>, OperationError> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;
        self.read_envelope(&url, response).await
    }

    async fn read_envelope<T: DeserializeOwned>(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> Result<Envelope<T>, OperationError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        decode_envelope(status, &body, self.timeout).inspect_err(|e| {
            tracing::warn!("Backend call {} failed: {}", url, e);
        })
    }

    fn transport_error(&self, url: &str, error: reqwest::Error) -> OperationError {
        let mapped = if error.is_timeout() {
            OperationError::Timeout(self.timeout)
        } else if error.is_decode() {
            OperationError::MalformedResponse(error.to_string())
        } else {
            // Connect, DNS, and reset errors all mean the backend could not be reached
            OperationError::Unreachable(error.to_string())
        };
        tracing::warn!("Backend call {} failed: {}", url, mapped);
        mapped
    }

    async fn run_selection(
        &self,
        path: &str,
        selection: Vec<SelectionEntry>,
    ) -> Result<OperationResult, OperationError> {
        let envelope = self
            .post::<OperationResult, _>(path, Some(selection.as_slice()))
            .await?;

        Ok(match envelope {
            Envelope::Full(result) => result,
            Envelope::Partial(result) => OperationResult {
                partial: true,
                ..result.unwrap_or_default()
            },
        })
    }
}

impl CleanerBackend for HttpCatalogClient {
    async fn fetch_catalog(&self) -> Result<Vec<Cleaner>, OperationError> {
        // An empty catalog arrives as `null`
        let envelope = self.get::<Option<Vec<Cleaner>>>(CLEANERS_PATH).await?;
        let cleaners = match envelope {
            Envelope::Full(cleaners) => cleaners.unwrap_or_default(),
            Envelope::Partial(cleaners) => {
                tracing::warn!("Backend returned a partial catalog");
                cleaners.flatten().unwrap_or_default()
            }
        };

        tracing::info!("Fetched {} cleaners from {}", cleaners.len(), self.base_url);
        Ok(cleaners)
    }

    async fn preview(
        &self,
        selection: Vec<SelectionEntry>,
    ) -> Result<OperationResult, OperationError> {
        self.run_selection(&self.preview_path, selection).await
    }

    async fn clean(&self, selection: Vec<SelectionEntry>) -> Result<OperationResult, OperationError> {
        self.run_selection(CLEAN_PATH, selection).await
    }

    async fn abort(&self) -> Result<String, OperationError> {
        let envelope = self.post::<Value, ()>(ABORT_PATH, None).await?;
        let value = match envelope {
            Envelope::Full(value) => value,
            Envelope::Partial(value) => value.unwrap_or(Value::Null),
        };

        Ok(value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

/// A decoded 2xx body: either the plain payload, or the
/// `{"partial": true, "data": ...}` envelope the backend sends after a cancelled run
#[derive(Debug, PartialEq)]
enum Envelope<T> {
    Full(T),
    Partial(Option<T>),
}

/// Map an HTTP status and body onto the call contract.
///
/// - empty body or 408 → `Timeout`
/// - any other non-2xx → `MalformedResponse` with the backend's `error` text
/// - non-JSON or schema mismatch → `MalformedResponse`
fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
    timeout: Duration,
) -> Result<Envelope<T>, OperationError> {
    if body.iter().all(u8::is_ascii_whitespace) || status == StatusCode::REQUEST_TIMEOUT {
        return Err(OperationError::Timeout(timeout));
    }

    let value: Option<Value> = serde_json::from_slice(body).ok();

    if !status.is_success() {
        let detail = value
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| String::from_utf8_lossy(body).trim().chars().take(200).collect());
        return Err(OperationError::MalformedResponse(format!(
            "HTTP {}: {}",
            status, detail
        )));
    }

    let value = value.ok_or_else(|| {
        OperationError::MalformedResponse("response body is not valid JSON".to_string())
    })?;

    let is_partial = value
        .get("partial")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if is_partial {
        let data = value.get("data").cloned().unwrap_or(Value::Null);
        if data.is_null() {
            return Ok(Envelope::Partial(None));
        }
        return serde_json::from_value(data)
            .map(|t| Envelope::Partial(Some(t)))
            .map_err(|e| OperationError::MalformedResponse(e.to_string()));
    }

    serde_json::from_value(value)
        .map(Envelope::Full)
        .map_err(|e| OperationError::MalformedResponse(e.to_string()))
}
