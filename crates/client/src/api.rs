//! REST client for the conversion backend HTTP endpoints.
//!
//! Wraps job submission (multipart upload of the chat export plus
//! JSON-encoded options) and artifact download using [`reqwest`].

use std::time::Duration;

use serde::Deserialize;

use chatprint_core::options::ExportOptions;
use chatprint_core::types::ClientId;

/// Shown when the backend rejects an upload without a usable message.
const GENERIC_SUBMIT_ERROR: &str = "Upload failed, please try again";

/// HTTP client for one conversion backend.
pub struct ConvertApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response returned by the `/convert` endpoint after accepting an
/// upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// Server-assigned session identifier; scopes the progress stream.
    pub client_id: ClientId,
}

/// Error body returned by the backend on a rejected request.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Errors from the conversion REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Conversion API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Server-supplied message, or a generic fallback.
        message: String,
    },
}

impl ConvertApi {
    /// Create a new API client for a conversion backend.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:8080`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Create an API client with a bounded per-request timeout.
    ///
    /// The backend enforces no deadline of its own; callers that cannot
    /// tolerate a stalled submission should set one here.
    pub fn with_timeout(api_url: String, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_url })
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// Base HTTP URL of the backend.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Upload a chat export for conversion.
    ///
    /// Sends a `POST /convert` multipart request carrying the file and
    /// the JSON-encoded options. Returns the server-assigned client ID
    /// that scopes the progress stream.
    pub async fn submit_export(
        &self,
        file_name: &str,
        file_bytes: Vec<u8>,
        options: &ExportOptions,
    ) -> Result<SubmitResponse, ApiError> {
        let options_json =
            serde_json::to_string(options).expect("ExportOptions is always serialisable");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(file_bytes).file_name(file_name.to_string()),
            )
            .text("options", options_json);

        let response = self
            .client
            .post(format!("{}/convert", self.api_url))
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download a previously rendered document.
    ///
    /// `pdf_url` is the URL from the success notification; relative
    /// values are resolved against the API base URL. Only meaningful
    /// after a successful conversion.
    pub async fn download_document(&self, pdf_url: &str) -> Result<Vec<u8>, ApiError> {
        let url = if pdf_url.starts_with("http://") || pdf_url.starts_with("https://") {
            pdf_url.to_string()
        } else {
            format!("{}/{}", self.api_url, pdf_url.trim_start_matches('/'))
        };

        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Api`] carrying
    /// the backend's `message` (or the generic fallback) on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) if !body.message.is_empty() => body.message,
                _ => GENERIC_SUBMIT_ERROR.to_string(),
            };
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
