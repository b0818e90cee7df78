use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// `X-Amz-Target` prefix for every Kinesis operation.
pub const TARGET_PREFIX: &str = "Kinesis_20131202";

const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },
    #[error("API returned {status}: {body}")]
    ApiResponse { status: u16, body: String },
}

impl ApiError {
    /// Error code reported by the service, without any namespace prefix.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Service { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some("ResourceNotFoundException")
    }

    /// The stream exists but is mid-transition (or the name is already taken).
    pub fn is_in_use(&self) -> bool {
        self.code() == Some("ResourceInUseException")
    }

    /// Whether the same call may succeed when retried later unchanged.
    ///
    /// Throttling, in-use conflicts, server-side failures and transport
    /// errors are retryable. Invalid arguments and access errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Request(_) => true,
            ApiError::Service { status, code, .. } => {
                *status >= 500
                    || matches!(
                        code.as_str(),
                        "LimitExceededException"
                            | "ProvisionedThroughputExceededException"
                            | "ThrottlingException"
                            | "ResourceInUseException"
                            | "InternalFailure"
                            | "ServiceUnavailable"
                    )
            }
            ApiError::ApiResponse { status, .. } => *status >= 500 || *status == 429,
            ApiError::InvalidUrl(_) | ApiError::Decode(_) => false,
        }
    }
}

/// Shared HTTP client for the stream service JSON protocol.
///
/// Every operation is a `POST /` whose `X-Amz-Target` header names the
/// operation and whose body is the JSON-encoded input. Request signing is
/// left to the endpoint (a local emulator or a signing proxy).
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    endpoint: Url,
}

impl HttpClient {
    pub fn new(endpoint: &str) -> Result<Self, ApiError> {
        let endpoint = Url::parse(endpoint)?;
        let inner = reqwest::Client::builder().build()?;

        Ok(Self { inner, endpoint })
    }

    /// Invoke `operation` with `body` and deserialize the JSON response.
    ///
    /// An empty response body is decoded as `{}` so operations without
    /// output can use `serde_json::Value` or a unit-like struct.
    pub async fn call<T: DeserializeOwned, B: Serialize>(
        &self,
        operation: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let target = format!("{TARGET_PREFIX}.{operation}");
        let payload = serde_json::to_vec(body)?;
        tracing::debug!(%operation, "stream api call");
        // `RequestBuilder::json` would force `application/json`.
        let resp = self
            .inner
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header("X-Amz-Target", target)
            .body(payload)
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    /// Invoke an operation whose output is ignored.
    pub async fn call_unit<B: Serialize>(&self, operation: &str, body: &B) -> Result<(), ApiError> {
        let _: serde_json::Value = self.call(operation, body).await?;
        Ok(())
    }

    /// Return the endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        if !(200..300).contains(&status) {
            return Err(service_error(status, body));
        }
        if body.trim().is_empty() {
            return Ok(serde_json::from_str("{}")?);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// Turn an error response into [`ApiError::Service`] when the body carries
/// a `__type` code, falling back to [`ApiError::ApiResponse`].
fn service_error(status: u16, body: String) -> ApiError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(&body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("__type"))
        .and_then(|v| v.as_str())
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string());
    match code {
        Some(code) => {
            let message = parsed
                .as_ref()
                .and_then(|v| v.get("message").or_else(|| v.get("Message")))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            ApiError::Service {
                status,
                code,
                message,
            }
        }
        None => ApiError::ApiResponse { status, body },
    }
}
