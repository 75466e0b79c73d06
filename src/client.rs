use std::env;
use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{GenerateContentRequest, GenerateContentResponse, Model};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variables consulted, in order, when no API key is given.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// A stream of decoded response chunks.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<GenerateContentResponse>> + Send>>;

/// Client for the Gemini API.
#[derive(Debug, Clone)]
pub struct Gemini {
    api_key: HeaderValue,
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl Gemini {
    /// Create a new Gemini client.
    ///
    /// The API key can be provided directly or read from the `GEMINI_API_KEY`
    /// or `API_KEY` environment variables.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => api_key_from_env().ok_or_else(|| {
                Error::configuration(format!(
                    "API key not provided and none of {} is set",
                    API_KEY_VARS.join(", ")
                ))
            })?,
        };
        let api_key = validate_api_key(&api_key)?;

        let mut base_url = Url::parse(base_url.as_deref().unwrap_or(DEFAULT_API_URL))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
        })
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert("x-goog-api-key", self.api_key.clone());
        headers
    }

    /// Build the URL for a model method such as `streamGenerateContent`.
    fn endpoint(&self, model: &Model, method: &str) -> Result<Url> {
        let name = model.to_string();
        let resource = if name.contains('/') {
            name
        } else {
            format!("models/{name}")
        };
        Ok(self.base_url.join(&format!("{resource}:{method}"))?)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        match serde_json::from_str::<ErrorEnvelope>(&error_body) {
            Ok(envelope) => map_status(
                status_code,
                envelope.error.status,
                envelope.error.message.unwrap_or(error_body),
                retry_after,
            ),
            Err(_) => map_status(status_code, None, error_body, retry_after),
        }
    }

    /// Stream a response for the given conversation.
    ///
    /// Returns once the server has accepted the request; chunks are then
    /// decoded lazily as the caller polls the stream.
    pub async fn stream_generate_content(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<EventStream> {
        let mut url = self.endpoint(model, "streamGenerateContent")?;
        url.query_pairs_mut().append_pair("alt", "sse");

        CLIENT_REQUESTS.click();
        tracing::debug!(%model, turns = request.contents.len(), "opening response stream");
        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .headers(self.default_headers())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::process_error_response(response).await;
            tracing::warn!(error = %err, "response stream rejected");
            return Err(err);
        }

        Ok(Box::pin(process_sse(response.bytes_stream())))
    }
}

/// Read the API key from the first configured environment variable that
/// holds a non-blank value.
pub fn api_key_from_env() -> Option<String> {
    first_api_key(|var| env::var(var).ok())
}

fn first_api_key(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
        .iter()
        .find_map(|var| lookup(var).filter(|value| !value.trim().is_empty()))
}

fn validate_api_key(api_key: &str) -> Result<HeaderValue> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(Error::configuration("API key is empty"));
    }
    let mut value = HeaderValue::from_str(api_key)
        .map_err(|_| Error::configuration("API key contains characters not allowed in a header"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// The `{"error": {...}}` body Google APIs return on failure.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

impl ErrorEnvelope {
    /// Convert to an [`Error`], using `fallback_status` when the body has no code.
    pub(crate) fn into_error(self, fallback_status: u16) -> Error {
        let status_code = self.error.code.unwrap_or(fallback_status);
        let message = self
            .error
            .message
            .unwrap_or_else(|| "unknown error".to_string());
        map_status(status_code, self.error.status, message, None)
    }
}

/// Map HTTP status code to appropriate error type
fn map_status(
    status_code: u16,
    status: Option<String>,
    message: String,
    retry_after: Option<u64>,
) -> Error {
    match status_code {
        400 if message.contains("API key") => Error::authentication(message),
        400 => Error::bad_request(message),
        401 | 403 => Error::authentication(message),
        404 => Error::not_found(message),
        408 => Error::timeout(message, None),
        429 => Error::rate_limit(message, retry_after),
        500..=599 => Error::server_error(status_code, message),
        _ => Error::api(status_code, status, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn client_creation() {
        let client = Gemini::new(Some("test-key".to_string())).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.base_url.as_str(), DEFAULT_API_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = Gemini::with_options(
            Some("test-key".to_string()),
            Some("http://localhost:8080/v1beta".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "http://localhost:8080/v1beta/");
        assert_eq!(client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn malformed_keys_are_configuration_errors() {
        let err = Gemini::new(Some("   ".to_string())).unwrap_err();
        assert!(err.is_configuration());

        let err = Gemini::new(Some("bad\nkey".to_string())).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn malformed_base_url_is_configuration_error() {
        let err = Gemini::with_options(Some("k".to_string()), Some("::".to_string()), None)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn blank_env_key_falls_through() {
        let vars = |values: [(&'static str, &'static str); 2]| {
            move |var: &str| {
                values
                    .iter()
                    .find(|(name, _)| *name == var)
                    .map(|(_, value)| value.to_string())
            }
        };
        assert_eq!(
            first_api_key(vars([("GEMINI_API_KEY", ""), ("API_KEY", "real-key")])),
            Some("real-key".to_string())
        );
        assert_eq!(
            first_api_key(vars([("GEMINI_API_KEY", "gem-key"), ("API_KEY", "other")])),
            Some("gem-key".to_string())
        );
        assert_eq!(
            first_api_key(vars([("GEMINI_API_KEY", "  "), ("API_KEY", "")])),
            None
        );
        assert_eq!(first_api_key(|_| None), None);
    }

    #[test]
    fn endpoint_paths() {
        let client = Gemini::new(Some("k".to_string())).unwrap();
        let url = client
            .endpoint(
                &Model::Known(KnownModel::Gemini25Flash),
                "streamGenerateContent",
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent"
        );

        let url = client
            .endpoint(
                &Model::Custom("tunedModels/my-bot".to_string()),
                "streamGenerateContent",
            )
            .unwrap();
        assert!(url.path().ends_with("/v1beta/tunedModels/my-bot:streamGenerateContent"));
    }

    #[test]
    fn status_mapping() {
        assert!(map_status(400, None, "API key not valid".to_string(), None).is_authentication());
        assert!(matches!(
            map_status(400, None, "bad".to_string(), None),
            Error::BadRequest { .. }
        ));
        assert!(map_status(429, None, "quota".to_string(), Some(5)).is_rate_limit());
        assert_eq!(
            map_status(503, None, "busy".to_string(), None).status_code(),
            Some(503)
        );
        assert_eq!(
            map_status(409, Some("ABORTED".to_string()), "x".to_string(), None).status_code(),
            Some(409)
        );
    }

    #[test]
    fn envelope_conversion() {
        let envelope: ErrorEnvelope = serde_json::from_str(
            r#"{"error":{"code":404,"message":"models/nope is not found","status":"NOT_FOUND"}}"#,
        )
        .unwrap();
        assert!(matches!(envelope.into_error(500), Error::NotFound { .. }));
    }
}
