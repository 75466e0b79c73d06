//! Error types for parley.
//!
//! Errors fall into three families.  Configuration and session errors stop a
//! connection attempt and surface as [`ConnectionStatus::Error`].  Transport
//! errors happen while talking to the model and only ever affect the message
//! whose response was in flight.  Serialization and I/O errors come from the
//! local store and are logged, never shown as conversation state.
//!
//! [`ConnectionStatus::Error`]: crate::ConnectionStatus::Error

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;
use std::time::Duration;

/// A boxed underlying error, as accepted by the constructors.
pub type BoxedCause = Box<dyn error::Error + Send + Sync>;

/// A shared underlying error, as stored in [`Error`] so it stays `Clone`.
pub type Cause = Arc<dyn error::Error + Send + Sync>;

/// Everything that can go wrong in parley.
#[derive(Clone, Debug)]
pub enum Error {
    /// No usable API key, or an unusable base URL.
    Configuration { message: String },

    /// The client exists but a chat session could not be set up.
    Session {
        message: String,
        source: Option<Cause>,
    },

    /// A non-success HTTP status with no more specific variant.
    Api {
        status_code: u16,
        /// Google status name such as `FAILED_PRECONDITION`.
        status: Option<String>,
        message: String,
    },

    /// The key was rejected (401, 403, or a 400 that names the key).
    Authentication { message: String },

    /// The request was malformed (400).
    BadRequest { message: String },

    /// Unknown model or endpoint (404).
    NotFound { message: String },

    /// Quota exhausted (429).
    RateLimit {
        message: String,
        /// Seconds from the `retry-after` header.
        retry_after: Option<u64>,
    },

    /// The service failed (5xx).
    ServerError { status_code: u16, message: String },

    /// The request or the stream took too long.
    Timeout {
        message: String,
        /// The configured limit, in seconds.
        duration: Option<f64>,
    },

    /// The server could not be reached.
    Connection {
        message: String,
        source: Option<Cause>,
    },

    /// reqwest failed for some other reason.
    HttpClient {
        message: String,
        source: Option<Cause>,
    },

    /// The response stream broke, or carried an error event.
    Streaming {
        message: String,
        source: Option<Cause>,
    },

    /// The response stream was not valid UTF-8.
    Encoding {
        message: String,
        source: Option<Cause>,
    },

    /// JSON could not be produced or understood.
    Serialization {
        message: String,
        source: Option<Cause>,
    },

    /// The local store could not be read or written.
    Io {
        message: String,
        source: Arc<io::Error>,
    },
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        Error::Configuration { message }
    }

    pub fn session(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        let (message, source) = (message.into(), source.map(Cause::from));
        Error::Session { message, source }
    }

    pub fn api(status_code: u16, status: Option<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Error::Api {
            status_code,
            status,
            message,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        let message = message.into();
        Error::Authentication { message }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        let message = message.into();
        Error::BadRequest { message }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        let message = message.into();
        Error::NotFound { message }
    }

    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        let message = message.into();
        Error::RateLimit {
            message,
            retry_after,
        }
    }

    pub fn server_error(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Error::ServerError {
            status_code,
            message,
        }
    }

    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        let message = message.into();
        Error::Timeout { message, duration }
    }

    pub fn connection(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        let (message, source) = (message.into(), source.map(Cause::from));
        Error::Connection { message, source }
    }

    pub fn http_client(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        let (message, source) = (message.into(), source.map(Cause::from));
        Error::HttpClient { message, source }
    }

    pub fn streaming(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        let (message, source) = (message.into(), source.map(Cause::from));
        Error::Streaming { message, source }
    }

    pub fn encoding(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        let (message, source) = (message.into(), source.map(Cause::from));
        Error::Encoding { message, source }
    }

    pub fn serialization(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        let (message, source) = (message.into(), source.map(Cause::from));
        Error::Serialization { message, source }
    }

    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        let (message, source) = (message.into(), Arc::new(source));
        Error::Io { message, source }
    }

    /// True for errors that prevent a connection: configuration and session.
    pub fn is_connect_failure(&self) -> bool {
        self.is_configuration() || self.is_session()
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    pub fn is_session(&self) -> bool {
        matches!(self, Error::Session { .. })
    }

    /// True for errors raised while sending a turn or reading its reply.
    pub fn is_transport(&self) -> bool {
        !self.is_connect_failure()
            && !matches!(self, Error::Serialization { .. } | Error::Io { .. })
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimit { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// The HTTP status behind this error, when one is known.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } | Error::ServerError { status_code, .. } => {
                Some(*status_code)
            }
            Error::BadRequest { .. } => Some(400),
            Error::NotFound { .. } => Some(404),
            Error::RateLimit { .. } => Some(429),
            _ => None,
        }
    }

    /// How long the server asked us to wait, for rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimit {
                retry_after: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// The human-readable message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::Configuration { message }
            | Error::Session { message, .. }
            | Error::Api { message, .. }
            | Error::Authentication { message }
            | Error::BadRequest { message }
            | Error::NotFound { message }
            | Error::RateLimit { message, .. }
            | Error::ServerError { message, .. }
            | Error::Timeout { message, .. }
            | Error::Connection { message, .. }
            | Error::HttpClient { message, .. }
            | Error::Streaming { message, .. }
            | Error::Encoding { message, .. }
            | Error::Serialization { message, .. }
            | Error::Io { message, .. } => message,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Error::Configuration { .. } => "Configuration error",
            Error::Session { .. } => "Session error",
            Error::Api { .. } => "API error",
            Error::Authentication { .. } => "Authentication error",
            Error::BadRequest { .. } => "Bad request",
            Error::NotFound { .. } => "Not found",
            Error::RateLimit { .. } => "Rate limit exceeded",
            Error::ServerError { .. } => "Server error",
            Error::Timeout { .. } => "Timeout error",
            Error::Connection { .. } => "Connection error",
            Error::HttpClient { .. } => "HTTP client error",
            Error::Streaming { .. } => "Streaming error",
            Error::Encoding { .. } => "Encoding error",
            Error::Serialization { .. } => "Serialization error",
            Error::Io { .. } => "I/O error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())?;
        match self {
            Error::Api {
                status_code,
                status: Some(status),
                ..
            } => write!(f, " {status_code} ({status})")?,
            Error::Api { status_code, .. } | Error::ServerError { status_code, .. } => {
                write!(f, " {status_code}")?
            }
            _ => {}
        }
        write!(f, ": {}", self.message())?;
        match self {
            Error::RateLimit {
                retry_after: Some(secs),
                ..
            } => write!(f, " (retry after {secs} seconds)"),
            Error::Timeout {
                duration: Some(secs),
                ..
            } => write!(f, " ({secs} seconds)"),
            _ => Ok(()),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        let cause = match self {
            Error::Io { source, .. } => return Some(source.as_ref()),
            Error::Session { source, .. }
            | Error::Connection { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Streaming { source, .. }
            | Error::Encoding { source, .. }
            | Error::Serialization { source, .. } => source.as_ref()?,
            _ => return None,
        };
        Some(cause.as_ref())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::configuration(format!("invalid URL: {err}"))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::encoding(format!("UTF-8 error: {err}"), Some(Box::new(err)))
    }
}

/// Result alias used throughout parley.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_predicates() {
        assert!(Error::configuration("no key").is_configuration());
        assert!(Error::configuration("no key").is_connect_failure());
        assert!(!Error::configuration("no key").is_transport());
        assert!(Error::session("boom", None).is_session());
        assert!(Error::streaming("reset", None).is_transport());
        assert!(Error::rate_limit("slow down", Some(3)).is_transport());
        assert!(Error::server_error(503, "unavailable").is_transport());
        assert!(!Error::serialization("bad json", None).is_transport());
        assert!(!Error::io("disk", io::Error::other("full")).is_transport());
    }

    #[test]
    fn display_includes_context() {
        let err = Error::api(409, Some("ABORTED".to_string()), "conflict");
        assert_eq!(err.to_string(), "API error 409 (ABORTED): conflict");
        assert_eq!(err.message(), "conflict");

        let err = Error::rate_limit("quota", Some(7));
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded: quota (retry after 7 seconds)"
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));

        let err = Error::server_error(502, "bad gateway");
        assert_eq!(err.to_string(), "Server error 502: bad gateway");

        let err = Error::configuration("GEMINI_API_KEY is not set");
        assert_eq!(
            err.to_string(),
            "Configuration error: GEMINI_API_KEY is not set"
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(Error::api(418, None, "teapot").status_code(), Some(418));
        assert_eq!(Error::server_error(500, "oops").status_code(), Some(500));
        assert_eq!(Error::not_found("models/x").status_code(), Some(404));
        assert_eq!(Error::timeout("slow", Some(60.0)).status_code(), None);
    }

    #[test]
    fn sources_are_kept() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(error::Error::source(&err).is_some());

        let err = Error::session("could not start", Some(Box::new(Error::configuration("x"))));
        let source = error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Configuration error: x");

        assert!(error::Error::source(&Error::streaming("reset", None)).is_none());
    }

    #[test]
    fn url_errors_are_configuration_errors() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(err.is_configuration());
    }
}
