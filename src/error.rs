//! Error types for EmailBison API calls.
//!
//! Errors stay deliberately small: an HTTP failure carries only its status
//! code, because the full diagnostic picture (URL, params, body preview)
//! lives in the client's [`RequestTrace`](crate::RequestTrace) and is
//! attached to tool errors at the boundary where it is reported.

use http::StatusCode;

/// The main error type for EmailBison API calls.
///
/// # Examples
///
/// ```no_run
/// use emailbison_mcp::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://send.example.com")?
///     .api_key("token")
///     .build()?;
///
/// match client.get("/api/campaigns", None).await {
///     Ok(body) => println!("Success: {body}"),
///     Err(Error::HttpStatus { status }) => {
///         eprintln!("HTTP error {status}");
///         eprintln!("last request: {:?}", client.last_trace());
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed,
    /// request timed out).
    ///
    /// This wraps the underlying `reqwest::Error` and indicates problems at
    /// the network layer rather than the HTTP protocol layer.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server's final answer was a non-2xx status code.
    ///
    /// Transient statuses are retried before this surfaces; when the retry
    /// budget is spent the last status still ends up here.
    #[error("HTTP error {status}")]
    HttpStatus {
        /// The HTTP status code
        status: StatusCode,
    },

    /// Invalid configuration was provided.
    ///
    /// This indicates a problem with how the client was configured, such as
    /// a missing API key or an unusable header value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An invalid URL was provided.
    ///
    /// This wraps URL parsing errors.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if this error is potentially retryable.
    ///
    /// Network errors and the transient HTTP statuses (429, 500, 502, 503,
    /// 504) are considered retryable. Other 4xx statuses and configuration
    /// errors are not.
    ///
    /// # Examples
    ///
    /// ```
    /// use emailbison_mcp::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::HttpStatus {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    /// };
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::HttpStatus {
    ///     status: StatusCode::UNPROCESSABLE_ENTITY,
    /// };
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::HttpStatus { status } => crate::retry::is_retryable_status(*status),
            Error::Configuration(_) => false,
            Error::InvalidUrl(_) => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpStatus { status } => Some(*status),
            _ => None,
        }
    }
}

/// A specialized `Result` type for EmailBison API calls.
pub type Result<T> = std::result::Result<T, Error>;
