//! HTTP client for the EmailBison API.
//!
//! The [`Client`] owns one connection pool and runs every request through
//! the same pipeline: build URL, retry transient failures on a deterministic
//! backoff, record a [`RequestTrace`] per attempt, then decode whatever the
//! server sent back as leniently as possible. The API mixes JSON, empty
//! bodies and HTML error pages across endpoints, so decoding never assumes a
//! shape.

use crate::{
    query,
    retry::{self, RetryPolicy},
    trace::RequestTrace,
    Error, Result,
};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_IDLE_CONNECTIONS: usize = 10;
const USER_AGENT: &str = concat!("EmailBison-MCP/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the bearer token.
pub const ENV_API_KEY: &str = "EMAILBISON_API_KEY";
/// Environment variable overriding the API host.
pub const ENV_BASE_URL: &str = "EMAILBISON_BASE_URL";
const DEFAULT_BASE_URL: &str = "https://send.highticket.agency";

/// A client for the EmailBison API with retries and a diagnostic trace.
///
/// The client is cheap to clone and designed to be reused across requests;
/// it maintains one connection pool and a single [`RequestTrace`] slot
/// describing the most recent attempt.
///
/// # Examples
///
/// ```no_run
/// use emailbison_mcp::Client;
///
/// # async fn example() -> Result<(), emailbison_mcp::Error> {
/// let client = Client::builder()
///     .base_url("https://send.example.com")?
///     .api_key("token")
///     .build()?;
///
/// let campaigns = client.campaigns(Some("active"), None).await?;
/// println!("{} campaigns", campaigns.meta.total);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    retry_policy: RetryPolicy,
    last_trace: Mutex<RequestTrace>,
}

/// One terminal attempt's worth of response, body already read.
struct RawResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

/// A fully-drained paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedData {
    /// Records from every page, in page order.
    pub data: Vec<Value>,
    pub meta: PagedMeta,
}

/// Summary block attached to a [`PagedData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PagedMeta {
    /// Number of records actually collected.
    pub total: usize,
    /// `last_page` as reported by the first page's meta.
    pub total_pages: u64,
}

impl From<PagedData> for Value {
    fn from(paged: PagedData) -> Value {
        json!({
            "data": paged.data,
            "meta": { "total": paged.meta.total, "total_pages": paged.meta.total_pages },
        })
    }
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Builds a client from `EMAILBISON_API_KEY` and `EMAILBISON_BASE_URL`.
    ///
    /// The base URL falls back to the production host when unset.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the API key is missing or either
    /// value is unusable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| Error::Configuration(format!("{ENV_API_KEY} is not set")))?;
        let base_url =
            std::env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        Client::builder().base_url(base_url)?.api_key(api_key).build()
    }

    /// Returns a snapshot of the most recent HTTP attempt.
    pub fn last_trace(&self) -> RequestTrace {
        self.inner
            .last_trace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_trace(&self, trace: RequestTrace) {
        *self
            .inner
            .last_trace
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = trace;
    }

    /// Sends a request through the full pipeline and decodes the final
    /// response.
    ///
    /// This is also the raw passthrough: any method, path, query params and
    /// JSON body go through the same retry, trace and decode handling as the
    /// typed operations.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: Option<&Value>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let raw = self.request_with_retries(&method, path, params, body).await?;
        normalize(raw)
    }

    /// Makes a GET request with optional query parameters.
    pub async fn get(&self, path: &str, params: Option<&Value>) -> Result<Value> {
        self.request(Method::GET, path, params, None).await
    }

    /// Makes a POST request with a JSON body.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, path, None, Some(body)).await
    }

    /// Makes a PATCH request with a JSON body.
    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::PATCH, path, None, Some(body)).await
    }

    /// Drains a paginated listing into one result.
    ///
    /// The first request goes out without a `page` parameter; `meta` on that
    /// response decides how many more pages exist (`current_page` and
    /// `last_page`, both defaulting to 1 when missing, null or 0). Remaining
    /// pages are fetched sequentially in increasing order and appended. Any
    /// page failure propagates and discards the partial result.
    pub async fn get_paged(&self, path: &str, params: Option<&Value>) -> Result<PagedData> {
        let first = self.get(path, params).await?;
        let mut data = array_field(&first, "data");
        let current = meta_page(&first, "current_page");
        let last = meta_page(&first, "last_page");

        for page in current + 1..=last {
            let mut page_params = match params {
                Some(Value::Object(map)) => map.clone(),
                _ => serde_json::Map::new(),
            };
            page_params.insert("page".to_owned(), json!(page));
            let next = self.get(path, Some(&Value::Object(page_params))).await?;
            data.extend(array_field(&next, "data"));
        }

        Ok(PagedData {
            meta: PagedMeta {
                total: data.len(),
                total_pages: last,
            },
            data,
        })
    }

    async fn request_with_retries(
        &self,
        method: &Method,
        path: &str,
        params: Option<&Value>,
        body: Option<&Value>,
    ) -> Result<RawResponse> {
        let url = self.build_url(path, params)?;
        let mut retries = 0usize;

        loop {
            let trace = RequestTrace::for_attempt(url.as_str(), method, params, body);
            tracing::debug!(
                method = %method,
                url = %url,
                attempt = retries + 1,
                "Sending HTTP request"
            );

            match self.execute(method, url.clone(), body).await {
                Ok(raw) => {
                    self.store_trace(trace.with_response(
                        raw.status,
                        raw.content_type.as_deref(),
                        &raw.body,
                    ));
                    tracing::debug!(
                        status = raw.status.as_u16(),
                        content_type = raw.content_type.as_deref().unwrap_or(""),
                        "Received HTTP response"
                    );

                    if retry::is_retryable_status(raw.status) {
                        if let Some(delay) = self.inner.retry_policy.delay_for_attempt(retries + 1)
                        {
                            tracing::warn!(
                                status = raw.status.as_u16(),
                                delay_ms = delay.as_millis() as u64,
                                attempt = retries + 1,
                                "Retryable status; backing off"
                            );
                            tokio::time::sleep(delay).await;
                            retries += 1;
                            continue;
                        }
                    }
                    // Success, a non-retryable status, or budget spent with
                    // the last response standing.
                    return Ok(raw);
                }
                Err(e) => {
                    // Transport failure: the trace keeps its request fields
                    // and empty response fields.
                    self.store_trace(trace);
                    if let Some(delay) = self.inner.retry_policy.delay_for_attempt(retries + 1) {
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            attempt = retries + 1,
                            "Transport error; backing off"
                        );
                        tokio::time::sleep(delay).await;
                        retries += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Executes a single attempt: send, then read the whole body.
    async fn execute(&self, method: &Method, url: Url, body: Option<&Value>) -> Result<RawResponse> {
        let mut request = self.inner.http_client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    fn build_url(&self, path: &str, params: Option<&Value>) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.inner.base_url, path))?;
        if let Some(params) = params {
            let pairs = query::to_query_pairs(params);
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
        }
        Ok(url)
    }
}

/// Decodes the terminal response of a request.
///
/// Non-2xx statuses become [`Error::HttpStatus`] after their body is logged.
/// Everything else is decoded leniently: empty bodies become `{}`, bodies
/// that announce or look like JSON are parsed, and anything unparseable is
/// wrapped as `{"raw": <text>}` rather than failing the call.
fn normalize(raw: RawResponse) -> Result<Value> {
    let RawResponse {
        status,
        content_type,
        body,
    } = raw;

    if !status.is_success() {
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            match serde_json::from_str::<Value>(&body) {
                Ok(detail) => tracing::debug!(detail = %detail, "422 validation detail"),
                Err(_) => tracing::debug!(body = %clip(&body), "422 raw body"),
            }
        }
        if status.is_client_error() {
            tracing::error!(status = status.as_u16(), body = %clip(&body), "Client error");
        } else {
            tracing::warn!(status = status.as_u16(), body = %clip(&body), "Server error");
        }
        return Err(Error::HttpStatus { status });
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(json!({}));
    }

    let announces_json = content_type
        .as_deref()
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);
    if announces_json || trimmed.starts_with('{') || trimmed.starts_with('[') {
        match serde_json::from_str(trimmed) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::debug!(error = %e, "JSON decode failed on success response");
                Ok(json!({ "raw": trimmed }))
            }
        }
    } else {
        Ok(json!({ "raw": trimmed }))
    }
}

/// Truncates log output; error pages can be whole HTML documents.
fn clip(body: &str) -> String {
    body.chars().take(4000).collect()
}

fn array_field(body: &Value, key: &str) -> Vec<Value> {
    body.get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Reads a page number out of `meta`, treating missing, null and 0 as 1.
fn meta_page(body: &Value, key: &str) -> u64 {
    body.get("meta")
        .and_then(|meta| meta.get(key))
        .and_then(Value::as_u64)
        .filter(|n| *n != 0)
        .unwrap_or(1)
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use emailbison_mcp::{Client, RetryPolicy};
///
/// # fn example() -> Result<(), emailbison_mcp::Error> {
/// let client = Client::builder()
///     .base_url("https://send.example.com")?
///     .api_key("token")
///     .retry_policy(RetryPolicy::new(3))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    retry_policy: RetryPolicy,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Sets the base URL for all requests. A trailing slash is stripped so
    /// paths can always start with `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref().trim_end_matches('/').to_owned();
        Url::parse(&url)?;
        self.base_url = Some(url);
        Ok(self)
    }

    /// Sets the bearer token sent with every request.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the retry policy for transient failures.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or API key is missing, or the
    /// underlying HTTP client cannot be constructed.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Configuration("Base URL is required".to_owned()))?;
        let api_key = self
            .api_key
            .ok_or_else(|| Error::Configuration("API key is required".to_owned()))?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::try_from(format!("Bearer {api_key}"))
            .map_err(|e| Error::Configuration(format!("Invalid API key: {e}")))?;
        headers.insert(http::header::AUTHORIZATION, bearer);
        headers.insert(
            http::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                retry_policy: self.retry_policy,
                last_trace: Mutex::new(RequestTrace::default()),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, content_type: Option<&str>, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: content_type.map(str::to_owned),
            body: body.to_owned(),
        }
    }

    #[test]
    fn test_empty_body_decodes_to_empty_object() {
        assert_eq!(normalize(raw(200, None, "")).unwrap(), json!({}));
        assert_eq!(normalize(raw(200, None, "  \n\t ")).unwrap(), json!({}));
    }

    #[test]
    fn test_json_bodies_are_parsed() {
        let value = normalize(raw(
            200,
            Some("application/json"),
            r#"{"data": [1, 2]}"#,
        ))
        .unwrap();
        assert_eq!(value, json!({"data": [1, 2]}));

        // Sniffed from the body even when the content type lies.
        let value = normalize(raw(200, Some("text/html"), "[1, 2]")).unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn test_unparseable_bodies_are_wrapped_raw() {
        let value = normalize(raw(200, Some("text/html"), "<html>hi</html>")).unwrap();
        assert_eq!(value, json!({"raw": "<html>hi</html>"}));

        // Announced as JSON but broken: wrapped instead of failing.
        let value = normalize(raw(200, Some("application/json"), "{broken")).unwrap();
        assert_eq!(value, json!({"raw": "{broken"}));
    }

    #[test]
    fn test_error_status_fails_with_status() {
        let err = normalize(raw(422, Some("application/json"), r#"{"message":"no"}"#))
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
    }

    #[test]
    fn test_meta_page_defaults() {
        assert_eq!(meta_page(&json!({}), "last_page"), 1);
        assert_eq!(meta_page(&json!({"meta": {}}), "last_page"), 1);
        assert_eq!(meta_page(&json!({"meta": {"last_page": null}}), "last_page"), 1);
        assert_eq!(meta_page(&json!({"meta": {"last_page": 0}}), "last_page"), 1);
        assert_eq!(meta_page(&json!({"meta": {"last_page": 7}}), "last_page"), 7);
    }

    #[test]
    fn test_base_url_trailing_slash_is_stripped() {
        let client = Client::builder()
            .base_url("https://send.example.com/")
            .unwrap()
            .api_key("k")
            .build()
            .unwrap();
        assert_eq!(
            client.build_url("/api/campaigns", None).unwrap().as_str(),
            "https://send.example.com/api/campaigns"
        );
    }

    #[test]
    fn test_build_requires_key_and_url() {
        assert!(Client::builder().api_key("k").build().is_err());
        assert!(Client::builder()
            .base_url("https://send.example.com")
            .unwrap()
            .build()
            .is_err());
    }
}
