//! Diagnostic snapshot of the most recent HTTP attempt.

use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

/// Cap on how much response body a trace keeps.
const PREVIEW_LIMIT: usize = 2000;

/// A record of the last physical HTTP attempt, success or failure.
///
/// The client holds exactly one trace and replaces it wholesale: once when
/// an attempt starts (request fields set, response fields cleared) and once
/// when the attempt resolves. Retries overwrite it, so after a request
/// finishes the trace describes the final attempt. Tool errors embed it so
/// the caller can see what was actually on the wire.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestTrace {
    /// Full URL of the attempt, query string included.
    pub url: Option<String>,
    /// HTTP method as sent.
    pub method: Option<String>,
    /// Status of the response, absent when the attempt died in transport.
    pub status: Option<u16>,
    /// `Content-Type` of the response, if the server sent one.
    pub content_type: Option<String>,
    /// Query parameters before encoding.
    pub request_params: Option<Value>,
    /// JSON body as sent.
    pub request_json: Option<Value>,
    /// First part of the response body, capped at 2000 characters.
    pub response_preview: Option<String>,
}

impl RequestTrace {
    /// Builds a fresh trace for an attempt that is about to go out.
    pub(crate) fn for_attempt(
        url: &str,
        method: &Method,
        params: Option<&Value>,
        body: Option<&Value>,
    ) -> Self {
        Self {
            url: Some(url.to_owned()),
            method: Some(method.to_string()),
            status: None,
            content_type: None,
            request_params: params.cloned(),
            request_json: body.cloned(),
            response_preview: None,
        }
    }

    /// Returns the trace with response fields filled in.
    pub(crate) fn with_response(
        mut self,
        status: StatusCode,
        content_type: Option<&str>,
        body: &str,
    ) -> Self {
        self.status = Some(status.as_u16());
        self.content_type = content_type.map(str::to_owned);
        self.response_preview = Some(body.chars().take(PREVIEW_LIMIT).collect());
        self
    }
}
