//! Campaign listing, creation, stats and sequence steps.

use crate::client::PagedData;
use crate::{Client, Error, Result};
use serde_json::{json, Value};

impl Client {
    /// Lists campaigns across all pages, optionally filtered by status and
    /// tags. `tag_ids` go out as repeated query keys.
    pub async fn campaigns(&self, status: Option<&str>, tag_ids: Option<&[i64]>) -> Result<PagedData> {
        let mut params = serde_json::Map::new();
        if let Some(status) = status.filter(|s| !s.is_empty()) {
            params.insert("status".to_owned(), json!(status));
        }
        if let Some(tag_ids) = tag_ids.filter(|t| !t.is_empty()) {
            params.insert("tag_ids".to_owned(), json!(tag_ids));
        }
        let params = (!params.is_empty()).then(|| Value::Object(params));
        self.get_paged("/api/campaigns", params.as_ref()).await
    }

    /// Fetches one campaign's detail record.
    pub async fn campaign_details(&self, campaign_id: i64) -> Result<Value> {
        self.get(&format!("/api/campaigns/{campaign_id}"), None).await
    }

    /// Creates a campaign. Extra body fields are merged over `name`/`type`.
    pub async fn create_campaign(
        &self,
        name: &str,
        campaign_type: &str,
        extra: Option<&Value>,
    ) -> Result<Value> {
        let mut body = serde_json::Map::new();
        body.insert("name".to_owned(), json!(name));
        body.insert("type".to_owned(), json!(campaign_type));
        if let Some(Value::Object(extra)) = extra {
            for (key, value) in extra {
                body.insert(key.clone(), value.clone());
            }
        }
        self.post("/api/campaigns", &Value::Object(body)).await
    }

    /// Fetches campaign stats, working around endpoint-version drift.
    ///
    /// Three tiers: `POST` with the date range in the body, then `GET` with
    /// the range as query params, then `POST` with an empty body. A tier is
    /// skipped only when the previous one failed with an HTTP status;
    /// transport failures have already spent their retries and propagate.
    /// Dates that are not `YYYY-MM-DD` are silently left out.
    pub async fn campaign_stats(
        &self,
        campaign_id: i64,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Value> {
        let path = format!("/api/campaigns/{campaign_id}/stats");
        let mut dates = serde_json::Map::new();
        if let Some(date) = start_date.filter(|d| is_date(d)) {
            dates.insert("start_date".to_owned(), json!(date));
        }
        if let Some(date) = end_date.filter(|d| is_date(d)) {
            dates.insert("end_date".to_owned(), json!(date));
        }

        match self.post(&path, &Value::Object(dates.clone())).await {
            Err(Error::HttpStatus { status }) => {
                tracing::debug!(status = status.as_u16(), "POST stats failed; trying GET");
            }
            other => return other,
        }

        let query = (!dates.is_empty()).then(|| Value::Object(dates));
        match self.get(&path, query.as_ref()).await {
            Err(Error::HttpStatus { status }) => {
                tracing::debug!(
                    status = status.as_u16(),
                    "GET stats failed; trying bare POST"
                );
            }
            other => return other,
        }

        self.post(&path, &json!({})).await
    }

    /// Fetches sequence steps, preferring the v1.1 endpoint and falling
    /// back to the legacy path when it answers with an error status.
    pub async fn sequence_steps(&self, campaign_id: i64) -> Result<Value> {
        let primary = format!("/api/campaigns/v1.1/{campaign_id}/sequence-steps");
        match self.get(&primary, None).await {
            Err(Error::HttpStatus { status }) => {
                tracing::debug!(
                    status = status.as_u16(),
                    "v1.1 sequence steps failed; falling back to legacy path"
                );
                self.get(&format!("/api/campaigns/{campaign_id}/sequence-steps"), None)
                    .await
            }
            other => other,
        }
    }

    /// Daily event stats over a date range, optionally narrowed to specific
    /// sender emails or campaigns (indexed array params).
    pub async fn campaign_events_stats(
        &self,
        start_date: &str,
        end_date: &str,
        sender_email_ids: Option<&[i64]>,
        campaign_ids: Option<&[i64]>,
    ) -> Result<Value> {
        let params = super::indexed_params(&json!({
            "start_date": start_date,
            "end_date": end_date,
            "sender_email_ids": sender_email_ids,
            "campaign_ids": campaign_ids,
        }));
        self.get("/api/campaign-events/stats", Some(&params)).await
    }
}

/// `YYYY-MM-DD`, digits only. Anything else is treated as absent.
fn is_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| match i {
                4 | 7 => *b == b'-',
                _ => b.is_ascii_digit(),
            })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_date() {
        assert!(is_date("2025-01-31"));
        assert!(is_date("1999-12-01"));

        assert!(!is_date("2025-1-31"));
        assert!(!is_date("2025/01/31"));
        assert!(!is_date("20250131"));
        assert!(!is_date("2025-01-31T00:00:00"));
        assert!(!is_date("yesterday"));
        assert!(!is_date(""));
    }
}
