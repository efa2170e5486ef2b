//! Sender email accounts and warmup management.

use crate::{Client, Result};
use serde_json::{json, Value};

impl Client {
    /// Lists sender email accounts. Array filters go out as indexed keys.
    pub async fn sender_emails(&self, filters: Option<&Value>) -> Result<Value> {
        let params = filters.map(super::indexed_params);
        self.get("/api/sender-emails", params.as_ref()).await
    }

    /// Lists sender emails with their warmup state.
    pub async fn warmup_accounts(&self, filters: Option<&Value>) -> Result<Value> {
        let params = filters.map(super::indexed_params);
        self.get("/api/warmup/sender-emails", params.as_ref()).await
    }

    /// Warmup details for one sender email, optionally narrowed to a date
    /// range. Dates are passed through as given.
    pub async fn warmup_account(
        &self,
        sender_email_id: i64,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Value> {
        let mut params = serde_json::Map::new();
        if let Some(date) = start_date.filter(|d| !d.is_empty()) {
            params.insert("start_date".to_owned(), json!(date));
        }
        if let Some(date) = end_date.filter(|d| !d.is_empty()) {
            params.insert("end_date".to_owned(), json!(date));
        }
        let params = (!params.is_empty()).then(|| Value::Object(params));
        self.get(
            &format!("/api/warmup/sender-emails/{sender_email_id}"),
            params.as_ref(),
        )
        .await
    }

    /// Enables warmup for the given sender emails.
    pub async fn warmup_enable(&self, sender_email_ids: &[i64]) -> Result<Value> {
        self.patch(
            "/api/warmup/sender-emails/enable",
            &json!({ "sender_email_ids": sender_email_ids }),
        )
        .await
    }

    /// Disables warmup for the given sender emails.
    pub async fn warmup_disable(&self, sender_email_ids: &[i64]) -> Result<Value> {
        self.patch(
            "/api/warmup/sender-emails/disable",
            &json!({ "sender_email_ids": sender_email_ids }),
        )
        .await
    }

    /// Updates daily warmup limits; the reply limit is optional.
    pub async fn warmup_update_limits(
        &self,
        sender_email_ids: &[i64],
        daily_limit: i64,
        daily_reply_limit: Option<i64>,
    ) -> Result<Value> {
        let mut body = serde_json::Map::new();
        body.insert("sender_email_ids".to_owned(), json!(sender_email_ids));
        body.insert("daily_limit".to_owned(), json!(daily_limit));
        if let Some(limit) = daily_reply_limit {
            body.insert("daily_reply_limit".to_owned(), json!(limit));
        }
        self.patch(
            "/api/warmup/sender-emails/update-daily-warmup-limits",
            &Value::Object(body),
        )
        .await
    }
}
