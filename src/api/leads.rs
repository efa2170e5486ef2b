//! Lead listing and campaign membership operations.

use crate::client::PagedData;
use crate::{Client, Result};
use serde_json::{json, Value};

impl Client {
    /// Lists a campaign's leads across all pages.
    pub async fn campaign_leads(
        &self,
        campaign_id: i64,
        filters: Option<&Value>,
    ) -> Result<PagedData> {
        let path = format!("/api/campaigns/{campaign_id}/leads");
        self.get_paged(&path, filters).await
    }

    /// Attaches individual leads to a campaign.
    pub async fn attach_leads(
        &self,
        campaign_id: i64,
        lead_ids: &[i64],
        allow_parallel_sending: bool,
    ) -> Result<Value> {
        let body = json!({
            "lead_ids": lead_ids,
            "allow_parallel_sending": allow_parallel_sending,
        });
        self.post(
            &format!("/api/campaigns/{campaign_id}/leads/attach-leads"),
            &body,
        )
        .await
    }

    /// Attaches an entire lead list to a campaign.
    pub async fn attach_lead_list(
        &self,
        campaign_id: i64,
        lead_list_id: i64,
        allow_parallel_sending: bool,
    ) -> Result<Value> {
        let body = json!({
            "lead_list_id": lead_list_id,
            "allow_parallel_sending": allow_parallel_sending,
        });
        self.post(
            &format!("/api/campaigns/{campaign_id}/leads/attach-lead-list"),
            &body,
        )
        .await
    }

    /// Stops all future sequence emails to the given leads.
    pub async fn stop_future_emails(&self, campaign_id: i64, lead_ids: &[i64]) -> Result<Value> {
        self.post(
            &format!("/api/campaigns/{campaign_id}/leads/stop-future-emails"),
            &json!({ "lead_ids": lead_ids }),
        )
        .await
    }
}
