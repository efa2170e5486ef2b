//! Reply retrieval with adaptive filter shapes.
//!
//! The global `/api/replies` endpoint has changed its campaign-filter
//! encoding more than once. Rather than tracking versions, the client
//! probes a fixed list of known encodings and keeps the first one the
//! server accepts; when every shape fails it drops to the legacy
//! per-campaign endpoint and filters client-side.

use super::is_truthy;
use crate::client::PagedData;
use crate::{Client, Result};
use serde_json::{json, Map, Value};

/// Replies come back in big pages to keep round-trips down.
const PER_PAGE: u32 = 200;

/// Reply status filters understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Interested,
    AutomatedReply,
    NotAutomatedReply,
}

impl ReplyStatus {
    /// Parses a tool-level filter string. Unknown values mean no filter.
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value {
            Some("interested") => Some(Self::Interested),
            Some("automated_reply") => Some(Self::AutomatedReply),
            Some("not_automated_reply") => Some(Self::NotAutomatedReply),
            _ => None,
        }
    }

    fn apply(self, filters: &mut Map<String, Value>) {
        match self {
            Self::Interested => {
                filters.insert("interested".to_owned(), json!({"value": 1}));
            }
            Self::AutomatedReply => {
                filters.insert("automated_reply".to_owned(), json!({"value": 1}));
            }
            Self::NotAutomatedReply => {
                filters.insert("automated_reply".to_owned(), json!({"value": 0}));
            }
        }
    }

    fn keeps(self, reply: &Value) -> bool {
        match self {
            Self::Interested => is_truthy(reply.get("interested")),
            Self::AutomatedReply => is_truthy(reply.get("automated_reply")),
            Self::NotAutomatedReply => !is_truthy(reply.get("automated_reply")),
        }
    }
}

/// Known encodings for the campaign selector on `/api/replies`, in probe
/// order.
#[derive(Debug, Clone, Copy)]
enum CampaignSelector {
    SingleValue,
    Array,
    Bare,
    ArrayValue,
    ValueArray,
}

const SELECTOR_SHAPES: [CampaignSelector; 5] = [
    CampaignSelector::SingleValue,
    CampaignSelector::Array,
    CampaignSelector::Bare,
    CampaignSelector::ArrayValue,
    CampaignSelector::ValueArray,
];

impl CampaignSelector {
    fn apply(self, campaign_id: i64, filters: &mut Map<String, Value>) {
        match self {
            Self::SingleValue => {
                filters.insert("campaign_id".to_owned(), json!({"value": campaign_id}));
            }
            Self::Array => {
                filters.insert("campaign_ids".to_owned(), json!([campaign_id]));
            }
            Self::Bare => {
                filters.insert("campaign_id".to_owned(), json!(campaign_id));
            }
            Self::ArrayValue => {
                filters.insert("campaign_ids".to_owned(), json!({"value": [campaign_id]}));
            }
            Self::ValueArray => {
                filters.insert("campaign_id".to_owned(), json!([campaign_id]));
            }
        }
    }
}

/// Maps a user-supplied folder name onto the label the API stores.
///
/// Matching is case-insensitive. `"all"` and unrecognized names return
/// `None`, which disables folder filtering.
fn folder_label(folder: &str) -> Option<&'static str> {
    match folder.to_ascii_lowercase().as_str() {
        "inbox" => Some("Inbox"),
        "sent" => Some("Sent"),
        "spam" => Some("Spam"),
        "bounced" => Some("Bounced"),
        _ => None,
    }
}

fn build_filters(
    selector: CampaignSelector,
    campaign_id: i64,
    status: Option<ReplyStatus>,
    folder: Option<&str>,
) -> Value {
    let mut filters = Map::new();
    selector.apply(campaign_id, &mut filters);
    if let Some(label) = folder.and_then(folder_label) {
        filters.insert("folder".to_owned(), json!({"value": label}));
    }
    if let Some(status) = status {
        status.apply(&mut filters);
    }
    Value::Object(filters)
}

impl Client {
    /// Fetches every reply for a campaign.
    ///
    /// Probes the global endpoint with each selector shape in order and
    /// returns the first complete (all pages) result; any failure moves on
    /// to the next shape. On that path the status and folder filters are the
    /// server's job. When every shape fails, falls back to the legacy
    /// per-campaign endpoint and applies the filters client-side instead;
    /// the global path never re-filters locally.
    pub async fn campaign_replies(
        &self,
        campaign_id: i64,
        status: Option<ReplyStatus>,
        folder: Option<&str>,
    ) -> Result<PagedData> {
        for selector in SELECTOR_SHAPES {
            let params = json!({
                "filters": build_filters(selector, campaign_id, status, folder),
                "per_page": PER_PAGE,
            });
            match self.get_paged("/api/replies", Some(&params)).await {
                Ok(paged) => return Ok(paged),
                Err(e) => {
                    tracing::debug!(
                        shape = ?selector,
                        error = %e,
                        "/api/replies rejected filter shape"
                    );
                }
            }
        }

        tracing::debug!(campaign_id, "All filter shapes failed; using legacy replies endpoint");
        let path = format!("/api/campaigns/{campaign_id}/replies");
        let mut paged = self
            .get_paged(&path, Some(&json!({ "per_page": PER_PAGE })))
            .await?;

        if let Some(status) = status {
            paged.data.retain(|reply| status.keeps(reply));
        }
        if let Some(label) = folder.and_then(folder_label) {
            paged
                .data
                .retain(|reply| reply.get("folder").and_then(Value::as_str) == Some(label));
        }
        paged.meta.total = paged.data.len();
        Ok(paged)
    }
}
