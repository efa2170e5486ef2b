//! Tool catalog and dispatch.
//!
//! Every tool resolves to a single text block. API failures are not
//! protocol errors: they come back as a `Tool error:` block carrying the
//! last HTTP exchange, so the calling agent can see what the server
//! actually said and adjust.

use crate::api::ReplyStatus;
use crate::client::Client;
use crate::error::Error;
use crate::render::{self, CampaignPerformance};
use crate::trace::RequestTrace;
use http::Method;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Cap on raw JSON dumps returned to the model.
const DUMP_LIMIT: usize = 50_000;

/// A tool advertised through `tools/list`.
#[derive(Debug)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[derive(Debug, thiserror::Error)]
enum ToolError {
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error(transparent)]
    Api(#[from] Error),
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: String,
    last_http: RequestTrace,
}

/// Runs a tool and renders its outcome as text.
///
/// `client` is `None` when the server came up without an API key; every
/// call then gets the same pointer at the missing configuration.
pub async fn call_tool(client: Option<&Client>, name: &str, args: &Map<String, Value>) -> String {
    let Some(client) = client else {
        return "Error: client not initialized. Set EMAILBISON_API_KEY.".to_owned();
    };
    match dispatch(client, name, args).await {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(tool = name, %error, "tool call failed");
            let envelope = ErrorEnvelope {
                error: error.to_string(),
                last_http: client.last_trace(),
            };
            let details = serde_json::to_string_pretty(&envelope)
                .unwrap_or_else(|_| format!("{{\"error\": \"{error}\"}}"));
            format!("Tool error:\n```json\n{details}\n```")
        }
    }
}

async fn dispatch(
    client: &Client,
    name: &str,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    match name {
        "list_campaigns" => {
            let tag_ids = optional_id_list(args, "tag_ids")?;
            let paged = client
                .campaigns(str_arg(args, "status"), tag_ids.as_deref())
                .await?;
            Ok(render::campaign_list(&paged.data))
        }

        "analyze_campaign" => {
            let campaign_id = required_i64(args, "campaign_id")?;
            let details = client.campaign_details(campaign_id).await?;
            let stats = client
                .campaign_stats(
                    campaign_id,
                    str_arg(args, "start_date"),
                    str_arg(args, "end_date"),
                )
                .await?;

            // The optional sections degrade quietly; a flaky sequence or
            // replies endpoint should not sink the whole report.
            let sequence = if flag(args, "include_sequence", true) {
                match client.sequence_steps(campaign_id).await {
                    Ok(seq) => Some(seq),
                    Err(error) => {
                        tracing::debug!(campaign_id, %error, "sequence section skipped");
                        None
                    }
                }
            } else {
                None
            };
            let replies = if flag(args, "include_replies", true) {
                match client.campaign_replies(campaign_id, None, None).await {
                    Ok(paged) => Some(paged),
                    Err(error) => {
                        tracing::debug!(campaign_id, %error, "replies section skipped");
                        None
                    }
                }
            } else {
                None
            };

            Ok(render::campaign_analysis(
                details.get("data").unwrap_or(&Value::Null),
                stats.get("data").unwrap_or(&Value::Null),
                sequence.as_ref(),
                replies.as_ref().map(|p| p.data.as_slice()),
            ))
        }

        "analyze_replies" => {
            let campaign_id = required_i64(args, "campaign_id")?;
            let status = ReplyStatus::parse(str_arg(args, "status_filter"));
            let paged = client
                .campaign_replies(campaign_id, status, str_arg(args, "folder"))
                .await?;
            Ok(render::replies_analysis(campaign_id, &paged.data))
        }

        "campaign_performance_summary" => {
            let ids = match optional_id_list(args, "campaign_ids")?.filter(|ids| !ids.is_empty())
            {
                Some(ids) => ids,
                None => {
                    let campaigns = client.campaigns(None, None).await?;
                    campaigns
                        .data
                        .iter()
                        .filter_map(|c| c.get("id").and_then(Value::as_i64))
                        .take(10)
                        .collect()
                }
            };
            let start = str_arg(args, "start_date");
            let end = str_arg(args, "end_date");

            let mut rows = Vec::new();
            for campaign_id in ids {
                let details = match client.campaign_details(campaign_id).await {
                    Ok(details) => details,
                    Err(error) => {
                        tracing::debug!(campaign_id, %error, "skipping campaign in summary");
                        continue;
                    }
                };
                let stats = match client.campaign_stats(campaign_id, start, end).await {
                    Ok(stats) => stats,
                    Err(error) => {
                        tracing::debug!(campaign_id, %error, "skipping campaign in summary");
                        continue;
                    }
                };
                rows.push(CampaignPerformance::from_records(
                    campaign_id,
                    details.get("data").unwrap_or(&Value::Null),
                    stats.get("data").unwrap_or(&Value::Null),
                ));
            }
            Ok(render::performance_summary(rows))
        }

        "lead_engagement_analysis" => {
            let campaign_id = required_i64(args, "campaign_id")?;
            let threshold = optional_i64(args, "engagement_threshold")?.unwrap_or(2);
            let leads = client.campaign_leads(campaign_id, None).await?;
            Ok(render::lead_engagement(campaign_id, &leads.data, threshold))
        }

        "sequence_optimization_insights" => {
            let campaign_id = required_i64(args, "campaign_id")?;
            let stats = client.campaign_stats(campaign_id, None, None).await?;
            let sequence = client.sequence_steps(campaign_id).await?;
            let steps = sequence
                .get("data")
                .and_then(|d| d.get("sequence_steps"))
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            Ok(render::sequence_insights(
                stats.get("data").unwrap_or(&Value::Null),
                steps,
            ))
        }

        "dump_replies_json" => {
            let campaign_id = required_i64(args, "campaign_id")?;
            let status = ReplyStatus::parse(str_arg(args, "status_filter"));
            let paged = client
                .campaign_replies(campaign_id, status, str_arg(args, "folder"))
                .await?;
            Ok(render::json_block(&Value::from(paged), Some(DUMP_LIMIT)))
        }

        "create_campaign" => {
            let name = required_str(args, "name")?;
            let campaign_type = str_arg(args, "type").unwrap_or("outbound");
            let extra = args.get("extra").filter(|v| v.is_object());
            let res = client.create_campaign(name, campaign_type, extra).await?;
            Ok(render::json_block(&res, None))
        }

        "add_leads_to_campaign" => {
            let campaign_id = required_i64(args, "campaign_id")?;
            let parallel = flag(args, "allow_parallel_sending", false);
            // A lead list wins over individual ids when both are given.
            let res = match optional_i64(args, "lead_list_id")? {
                Some(list_id) => client.attach_lead_list(campaign_id, list_id, parallel).await?,
                None => {
                    let lead_ids = id_list(args, "lead_ids")?;
                    client.attach_leads(campaign_id, &lead_ids, parallel).await?
                }
            };
            Ok(render::json_block(&res, None))
        }

        "stop_future_emails" => {
            let campaign_id = required_i64(args, "campaign_id")?;
            let lead_ids = id_list(args, "lead_ids")?;
            let res = client.stop_future_emails(campaign_id, &lead_ids).await?;
            Ok(render::json_block(&res, None))
        }

        "campaign_events_stats" => {
            let start = required_str(args, "start_date")?;
            let end = required_str(args, "end_date")?;
            let sender_email_ids = optional_id_list(args, "sender_email_ids")?;
            let campaign_ids = optional_id_list(args, "campaign_ids")?;
            let res = client
                .campaign_events_stats(
                    start,
                    end,
                    sender_email_ids.as_deref(),
                    campaign_ids.as_deref(),
                )
                .await?;
            Ok(render::json_block(&res, Some(DUMP_LIMIT)))
        }

        "list_email_accounts" => {
            let res = client.sender_emails(None).await?;
            Ok(render::json_block(&res, Some(DUMP_LIMIT)))
        }

        "list_warmup_accounts" => {
            let res = client.warmup_accounts(None).await?;
            Ok(render::json_block(&res, Some(DUMP_LIMIT)))
        }

        "warmup_account_details" => {
            let sender_email_id = required_i64(args, "sender_email_id")?;
            let res = client
                .warmup_account(
                    sender_email_id,
                    str_arg(args, "start_date"),
                    str_arg(args, "end_date"),
                )
                .await?;
            Ok(render::json_block(&res, Some(DUMP_LIMIT)))
        }

        "warmup_enable" => {
            let ids = id_list(args, "sender_email_ids")?;
            let res = client.warmup_enable(&ids).await?;
            Ok(render::json_block(&res, None))
        }

        "warmup_disable" => {
            let ids = id_list(args, "sender_email_ids")?;
            let res = client.warmup_disable(&ids).await?;
            Ok(render::json_block(&res, None))
        }

        "warmup_update_limits" => {
            let ids = id_list(args, "sender_email_ids")?;
            let daily_limit = required_i64(args, "daily_limit")?;
            let daily_reply_limit = optional_i64(args, "daily_reply_limit")?;
            let res = client
                .warmup_update_limits(&ids, daily_limit, daily_reply_limit)
                .await?;
            Ok(render::json_block(&res, None))
        }

        "raw_request" => {
            let method = required_str(args, "method")?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| ToolError::InvalidArgument("method"))?;
            let path = required_str(args, "path")?;
            let params = args.get("params").filter(|v| !v.is_null());
            let body = args.get("body").filter(|v| !v.is_null());
            let res = client.request(method, path, params, body).await?;
            Ok(render::json_block(&res, Some(DUMP_LIMIT)))
        }

        _ => Ok(format!("Unknown tool: {name}")),
    }
}

// ---- argument extraction ----
//
// Agents are sloppy with types: ids arrive as strings, floats, or proper
// integers depending on the model. Coercion here is deliberately lenient.

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn optional_i64(args: &Map<String, Value>, key: &'static str) -> Result<Option<i64>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => coerce_i64(value)
            .map(Some)
            .ok_or(ToolError::InvalidArgument(key)),
    }
}

fn required_i64(args: &Map<String, Value>, key: &'static str) -> Result<i64, ToolError> {
    optional_i64(args, key)?.ok_or(ToolError::MissingArgument(key))
}

fn str_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn required_str<'a>(
    args: &'a Map<String, Value>,
    key: &'static str,
) -> Result<&'a str, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ToolError::MissingArgument(key)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ToolError::InvalidArgument(key)),
    }
}

/// Boolean flag with a default; an explicit null counts as false.
fn flag(args: &Map<String, Value>, key: &str, default: bool) -> bool {
    match args.get(key) {
        None => default,
        Some(value) => crate::api::is_truthy(Some(value)),
    }
}

fn id_list(args: &Map<String, Value>, key: &'static str) -> Result<Vec<i64>, ToolError> {
    let value = args.get(key).ok_or(ToolError::MissingArgument(key))?;
    let items = value.as_array().ok_or(ToolError::InvalidArgument(key))?;
    items
        .iter()
        .map(|item| coerce_i64(item).ok_or(ToolError::InvalidArgument(key)))
        .collect()
}

fn optional_id_list(
    args: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<Vec<i64>>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => id_list(args, key).map(Some),
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_campaigns",
            description: "List campaigns",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "status": { "type": "string" },
                    "tag_ids": { "type": "array", "items": { "type": "integer" } }
                }
            }),
        },
        ToolDefinition {
            name: "analyze_campaign",
            description: "Campaign overview + stats + replies",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "campaign_id": { "type": "integer" },
                    "start_date": { "type": "string" },
                    "end_date": { "type": "string" },
                    "include_replies": { "type": "boolean", "default": true },
                    "include_sequence": { "type": "boolean", "default": true }
                },
                "required": ["campaign_id"]
            }),
        },
        ToolDefinition {
            name: "analyze_replies",
            description: "Analyze replies for a campaign",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "campaign_id": { "type": "integer" },
                    "status_filter": {
                        "type": "string",
                        "enum": ["interested", "automated_reply", "not_automated_reply"]
                    },
                    "folder": { "type": "string" },
                    "analyze_threads": { "type": "boolean", "default": false }
                },
                "required": ["campaign_id"]
            }),
        },
        ToolDefinition {
            name: "campaign_performance_summary",
            description: "Compare performance",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "campaign_ids": { "type": "array", "items": { "type": "integer" } },
                    "start_date": { "type": "string" },
                    "end_date": { "type": "string" }
                }
            }),
        },
        ToolDefinition {
            name: "lead_engagement_analysis",
            description: "Lead engagement tiers",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "campaign_id": { "type": "integer" },
                    "engagement_threshold": { "type": "integer", "default": 2 }
                },
                "required": ["campaign_id"]
            }),
        },
        ToolDefinition {
            name: "sequence_optimization_insights",
            description: "Sequence step insights",
            input_schema: json!({
                "type": "object",
                "properties": { "campaign_id": { "type": "integer" } },
                "required": ["campaign_id"]
            }),
        },
        ToolDefinition {
            name: "dump_replies_json",
            description: "Raw replies JSON (debug)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "campaign_id": { "type": "integer" },
                    "status_filter": { "type": "string" },
                    "folder": { "type": "string" }
                },
                "required": ["campaign_id"]
            }),
        },
        ToolDefinition {
            name: "create_campaign",
            description: "Create a campaign (POST /api/campaigns)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "type": { "type": "string", "default": "outbound" },
                    "extra": { "type": "object" }
                },
                "required": ["name"]
            }),
        },
        ToolDefinition {
            name: "add_leads_to_campaign",
            description: "Attach leads or a lead list to a campaign",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "campaign_id": { "type": "integer" },
                    "lead_ids": { "type": "array", "items": { "type": "integer" } },
                    "lead_list_id": { "type": "integer" },
                    "allow_parallel_sending": { "type": "boolean", "default": false }
                },
                "oneOf": [
                    { "required": ["campaign_id", "lead_ids"] },
                    { "required": ["campaign_id", "lead_list_id"] }
                ]
            }),
        },
        ToolDefinition {
            name: "stop_future_emails",
            description: "Stop future emails for specific leads in a campaign",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "campaign_id": { "type": "integer" },
                    "lead_ids": { "type": "array", "items": { "type": "integer" } }
                },
                "required": ["campaign_id", "lead_ids"]
            }),
        },
        ToolDefinition {
            name: "campaign_events_stats",
            description: "Daily event stats (GET /api/campaign-events/stats)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "start_date": { "type": "string" },
                    "end_date": { "type": "string" },
                    "sender_email_ids": { "type": "array", "items": { "type": "integer" } },
                    "campaign_ids": { "type": "array", "items": { "type": "integer" } }
                },
                "required": ["start_date", "end_date"]
            }),
        },
        ToolDefinition {
            name: "list_email_accounts",
            description: "List sender emails",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "list_warmup_accounts",
            description: "List sender emails with warmup info",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "warmup_account_details",
            description: "Warmup details for a sender email",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sender_email_id": { "type": "integer" },
                    "start_date": { "type": "string" },
                    "end_date": { "type": "string" }
                },
                "required": ["sender_email_id"]
            }),
        },
        ToolDefinition {
            name: "warmup_enable",
            description: "Enable warmup for sender emails",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sender_email_ids": { "type": "array", "items": { "type": "integer" } }
                },
                "required": ["sender_email_ids"]
            }),
        },
        ToolDefinition {
            name: "warmup_disable",
            description: "Disable warmup for sender emails",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sender_email_ids": { "type": "array", "items": { "type": "integer" } }
                },
                "required": ["sender_email_ids"]
            }),
        },
        ToolDefinition {
            name: "warmup_update_limits",
            description: "Update daily warmup limits",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sender_email_ids": { "type": "array", "items": { "type": "integer" } },
                    "daily_limit": { "type": "integer" },
                    "daily_reply_limit": { "type": "integer" }
                },
                "required": ["sender_email_ids", "daily_limit"]
            }),
        },
        ToolDefinition {
            name: "raw_request",
            description: "Send a raw HTTP request to the API (debug)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "method": {
                        "type": "string",
                        "enum": ["GET", "POST", "PATCH", "PUT", "DELETE", "HEAD", "OPTIONS"]
                    },
                    "path": { "type": "string" },
                    "params": { "type": "object" },
                    "body": { "type": "object" }
                },
                "required": ["method", "path"]
            }),
        },
    ]
}
