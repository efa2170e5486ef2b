//! Markdown rendering for the analysis tools.
//!
//! Everything here is a pure function over already-fetched records, so the
//! report shapes can be tested without a server. Field access is defensive
//! throughout; reply and campaign records routinely miss fields or carry
//! nulls.

use crate::api::is_truthy;
use serde_json::Value;
use std::fmt::Write;

/// One campaign's headline numbers for the comparison report.
pub(crate) struct CampaignPerformance {
    pub name: String,
    pub id: i64,
    pub emails: i64,
    pub open_rate: f64,
    pub reply_rate: f64,
    pub interested_rate: f64,
}

impl CampaignPerformance {
    pub(crate) fn from_records(id: i64, campaign: &Value, stats: &Value) -> Self {
        Self {
            name: display(campaign, "name"),
            id,
            emails: count(stats, "emails_sent"),
            open_rate: percent(stats, "opened_percentage"),
            reply_rate: percent(stats, "unique_replies_per_contact_percentage"),
            interested_rate: percent(stats, "interested_percentage"),
        }
    }
}

/// Scalar field for display; missing and null render as the fallback.
fn display_with(record: &Value, key: &str, fallback: &str) -> String {
    match record.get(key) {
        None | Some(Value::Null) => fallback.to_owned(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn display(record: &Value, key: &str) -> String {
    display_with(record, key, "?")
}

/// Numeric field coerced to a count; anything unusable is 0.
fn count(record: &Value, key: &str) -> i64 {
    match record.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn percent(record: &Value, key: &str) -> f64 {
    match record.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// First `limit` characters of a message body, flattened to one line.
fn body_preview(record: &Value, limit: usize) -> String {
    let text = record
        .get("text_body")
        .and_then(Value::as_str)
        .unwrap_or("");
    text.chars()
        .take(limit)
        .collect::<String>()
        .replace('\n', " ")
        .trim()
        .to_owned()
}

pub(crate) fn campaign_list(campaigns: &[Value]) -> String {
    let mut out = String::from("# Campaigns\n\n");
    for c in campaigns {
        let _ = write!(
            out,
            "## {} (ID {})\n- Status: {}\n- Emails Sent: {}\n- Opens: {} (U: {})\n- Replies: {} (U: {})\n- Bounced: {}\n- Interested: {}\n- Total Leads: {}\n\n",
            display(c, "name"),
            display(c, "id"),
            display(c, "status"),
            display(c, "emails_sent"),
            display(c, "opened"),
            display(c, "unique_opens"),
            display(c, "replied"),
            display(c, "unique_replies"),
            display(c, "bounced"),
            display(c, "interested"),
            display(c, "total_leads"),
        );
    }
    out
}

pub(crate) fn campaign_analysis(
    campaign: &Value,
    stats: &Value,
    sequence: Option<&Value>,
    replies: Option<&[Value]>,
) -> String {
    let mut out = format!(
        "# Campaign: {}\n\n## Overview\n- Status: {}\n- Type: {}\n- Created: {}\n\n## Metrics\n- Emails Sent: {}\n- Leads Contacted: {}\n- Open %: {}\n- Reply %: {}\n- Bounce %: {}\n- Interested %: {}\n",
        display(campaign, "name"),
        display(campaign, "status"),
        display(campaign, "type"),
        display(campaign, "created_at"),
        count(stats, "emails_sent"),
        count(stats, "total_leads_contacted"),
        percent(stats, "opened_percentage"),
        percent(stats, "unique_replies_per_contact_percentage"),
        percent(stats, "bounced_percentage"),
        percent(stats, "interested_percentage"),
    );

    // Step lines come from the stats payload; the sequence response only
    // gates whether the section appears at all.
    let has_steps = sequence
        .and_then(|seq| seq.get("data"))
        .and_then(|data| data.get("sequence_steps"))
        .and_then(Value::as_array)
        .is_some_and(|steps| !steps.is_empty());
    if has_steps {
        out.push_str("\n## Sequence Step Performance\n");
        for st in stats
            .get("sequence_step_stats")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let _ = writeln!(
                out,
                "- Step {}: sent {}, u-opens {}, u-replies {}, interested {}",
                display(st, "sequence_step_id"),
                count(st, "sent"),
                count(st, "unique_opens"),
                count(st, "unique_replies"),
                count(st, "interested"),
            );
        }
    }

    if let Some(replies) = replies.filter(|r| !r.is_empty()) {
        let interested = replies
            .iter()
            .filter(|r| is_truthy(r.get("interested")))
            .count();
        let automated = replies
            .iter()
            .filter(|r| is_truthy(r.get("automated_reply")))
            .count();
        let _ = write!(
            out,
            "\n## Replies ({})\n- Interested: {}\n- Automated: {}\n\n### Samples\n",
            replies.len(),
            interested,
            automated,
        );
        for r in replies.iter().take(5) {
            let _ = writeln!(
                out,
                "- {} <{}> — {} — {}...",
                display(r, "from_name"),
                display(r, "from_email_address"),
                display(r, "subject"),
                body_preview(r, 200),
            );
        }
    }
    out
}

pub(crate) fn replies_analysis(campaign_id: i64, replies: &[Value]) -> String {
    let interested = replies
        .iter()
        .filter(|r| is_truthy(r.get("interested")))
        .count();
    let automated = replies
        .iter()
        .filter(|r| is_truthy(r.get("automated_reply")))
        .count();
    let mut out = format!(
        "# Replies for {campaign_id}\n- Total: {}\n- Interested: {}\n- Automated: {}\n\n",
        replies.len(),
        interested,
        automated,
    );

    let humans = replies
        .iter()
        .filter(|r| !is_truthy(r.get("automated_reply")))
        .take(20);
    for (i, r) in humans.enumerate() {
        let preview = body_preview(r, 300);
        let ellipsis = if preview.chars().count() == 300 { "..." } else { "" };
        let _ = write!(
            out,
            "### #{} {} ({})\nSubject: {}\nInterested: {}\nMsg: {}{}\n\n",
            i + 1,
            display(r, "from_email_address"),
            display_with(r, "from_name", ""),
            display(r, "subject"),
            is_truthy(r.get("interested")),
            preview,
            ellipsis,
        );
    }
    out
}

/// Top campaigns by reply rate; at most five rows make the report.
pub(crate) fn performance_summary(mut rows: Vec<CampaignPerformance>) -> String {
    rows.sort_by(|a, b| {
        b.reply_rate
            .partial_cmp(&a.reply_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut out = String::from("# Performance (by Reply %)\n\n");
    for (i, p) in rows.iter().take(5).enumerate() {
        let _ = writeln!(
            out,
            "{}. {} (ID {}) — Sent {}, Open {}%, Reply {}%, Interested {}%",
            i + 1,
            p.name,
            p.id,
            p.emails,
            p.open_rate,
            p.reply_rate,
            p.interested_rate,
        );
    }
    out
}

/// Buckets leads by engagement score (opens plus three per reply).
pub(crate) fn lead_engagement(campaign_id: i64, leads: &[Value], threshold: i64) -> String {
    let mut high: Vec<(i64, &Value)> = Vec::new();
    let (mut engaged, mut low, mut none) = (0usize, 0usize, 0usize);

    for lead in leads {
        let stats = lead.get("lead_campaign_data").unwrap_or(&Value::Null);
        let score = count(stats, "opens") + count(stats, "replies") * 3;
        if score >= threshold * 3 {
            high.push((score, lead));
        } else if score >= threshold {
            engaged += 1;
        } else if score > 0 {
            low += 1;
        } else {
            none += 1;
        }
    }

    let mut out = format!(
        "# Lead Engagement (Campaign {campaign_id})\nTotal leads: {}\n- Highly: {} | Engaged: {} | Low: {} | None: {}\n\n",
        leads.len(),
        high.len(),
        engaged,
        low,
        none,
    );
    if !high.is_empty() {
        out.push_str("## Top Engaged\n");
        high.sort_by(|a, b| b.0.cmp(&a.0));
        for (score, lead) in high.iter().take(10) {
            let _ = writeln!(
                out,
                "- {} {} <{}> — score {}",
                display_with(lead, "first_name", ""),
                display_with(lead, "last_name", ""),
                display(lead, "email"),
                score,
            );
        }
    }
    out
}

pub(crate) fn sequence_insights(stats: &Value, steps: &[Value]) -> String {
    let mut out = String::from("# Sequence Insights\n");
    if steps.is_empty() {
        return out;
    }

    let variants = steps.iter().any(|s| is_truthy(s.get("variant")));
    let _ = writeln!(
        out,
        "- Steps: {} | Variants: {}",
        steps.len(),
        if variants { "Yes" } else { "No" },
    );

    let empty = Vec::new();
    let step_stats = stats
        .get("sequence_step_stats")
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    for (i, step) in steps.iter().enumerate() {
        let stat = step_stats
            .iter()
            .find(|ss| ss.get("sequence_step_id") == step.get("id"))
            .unwrap_or(&Value::Null);
        let sent = count(stat, "sent");
        let replies = count(stat, "unique_replies");
        let rate = replies as f64 / sent.max(1) as f64 * 100.0;
        let _ = write!(
            out,
            "\n{}) {} — wait {}d, thread:{}, var:{}\n   sent {}, reply% {:.1}, interested {}\n",
            i + 1,
            display_with(step, "email_subject", "(no subject)"),
            count(step, "wait_in_days"),
            is_truthy(step.get("thread_reply")),
            is_truthy(step.get("variant")),
            sent,
            rate,
            count(stat, "interested"),
        );
    }
    out
}

/// Pretty JSON in a fenced block, optionally truncated for the big dumps.
pub(crate) fn json_block(value: &Value, limit: Option<usize>) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    let body: String = match limit {
        Some(limit) => pretty.chars().take(limit).collect(),
        None => pretty,
    };
    format!("```json\n{body}\n```")
}
