//! # EmailBison MCP - agent tools for the EmailBison sending platform
//!
//! This crate turns the EmailBison email-marketing REST API into a set of
//! MCP tools served over stdio, built around a retry-aware `reqwest` client
//! that keeps a trace of the last HTTP exchange for debugging.
//!
//! The EmailBison API is moody: some deployments want reply filters shaped
//! one way, some another, and a few endpoints moved between versions. The
//! client absorbs that drift so the tools above it stay simple:
//!
//! - **Retries with deterministic backoff** - transient statuses (429, 500,
//!   502, 503, 504) and network failures are retried up to three times
//! - **Filter shape probing** - the replies endpoint is tried with each
//!   known filter encoding until one works, with a legacy fallback that
//!   filters client-side
//! - **Endpoint version fallbacks** - stats and sequence-step lookups walk
//!   older endpoint forms when the current one answers with an error status
//! - **Tolerant decoding** - responses are never required to be JSON;
//!   non-JSON bodies come back wrapped as `{"raw": ...}`
//! - **Last-exchange trace** - every attempt records URL, method, status
//!   and a body preview, and tool errors embed that trace for the agent
//!
//! ## Quick Start
//!
//! ```no_run
//! use emailbison_mcp::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), emailbison_mcp::Error> {
//!     let client = Client::builder()
//!         .base_url("https://send.example.com")?
//!         .api_key("your-api-key")
//!         .build()?;
//!
//!     // Fetch every page of the campaign list.
//!     let campaigns = client.campaigns(None, None).await?;
//!     for campaign in &campaigns.data {
//!         println!("{} ({})", campaign["name"], campaign["id"]);
//!     }
//!
//!     // Replies, probing filter shapes as needed.
//!     let replies = client.campaign_replies(42, None, Some("inbox")).await?;
//!     println!("{} replies", replies.meta.total);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Running as an MCP server
//!
//! The binary reads `EMAILBISON_API_KEY` (and optionally
//! `EMAILBISON_BASE_URL`) from the environment, then speaks JSON-RPC over
//! stdio:
//!
//! ```no_run
//! use emailbison_mcp::{Client, McpServer};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let client = Client::from_env().ok();
//!     McpServer::new(client).serve_stdio().await
//! }
//! ```

mod api;
mod client;
mod error;
mod query;
mod render;
pub mod retry;
mod server;
pub mod tools;
mod trace;

pub use api::ReplyStatus;
pub use client::{Client, ClientBuilder, PagedData, PagedMeta, ENV_API_KEY, ENV_BASE_URL};
pub use error::{Error, Result};
pub use retry::RetryPolicy;
pub use server::McpServer;
pub use trace::RequestTrace;
