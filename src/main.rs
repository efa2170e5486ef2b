//! Binary entrypoint: wires environment configuration to the stdio server.

use emailbison_mcp::{Client, McpServer, ENV_API_KEY};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // A .env file is a convenience for local runs; missing is fine.
    dotenvy::dotenv().ok();

    // stdout carries the protocol, so all logging goes to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("emailbison_mcp=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting EmailBison MCP server"
    );

    // A missing key does not stop the server. The protocol still has to
    // come up so the agent can be told what is wrong.
    let client = match std::env::var(ENV_API_KEY) {
        Ok(key) if !key.is_empty() => {
            tracing::info!(api_key = %redact(&key), "API key loaded");
            match Client::from_env() {
                Ok(client) => Some(client),
                Err(error) => {
                    tracing::error!(%error, "could not build the API client");
                    None
                }
            }
        }
        _ => {
            tracing::warn!("{ENV_API_KEY} is not set; every tool call will report the missing key");
            None
        }
    };

    McpServer::new(client).serve_stdio().await
}

/// Shows enough of the key to recognize it without logging the secret.
fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 16 {
        return "***".to_owned();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn test_redact_keeps_ends_only() {
        assert_eq!(redact("0123456789abcdefghij"), "0123456789...efghij");
        assert_eq!(redact("short"), "***");
    }
}
