//! MCP server plumbing: Content-Length framed JSON-RPC 2.0 over stdio.
//!
//! The loop is deliberately small. Requests carrying an `id` get exactly
//! one response, notifications get none, and batches fan out in order.
//! Tool failures never surface as protocol errors; they are rendered into
//! the tool's text output instead so the agent can read them.

use crate::client::Client;
use crate::tools;
use serde_json::{json, Map, Value};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "email-bison";

struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }
}

/// Serves the tool catalog over stdio.
pub struct McpServer {
    client: Option<Client>,
}

impl McpServer {
    /// `client` may be `None` when no API key was configured; the server
    /// still answers the protocol and reports the problem per tool call.
    pub fn new(client: Option<Client>) -> Self {
        Self { client }
    }

    /// Reads framed messages from stdin until EOF.
    pub async fn serve_stdio(&self) -> io::Result<()> {
        let mut reader = BufReader::new(io::stdin());
        let mut stdout = io::stdout();

        loop {
            let Some(incoming) = read_framed_json(&mut reader).await? else {
                break;
            };
            for response in self.handle_incoming(incoming).await {
                write_framed_json(&mut stdout, &response).await?;
            }
        }
        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    async fn handle_incoming(&self, incoming: Value) -> Vec<Value> {
        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                return vec![error_response(
                    Value::Null,
                    RpcError::invalid_request("batch must not be empty"),
                )];
            }
            let mut responses = Vec::new();
            for item in batch {
                if let Some(response) = self.handle_single(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        match self.handle_single(incoming).await {
            Some(response) => vec![response],
            None => Vec::new(),
        }
    }

    async fn handle_single(&self, incoming: Value) -> Option<Value> {
        let Some(message) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("request must be a JSON object"),
            ));
        };

        if message.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = message.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = message.get("method").and_then(Value::as_str) else {
            // A message without a method is a client-side response; this
            // server never issues outbound requests, so drop it.
            return None;
        };

        let params = message.get("params").cloned().unwrap_or(Value::Null);
        match message.get("id").cloned() {
            Some(id) => Some(match self.handle_request(method, params).await {
                Ok(result) => success_response(id, result),
                Err(error) => error_response(id, error),
            }),
            None => {
                tracing::debug!(method, "ignoring notification");
                None
            }
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "listChanged": false },
                "prompts": { "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        tracing::debug!(tool = name, "tools/call");
        let text = tools::call_tool(self.client.as_ref(), name, &args).await;
        Ok(json!({
            "content": [{ "type": "text", "text": text }]
        }))
    }
}

fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tools::tool_definitions()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}

/// Reads one `Content-Length` framed JSON message; `None` on clean EOF.
async fn read_framed_json<R>(reader: &mut R) -> io::Result<Option<Value>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if content_length.is_none() {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "unexpected EOF while reading headers",
            ));
        }

        if line == "\r\n" || line == "\n" {
            break;
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                let parsed = value.trim().parse::<usize>().map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "invalid Content-Length header")
                })?;
                content_length = Some(parsed);
            }
        }
    }

    let content_length = content_length.ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "missing Content-Length header")
    })?;
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;

    let json = serde_json::from_slice(&payload).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidData, format!("invalid JSON payload: {e}"))
    })?;
    Ok(Some(json))
}

async fn write_framed_json<W>(writer: &mut W, value: &Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> McpServer {
        McpServer::new(None)
    }

    async fn only_response(server: &McpServer, message: Value) -> Value {
        let mut responses = server.handle_incoming(message).await;
        assert_eq!(responses.len(), 1);
        responses.pop().unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = only_response(
            &server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "email-bison");
    }

    #[tokio::test]
    async fn test_tools_list_carries_full_catalog() {
        let response = only_response(
            &server(),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        )
        .await;
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 18);
        assert!(tools.iter().any(|t| t["name"] == "raw_request"));
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn test_ping_and_empty_listings() {
        let sv = server();
        let ping = only_response(&sv, json!({"jsonrpc": "2.0", "id": 3, "method": "ping"})).await;
        assert_eq!(ping["result"], json!({}));

        let prompts =
            only_response(&sv, json!({"jsonrpc": "2.0", "id": 4, "method": "prompts/list"})).await;
        assert_eq!(prompts["result"], json!({"prompts": []}));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = only_response(
            &server(),
            json!({"jsonrpc": "2.0", "id": 5, "method": "shutdown"}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_bad_jsonrpc_version() {
        let response = only_response(
            &server(),
            json!({"jsonrpc": "1.0", "id": 6, "method": "ping"}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let responses = server()
            .handle_incoming(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn test_batch_fans_out_in_order() {
        let responses = server()
            .handle_incoming(json!([
                {"jsonrpc": "2.0", "id": 1, "method": "ping"},
                {"jsonrpc": "2.0", "method": "notifications/initialized"},
                {"jsonrpc": "2.0", "id": 2, "method": "ping"}
            ]))
            .await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["id"], 2);
    }

    #[tokio::test]
    async fn test_empty_batch_is_invalid() {
        let responses = server().handle_incoming(json!([])).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_tools_call_without_client() {
        let response = only_response(
            &server(),
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": {"name": "list_campaigns", "arguments": {}}
            }),
        )
        .await;
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert_eq!(text, "Error: client not initialized. Set EMAILBISON_API_KEY.");
    }

    #[tokio::test]
    async fn test_tools_call_requires_name() {
        let response = only_response(
            &server(),
            json!({"jsonrpc": "2.0", "id": 8, "method": "tools/call", "params": {}}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_framing_round_trip() {
        let message = json!({"jsonrpc": "2.0", "id": 9, "method": "ping"});
        let mut buffer = Vec::new();
        write_framed_json(&mut buffer, &message).await.unwrap();

        let mut reader = BufReader::new(buffer.as_slice());
        let decoded = read_framed_json(&mut reader).await.unwrap().unwrap();
        assert_eq!(decoded, message);
        // Clean EOF after the only message.
        assert!(read_framed_json(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_framing_accepts_lowercase_header() {
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        let framed = format!("content-length: {}\r\n\r\n{}", body.len(), body);
        let mut reader = BufReader::new(framed.as_bytes());
        let decoded = read_framed_json(&mut reader).await.unwrap().unwrap();
        assert_eq!(decoded["method"], "ping");
    }

    #[tokio::test]
    async fn test_framing_rejects_missing_length() {
        let mut reader = BufReader::new("X-Other: 1\r\n\r\n{}".as_bytes());
        assert!(read_framed_json(&mut reader).await.is_err());
    }
}
