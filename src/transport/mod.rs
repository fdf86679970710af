//! Newline-delimited JSON-RPC server exposing a [`ToolRegistry`].
//!
//! Every request runs on its own task so a slow tool never blocks discovery
//! or other calls. Responses funnel through a single writer task, one line
//! per message.

pub mod jsonrpc;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::tools::{ToolCallRequest, ToolRegistry};
use jsonrpc::{
    INTERNAL_ERROR, INVALID_PARAMS, Incoming, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND,
    RpcError, decode,
};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Serves one registry over a byte stream
pub struct Server {
    registry: Arc<ToolRegistry>,
}

impl Server {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Serve on the process's stdin and stdout until stdin closes
    pub async fn serve_stdio(&self) -> Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve until `reader` reaches end of input.
    ///
    /// In-flight requests finish and their responses are written before this
    /// returns.
    ///
    /// A frame that is not valid JSON (or not UTF-8) is answered with a parse
    /// error and serving continues; only a failing reader ends the loop early.
    pub async fn serve<R, W>(&self, mut reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut in_flight = JoinSet::new();
        let mut frame = Vec::new();
        info!(tools = self.registry.names().len(), "serving tools over stdio");

        let read_result = loop {
            frame.clear();
            match reader.read_until(b'\n', &mut frame).await {
                Ok(0) => break Ok(()),
                Ok(_) => self.accept(&frame, &tx, &mut in_flight),
                Err(e) => break Err(anyhow::Error::new(e).context("failed to read request")),
            }

            // Reap finished handlers so the set does not grow unbounded
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    warn!(error = %e, "request handler failed");
                }
            }
        };

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "request handler failed");
            }
        }
        drop(tx);

        writer_task.await.context("response writer task failed")??;
        read_result?;
        debug!("input closed, server stopped");
        Ok(())
    }

    fn accept(
        &self,
        frame: &[u8],
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
        in_flight: &mut JoinSet<()>,
    ) {
        if frame.iter().all(u8::is_ascii_whitespace) {
            return;
        }

        match decode(frame) {
            Incoming::Invalid(response) => {
                warn!(line = %String::from_utf8_lossy(frame).trim_end(), "rejected malformed message");
                let _ = tx.send(response);
            }
            Incoming::Request(request) => {
                let registry = Arc::clone(&self.registry);
                let tx = tx.clone();
                in_flight.spawn(async move {
                    if let Some(response) = respond(&registry, request).await {
                        let _ = tx.send(response);
                    }
                });
            }
        }
    }
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_string(&response).context("failed to encode response")?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .context("failed to write response")?;
        writer.flush().await.context("failed to flush response")?;
    }
    writer.shutdown().await.ok();
    Ok(())
}

/// Handle one request; notifications produce no response
async fn respond(registry: &ToolRegistry, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    if request.is_notification() {
        debug!(method = %request.method, "notification received");
        return None;
    }
    let id = request.id.clone().unwrap_or_default();

    let outcome = match request.method.as_str() {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": registry.list_all_tools() })),
        "tools/call" => call_tool(registry, request.params).await,
        other => Err(RpcError::new(
            METHOD_NOT_FOUND,
            format!("method not found: {}", other),
        )),
    };

    Some(match outcome {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => JsonRpcResponse::failure(id, error),
    })
}

async fn call_tool(registry: &ToolRegistry, params: Option<Value>) -> Result<Value, RpcError> {
    let params = params.ok_or_else(|| RpcError::new(INVALID_PARAMS, "missing params"))?;
    let call: ToolCallRequest = serde_json::from_value(params)
        .map_err(|e| RpcError::new(INVALID_PARAMS, format!("invalid params: {}", e)))?;

    let result = registry.dispatch(&call).await;
    serde_json::to_value(&result).map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use tokio::io::AsyncReadExt;

    async fn exchange(input: impl AsRef<[u8]>) -> Vec<Value> {
        let registry = ToolRegistry::with_default_modules(&HubConfig::default()).unwrap();
        let server = Server::new(Arc::new(registry));
        let (mut client, server_side) = tokio::io::duplex(256 * 1024);

        server.serve(input.as_ref(), server_side).await.unwrap();

        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn by_id(responses: &[Value], id: i64) -> &Value {
        responses
            .iter()
            .find(|r| r["id"] == id)
            .unwrap_or_else(|| panic!("no response with id {}", id))
    }

    #[tokio::test]
    async fn initialize_reports_protocol_and_server() {
        let responses =
            exchange("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n").await;
        let result = &by_id(&responses, 1)["result"];
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "tool-hub");
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let responses = exchange(concat!(
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n",
        ))
        .await;
        assert_eq!(responses.len(), 1);
        assert_eq!(by_id(&responses, 2)["result"], json!({}));
    }

    #[tokio::test]
    async fn lists_and_calls_tools() {
        let responses = exchange(concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":",
            "{\"name\":\"finance_mobile_money_services\",\"arguments\":{}}}\n",
        ))
        .await;

        let tools = by_id(&responses, 1)["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 12);
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));

        let call = &by_id(&responses, 2)["result"];
        assert_eq!(call["isError"], true);
        assert_eq!(
            call["content"][0]["text"],
            "Error executing tool finance_mobile_money_services: invalid argument: missing required argument 'country'"
        );
    }

    #[tokio::test]
    async fn protocol_errors_use_standard_codes() {
        let responses = exchange(concat!(
            "not json\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"resources/list\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":4,\"method\":\"tools/call\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":5,\"method\":\"tools/call\",\"params\":{\"arguments\":{}}}\n",
        ))
        .await;

        assert_eq!(responses.len(), 4);
        let parse = responses.iter().find(|r| r["id"].is_null()).unwrap();
        assert_eq!(parse["error"]["code"], jsonrpc::PARSE_ERROR);
        assert_eq!(by_id(&responses, 3)["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(by_id(&responses, 4)["error"]["code"], INVALID_PARAMS);
        assert_eq!(by_id(&responses, 5)["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn invalid_utf8_frame_gets_parse_error_and_serving_continues() {
        let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n".to_vec();
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n");

        let responses = exchange(input).await;

        assert_eq!(responses.len(), 3);
        assert_eq!(by_id(&responses, 1)["result"], json!({}));
        assert_eq!(by_id(&responses, 2)["result"], json!({}));
        let parse = responses.iter().find(|r| r["id"].is_null()).unwrap();
        assert_eq!(parse["error"]["code"], jsonrpc::PARSE_ERROR);
    }

    #[tokio::test]
    async fn null_id_is_answered() {
        let responses = exchange("{\"jsonrpc\":\"2.0\",\"id\":null,\"method\":\"ping\"}\n").await;
        assert_eq!(responses.len(), 1);
        assert!(responses[0]["id"].is_null());
        assert_eq!(responses[0]["result"], json!({}));
    }
}
