//! Newline-delimited stdio transport.
//!
//! One JSON-RPC message per line in, one response per line out.  Requests
//! are handled in arrival order; the loop ends when the reader hits EOF.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::{JsonRpcResponse, PARSE_ERROR, Reply};
use crate::server::McpServer;

/// Serve requests read from `reader`, writing replies to `writer`.
///
/// A line that is not valid UTF-8 JSON gets a parse error reply and the
/// loop carries on with the next line.
pub async fn serve<R, W>(server: &McpServer, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut handled: u64 = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_slice::<Value>(line) {
            Ok(message) => server.handle_message(message).await,
            Err(e) => {
                warn!(error = %e, "unparsable message on stdin");
                Some(Reply::Single(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("parse error: {e}"),
                )))
            }
        };
        handled += 1;

        if let Some(reply) = reply {
            let mut out = serde_json::to_string(&reply)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
            debug!(bytes = out.len(), "reply written");
        }
    }

    info!(messages = handled, "input closed, stopping MCP server");
    Ok(())
}

/// Serve on the process's stdin and stdout.
pub async fn serve_stdio(server: &McpServer) -> Result<()> {
    serve(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn run(input: &str) -> Vec<Value> {
        run_bytes(input.as_bytes()).await
    }

    async fn run_bytes(input: &[u8]) -> Vec<Value> {
        let server = McpServer::new(Vec::new());
        let mut output = Vec::new();
        serve(&server, input, &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn one_reply_per_request_line() {
        let replies = run(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n   \n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":"b","method":"tools/list"}"#,
            "\n",
        ))
        .await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[1]["id"], "b");
        assert_eq!(replies[1]["result"]["tools"], json!([]));
    }

    #[tokio::test]
    async fn garbage_yields_parse_error_with_null_id() {
        let replies = run("{not json\n").await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0]["id"].is_null());
        assert_eq!(replies[0]["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_end_session() {
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n");

        let replies = run_bytes(&input).await;
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["id"], 1);
        assert!(replies[1]["id"].is_null());
        assert_eq!(replies[1]["error"]["code"], PARSE_ERROR);
        assert_eq!(replies[2]["id"], 2);
        assert_eq!(replies[2]["result"], json!({}));
    }

    #[tokio::test]
    async fn batch_reply_is_one_line() {
        let replies = run(concat!(
            r#"[{"jsonrpc":"2.0","id":1,"method":"ping"},{"jsonrpc":"2.0","id":2,"method":"ping"}]"#,
            "\n[]\n",
        ))
        .await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].as_array().unwrap().len(), 2);
        assert_eq!(replies[1]["error"]["code"], crate::protocol::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn last_line_without_newline_is_handled() {
        let replies = run(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#).await;
        assert_eq!(replies[0]["id"], 7);
    }
}
