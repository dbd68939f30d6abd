//! Local HTTP/1.1 peers serving a two-tool math server for transport tests

use mcp_core::PROTOCOL_VERSION;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub(crate) const SESSION_ID: &str = "session-1";

struct HttpRequest {
    method: String,
    headers: HashMap<String, String>,
    body: Value,
}

/// Read one request off a keep-alive connection; `None` once the peer hangs up
async fn read_request<R: AsyncRead + Unpin>(reader: &mut BufReader<R>) -> Option<HttpRequest> {
    let mut line = String::new();
    if reader.read_line(&mut line).await.ok()? == 0 {
        return None;
    }
    let method = line.split_whitespace().next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length = headers
        .get("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).await.ok()?;

    Some(HttpRequest {
        method,
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    })
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> std::io::Result<()> {
    let mut head = format!("HTTP/1.1 {status}\r\nContent-Length: {}\r\n", body.len());
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(body.as_bytes()).await?;
    writer.flush().await
}

/// The server's reply to one JSON-RPC message; notifications get none
fn math_reply(message: &Value) -> Option<Value> {
    let id = message.get("id")?.clone();
    let result = match message["method"].as_str() {
        Some("initialize") => json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": "math-server", "version": "1.0.0"}
        }),
        Some("ping") => json!({}),
        Some("tools/list") => json!({
            "tools": [
                {"name": "add", "description": "Add two numbers", "inputSchema": {"type": "object"}},
                {"name": "multiply", "description": "Multiply two numbers", "inputSchema": {"type": "object"}}
            ]
        }),
        Some("tools/call") => {
            let arguments = &message["params"]["arguments"];
            let a = arguments["a"].as_f64().unwrap_or_default();
            let b = arguments["b"].as_f64().unwrap_or_default();
            let text = match message["params"]["name"].as_str() {
                Some("add") => format!("{a:?} + {b:?} = {:?}", a + b),
                Some("multiply") => format!("{a:?} * {b:?} = {:?}", a * b),
                other => format!("Error: Unknown tool: {}", other.unwrap_or_default()),
            };
            json!({"content": [{"type": "text", "text": text}]})
        }
        _ => {
            return Some(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": "Method not found"}
            }));
        }
    };
    Some(json!({"jsonrpc": "2.0", "id": id, "result": result}))
}

/// Streamable-HTTP server on a local port
///
/// Assigns [`SESSION_ID`] on `initialize`, answers `tools/list` with an
/// event-stream body and everything else with JSON. Returns the endpoint URL
/// and a log of `"<HTTP method> <rpc method> <session header>"` lines.
pub(crate) async fn spawn_http_server() -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/mcp", listener.local_addr().unwrap());
    let log = Arc::new(Mutex::new(Vec::new()));

    let server_log = Arc::clone(&log);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let log = Arc::clone(&server_log);
            tokio::spawn(async move {
                let (read, mut write) = stream.into_split();
                let mut reader = BufReader::new(read);

                while let Some(request) = read_request(&mut reader).await {
                    let rpc_method = request.body["method"].as_str().unwrap_or("-").to_string();
                    let session = request.headers.get("mcp-session-id").map_or("-", String::as_str);
                    log.lock()
                        .unwrap()
                        .push(format!("{} {} {}", request.method, rpc_method, session));

                    let written = match math_reply(&request.body) {
                        _ if request.method == "DELETE" => {
                            write_response(&mut write, "200 OK", &[], "").await
                        }
                        None => write_response(&mut write, "202 Accepted", &[], "").await,
                        Some(reply) if rpc_method == "initialize" => {
                            let headers = [("Content-Type", "application/json"), ("Mcp-Session-Id", SESSION_ID)];
                            write_response(&mut write, "200 OK", &headers, &reply.to_string()).await
                        }
                        Some(reply) if rpc_method == "tools/list" => {
                            let body = format!("event: message\ndata: {reply}\n\n");
                            let headers = [("Content-Type", "text/event-stream")];
                            write_response(&mut write, "200 OK", &headers, &body).await
                        }
                        Some(reply) => {
                            let headers = [("Content-Type", "application/json")];
                            write_response(&mut write, "200 OK", &headers, &reply.to_string()).await
                        }
                    };
                    if written.is_err() {
                        break;
                    }
                }
            });
        }
    });

    (url, log)
}

/// SSE server on a local port
///
/// A GET opens the event stream and announces `/messages?sessionId=1` as the
/// POST endpoint. Each POST is acknowledged with `202 Accepted` and its
/// response is pushed onto the open stream as a `message` event.
pub(crate) async fn spawn_sse_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/sse", listener.local_addr().unwrap());

    let (events_tx, events_rx) = mpsc::unbounded_channel::<String>();
    let events_rx = Arc::new(tokio::sync::Mutex::new(Some(events_rx)));

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let events_tx = events_tx.clone();
            let events_rx = Arc::clone(&events_rx);
            tokio::spawn(async move {
                let (read, mut write) = stream.into_split();
                let mut reader = BufReader::new(read);

                while let Some(request) = read_request(&mut reader).await {
                    if request.method == "GET" {
                        let Some(mut events) = events_rx.lock().await.take() else {
                            break;
                        };
                        let head = "HTTP/1.1 200 OK\r\n\
                                    Content-Type: text/event-stream\r\n\
                                    Cache-Control: no-cache\r\n\
                                    Transfer-Encoding: chunked\r\n\r\n";
                        if write.write_all(head.as_bytes()).await.is_err() {
                            break;
                        }

                        let mut event = Some("event: endpoint\ndata: /messages?sessionId=1\n\n".to_string());
                        while let Some(data) = event {
                            let chunk = format!("{:x}\r\n{}\r\n", data.len(), data);
                            if write.write_all(chunk.as_bytes()).await.is_err() || write.flush().await.is_err() {
                                break;
                            }
                            event = events.recv().await;
                        }
                        break;
                    }

                    if let Some(reply) = math_reply(&request.body) {
                        let _ = events_tx.send(format!("event: message\ndata: {reply}\n\n"));
                    }
                    if write_response(&mut write, "202 Accepted", &[], "").await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    url
}
