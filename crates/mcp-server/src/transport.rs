//! Newline-delimited JSON transport
//!
//! Each line on the input is one JSON-RPC message. Requests are handled
//! concurrently; replies are funneled through a single writer task so lines
//! never interleave. Replies carry their request id, which is how clients
//! correlate them.

use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::server::{McpServer, parse_error_reply};

/// Serve one session over an arbitrary byte stream pair
///
/// Returns once the input reaches EOF and every in-flight request has been
/// answered.
pub async fn serve<R, W>(server: Arc<McpServer>, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(mut line) = rx.recv().await {
            line.push('\n');
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok::<_, io::Error>(())
    });

    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    let mut in_flight = JoinSet::new();

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            break;
        }

        // A line that is not UTF-8 is answered like any other unparseable line
        let line = match String::from_utf8(std::mem::take(&mut buffer)) {
            Ok(line) => line,
            Err(e) => {
                if let Some(reply) = parse_error_reply(&e.to_string()) {
                    let _ = tx.send(reply);
                }
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let server = Arc::clone(&server);
        let tx = tx.clone();
        in_flight.spawn(async move {
            if let Some(reply) = server.handle_line(&line).await {
                // The writer only goes away if the output is broken
                let _ = tx.send(reply);
            }
        });

        while in_flight.try_join_next().is_some() {}
    }

    debug!("Input closed; draining {} in-flight requests", in_flight.len());
    while in_flight.join_next().await.is_some() {}
    drop(tx);

    writer_task.await.map_err(io::Error::other)?
}

/// Serve one session over the process's stdin/stdout
pub async fn serve_stdio(server: Arc<McpServer>) -> io::Result<()> {
    info!(
        "Serving '{}' v{} on stdio",
        server.info().name,
        server.info().version
    );
    serve(server, tokio::io::stdin(), tokio::io::stdout()).await?;
    info!("Client disconnected");
    Ok(())
}
