//! Framed-JSON TCP transport feeding the router.
//!
//! One connection carries pipelined requests; each is dispatched on its own
//! task so a slow command does not stall the frames behind it, and responses
//! are correlated by `requestId`. The shared writer sits behind a mutex so
//! interleaved completions serialize cleanly.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::codec::JsonCodec;
use crate::protocol::{CommandRequest, CommandResponse};
use crate::router::Router;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7575,
        }
    }
}

/// Bind and serve until `shutdown` fires.
pub async fn serve(
    config: &ServerConfig,
    router: Arc<Router>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, router, shutdown).await
}

/// Serve on an already-bound listener (tests bind port 0 and read the
/// resulting address themselves).
pub async fn serve_listener(
    listener: TcpListener,
    router: Arc<Router>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "command server listening");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                tracing::debug!(%peer, "client connected");
                let router = Arc::clone(&router);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    handle_connection(stream, router, shutdown).await;
                    tracing::debug!(%peer, "client disconnected");
                });
            }
        }
    }

    tracing::info!("command server stopped");
    Ok(())
}

async fn handle_connection(stream: TcpStream, router: Arc<Router>, shutdown: CancellationToken) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, JsonCodec::<CommandRequest>::new());
    let writer = Arc::new(tokio::sync::Mutex::new(FramedWrite::new(
        write_half,
        JsonCodec::<CommandResponse>::new(),
    )));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = reader.next() => match frame {
                Some(Ok(request)) => {
                    let router = Arc::clone(&router);
                    let writer = Arc::clone(&writer);
                    tokio::spawn(async move {
                        let response = router.dispatch(request).await;
                        let mut writer = writer.lock().await;
                        if let Err(err) = writer.send(response).await {
                            tracing::warn!(error = %err, "failed to write response");
                        }
                    });
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "malformed request frame, closing connection");
                    break;
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::commands::standard_registry;
    use crate::executor::{HostExecutor, SerialExecutor};
    use crate::host::HostSession;
    use crate::host::document::Document;
    use crate::router::Router;

    async fn start_server() -> (SocketAddr, CancellationToken, Arc<HostExecutor>) {
        let executor = Arc::new(HostExecutor::spawn(HostSession::new(Document::sample())).unwrap());
        let registry = standard_registry(executor.clone() as Arc<dyn SerialExecutor>).unwrap();
        let router = Arc::new(Router::new(registry));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        tokio::spawn(serve_listener(listener, router, shutdown.clone()));

        (addr, shutdown, executor)
    }

    #[tokio::test]
    async fn serves_commands_end_to_end() {
        let (addr, shutdown, executor) = start_server().await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, write_half) = stream.into_split();
        let mut writer = FramedWrite::new(write_half, JsonCodec::<CommandRequest>::new());
        let mut reader = FramedRead::new(read_half, JsonCodec::<CommandResponse>::new());

        writer
            .send(CommandRequest {
                command_name: "get_element_id".to_string(),
                request_id: "req-1".to_string(),
                parameters: json!({"filterType": "walls"}),
            })
            .await
            .unwrap();
        let response = reader.next().await.unwrap().unwrap();
        assert_eq!(response.request_id, "req-1");
        assert_eq!(response.result["success"], json!(true));
        assert_eq!(response.result["Count"], json!(3));

        writer
            .send(CommandRequest {
                command_name: "frobnicate".to_string(),
                request_id: "req-2".to_string(),
                parameters: json!({}),
            })
            .await
            .unwrap();
        let response = reader.next().await.unwrap().unwrap();
        assert_eq!(response.result["success"], json!(false));
        assert_eq!(response.result["code"], json!("unknown_command"));

        shutdown.cancel();
        executor.shutdown();
    }

    #[tokio::test]
    async fn fills_request_ids_for_bare_requests() {
        let (addr, shutdown, executor) = start_server().await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, write_half) = stream.into_split();
        let mut writer = FramedWrite::new(write_half, JsonCodec::<CommandRequest>::new());
        let mut reader = FramedRead::new(read_half, JsonCodec::<CommandResponse>::new());

        writer
            .send(CommandRequest {
                command_name: "get_warnings".to_string(),
                request_id: String::new(),
                parameters: json!({"includeElementIds": false}),
            })
            .await
            .unwrap();
        let response = reader.next().await.unwrap().unwrap();
        assert!(!response.request_id.is_empty());
        assert_eq!(response.result["ModelName"], json!("Sample House"));

        shutdown.cancel();
        executor.shutdown();
    }
}
