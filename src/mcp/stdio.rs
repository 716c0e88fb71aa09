// ABOUTME: Line-oriented transport reading one JSON object per line
// ABOUTME: Classifies inbound frames, forwards bus events, and cancels sampling on EOF
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Line-oriented direct channel.
//!
//! Reads exactly one JSON object per input line and writes one per output
//! line. Inbound frames are classified by shape: responses go to the
//! channel's sampling peer, requests go to the request processor, malformed
//! input gets a structured parse-error reply rather than crashing the
//! channel. End-of-input cancels every pending sampling entry and stops the
//! notification forwarder, so nothing waits past teardown.
//!
//! The channel is generic over its reader/writer so tests can drive it with
//! in-memory pipes instead of process stdio.

use crate::errors::{AppError, AppResult};
use crate::jsonrpc::{classify, InboundFrame, JsonRpcNotification, JsonRpcResponse};
use crate::mcp::processor::RequestProcessor;
use crate::mcp::resources::ServerResources;
use crate::sampling::SamplingPeer;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One line-oriented channel over a reader/writer pair
pub struct LineChannel {
    resources: Arc<ServerResources>,
    peer: Arc<SamplingPeer>,
    outbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl LineChannel {
    /// Create a channel over the shared resources
    #[must_use]
    pub fn new(resources: Arc<ServerResources>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let peer = Arc::new(SamplingPeer::new(
            outbound_tx.clone(),
            resources.config.sampling_timeout,
        ));
        Self {
            resources,
            peer,
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
        }
    }

    /// Sampling peer bound to this channel's outbound writer
    #[must_use]
    pub fn sampling_peer(&self) -> Arc<SamplingPeer> {
        Arc::clone(&self.peer)
    }

    /// Run the channel until end-of-input.
    ///
    /// # Errors
    /// Returns a transport error when the channel has already been run or the
    /// underlying reader fails.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> AppResult<()>
    where
        R: tokio::io::AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let outbound_rx = {
            let mut slot = self.outbound_rx.lock().await;
            slot.take()
                .ok_or_else(|| AppError::transport("Line channel already running"))?
        };

        let writer_task = spawn_writer(writer, outbound_rx);
        let forwarder = self.spawn_notification_forwarder();
        let processor = RequestProcessor::new(Arc::clone(&self.resources));

        let mut lines = BufReader::new(reader).lines();
        let result = loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    self.handle_line(line, &processor).await;
                }
                Ok(None) => {
                    info!("Line channel reached end of input");
                    break Ok(());
                }
                Err(e) => {
                    break Err(AppError::transport(format!("Line channel read failed: {e}")));
                }
            }
        };

        // Teardown: nothing waiting on this channel may block past here
        self.peer.cancel_all_pending().await;
        forwarder.abort();
        drop(writer_task);
        result
    }

    async fn handle_line(&self, line: &str, processor: &RequestProcessor) {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                self.reply(&JsonRpcResponse::failure(
                    None,
                    &AppError::parse(format!("Invalid JSON: {e}")),
                ));
                return;
            }
        };

        match classify(&value) {
            InboundFrame::Response { id, result, error } => {
                if !self.peer.handle_response(&id, result, error).await {
                    // Unmatched responses are logged, never propagated
                    warn!(?id, "Dropped unmatched response on line channel");
                }
            }
            InboundFrame::Request(request) => {
                if let Some(response) = processor.process(request, None).await {
                    self.reply(&response);
                }
            }
            InboundFrame::Malformed(err) => {
                let id = value.get("id").cloned();
                self.reply(&JsonRpcResponse::failure(id, &err));
            }
        }
    }

    fn reply(&self, response: &JsonRpcResponse) {
        match serde_json::to_string(response) {
            Ok(frame) => {
                let _ = self.outbound_tx.send(frame);
            }
            Err(e) => warn!("Failed to encode response: {e}"),
        }
    }

    /// Forward bus events onto this channel as JSON-RPC notifications
    fn spawn_notification_forwarder(&self) -> JoinHandle<()> {
        let mut receiver = self.resources.bus.subscribe();
        let outbound = self.outbound_tx.clone();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        let Ok(params) = serde_json::to_value(&event) else {
                            continue;
                        };
                        let notification = JsonRpcNotification::new(event.method(), params);
                        let Ok(frame) = serde_json::to_string(&notification) else {
                            continue;
                        };
                        if outbound.send(frame).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Line channel lagged behind the notification bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Line channel notification forwarder stopped");
        })
    }
}

/// Drain outbound frames to the writer, one JSON object per line.
///
/// The task ends when every sender is dropped; holding the returned handle
/// until after teardown lets queued replies flush.
fn spawn_writer<W>(mut writer: W, mut outbound_rx: mpsc::UnboundedReceiver<String>) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if writer.write_all(frame.as_bytes()).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            let _ = writer.flush().await;
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenValidator;
    use crate::config::ServerConfig;
    use crate::context::InMemoryRecordStore;
    use crate::tools::builtin::EchoTool;
    use crate::tools::registry::ToolRegistry;
    use serde_json::json;
    use std::time::Duration;

    fn resources() -> Arc<ServerResources> {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool));
        Arc::new(ServerResources::new(
            ServerConfig::default(),
            registry,
            Arc::new(StaticTokenValidator::new()),
            Arc::new(InMemoryRecordStore::new()),
        ))
    }

    async fn run_lines(input: &str) -> Vec<Value> {
        let channel = LineChannel::new(resources());
        let (write_half, read_back) = tokio::io::duplex(64 * 1024);
        channel.run(input.as_bytes(), write_half).await.unwrap();
        // Dropping the channel closes the writer so the read side sees EOF
        drop(channel);

        let mut lines = BufReader::new(read_back).lines();
        let mut out = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            out.push(serde_json::from_str(&line).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn dispatches_request_and_replies_on_same_channel() {
        let input = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"echo","arguments":{"x":1}}}"#;
        let replies = run_lines(&format!("{input}\n")).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["result"], json!({"x": 1}));
    }

    #[tokio::test]
    async fn malformed_line_gets_parse_error_without_killing_channel() {
        let input = "not json at all\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
        let replies = run_lines(input).await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["error"]["code"], json!(-32700));
        assert_eq!(replies[1]["id"], json!(2));
    }

    #[tokio::test]
    async fn ambiguous_frame_is_answered_not_routed_to_correlator() {
        // id present, no method, no result/error
        let replies = run_lines("{\"jsonrpc\":\"2.0\",\"id\":9}\n").await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["error"]["code"], json!(-32600));
        assert_eq!(replies[0]["id"], json!(9));
    }

    #[tokio::test]
    async fn channel_peer_uses_configured_sampling_timeout() {
        let mut config = ServerConfig::default();
        config.sampling_timeout = Duration::from_millis(20);
        let resources = Arc::new(ServerResources::new(
            config,
            Arc::new(ToolRegistry::new()),
            Arc::new(StaticTokenValidator::new()),
            Arc::new(InMemoryRecordStore::new()),
        ));

        let channel = LineChannel::new(resources);
        let err = channel
            .sampling_peer()
            .issue_default("sampling/create", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::Timeout);
    }

    #[tokio::test]
    async fn eof_cancels_pending_sampling_entries() {
        let channel = Arc::new(LineChannel::new(resources()));
        let peer = channel.sampling_peer();

        let issuer = tokio::spawn(async move {
            peer.issue("sampling/create", json!({}), Duration::from_secs(30))
                .await
        });

        // Wait for the entry to land before feeding EOF
        let peer = channel.sampling_peer();
        while peer.pending_count().await == 0 {
            tokio::task::yield_now().await;
        }

        let (write_half, _read_back) = tokio::io::duplex(1024);
        channel.run(&b""[..], write_half).await.unwrap();

        let err = issuer.await.unwrap().unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::ConnectionClosed);
        assert_eq!(channel.sampling_peer().pending_count().await, 0);
    }

    #[tokio::test]
    async fn response_frame_fulfills_pending_entry() {
        let channel = Arc::new(LineChannel::new(resources()));
        let peer = channel.sampling_peer();

        let issuer = tokio::spawn(async move {
            peer.issue("sampling/create", json!({"prompt": "hi"}), Duration::from_secs(5))
                .await
        });

        let peer = channel.sampling_peer();
        while peer.pending_count().await == 0 {
            tokio::task::yield_now().await;
        }

        // The first issued id on a fresh peer is 1
        let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"answer\":\"yo\"}}\n";
        let (write_half, _read_back) = tokio::io::duplex(1024);
        channel.run(input.as_bytes(), write_half).await.unwrap();

        assert_eq!(issuer.await.unwrap().unwrap(), json!({"answer": "yo"}));
    }
}
