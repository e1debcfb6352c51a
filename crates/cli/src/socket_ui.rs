// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! The headless `UiAdapter`: owner commands arrive over the Unix control
//! socket (`ouro_wire`'s length-prefixed JSON framing) rather than through
//! any chat front end. `status`/`review`/`ping` are answered inline from a
//! cache the daemon loop refreshes after every tick; the remaining commands
//! are translated into the same slash-command text the chat-text path
//! understands and handed to the tick loop as an `InboundMessage`.

use ouro_supervisor::ui::{InboundMessage, UiAdapter};
use ouro_wire::{read_query, write_response, Query, Response, StatusReport};
use parking_lot::Mutex;
use std::path::Path;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};

#[derive(Default)]
pub struct StatusCache {
    status: Mutex<StatusReport>,
}

impl StatusCache {
    pub fn update_status(&self, report: StatusReport) {
        *self.status.lock() = report;
    }

    pub fn status(&self) -> StatusReport {
        self.status.lock().clone()
    }
}

pub struct SocketUiAdapter {
    listener: UnixListener,
    cache: std::sync::Arc<StatusCache>,
}

impl SocketUiAdapter {
    /// Binds the control socket, removing a stale file left behind by a
    /// previous process (the single-instance PID lock is what actually
    /// prevents two live daemons, not this).
    pub fn bind(path: &Path, cache: std::sync::Arc<StatusCache>) -> std::io::Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(path)?;
        Ok(Self { listener, cache })
    }

    async fn handle_connection(&self, mut stream: UnixStream) -> Option<InboundMessage> {
        let query = match read_query(&mut stream).await {
            Ok(q) => q,
            Err(_) => return None,
        };
        match query {
            Query::Ping => {
                let _ = write_response(&mut stream, &Response::Pong).await;
                None
            }
            Query::Status => {
                let _ = write_response(&mut stream, &Response::Status(self.cache.status())).await;
                None
            }
            Query::Review => {
                let _ = write_response(&mut stream, &Response::Review { summary: None }).await;
                None
            }
            Query::Evolve { enabled } => {
                let _ = write_response(&mut stream, &Response::Ok).await;
                let text = if enabled { "/evolve on".to_string() } else { "/evolve off".to_string() };
                Some(InboundMessage { msg_id: new_msg_id(), text, image: None })
            }
            Query::Bg { enabled } => {
                let _ = write_response(&mut stream, &Response::Ok).await;
                let text = if enabled { "/bg on".to_string() } else { "/bg off".to_string() };
                Some(InboundMessage { msg_id: new_msg_id(), text, image: None })
            }
            Query::Restart => {
                let _ = write_response(&mut stream, &Response::Ok).await;
                Some(InboundMessage { msg_id: new_msg_id(), text: "/restart".to_string(), image: None })
            }
            Query::Panic => {
                let _ = write_response(&mut stream, &Response::Ok).await;
                Some(InboundMessage { msg_id: new_msg_id(), text: "/panic".to_string(), image: None })
            }
        }
    }
}

fn new_msg_id() -> String {
    format!("ctl-{}", nanoid::nanoid!(8))
}

#[async_trait::async_trait]
impl UiAdapter for SocketUiAdapter {
    async fn poll(&self, timeout: Duration) -> Option<InboundMessage> {
        let accept = tokio::time::timeout(timeout, self.listener.accept()).await;
        let (stream, _addr) = accept.ok()?.ok()?;
        self.handle_connection(stream).await
    }

    async fn notify(&self, text: &str) {
        tracing::info!(target: "ouroboros::owner", "{text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ouro_wire::{read_message, write_message};
    use std::sync::Arc;

    async fn round_trip(sock: &std::path::Path, query: &Query) -> Response {
        let mut stream = UnixStream::connect(sock).await.unwrap();
        let payload = ouro_wire::encode(query).unwrap();
        write_message(&mut stream, &payload).await.unwrap();
        let reply = read_message(&mut stream).await.unwrap();
        ouro_wire::decode(&reply).unwrap()
    }

    #[tokio::test]
    async fn ping_replies_pong_without_producing_an_inbound_message() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("control.sock");
        let cache = Arc::new(StatusCache::default());
        let adapter = SocketUiAdapter::bind(&sock, cache).unwrap();

        let client = tokio::spawn({
            let sock = sock.clone();
            async move { round_trip(&sock, &Query::Ping).await }
        });
        let inbound = adapter.poll(Duration::from_secs(1)).await;
        let response = client.await.unwrap();

        assert_eq!(response, Response::Pong);
        assert!(inbound.is_none());
    }

    #[tokio::test]
    async fn status_replies_from_the_cache_without_producing_an_inbound_message() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("control.sock");
        let cache = Arc::new(StatusCache::default());
        cache.update_status(StatusReport { spent_usd: 4.5, pending_tasks: 2, ..StatusReport::default() });
        let adapter = SocketUiAdapter::bind(&sock, cache).unwrap();

        let client = tokio::spawn({
            let sock = sock.clone();
            async move { round_trip(&sock, &Query::Status).await }
        });
        let inbound = adapter.poll(Duration::from_secs(1)).await;
        let response = client.await.unwrap();

        match response {
            Response::Status(report) => {
                assert_eq!(report.spent_usd, 4.5);
                assert_eq!(report.pending_tasks, 2);
            }
            other => panic!("expected Response::Status, got {other:?}"),
        }
        assert!(inbound.is_none());
    }

    #[tokio::test]
    async fn restart_acks_ok_and_forwards_a_slash_command() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("control.sock");
        let cache = Arc::new(StatusCache::default());
        let adapter = SocketUiAdapter::bind(&sock, cache).unwrap();

        let client = tokio::spawn({
            let sock = sock.clone();
            async move { round_trip(&sock, &Query::Restart).await }
        });
        let inbound = adapter.poll(Duration::from_secs(1)).await;
        let response = client.await.unwrap();

        assert_eq!(response, Response::Ok);
        assert_eq!(inbound.unwrap().text, "/restart");
    }

    #[tokio::test]
    async fn evolve_on_forwards_the_matching_slash_command() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("control.sock");
        let cache = Arc::new(StatusCache::default());
        let adapter = SocketUiAdapter::bind(&sock, cache).unwrap();

        let client = tokio::spawn({
            let sock = sock.clone();
            async move { round_trip(&sock, &Query::Evolve { enabled: true }).await }
        });
        let inbound = adapter.poll(Duration::from_secs(1)).await;
        let _ = client.await.unwrap();

        assert_eq!(inbound.unwrap().text, "/evolve on");
    }

    #[tokio::test]
    async fn bind_removes_a_stale_socket_file_left_by_a_previous_process() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("control.sock");
        std::fs::write(&sock, b"stale").unwrap();

        let cache = Arc::new(StatusCache::default());
        let adapter = SocketUiAdapter::bind(&sock, cache);
        assert!(adapter.is_ok());
    }

    #[tokio::test]
    async fn poll_times_out_with_no_connection() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("control.sock");
        let cache = Arc::new(StatusCache::default());
        let adapter = SocketUiAdapter::bind(&sock, cache).unwrap();

        let inbound = adapter.poll(Duration::from_millis(50)).await;
        assert!(inbound.is_none());
    }
}
