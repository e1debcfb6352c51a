// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Thin client for `ouroctl`'s read/command subcommands: one request, one
//! response, over the control socket.

use anyhow::{anyhow, Context, Result};
use ouro_wire::{read_message, write_message, Query, Response};
use std::path::Path;
use tokio::net::UnixStream;

pub async fn send(socket_path: &Path, query: Query) -> Result<Response> {
    let mut stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("no supervisor listening on {}", socket_path.display()))?;
    let payload = ouro_wire::encode(&query)?;
    write_message(&mut stream, &payload).await?;
    let reply = read_message(&mut stream).await?;
    let response: Response = ouro_wire::decode(&reply)?;
    if let Response::Error { message } = &response {
        return Err(anyhow!("supervisor reported an error: {message}"));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_fails_clearly_when_nothing_is_listening() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("control.sock");

        let err = send(&sock, Query::Ping).await.unwrap_err();

        assert!(err.to_string().contains("no supervisor listening"));
    }
}
