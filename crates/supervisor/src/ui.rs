// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! The UI adapter boundary: whatever front end feeds owner messages in and
//! receives notifications out. No concrete façade (HTTP/WebSocket/Telegram)
//! is wired up here — only the trait and an in-process fake for tests.

use async_trait::async_trait;
use ouro_core::task::ImageRef;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub msg_id: String,
    pub text: String,
    pub image: Option<ImageRef>,
}

#[async_trait]
pub trait UiAdapter: Send + Sync {
    /// Long-polls for the next inbound owner message, honoring `timeout`.
    /// Returns `None` on timeout with nothing received.
    async fn poll(&self, timeout: Duration) -> Option<InboundMessage>;
    async fn notify(&self, text: &str);
}

#[derive(Default)]
pub struct FakeUiAdapter {
    inbound: parking_lot::Mutex<std::collections::VecDeque<InboundMessage>>,
    notifications: parking_lot::Mutex<Vec<String>>,
}

impl FakeUiAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&self, msg: InboundMessage) {
        self.inbound.lock().push_back(msg);
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().clone()
    }
}

#[async_trait]
impl UiAdapter for FakeUiAdapter {
    async fn poll(&self, _timeout: Duration) -> Option<InboundMessage> {
        self.inbound.lock().pop_front()
    }

    async fn notify(&self, text: &str) {
        self.notifications.lock().push(text.to_string());
    }
}
