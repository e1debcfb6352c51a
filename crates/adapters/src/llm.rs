// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! The LLM client boundary. No concrete provider is wired up here — the
//! core never parses model output, it only spends the `Usage` a call
//! reports back.

use crate::error::LlmClientError;
use async_trait::async_trait;
use ouro_core::task::ImageRef;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<(ChatResponse, Usage), LlmClientError>;
    async fn vision_query(&self, prompt: &str, images: &[ImageRef]) -> Result<(String, Usage), LlmClientError>;
}

/// A scripted client for tests: each call pops the next queued response (or
/// error) in FIFO order. Panics (test-only) if the script runs dry, since a
/// test that exhausts its script is a test bug, not a runtime condition.
pub struct FakeLlmClient {
    chat_script: Mutex<VecDeque<Result<(ChatResponse, Usage), LlmClientError>>>,
    vision_script: Mutex<VecDeque<Result<(String, Usage), LlmClientError>>>,
}

impl FakeLlmClient {
    pub fn new() -> Self {
        Self { chat_script: Mutex::new(VecDeque::new()), vision_script: Mutex::new(VecDeque::new()) }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn push_chat(&self, response: ChatResponse, usage: Usage) {
        self.chat_script.lock().push_back(Ok((response, usage)));
    }

    pub fn push_chat_error(&self, err: LlmClientError) {
        self.chat_script.lock().push_back(Err(err));
    }

    pub fn push_vision(&self, text: impl Into<String>, usage: Usage) {
        self.vision_script.lock().push_back(Ok((text.into(), usage)));
    }
}

impl Default for FakeLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(&self, _req: ChatRequest) -> Result<(ChatResponse, Usage), LlmClientError> {
        self.chat_script.lock().pop_front().unwrap_or_else(|| {
            Ok((ChatResponse { text: String::new() }, Usage { prompt_tokens: 0, completion_tokens: 0, cost_usd: 0.0 }))
        })
    }

    async fn vision_query(&self, _prompt: &str, _images: &[ImageRef]) -> Result<(String, Usage), LlmClientError> {
        self.vision_script.lock().pop_front().unwrap_or_else(|| {
            Ok((String::new(), Usage { prompt_tokens: 0, completion_tokens: 0, cost_usd: 0.0 }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_client_replays_scripted_responses_in_order() {
        let client = FakeLlmClient::new();
        client.push_chat(ChatResponse { text: "first".to_string() }, Usage { prompt_tokens: 1, completion_tokens: 1, cost_usd: 0.01 });
        client.push_chat(ChatResponse { text: "second".to_string() }, Usage { prompt_tokens: 2, completion_tokens: 2, cost_usd: 0.02 });

        let req = ChatRequest { system_prompt: String::new(), messages: vec![] };
        let (resp, _) = client.chat(req.clone()).await.unwrap();
        assert_eq!(resp.text, "first");
        let (resp, _) = client.chat(req).await.unwrap();
        assert_eq!(resp.text, "second");
    }

    #[tokio::test]
    async fn fake_client_replays_scripted_errors() {
        let client = FakeLlmClient::new();
        client.push_chat_error(LlmClientError::BudgetExhausted { spent: 10.0, limit: 10.0 });
        let req = ChatRequest { system_prompt: String::new(), messages: vec![] };
        let result = client.chat(req).await;
        assert!(matches!(result, Err(LlmClientError::BudgetExhausted { .. })));
    }
}
