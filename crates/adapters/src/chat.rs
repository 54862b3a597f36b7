// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The chat transport adapter: a long-poll HTTP client against the
//! third-party chat API, behind the `ChatTransport` trait.
//!
//! Long-poll shape: 30s long-poll timeout, 35s request timeout, a
//! monotonically advancing `offset`, matching the trait-plus-fake-plus-
//! production-impl structure used elsewhere in this crate.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use std::time::Duration;

pub const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(30);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(35);

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("unexpected response: {0}")]
    BadResponse(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Message,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub text: String,
    pub chat: Chat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ChatError>;
    async fn send(&self, text: &str) -> Result<bool, ChatError>;
}

/// Production transport: long-polls `getUpdates` and posts via `sendMessage`
/// against a Telegram-shaped bot API.
pub struct HttpChatTransport {
    client: reqwest::Client,
    base_url: String,
    chat_id: String,
}

impl HttpChatTransport {
    pub fn new(token: String, chat_id: String) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChatError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            base_url: format!("https://api.telegram.org/bot{token}"),
            chat_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    #[serde(default)]
    result: Vec<Update>,
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ChatError> {
        let mut query = vec![("timeout", LONG_POLL_TIMEOUT.as_secs().to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        let response = self
            .client
            .get(format!("{}/getUpdates", self.base_url))
            .query(&query)
            .send()
            .await
            .map_err(|e| ChatError::RequestFailed(e.to_string()))?;
        let parsed: GetUpdatesResponse = response
            .json()
            .await
            .map_err(|e| ChatError::BadResponse(e.to_string()))?;
        Ok(parsed.result)
    }

    async fn send(&self, text: &str) -> Result<bool, ChatError> {
        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()
            .await
            .map_err(|e| ChatError::RequestFailed(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeChatTransport;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct FakeState {
        pending: Vec<Update>,
        sent: Vec<String>,
        fail_sends: bool,
    }

    /// In-memory chat transport for tests: queue updates with
    /// `push_update`, then drain them through `get_updates`; `send` records
    /// messages unless `fail_next_sends` is set.
    #[derive(Clone)]
    pub struct FakeChatTransport {
        inner: Arc<Mutex<FakeState>>,
    }

    impl Default for FakeChatTransport {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeState {
                    pending: Vec::new(),
                    sent: Vec::new(),
                    fail_sends: false,
                })),
            }
        }
    }

    impl FakeChatTransport {
        pub fn push_update(&self, update_id: i64, text: &str, chat_id: i64) {
            self.inner.lock().pending.push(Update {
                update_id,
                message: Message {
                    text: text.to_string(),
                    chat: Chat { id: chat_id },
                },
            });
        }

        pub fn sent_messages(&self) -> Vec<String> {
            self.inner.lock().sent.clone()
        }

        pub fn fail_next_sends(&self, fail: bool) {
            self.inner.lock().fail_sends = fail;
        }
    }

    #[async_trait]
    impl ChatTransport for FakeChatTransport {
        async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ChatError> {
            let mut state = self.inner.lock();
            let drained: Vec<Update> = state
                .pending
                .iter()
                .filter(|u| match offset {
                    Some(o) => u.update_id >= o,
                    None => true,
                })
                .cloned()
                .collect();
            state.pending.retain(|u| !drained.iter().any(|d| d.update_id == u.update_id));
            Ok(drained)
        }

        async fn send(&self, text: &str) -> Result<bool, ChatError> {
            let mut state = self.inner.lock();
            if state.fail_sends {
                return Ok(false);
            }
            state.sent.push(text.to_string());
            Ok(true)
        }
    }
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
