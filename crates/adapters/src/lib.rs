// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External I/O adapters: the worker CLI subprocess adapter and the chat
//! transport adapter, each behind a trait with a production and a fake
//! implementation.

pub mod chat;
pub mod worker;

pub use chat::{ChatError, ChatTransport, HttpChatTransport, Update};
pub use worker::{WorkerCli, WorkerCommand, WorkerError, WorkerOutcome};

#[cfg(any(test, feature = "test-support"))]
pub use chat::FakeChatTransport;
#[cfg(any(test, feature = "test-support"))]
pub use worker::FakeWorkerCli;
