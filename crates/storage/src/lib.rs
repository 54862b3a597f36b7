// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed state for koan: missions markdown, signal files, pidfiles,
//! the outbox, journals, usage state, chat history, and the mission dedup
//! ledger. Every mutation goes through an advisory file lock; cross-file
//! transactions are intentionally absent (each store protects only itself).

pub mod chat_history;
pub mod history;
pub mod journal;
pub mod missions;
pub mod outbox;
pub mod signals;
pub mod usage;

pub use chat_history::{ChatEntry, ChatHistoryError, Role as ChatRole};
pub use history::{HistoryError, HistoryRecord, Outcome as HistoryOutcome};
pub use journal::JournalError;
pub use missions::{MissionsError, MissionsFile};
pub use outbox::OutboxError;
pub use signals::{PidLock, SignalError, Signals};
pub use usage::{UsageError, UsageState};
