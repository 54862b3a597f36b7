// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The messaging bridge poller: long-polls the chat transport, classifies
//! incoming messages, dispatches commands/missions/chat, and flushes the
//! outbox on a fixed interval.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use koan_adapters::chat::ChatTransport;
use koan_storage::missions::MissionsFile;
use koan_storage::outbox;
use thiserror::Error;
use tokio::sync::Mutex;

const IMPERATIVE_VERBS: &[&str] = &[
    "implement", "create", "add", "fix", "audit", "review", "analyze", "explore", "build",
    "write", "run", "deploy", "test", "refactor",
];

const MISSION_SHORT_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("chat transport error: {0}")]
    Chat(#[from] koan_adapters::chat::ChatError),

    #[error("outbox error: {0}")]
    Outbox(#[from] outbox::OutboxError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What an inbound chat message resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Command,
    Mission,
    Chat,
}

/// Classifies inbound text: a leading `/` is always a command; an explicit
/// `mission:`/`mission :` prefix is always a mission regardless of length;
/// otherwise text opening on a recognized imperative verb is a mission, as
/// long as there's verb context (more than just the bare verb) or the text
/// runs past `MISSION_SHORT_LIMIT` chars (length only ever *adds* a
/// long-message exception, it never blocks a verb match); everything else
/// is chat.
pub fn classify(text: &str) -> Classification {
    let trimmed = text.trim_start();
    if trimmed.starts_with('/') {
        return Classification::Command;
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with("mission:") || lower.starts_with("mission :") {
        return Classification::Mission;
    }
    let mut words = lower.split_whitespace();
    let has_verb = words.next().is_some_and(|w| IMPERATIVE_VERBS.contains(&w));
    let has_context = words.next().is_some();
    if has_verb && (has_context || trimmed.len() > MISSION_SHORT_LIMIT) {
        return Classification::Mission;
    }
    Classification::Chat
}

/// Long-polls the chat transport, dispatches each update, and flushes the
/// outbox on every tick. The actual dispatch (command handling, mission
/// enqueueing, chat worker invocation) is supplied by the caller via
/// `on_update`, keeping this struct free of a direct dependency on
/// `koan_storage::missions`/the worker CLI.
pub struct BridgePoller<T: ChatTransport> {
    transport: Arc<T>,
    instance_dir: PathBuf,
    poll_interval: Duration,
    offset: Mutex<Option<i64>>,
}

impl<T: ChatTransport> BridgePoller<T> {
    pub fn new(transport: Arc<T>, instance_dir: PathBuf, poll_interval: Duration) -> Self {
        Self {
            transport,
            instance_dir,
            poll_interval,
            offset: Mutex::new(None),
        }
    }

    /// One iteration: fetch updates, classify each, hand it (plus the
    /// sending chat id, so the caller can ignore messages from anyone but
    /// the configured operator) to `on_update`, then flush anything queued
    /// in the outbox.
    pub async fn tick<F>(&self, mut on_update: F) -> Result<(), BridgeError>
    where
        F: FnMut(Classification, &str, i64),
    {
        let offset = *self.offset.lock().await;
        let updates = self.transport.get_updates(offset).await?;
        let mut next_offset = offset;
        for update in &updates {
            on_update(classify(&update.message.text), &update.message.text, update.message.chat.id);
            next_offset = Some(update.update_id + 1);
        }
        if next_offset != offset {
            *self.offset.lock().await = next_offset;
        }

        self.flush_outbox().await?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Async equivalent of `koan_storage::outbox::flush`: the storage crate
    /// has no async runtime dependency, so the lock-read-send-truncate
    /// sequence is reimplemented here with the transport's genuinely async
    /// `send`, rather than blocking on it from inside a running reactor.
    async fn flush_outbox(&self) -> Result<bool, BridgeError> {
        use fs2::FileExt as _;
        use std::io::{Read, Write as _};

        let path = outbox::outbox_path(&self.instance_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        file.lock_exclusive()?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;
        if content.trim().is_empty() {
            fs2::FileExt::unlock(&file)?;
            return Ok(false);
        }

        let sent = self.transport.send(content.trim_end()).await?;
        if sent {
            file.set_len(0)?;
        }
        fs2::FileExt::unlock(&file)?;
        Ok(sent)
    }
}

/// Flushes stale, untagged pending missions-history is out of scope here;
/// this helper only exists so the bridge can enqueue a mission text it
/// classified, reusing the storage crate's insertion logic directly.
pub fn enqueue_mission(missions: &mut MissionsFile, text: &str) {
    missions.insert_mission(text, false);
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
