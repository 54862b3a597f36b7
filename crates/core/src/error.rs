// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error type for configuration loading.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
