// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for digitalhub-sdk.

use thiserror::Error;

use crate::kind::EntityType;
use crate::runtime::RuntimeError;
use crate::state::State;

/// Result type using SdkError.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Errors that can occur when using the SDK.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration error: unknown kind, unregistered runtime, bad environment value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid input (malformed spec, status, state string or reference).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Locally executed run asked to run outside `BUILT` or `STOPPED`.
    #[error("run {id} is not in a state to run (state: {state})")]
    NotRunnable {
        /// Run identifier.
        id: String,
        /// State observed when the operation was attempted.
        state: State,
    },

    /// Entity lookup failed.
    #[error("{entity_type} not found: {key}")]
    NotFound {
        /// Type of the entity that was looked up.
        entity_type: EntityType,
        /// Name, id or reference used for the lookup.
        key: String,
    },

    /// Execution engine failed while building or running.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Waiting for a run exceeded its deadline.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// Backend could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend returned an error response.
    #[error("server error [{code}]: {message}")]
    Server { code: u16, message: String },

    /// Backend returned something the SDK could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Operation not available for the current context.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl SdkError {
    /// Shorthand for a not-found error.
    pub fn not_found(entity_type: EntityType, key: impl Into<String>) -> Self {
        SdkError::NotFound {
            entity_type,
            key: key.into(),
        }
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SdkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SdkError::Connection(format!("request timed out: {}", err))
        } else if err.is_decode() {
            SdkError::UnexpectedResponse(err.to_string())
        } else {
            SdkError::Connection(err.to_string())
        }
    }
}
