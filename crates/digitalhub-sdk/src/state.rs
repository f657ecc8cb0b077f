// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Entity state enumeration shared by runs and the backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// State of an entity as tracked by the SDK and the backend.
///
/// A run moves `CREATED -> BUILT -> RUNNING -> {COMPLETED, ERROR, STOPPED}`;
/// a `STOPPED` run can be resumed back into `RUNNING`. The remaining states are
/// written by the backend while it orchestrates remote executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    /// Entity exists, nothing has been built yet.
    #[default]
    Created,
    /// Run spec has been built by its runtime.
    Built,
    /// Backend accepted the run for scheduling.
    Ready,
    /// Backend is waiting for resources.
    Pending,
    /// Execution in progress.
    Running,
    /// Stop requested, not yet honoured.
    Stop,
    /// Execution stopped; may be resumed.
    Stopped,
    /// Execution finished successfully.
    Completed,
    /// Execution failed.
    Error,
    /// Backend is tearing down resources.
    Deleting,
    /// Resources removed.
    Deleted,
}

impl State {
    /// All states, in lifecycle order.
    pub const ALL: [State; 11] = [
        State::Created,
        State::Built,
        State::Ready,
        State::Pending,
        State::Running,
        State::Stop,
        State::Stopped,
        State::Completed,
        State::Error,
        State::Deleting,
        State::Deleted,
    ];

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Created => "CREATED",
            State::Built => "BUILT",
            State::Ready => "READY",
            State::Pending => "PENDING",
            State::Running => "RUNNING",
            State::Stop => "STOP",
            State::Stopped => "STOPPED",
            State::Completed => "COMPLETED",
            State::Error => "ERROR",
            State::Deleting => "DELETING",
            State::Deleted => "DELETED",
        }
    }

    /// States in which `wait()` returns.
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Stopped | State::Error | State::Completed)
    }

    /// States from which a locally executed run may start running.
    pub fn is_runnable(&self) -> bool {
        matches!(self, State::Built | State::Stopped)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        State::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| SdkError::InvalidInput(format!("invalid state: {}", s)))
    }
}
