// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run status and the engine status patch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, SdkError};
use crate::kind::RunKind;
use crate::state::State;

/// Observed state of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    #[serde(default)]
    pub state: State,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Logical output name to material entity reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Map<String, Value>>,
    /// Kubernetes resources created by the remote engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k8s: Option<Value>,
    /// Engine-specific payload.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Status fields reported by a runtime after `run`.
///
/// Absent fields leave the run status untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k8s: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, value: Value) -> Self {
        self.outputs
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_k8s(mut self, k8s: Value) -> Self {
        self.k8s = Some(k8s);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Who owns the `state` field during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAuthority {
    /// The SDK drives the execution; engine-reported state is applied.
    Sdk,
    /// A remote engine updates state asynchronously; engine-reported state is dropped.
    Backend,
}

impl StateAuthority {
    pub fn for_local_execution(local_execution: bool) -> Self {
        if local_execution {
            StateAuthority::Sdk
        } else {
            StateAuthority::Backend
        }
    }
}

impl RunStatus {
    /// Apply an engine patch. Present fields override, extras are inserted.
    pub fn merge(&mut self, patch: StatusPatch, authority: StateAuthority) {
        if let Some(state) = patch.state {
            match authority {
                StateAuthority::Sdk => self.state = state,
                StateAuthority::Backend => {
                    debug!(state = %state, "Dropping engine-reported state");
                }
            }
        }
        if let Some(message) = patch.message {
            self.message = Some(message);
        }
        if let Some(outputs) = patch.outputs {
            self.outputs = Some(outputs);
        }
        if let Some(k8s) = patch.k8s {
            self.k8s = Some(k8s);
        }
        self.extra.extend(patch.extra);
    }
}

/// Build the status of a run of the given kind from a JSON mapping.
///
/// A missing or null `state` defaults to `CREATED`.
pub fn build_status(kind: &str, mut fields: Map<String, Value>) -> Result<RunStatus> {
    kind.parse::<RunKind>()?;
    let state = match fields.remove("state") {
        None | Some(Value::Null) => State::Created,
        Some(Value::String(s)) => s.parse()?,
        Some(other) => {
            return Err(SdkError::InvalidInput(format!("invalid state: {}", other)));
        }
    };
    let mut status: RunStatus = serde_json::from_value(Value::Object(fields))
        .map_err(|e| SdkError::InvalidInput(format!("invalid status: {}", e)))?;
    status.state = state;
    Ok(status)
}
