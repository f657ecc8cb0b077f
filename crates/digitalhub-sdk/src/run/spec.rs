// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run spec and its factory.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SdkError};
use crate::kind::RunKind;
use crate::reference::TaskReference;

/// Execution configuration of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    /// Task reference, `{task-kind}://{project}/{exec-name}:{exec-id}`.
    pub task: String,
    /// Whether the SDK process drives the execution. Derived from the run kind.
    #[serde(default)]
    pub local_execution: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub inputs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
    /// Fields merged in by the runtime at build time.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunSpec {
    pub fn task_reference(&self) -> Result<TaskReference> {
        TaskReference::parse(&self.task)
    }
}

/// Build the spec of a run of the given kind from a JSON mapping.
///
/// `local_execution` is derived from the kind; a caller-supplied value that
/// contradicts it is rejected. The task reference must parse and name a task
/// kind the run kind accepts.
pub fn build_spec(kind: &str, mut fields: Map<String, Value>) -> Result<RunSpec> {
    let run_kind: RunKind = kind.parse()?;
    let local_execution = run_kind.local_execution();
    match fields.remove("local_execution") {
        None | Some(Value::Null) => {}
        Some(Value::Bool(requested)) if requested == local_execution => {}
        Some(Value::Bool(requested)) => {
            return Err(SdkError::InvalidInput(format!(
                "local_execution={} is not allowed for kind {}",
                requested, run_kind
            )));
        }
        Some(other) => {
            return Err(SdkError::InvalidInput(format!(
                "invalid local_execution: {}",
                other
            )));
        }
    }

    let mut spec: RunSpec = serde_json::from_value(Value::Object(fields))
        .map_err(|e| SdkError::InvalidInput(format!("invalid spec for {}: {}", run_kind, e)))?;
    spec.local_execution = local_execution;

    let reference = spec.task_reference()?;
    if !run_kind.accepts_task(&reference.task_kind) {
        return Err(SdkError::InvalidInput(format!(
            "task kind {} is not valid for run kind {}",
            reference.task_kind, run_kind
        )));
    }
    Ok(spec)
}
