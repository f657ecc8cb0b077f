// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Entity reference strings.
//!
//! A run points at its task with `{task-kind}://{project}/{exec-name}:{exec-id}`.
//! The same path with the executable kind as scheme is what a task stores in
//! `spec.function`, which is how tasks are matched back to their executable.

use std::fmt;

use crate::error::{Result, SdkError};

/// Parsed `spec.task` reference of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReference {
    /// Scheme, the task kind (e.g. `container+job`).
    pub task_kind: String,
    /// First path segment.
    pub project: String,
    /// Executable name (last segment, before `:`).
    pub exec_name: String,
    /// Executable id (last segment, after `:`).
    pub exec_id: String,
    path: String,
}

impl TaskReference {
    /// Parse a task reference.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |why: &str| {
            SdkError::InvalidInput(format!("invalid task reference '{}': {}", reference, why))
        };

        let (task_kind, path) = reference
            .split_once("://")
            .ok_or_else(|| invalid("missing '://'"))?;
        if task_kind.is_empty() {
            return Err(invalid("empty kind"));
        }
        if path.is_empty() {
            return Err(invalid("empty path"));
        }

        let project = path.split('/').next().unwrap_or_default();
        let last = path.rsplit('/').next().unwrap_or_default();
        let (exec_name, exec_id) = last
            .split_once(':')
            .ok_or_else(|| invalid("expected '<name>:<id>' as last segment"))?;
        if exec_name.is_empty() || exec_id.is_empty() {
            return Err(invalid("expected '<name>:<id>' as last segment"));
        }

        Ok(Self {
            task_kind: task_kind.to_string(),
            project: project.to_string(),
            exec_name: exec_name.to_string(),
            exec_id: exec_id.to_string(),
            path: path.to_string(),
        })
    }

    /// Build the reference of a task created for an executable.
    pub fn new(
        task_kind: impl Into<String>,
        project: impl Into<String>,
        exec_name: impl Into<String>,
        exec_id: impl Into<String>,
    ) -> Self {
        let project = project.into();
        let exec_name = exec_name.into();
        let exec_id = exec_id.into();
        let path = format!("{}/{}:{}", project, exec_name, exec_id);
        Self {
            task_kind: task_kind.into(),
            project,
            exec_name,
            exec_id,
            path,
        }
    }

    /// Reference to the executable, as stored in a task's `spec.function`.
    pub fn executable_reference(&self, executable_kind: &str) -> String {
        format!("{}://{}", executable_kind, self.path)
    }
}

impl fmt::Display for TaskReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.task_kind, self.path)
    }
}
