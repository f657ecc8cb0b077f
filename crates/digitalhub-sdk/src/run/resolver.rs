// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lookup of the executable and task a run was scheduled against.
//!
//! Nothing is cached: every call goes back to the processor.

use serde_json::Value;
use tracing::debug;

use crate::context::Context;
use crate::entity::Executable;
use crate::error::{Result, SdkError};
use crate::kind::{EntityType, RunKind};
use crate::processor::ListParams;
use crate::reference::TaskReference;
use crate::task::Task;

/// Read the executable pinned by the task reference.
pub async fn resolve_executable(
    context: &Context,
    project: &str,
    kind: RunKind,
    reference: &TaskReference,
) -> Result<Executable> {
    let entity_type = kind.executable_entity_type();
    debug!(
        exec_name = %reference.exec_name,
        exec_id = %reference.exec_id,
        entity_type = %entity_type,
        "Resolving executable"
    );
    let value = context
        .processor()
        .read_context_entity(
            project,
            entity_type,
            &reference.exec_name,
            Some(&reference.exec_id),
        )
        .await?;
    Executable::from_value(value)
}

/// Find the task of the given kind bound to the referenced executable.
///
/// In local mode every task of the project is scanned; against a backend the
/// listing is filtered server-side and the first match is taken.
pub async fn resolve_task(
    context: &Context,
    project: &str,
    kind: RunKind,
    reference: &TaskReference,
) -> Result<Task> {
    let exec_string = reference.executable_reference(kind.executable_kind());
    let processor = context.processor();

    let found = if context.is_local() {
        processor
            .list_context_entities(project, EntityType::Task, &ListParams::new())
            .await?
            .into_iter()
            .find(|task| {
                task.pointer("/spec/function").and_then(Value::as_str) == Some(exec_string.as_str())
                    && task.get("kind").and_then(Value::as_str) == Some(reference.task_kind.as_str())
            })
    } else {
        let params = ListParams::new()
            .with("function", exec_string.as_str())
            .with("kind", reference.task_kind.as_str());
        processor
            .list_context_entities(project, EntityType::Task, &params)
            .await?
            .into_iter()
            .next()
    };

    let value = found.ok_or_else(|| {
        SdkError::not_found(
            EntityType::Task,
            format!("{} ({})", exec_string, reference.task_kind),
        )
    })?;
    Task::from_value(value)
}
