// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Kubeflow Pipelines engine for workflows.
//!
//! `kfp+build` runs compile the workflow source into a pipeline definition;
//! `kfp+run` runs execute a compiled one. Both are executed by the backend.

use async_trait::async_trait;
use digitalhub_sdk::{
    Runtime, RuntimeError, RuntimeKind, RuntimeRegistration, RuntimeResult, State, StatusPatch,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::compose::{compose_spec, section, string_field, task_action};

pub struct KfpRuntime {
    project: String,
}

impl KfpRuntime {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
        }
    }
}

#[async_trait]
impl Runtime for KfpRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Kfp
    }

    async fn build(
        &self,
        executable: &Value,
        task: &Value,
        run: &Value,
    ) -> RuntimeResult<Map<String, Value>> {
        let workflow_spec = section(executable, "spec");
        if string_field(&workflow_spec, "source").is_none() {
            return Err(RuntimeError::InvalidSpec(
                "kfp workflow has no source".to_string(),
            ));
        }
        if task_action(task)? == "pipeline" {
            let task_spec = section(task, "spec");
            if string_field(&task_spec, "workflow").is_none() {
                return Err(RuntimeError::InvalidSpec(
                    "kfp pipeline task has no compiled workflow, run a kfp+build first"
                        .to_string(),
                ));
            }
        }
        compose_spec(executable, task, run, "workflow_spec")
    }

    async fn run(&self, run: &Value) -> RuntimeResult<StatusPatch> {
        let id = run.get("id").and_then(Value::as_str).unwrap_or_default();
        let kind = run.get("kind").and_then(Value::as_str).unwrap_or_default();
        info!(project = %self.project, run_id = id, kind, "Pipeline run handed to backend");
        Ok(StatusPatch::new().with_state(State::Ready))
    }
}

fn build(project: &str) -> Box<dyn Runtime> {
    Box::new(KfpRuntime::new(project))
}

static REGISTRATION: RuntimeRegistration = RuntimeRegistration {
    kind: RuntimeKind::Kfp,
    build,
};

inventory::submit! { &REGISTRATION }
