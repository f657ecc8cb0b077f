// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Container engine: jobs, deployments, services and image builds on Kubernetes.
//!
//! Execution is delegated to the backend, which creates the Kubernetes
//! resources and reports state on its own.

use async_trait::async_trait;
use digitalhub_sdk::{
    Runtime, RuntimeError, RuntimeKind, RuntimeRegistration, RuntimeResult, State, StatusPatch,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::compose::{compose_spec, section, string_field};

pub struct ContainerRuntime {
    project: String,
}

impl ContainerRuntime {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
        }
    }
}

#[async_trait]
impl Runtime for ContainerRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Container
    }

    async fn build(
        &self,
        executable: &Value,
        task: &Value,
        run: &Value,
    ) -> RuntimeResult<Map<String, Value>> {
        let function_spec = section(executable, "spec");
        if string_field(&function_spec, "image").is_none()
            && string_field(&function_spec, "base_image").is_none()
        {
            return Err(RuntimeError::InvalidSpec(
                "container function needs an image or a base_image".to_string(),
            ));
        }
        compose_spec(executable, task, run, "function_spec")
    }

    async fn run(&self, run: &Value) -> RuntimeResult<StatusPatch> {
        let id = run.get("id").and_then(Value::as_str).unwrap_or_default();
        info!(project = %self.project, run_id = id, "Container run handed to backend");
        Ok(StatusPatch::new().with_state(State::Ready))
    }
}

fn build(project: &str) -> Box<dyn Runtime> {
    Box::new(ContainerRuntime::new(project))
}

static REGISTRATION: RuntimeRegistration = RuntimeRegistration {
    kind: RuntimeKind::Container,
    build,
};

inventory::submit! { &REGISTRATION }
