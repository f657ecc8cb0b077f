// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hugging Face model serving engine.

use async_trait::async_trait;
use digitalhub_sdk::{
    Runtime, RuntimeError, RuntimeKind, RuntimeRegistration, RuntimeResult, State, StatusPatch,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::compose::{compose_spec, section, string_field};

pub struct HuggingfaceServeRuntime {
    project: String,
}

impl HuggingfaceServeRuntime {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
        }
    }
}

#[async_trait]
impl Runtime for HuggingfaceServeRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Huggingfaceserve
    }

    async fn build(
        &self,
        executable: &Value,
        task: &Value,
        run: &Value,
    ) -> RuntimeResult<Map<String, Value>> {
        let function_spec = section(executable, "spec");
        if string_field(&function_spec, "path").is_none() {
            return Err(RuntimeError::InvalidSpec(
                "huggingfaceserve function has no model path".to_string(),
            ));
        }
        let mut spec = compose_spec(executable, task, run, "function_spec")?;

        // Served model name defaults to the function name.
        if !spec.contains_key("model_name") {
            let name = string_field(&function_spec, "model_name")
                .or_else(|| executable.get("name").and_then(Value::as_str))
                .unwrap_or("model");
            spec.insert("model_name".to_string(), Value::String(name.to_string()));
        }
        Ok(spec)
    }

    async fn run(&self, run: &Value) -> RuntimeResult<StatusPatch> {
        let id = run.get("id").and_then(Value::as_str).unwrap_or_default();
        info!(project = %self.project, run_id = id, "Model service handed to backend");
        Ok(StatusPatch::new().with_state(State::Ready))
    }
}

fn build(project: &str) -> Box<dyn Runtime> {
    Box::new(HuggingfaceServeRuntime::new(project))
}

static REGISTRATION: RuntimeRegistration = RuntimeRegistration {
    kind: RuntimeKind::Huggingfaceserve,
    build,
};

inventory::submit! { &REGISTRATION }
