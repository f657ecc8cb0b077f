// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! dbt engine. Runs are executed in the SDK process by spawning the dbt CLI.
//!
//! The function spec carries `source` (dbt project directory) and optionally
//! `model` (selected model). The transform task spec may name the
//! `output_table` the run produces. Resolved inputs are passed to the dbt
//! process as JSON in `DHUB_RUN_INPUTS`.

use std::env;
use std::process::Stdio;

use async_trait::async_trait;
use digitalhub_sdk::{
    Runtime, RuntimeError, RuntimeKind, RuntimeRegistration, RuntimeResult, State, StatusPatch,
};
use serde_json::{Map, Value, json};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::compose::{compose_spec, section, string_field};

const DEFAULT_PROGRAM: &str = "dbt";

/// Lines of dbt output kept in the run status.
const OUTPUT_TAIL_LINES: usize = 20;

fn tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[start..].join("\n")
}

pub struct DbtRuntime {
    project: String,
    program: String,
}

impl DbtRuntime {
    /// Runtime using the dbt executable from `DHUB_DBT_BIN` (default: `dbt`).
    pub fn new(project: &str) -> Self {
        let program = env::var("DHUB_DBT_BIN").unwrap_or_else(|_| DEFAULT_PROGRAM.to_string());
        Self::with_program(project, program)
    }

    pub fn with_program(project: &str, program: impl Into<String>) -> Self {
        Self {
            project: project.to_string(),
            program: program.into(),
        }
    }
}

#[async_trait]
impl Runtime for DbtRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Dbt
    }

    async fn build(
        &self,
        executable: &Value,
        task: &Value,
        run: &Value,
    ) -> RuntimeResult<Map<String, Value>> {
        let function_spec = section(executable, "spec");
        if string_field(&function_spec, "source").is_none() {
            return Err(RuntimeError::InvalidSpec(
                "dbt function has no source project".to_string(),
            ));
        }
        compose_spec(executable, task, run, "function_spec")
    }

    async fn run(&self, run: &Value) -> RuntimeResult<StatusPatch> {
        let spec = section(run, "spec");
        let function_spec = spec
            .get("function_spec")
            .and_then(Value::as_object)
            .ok_or_else(|| RuntimeError::InvalidSpec("run is not built".to_string()))?;
        let project_dir = string_field(function_spec, "source")
            .ok_or_else(|| RuntimeError::InvalidSpec("dbt function has no source".to_string()))?;
        let model = string_field(function_spec, "model");

        let inputs = spec.get("inputs").cloned().unwrap_or_else(|| json!({}));

        let mut command = Command::new(&self.program);
        command
            .args(["run", "--project-dir", project_dir])
            .env("DHUB_PROJECT", &self.project)
            .env("DHUB_RUN_INPUTS", serde_json::to_string(&inputs)?)
            .stdin(Stdio::null());
        if let Some(model) = model {
            command.args(["--select", model]);
        }

        debug!(program = %self.program, project_dir, "Spawning dbt");
        let output = command.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            warn!(project = %self.project, code = %code, "dbt run failed");
            let detail = if stderr.trim().is_empty() {
                tail(&stdout)
            } else {
                tail(&stderr)
            };
            return Err(RuntimeError::Execution(format!(
                "dbt exited with {}: {}",
                code,
                detail.trim()
            )));
        }

        let mut patch = StatusPatch::new()
            .with_state(State::Completed)
            .with_field("dbt", json!({"log": tail(&stdout)}));
        let output_table = spec
            .get("transform_spec")
            .and_then(Value::as_object)
            .and_then(|task_spec| string_field(task_spec, "output_table"))
            .or(model);
        if let Some(table) = output_table {
            patch = patch.with_output(
                "output_table",
                Value::String(format!("store://{}/dataitem/{}", self.project, table)),
            );
        }
        info!(project = %self.project, "dbt run completed");
        Ok(patch)
    }
}

fn build(project: &str) -> Box<dyn Runtime> {
    Box::new(DbtRuntime::new(project))
}

static REGISTRATION: RuntimeRegistration = RuntimeRegistration {
    kind: RuntimeKind::Dbt,
    build,
};

inventory::submit! { &REGISTRATION }
