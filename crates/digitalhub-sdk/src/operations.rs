// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Entity operations on a project context.

use serde_json::{Map, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::context::Context;
use crate::entity::{Executable, Metadata};
use crate::error::{Result, SdkError};
use crate::kind::{EntityType, RunKind};
use crate::processor::ListParams;
use crate::run::{Run, build_spec};
use crate::task::{Task, TaskSpec};

/// Parameters of [`Context::execute`].
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Kind of the task to create, e.g. `container+job`.
    pub task_kind: String,
    /// Run kind; derived from the executable and task kinds when unset.
    pub run_kind: Option<RunKind>,
    /// Execution parameters of the task. `function` is filled in.
    pub task_spec: TaskSpec,
    /// Run spec fields. `task` is filled in.
    pub run_spec: Map<String, Value>,
    /// Wait for a terminal state after starting the run.
    pub wait: bool,
}

impl ExecuteOptions {
    pub fn new(task_kind: impl Into<String>) -> Self {
        Self {
            task_kind: task_kind.into(),
            ..Self::default()
        }
    }

    pub fn with_run_kind(mut self, kind: RunKind) -> Self {
        self.run_kind = Some(kind);
        self
    }

    pub fn with_task_spec(mut self, spec: TaskSpec) -> Self {
        self.task_spec = spec;
        self
    }

    pub fn with_run_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.run_spec.insert(key.into(), value);
        self
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }
}

impl Context {
    async fn new_executable(
        &self,
        entity_type: EntityType,
        name: &str,
        kind: &str,
        spec: Map<String, Value>,
    ) -> Result<Executable> {
        let executable = Executable {
            project: self.project().to_string(),
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            metadata: Metadata::new(self.project(), Some(name.to_string())),
            spec,
            status: Map::new(),
            user: None,
        };
        let actual = executable.entity_type()?;
        if actual != entity_type {
            return Err(SdkError::InvalidInput(format!(
                "kind {} is a {}, not a {}",
                kind, actual, entity_type
            )));
        }
        let stored = self
            .processor()
            .create_entity(self.project(), entity_type, &executable.to_value()?)
            .await?;
        info!(executable = name, kind, entity_type = %entity_type, "Executable created");
        Executable::from_value(stored)
    }

    /// Create a function.
    pub async fn new_function(
        &self,
        name: &str,
        kind: &str,
        spec: Map<String, Value>,
    ) -> Result<Executable> {
        self.new_executable(EntityType::Function, name, kind, spec)
            .await
    }

    /// Create a workflow.
    pub async fn new_workflow(
        &self,
        name: &str,
        kind: &str,
        spec: Map<String, Value>,
    ) -> Result<Executable> {
        self.new_executable(EntityType::Workflow, name, kind, spec)
            .await
    }

    /// Read a function or workflow by name; `id` pins a version.
    pub async fn get_executable(
        &self,
        entity_type: EntityType,
        name: &str,
        id: Option<&str>,
    ) -> Result<Executable> {
        if !matches!(entity_type, EntityType::Function | EntityType::Workflow) {
            return Err(SdkError::InvalidInput(format!(
                "{} is not an executable",
                entity_type
            )));
        }
        let value = self
            .processor()
            .read_context_entity(self.project(), entity_type, name, id)
            .await?;
        Executable::from_value(value)
    }

    /// Create a task of `kind` bound to the executable.
    pub async fn new_task(
        &self,
        executable: &Executable,
        kind: &str,
        mut spec: TaskSpec,
    ) -> Result<Task> {
        if !RunKind::for_executable(&executable.kind).any(|run| run.accepts_task(kind)) {
            return Err(SdkError::InvalidInput(format!(
                "task kind {} is not valid for executable kind {}",
                kind, executable.kind
            )));
        }
        spec.function = executable.reference();
        spec.validate()?;

        let task = Task {
            project: self.project().to_string(),
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            metadata: Metadata::new(self.project(), None),
            spec,
            status: Map::new(),
            user: None,
        };
        let stored = self
            .processor()
            .create_entity(self.project(), EntityType::Task, &task.to_value()?)
            .await?;
        info!(kind, function = %task.spec.function, "Task created");
        Task::from_value(stored)
    }

    pub async fn get_task(&self, id: &str) -> Result<Task> {
        let value = self
            .processor()
            .read_entity(self.project(), EntityType::Task, id)
            .await?;
        Task::from_value(value)
    }

    pub async fn list_tasks(&self, params: &ListParams) -> Result<Vec<Task>> {
        self.processor()
            .list_context_entities(self.project(), EntityType::Task, params)
            .await?
            .into_iter()
            .map(Task::from_value)
            .collect()
    }

    /// Create a run of `kind` against the task, persisted in `CREATED`.
    #[instrument(skip(self, task, spec), fields(task_id = %task.id))]
    pub async fn new_run(
        &self,
        task: &Task,
        kind: &str,
        mut spec: Map<String, Value>,
    ) -> Result<Run> {
        let run_kind: RunKind = kind.parse()?;
        spec.insert(
            "task".to_string(),
            Value::String(task.reference()?.to_string()),
        );
        let mut run = Run::new(self, run_kind, build_spec(kind, spec)?);
        run.create().await?;
        info!(run_id = %run.id, "Run created");
        Ok(run)
    }

    pub async fn get_run(&self, id: &str) -> Result<Run> {
        let value = self
            .processor()
            .read_entity(self.project(), EntityType::Run, id)
            .await?;
        Run::from_value(self, value)
    }

    pub async fn list_runs(&self, params: &ListParams) -> Result<Vec<Run>> {
        self.processor()
            .list_context_entities(self.project(), EntityType::Run, params)
            .await?
            .into_iter()
            .map(|value| Run::from_value(self, value))
            .collect()
    }

    pub async fn delete_run(&self, id: &str) -> Result<()> {
        self.processor()
            .delete_entity(self.project(), EntityType::Run, id)
            .await?;
        info!(run_id = id, "Run deleted");
        Ok(())
    }

    /// Create a task and a run for the executable, then build and run it.
    pub async fn execute(&self, executable: &Executable, options: ExecuteOptions) -> Result<Run> {
        let run_kind = match options.run_kind {
            Some(kind) => kind,
            None => RunKind::for_executable(&executable.kind)
                .find(|kind| kind.accepts_task(&options.task_kind))
                .ok_or_else(|| {
                    SdkError::InvalidInput(format!(
                        "no run kind for executable kind {} and task kind {}",
                        executable.kind, options.task_kind
                    ))
                })?,
        };

        let task = self
            .new_task(executable, &options.task_kind, options.task_spec)
            .await?;
        let mut run = self
            .new_run(&task, run_kind.as_str(), options.run_spec)
            .await?;
        run.build().await?;
        run.run().await?;
        if options.wait {
            run.wait(true).await?;
        }
        Ok(run)
    }
}
