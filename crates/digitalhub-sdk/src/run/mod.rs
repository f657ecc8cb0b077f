// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run entity and its lifecycle.
//!
//! ```text
//! CREATED --build--> BUILT --run--> RUNNING --> COMPLETED | ERROR | STOPPED
//!                                     ^                              |
//!                                     +-----------resume-------------+
//! ```
//!
//! For locally executed runs the SDK owns the `state` field: `run` requires
//! `BUILT` or `STOPPED`, persists `RUNNING` before calling the engine, and
//! applies the state the engine reports. For remote runs the backend owns it
//! and engine-reported state is dropped.
//!
//! Run kinds that resolve their inputs (see [`RunKind::resolves_inputs`]) hand
//! the engine the material entities instead of their keys. The stored spec
//! keeps the keys.

mod resolver;
mod spec;
mod status;

pub use resolver::{resolve_executable, resolve_task};
pub use spec::{RunSpec, build_spec};
pub use status::{RunStatus, StateAuthority, StatusPatch, build_status};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::context::Context;
use crate::entity::Metadata;
use crate::error::{Result, SdkError};
use crate::kind::{EntityType, RunKind};
use crate::material::{resolve_materials, resolve_value};
use crate::state::State;

/// Persisted shape of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunRecord {
    project: String,
    #[serde(alias = "uuid")]
    id: String,
    kind: RunKind,
    #[serde(default)]
    metadata: Metadata,
    spec: RunSpec,
    #[serde(default)]
    status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

/// A single execution of a function or workflow against a task.
#[derive(Clone)]
pub struct Run {
    pub project: String,
    pub id: String,
    pub kind: RunKind,
    pub metadata: Metadata,
    pub spec: RunSpec,
    pub status: RunStatus,
    pub user: Option<String>,
    context: Context,
}

impl std::fmt::Debug for Run {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Run")
            .field("project", &self.project)
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.status.state)
            .field("task", &self.spec.task)
            .finish()
    }
}

impl Run {
    /// New run in `CREATED`, not yet persisted.
    pub fn new(context: &Context, kind: RunKind, spec: RunSpec) -> Self {
        let project = context.project().to_string();
        Self {
            metadata: Metadata::new(project.clone(), None),
            project,
            id: Uuid::new_v4().to_string(),
            kind,
            spec,
            status: RunStatus::default(),
            user: None,
            context: context.clone(),
        }
    }

    /// Rebuild a run from its persisted mapping.
    pub fn from_value(context: &Context, value: Value) -> Result<Self> {
        let record: RunRecord = serde_json::from_value(value)?;
        let mut run = Self {
            project: record.project,
            id: record.id,
            kind: record.kind,
            metadata: record.metadata,
            spec: record.spec,
            status: record.status,
            user: record.user,
            context: context.clone(),
        };
        run.spec.local_execution = run.kind.local_execution();
        Ok(run)
    }

    /// Persisted mapping: `{project, id, kind, metadata, spec, status, user}`.
    pub fn to_value(&self) -> Result<Value> {
        let record = RunRecord {
            project: self.project.clone(),
            id: self.id.clone(),
            kind: self.kind,
            metadata: self.metadata.clone(),
            spec: self.spec.clone(),
            status: self.status.clone(),
            user: self.user.clone(),
        };
        Ok(serde_json::to_value(record)?)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn state(&self) -> State {
        self.status.state
    }

    pub fn local_execution(&self) -> bool {
        self.spec.local_execution
    }

    /// Inputs declared in the spec.
    pub fn inputs(&self) -> &Map<String, Value> {
        &self.spec.inputs
    }

    /// Outputs reported by the engine, if any.
    pub fn outputs(&self) -> Option<&Map<String, Value>> {
        self.status.outputs.as_ref()
    }

    /// Raw output value, usually a material key.
    pub fn output(&self, key: &str) -> Option<&Value> {
        self.outputs().and_then(|outputs| outputs.get(key))
    }

    /// Inputs with every material key replaced by its entity.
    pub async fn resolve_inputs(&self) -> Result<Map<String, Value>> {
        resolve_materials(&self.context, &self.spec.inputs).await
    }

    /// Outputs with every material key replaced by its entity.
    pub async fn resolve_outputs(&self) -> Result<Map<String, Value>> {
        match self.outputs() {
            Some(outputs) => resolve_materials(&self.context, outputs).await,
            None => Ok(Map::new()),
        }
    }

    /// Entity produced under `key`, or `None` if the run has no such output.
    pub async fn output_entity(&self, key: &str) -> Result<Option<Value>> {
        match self.output(key) {
            Some(value) => Ok(Some(resolve_value(&self.context, value).await?)),
            None => Ok(None),
        }
    }

    fn absorb(&mut self, value: Value) -> Result<()> {
        if !value.is_object() {
            return Ok(());
        }
        let fresh = Self::from_value(&self.context, value)?;
        self.id = fresh.id;
        self.metadata = fresh.metadata;
        self.spec = fresh.spec;
        self.status = fresh.status;
        self.user = fresh.user;
        Ok(())
    }

    /// Persist as a new entity.
    pub async fn create(&mut self) -> Result<()> {
        let body = self.to_value()?;
        let stored = self
            .context
            .processor()
            .create_entity(&self.project, EntityType::Run, &body)
            .await?;
        self.absorb(stored)
    }

    /// Persist the full run, replacing the stored one.
    pub async fn save(&mut self) -> Result<()> {
        self.metadata.touch();
        let body = self.to_value()?;
        let stored = self
            .context
            .processor()
            .update_entity(&self.project, EntityType::Run, &self.id, &body)
            .await?;
        self.absorb(stored)
    }

    /// Reload spec and status from the processor.
    pub async fn refresh(&mut self) -> Result<()> {
        let stored = self
            .context
            .processor()
            .read_entity(&self.project, EntityType::Run, &self.id)
            .await?;
        self.absorb(stored)
    }

    pub async fn delete(self) -> Result<()> {
        self.context
            .processor()
            .delete_entity(&self.project, EntityType::Run, &self.id)
            .await
    }

    /// Compute the concrete spec through the runtime and mark the run `BUILT`.
    ///
    /// Idempotent: every call recomputes the spec from the current executable
    /// and task.
    #[instrument(skip(self), fields(run_id = %self.id, kind = %self.kind))]
    pub async fn build(&mut self) -> Result<()> {
        let runtime = self
            .context
            .runtimes()
            .build_runtime(self.kind.as_str(), &self.project)?;
        let reference = self.spec.task_reference()?;
        let executable =
            resolve_executable(&self.context, &self.project, self.kind, &reference).await?;
        let task = resolve_task(&self.context, &self.project, self.kind, &reference).await?;

        let fields = runtime
            .build(&executable.to_value()?, &task.to_value()?, &self.to_value()?)
            .await?;
        self.spec = build_spec(self.kind.as_str(), fields)?;
        self.status.state = State::Built;
        self.save().await?;
        info!(task = %self.spec.task, "Run built");
        Ok(())
    }

    /// Execute the run through its runtime.
    ///
    /// Engine failures are recorded on the run (`ERROR` for local execution,
    /// `message` always) and then returned.
    #[instrument(skip(self), fields(run_id = %self.id, kind = %self.kind))]
    pub async fn run(&mut self) -> Result<&mut Self> {
        self.refresh().await?;
        let runtime = self
            .context
            .runtimes()
            .build_runtime(self.kind.as_str(), &self.project)?;

        let local_execution = self.spec.local_execution;
        if local_execution {
            if !self.status.state.is_runnable() {
                return Err(SdkError::NotRunnable {
                    id: self.id.clone(),
                    state: self.status.state,
                });
            }
            self.status.state = State::Running;
            self.save().await?;
        }

        if let Err(err) = self.setup_execution().await {
            self.record_failure(&err.to_string()).await;
            return Err(err);
        }

        info!(local_execution, "Run started");
        let body = self.to_value()?;
        let patch = match runtime.run(&body).await {
            Ok(patch) => patch,
            Err(err) => {
                self.record_failure(&err.to_string()).await;
                return Err(err.into());
            }
        };

        self.refresh().await?;
        self.status
            .merge(patch, StateAuthority::for_local_execution(local_execution));
        self.save().await?;
        info!(state = %self.status.state, "Run executed");
        Ok(self)
    }

    /// Prepare the in-memory spec the engine receives. Not persisted.
    async fn setup_execution(&mut self) -> Result<()> {
        if !self.kind.resolves_inputs() {
            return Ok(());
        }
        self.refresh().await?;
        self.spec.inputs = self.resolve_inputs().await?;
        debug!(inputs = self.spec.inputs.len(), "Inputs resolved");
        Ok(())
    }

    /// Record a failure on the run. Errors while doing so are only logged.
    async fn record_failure(&mut self, message: &str) {
        if let Err(secondary) = self.store_failure(message).await {
            warn!(
                run_id = %self.id,
                error = %secondary,
                "Failed to record run failure"
            );
        }
    }

    async fn store_failure(&mut self, message: &str) -> Result<()> {
        self.refresh().await?;
        if self.spec.local_execution {
            self.status.state = State::Error;
        }
        self.status.message = Some(message.to_string());
        self.save().await
    }

    /// Poll until the run reaches `STOPPED`, `ERROR` or `COMPLETED`.
    ///
    /// Uses the context's `wait_timeout`; without one this waits forever.
    pub async fn wait(&mut self, log_info: bool) -> Result<&mut Self> {
        let timeout = self.context.config().wait_timeout;
        self.wait_with_timeout(log_info, timeout).await
    }

    /// Poll until the run reaches a terminal state or the deadline passes.
    #[instrument(skip(self), fields(run_id = %self.id))]
    pub async fn wait_with_timeout(
        &mut self,
        log_info: bool,
        timeout: Option<Duration>,
    ) -> Result<&mut Self> {
        let interval = self.context.config().wait_poll_interval;
        let started = Instant::now();
        let deadline = timeout.map(|t| started + t);

        loop {
            self.refresh().await?;
            let state = self.status.state;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            if state.is_terminal() {
                if log_info {
                    info!(state = %state, elapsed_ms, "Run finished");
                }
                return Ok(self);
            }
            if log_info {
                info!(state = %state, elapsed_ms, "Waiting for run");
            } else {
                debug!(state = %state, elapsed_ms, "Waiting for run");
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let waited = timeout.unwrap_or_default().as_millis() as u64;
                        return Err(SdkError::Timeout(waited));
                    }
                    interval.min(deadline - now)
                }
                None => interval,
            };
            sleep(pause).await;
        }
    }

    /// Logs collected by the remote engine.
    pub async fn logs(&self) -> Result<Value> {
        self.context
            .processor()
            .read_run_logs(&self.project, EntityType::Run, &self.id)
            .await
    }

    /// Ask the remote engine to stop. No-op for local execution.
    pub async fn stop(&self) -> Result<()> {
        if self.spec.local_execution {
            return Ok(());
        }
        self.context
            .processor()
            .stop_run(&self.project, EntityType::Run, &self.id)
            .await?;
        info!(run_id = %self.id, "Stop requested");
        Ok(())
    }

    /// Ask the remote engine to resume a stopped run. No-op for local execution.
    pub async fn resume(&self) -> Result<()> {
        if self.spec.local_execution {
            return Ok(());
        }
        self.context
            .processor()
            .resume_run(&self.project, EntityType::Run, &self.id)
            .await?;
        info!(run_id = %self.id, "Resume requested");
        Ok(())
    }
}
