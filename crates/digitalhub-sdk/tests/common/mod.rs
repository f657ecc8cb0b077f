// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared fakes for digitalhub-sdk integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use digitalhub_sdk::{
    Context, EntityType, Executable, ListParams, LocalProcessor, Processor, Result, Run, Runtime,
    RuntimeError, RuntimeKind, RuntimeRegistry, RuntimeResult, SdkConfig, SdkError, State,
    StatusPatch, Task, TaskSpec,
};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

/// Fake engine recording every call.
#[derive(Clone)]
pub struct MockRuntime {
    /// Run mappings passed to `run`, in call order.
    pub runs: Arc<Mutex<Vec<Value>>>,
    /// Number of `build` calls.
    pub builds: Arc<AtomicUsize>,
    /// Patch returned by `run`.
    pub outcome: StatusPatch,
    /// Error message returned by `run` instead of the patch.
    pub failure: Option<String>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            runs: Arc::new(Mutex::new(Vec::new())),
            builds: Arc::new(AtomicUsize::new(0)),
            outcome: StatusPatch::new(),
            failure: None,
        }
    }

    /// Engine completing every run.
    pub fn completing() -> Self {
        Self {
            outcome: StatusPatch::new()
                .with_state(State::Completed)
                .with_output("result", json!("store://demo/dataitem/result:1")),
            ..Self::new()
        }
    }

    /// Engine reporting a state of its own, as remote engines do on submission.
    pub fn reporting(state: State) -> Self {
        Self {
            outcome: StatusPatch::new()
                .with_state(state)
                .with_k8s(json!({"job": "j-1"})),
            ..Self::new()
        }
    }

    /// Engine failing every run.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// State the run was in when the engine was called.
    pub async fn observed_states(&self) -> Vec<String> {
        self.runs
            .lock()
            .await
            .iter()
            .map(|run| run["status"]["state"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Registry serving this engine for every runtime kind.
    pub fn registry(&self) -> Arc<RuntimeRegistry> {
        let mut registry = RuntimeRegistry::empty();
        for kind in [
            RuntimeKind::Container,
            RuntimeKind::Kfp,
            RuntimeKind::Dbt,
            RuntimeKind::Huggingfaceserve,
        ] {
            let runtime = self.clone();
            registry = registry.with_builder(kind, move |_project| Box::new(runtime.clone()));
        }
        Arc::new(registry)
    }
}

#[async_trait]
impl Runtime for MockRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Container
    }

    async fn build(
        &self,
        executable: &Value,
        task: &Value,
        run: &Value,
    ) -> RuntimeResult<Map<String, Value>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let mut spec = run["spec"].as_object().cloned().unwrap_or_default();
        spec.insert("function_spec".to_string(), executable["spec"].clone());
        spec.insert("task_spec".to_string(), task["spec"].clone());
        Ok(spec)
    }

    async fn run(&self, run: &Value) -> RuntimeResult<StatusPatch> {
        self.runs.lock().await.push(run.clone());
        match &self.failure {
            Some(message) => Err(RuntimeError::Execution(message.clone())),
            None => Ok(self.outcome.clone()),
        }
    }
}

/// In-memory processor whose run reads can be scripted.
///
/// Every run read pops the next scripted state (if any) and stores it before
/// returning, which simulates a backend updating the run asynchronously.
#[derive(Default)]
pub struct ScriptedProcessor {
    inner: LocalProcessor,
    script: std::sync::Mutex<VecDeque<State>>,
    run_reads: AtomicUsize,
    fail_updates: AtomicBool,
    assign_ids: AtomicBool,
    /// Result of the remote task listing; `None` delegates to the store.
    pub task_listing: std::sync::Mutex<Option<Vec<Value>>>,
}

impl ScriptedProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(states: impl IntoIterator<Item = State>) -> Self {
        let processor = Self::new();
        processor
            .script
            .lock()
            .unwrap()
            .extend(states);
        processor
    }

    pub fn run_reads(&self) -> usize {
        self.run_reads.load(Ordering::SeqCst)
    }

    pub fn reset_reads(&self) {
        self.run_reads.store(0, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Ignore client-chosen run ids and assign new ones, as some backends do.
    pub fn assign_ids(&self, assign: bool) {
        self.assign_ids.store(assign, Ordering::SeqCst);
    }

    pub fn set_task_listing(&self, tasks: Vec<Value>) {
        *self.task_listing.lock().unwrap() = Some(tasks);
    }

    pub async fn stored_run(&self, project: &str, id: &str) -> Value {
        self.inner
            .read_entity(project, EntityType::Run, id)
            .await
            .unwrap()
    }
}

#[async_trait]
impl Processor for ScriptedProcessor {
    async fn create_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        entity: &Value,
    ) -> Result<Value> {
        if entity_type == EntityType::Run && self.assign_ids.load(Ordering::SeqCst) {
            let mut entity = entity.clone();
            if let Some(object) = entity.as_object_mut() {
                object.remove("id");
            }
            return self.inner.create_entity(project, entity_type, &entity).await;
        }
        self.inner.create_entity(project, entity_type, entity).await
    }

    async fn read_context_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        name: &str,
        entity_id: Option<&str>,
    ) -> Result<Value> {
        self.inner
            .read_context_entity(project, entity_type, name, entity_id)
            .await
    }

    async fn read_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        id: &str,
    ) -> Result<Value> {
        if entity_type != EntityType::Run {
            return self.inner.read_entity(project, entity_type, id).await;
        }
        self.run_reads.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let mut stored = self.inner.read_entity(project, entity_type, id).await?;
        if let Some(state) = next {
            stored["status"]["state"] = Value::String(state.to_string());
            self.inner
                .update_entity(project, entity_type, id, &stored)
                .await?;
        }
        Ok(stored)
    }

    async fn update_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        id: &str,
        entity: &Value,
    ) -> Result<Value> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(SdkError::Connection("backend unavailable".to_string()));
        }
        self.inner
            .update_entity(project, entity_type, id, entity)
            .await
    }

    async fn delete_entity(&self, project: &str, entity_type: EntityType, id: &str) -> Result<()> {
        self.inner.delete_entity(project, entity_type, id).await
    }

    async fn list_context_entities(
        &self,
        project: &str,
        entity_type: EntityType,
        params: &ListParams,
    ) -> Result<Vec<Value>> {
        if entity_type == EntityType::Task
            && let Some(tasks) = self.task_listing.lock().unwrap().clone()
        {
            return Ok(tasks);
        }
        self.inner
            .list_context_entities(project, entity_type, params)
            .await
    }

    async fn read_run_logs(
        &self,
        _project: &str,
        _entity_type: EntityType,
        id: &str,
    ) -> Result<Value> {
        Ok(json!({"run": id, "lines": ["started", "done"]}))
    }

    async fn stop_run(&self, _project: &str, _entity_type: EntityType, id: &str) -> Result<Value> {
        Ok(json!({"run": id, "action": "stop"}))
    }

    async fn resume_run(&self, _project: &str, _entity_type: EntityType, id: &str) -> Result<Value> {
        Ok(json!({"run": id, "action": "resume"}))
    }
}

/// Context over a scripted processor and a mock engine.
pub fn context(processor: Arc<ScriptedProcessor>, local: bool, runtime: &MockRuntime) -> Context {
    Context::new("demo", processor, local)
        .with_runtimes(runtime.registry())
        .with_config(SdkConfig::new().with_wait_poll_interval(Duration::from_secs(5)))
}

/// Function plus task of the given kinds, persisted in the context.
pub async fn seed(ctx: &Context, exec_kind: &str, task_kind: &str) -> (Executable, Task) {
    let mut spec = Map::new();
    spec.insert("source".to_string(), json!("models/"));
    let executable = if exec_kind == "kfp" {
        ctx.new_workflow("pipeline", exec_kind, spec).await.unwrap()
    } else {
        ctx.new_function("transform", exec_kind, spec).await.unwrap()
    };
    let task = ctx
        .new_task(&executable, task_kind, TaskSpec::default())
        .await
        .unwrap();
    (executable, task)
}

/// Material entity stored under `name:id`.
pub async fn seed_material(ctx: &Context, entity_type: EntityType, name: &str, id: &str) -> Value {
    ctx.processor()
        .create_entity(
            ctx.project(),
            entity_type,
            &json!({
                "id": id,
                "name": name,
                "kind": "table",
                "spec": {"path": format!("s3://datalake/{}.parquet", name)},
            }),
        )
        .await
        .unwrap()
}

/// Run in `CREATED` against a freshly seeded task.
pub async fn created_run(ctx: &Context, exec_kind: &str, task_kind: &str, run_kind: &str) -> Run {
    let (_, task) = seed(ctx, exec_kind, task_kind).await;
    ctx.new_run(&task, run_kind, Map::new()).await.unwrap()
}
