// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtime trait and the process-wide runtime registry.
//!
//! A runtime is the execution-engine strategy for one [`RuntimeKind`]. It is
//! constructed fresh for every run operation, bound to the run's project, and
//! discarded afterwards.
//!
//! Engines register themselves with `inventory`:
//!
//! ```ignore
//! static CONTAINER: RuntimeRegistration = RuntimeRegistration {
//!     kind: RuntimeKind::Container,
//!     build: |project| Box::new(ContainerRuntime::new(project)),
//! };
//! inventory::submit! { &CONTAINER }
//! ```
//!
//! [`RuntimeRegistry::global`] collects the registrations the first time it is
//! used and is never mutated afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::error::{Result, SdkError};
use crate::kind::{RunKind, RuntimeKind};
use crate::run::StatusPatch;

/// Errors raised by execution engines.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuntimeError {
    /// Spec could not be composed from executable, task and run.
    #[error("build failed: {0}")]
    Build(String),

    /// Execution failed.
    #[error("execution failed: {0}")]
    Execution(String),

    /// A required field is missing or malformed.
    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

/// Execution-engine strategy.
///
/// Runtimes receive plain mappings (the serialized executable, task and run)
/// and never touch the backend; persistence is the caller's job.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Engine family this runtime implements.
    fn kind(&self) -> RuntimeKind;

    /// Compute the run spec from the executable, the task and the current run.
    ///
    /// The returned mapping replaces the run spec wholesale.
    async fn build(
        &self,
        executable: &Value,
        task: &Value,
        run: &Value,
    ) -> RuntimeResult<Map<String, Value>>;

    /// Execute the run and report the resulting status fields.
    async fn run(&self, run: &Value) -> RuntimeResult<StatusPatch>;
}

/// Static registration submitted by engine modules.
pub struct RuntimeRegistration {
    /// Engine family.
    pub kind: RuntimeKind,
    /// Constructor, given the project the runtime is bound to.
    pub build: fn(&str) -> Box<dyn Runtime>,
}

inventory::collect!(&'static RuntimeRegistration);

/// Constructor stored in a registry.
pub type RuntimeBuilder = Arc<dyn Fn(&str) -> Box<dyn Runtime> + Send + Sync>;

static GLOBAL_REGISTRY: Lazy<Arc<RuntimeRegistry>> =
    Lazy::new(|| Arc::new(RuntimeRegistry::from_inventory()));

/// Mapping from runtime kind to runtime constructor.
#[derive(Clone, Default)]
pub struct RuntimeRegistry {
    builders: HashMap<RuntimeKind, RuntimeBuilder>,
}

impl RuntimeRegistry {
    /// Registry without any runtime.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every `inventory`-submitted runtime.
    ///
    /// When two engines register the same kind, the first one seen wins.
    pub fn from_inventory() -> Self {
        let mut registry = Self::empty();
        for registration in inventory::iter::<&'static RuntimeRegistration> {
            if registry.contains(registration.kind) {
                warn!(kind = %registration.kind, "Duplicate runtime registration ignored");
                continue;
            }
            let build = registration.build;
            registry
                .builders
                .insert(registration.kind, Arc::new(move |project: &str| build(project)));
        }
        registry
    }

    /// Process-wide registry, populated once on first use.
    pub fn global() -> Arc<RuntimeRegistry> {
        GLOBAL_REGISTRY.clone()
    }

    /// Add or replace the constructor for a kind.
    pub fn with_builder<F>(mut self, kind: RuntimeKind, build: F) -> Self
    where
        F: Fn(&str) -> Box<dyn Runtime> + Send + Sync + 'static,
    {
        self.builders.insert(kind, Arc::new(build));
        self
    }

    /// Whether a runtime is registered for the kind.
    pub fn contains(&self, kind: RuntimeKind) -> bool {
        self.builders.contains_key(&kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<RuntimeKind> {
        let mut kinds: Vec<RuntimeKind> = self.builders.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Build the runtime for a run kind, bound to a project.
    pub fn build_runtime(&self, kind: &str, project: &str) -> Result<Box<dyn Runtime>> {
        let run_kind: RunKind = kind.parse()?;
        let runtime_kind = run_kind.runtime();
        let build = self.builders.get(&runtime_kind).ok_or_else(|| {
            SdkError::Config(format!(
                "no runtime registered for kind {} ({})",
                run_kind, runtime_kind
            ))
        })?;
        Ok(build(project))
    }
}

impl std::fmt::Debug for RuntimeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Build a runtime from the process-wide registry.
pub fn build_runtime(kind: &str, project: &str) -> Result<Box<dyn Runtime>> {
    RuntimeRegistry::global().build_runtime(kind, project)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoRuntime {
        project: String,
    }

    #[async_trait]
    impl Runtime for EchoRuntime {
        fn kind(&self) -> RuntimeKind {
            RuntimeKind::Container
        }

        async fn build(
            &self,
            _executable: &Value,
            _task: &Value,
            run: &Value,
        ) -> RuntimeResult<Map<String, Value>> {
            let mut spec = run
                .get("spec")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            spec.insert("project".to_string(), Value::String(self.project.clone()));
            Ok(spec)
        }

        async fn run(&self, _run: &Value) -> RuntimeResult<StatusPatch> {
            Ok(StatusPatch::default())
        }
    }

    fn registry() -> RuntimeRegistry {
        RuntimeRegistry::empty().with_builder(RuntimeKind::Container, |project| {
            Box::new(EchoRuntime {
                project: project.to_string(),
            })
        })
    }

    #[tokio::test]
    async fn test_build_runtime_binds_project() {
        let runtime = registry().build_runtime("container+run", "demo").unwrap();
        assert_eq!(runtime.kind(), RuntimeKind::Container);
        let spec = runtime
            .build(&Value::Null, &Value::Null, &serde_json::json!({"spec": {}}))
            .await
            .unwrap();
        assert_eq!(spec.get("project"), Some(&Value::String("demo".to_string())));
    }

    #[test]
    fn test_unknown_kind_is_config_error() {
        let err = registry().build_runtime("spark+run", "demo").err().unwrap();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn test_unregistered_runtime_is_config_error() {
        let err = registry().build_runtime("dbt+run", "demo").err().unwrap();
        assert!(matches!(err, SdkError::Config(_)));
        assert!(err.to_string().contains("dbt+run"));
    }

    #[test]
    fn test_kinds_sorted() {
        let registry = registry().with_builder(RuntimeKind::Dbt, |project| {
            Box::new(EchoRuntime {
                project: project.to_string(),
            })
        });
        assert_eq!(
            registry.kinds(),
            vec![RuntimeKind::Container, RuntimeKind::Dbt]
        );
        assert!(format!("{:?}", registry).contains("Dbt"));
    }

    #[test]
    fn test_runtime_error_display() {
        let err = RuntimeError::Execution("exit code 2".to_string());
        assert_eq!(err.to_string(), "execution failed: exit code 2");
        let sdk: SdkError = err.into();
        assert_eq!(sdk.to_string(), "execution failed: exit code 2");
    }
}
