// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Kind tables.
//!
//! Every entity carries a `kind` string on the wire. The SDK maps those strings
//! onto closed enumerations so that runtime selection, executable lookup and
//! task validation are checked once, at parse time.
//!
//! | Run kind | Executable | Entity | Runtime | Local | Task kinds |
//! |----------|------------|--------|---------|-------|------------|
//! | `container+run` | `container` | function | container | no | `container+job`, `container+deploy`, `container+serve`, `container+build` |
//! | `kfp+run` | `kfp` | workflow | kfp | no | `kfp+pipeline` |
//! | `kfp+build` | `kfp` | workflow | kfp | no | `kfp+build` |
//! | `dbt+run` | `dbt` | function | dbt | yes | `dbt+transform` |
//! | `huggingfaceserve+run` | `huggingfaceserve` | function | huggingfaceserve | no | `huggingfaceserve+serve` |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SdkError;

/// Entity types known to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Project,
    Function,
    Workflow,
    Task,
    Run,
    Artifact,
    Dataitem,
    Model,
}

impl EntityType {
    /// Singular name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Project => "project",
            EntityType::Function => "function",
            EntityType::Workflow => "workflow",
            EntityType::Task => "task",
            EntityType::Run => "run",
            EntityType::Artifact => "artifact",
            EntityType::Dataitem => "dataitem",
            EntityType::Model => "model",
        }
    }

    /// REST collection name.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityType::Project => "projects",
            EntityType::Function => "functions",
            EntityType::Workflow => "workflows",
            EntityType::Task => "tasks",
            EntityType::Run => "runs",
            EntityType::Artifact => "artifacts",
            EntityType::Dataitem => "dataitems",
            EntityType::Model => "models",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution engine families. Exactly one runtime exists per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuntimeKind {
    Container,
    Kfp,
    Dbt,
    Huggingfaceserve,
}

impl RuntimeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeKind::Container => "container",
            RuntimeKind::Kfp => "kfp",
            RuntimeKind::Dbt => "dbt",
            RuntimeKind::Huggingfaceserve => "huggingfaceserve",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run kinds supported by this installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunKind {
    ContainerRun,
    KfpRun,
    KfpBuild,
    DbtRun,
    HuggingfaceserveRun,
}

impl RunKind {
    pub const ALL: [RunKind; 5] = [
        RunKind::ContainerRun,
        RunKind::KfpRun,
        RunKind::KfpBuild,
        RunKind::DbtRun,
        RunKind::HuggingfaceserveRun,
    ];

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::ContainerRun => "container+run",
            RunKind::KfpRun => "kfp+run",
            RunKind::KfpBuild => "kfp+build",
            RunKind::DbtRun => "dbt+run",
            RunKind::HuggingfaceserveRun => "huggingfaceserve+run",
        }
    }

    /// Runtime that builds and executes runs of this kind.
    pub fn runtime(&self) -> RuntimeKind {
        match self {
            RunKind::ContainerRun => RuntimeKind::Container,
            RunKind::KfpRun | RunKind::KfpBuild => RuntimeKind::Kfp,
            RunKind::DbtRun => RuntimeKind::Dbt,
            RunKind::HuggingfaceserveRun => RuntimeKind::Huggingfaceserve,
        }
    }

    /// Kind of the executable the run invokes.
    pub fn executable_kind(&self) -> &'static str {
        self.runtime().as_str()
    }

    /// Entity type of the executable (function or workflow).
    pub fn executable_entity_type(&self) -> EntityType {
        match self {
            RunKind::KfpRun | RunKind::KfpBuild => EntityType::Workflow,
            _ => EntityType::Function,
        }
    }

    /// Whether the SDK process itself drives the execution.
    pub fn local_execution(&self) -> bool {
        matches!(self, RunKind::DbtRun)
    }

    /// Whether input keys are replaced by their material entities before the
    /// engine is called.
    pub fn resolves_inputs(&self) -> bool {
        matches!(self, RunKind::DbtRun)
    }

    /// Task kinds a run of this kind can be scheduled against.
    pub fn task_kinds(&self) -> &'static [&'static str] {
        match self {
            RunKind::ContainerRun => &[
                "container+job",
                "container+deploy",
                "container+serve",
                "container+build",
            ],
            RunKind::KfpRun => &["kfp+pipeline"],
            RunKind::KfpBuild => &["kfp+build"],
            RunKind::DbtRun => &["dbt+transform"],
            RunKind::HuggingfaceserveRun => &["huggingfaceserve+serve"],
        }
    }

    /// Whether `task_kind` is valid for this run kind.
    pub fn accepts_task(&self, task_kind: &str) -> bool {
        self.task_kinds().contains(&task_kind)
    }

    /// Run kinds whose executable has the given kind.
    pub fn for_executable(executable_kind: &str) -> impl Iterator<Item = RunKind> + '_ {
        RunKind::ALL
            .into_iter()
            .filter(move |kind| kind.executable_kind() == executable_kind)
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunKind {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SdkError::Config(format!("invalid kind: {}", s)))
    }
}

impl Serialize for RunKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RunKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_kind_parse_roundtrip() {
        for kind in RunKind::ALL {
            assert_eq!(kind.as_str().parse::<RunKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_run_kind_is_config_error() {
        let err = "spark+run".parse::<RunKind>().unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
        assert!(err.to_string().contains("spark+run"));
    }

    #[test]
    fn test_executable_entity_types() {
        assert_eq!(
            RunKind::ContainerRun.executable_entity_type(),
            EntityType::Function
        );
        assert_eq!(RunKind::KfpRun.executable_entity_type(), EntityType::Workflow);
        assert_eq!(RunKind::KfpBuild.executable_entity_type(), EntityType::Workflow);
    }

    #[test]
    fn test_only_dbt_runs_locally() {
        let local: Vec<RunKind> = RunKind::ALL
            .into_iter()
            .filter(|k| k.local_execution())
            .collect();
        assert_eq!(local, vec![RunKind::DbtRun]);
        assert!(RunKind::DbtRun.resolves_inputs());
        assert!(!RunKind::ContainerRun.resolves_inputs());
    }

    #[test]
    fn test_task_kind_acceptance() {
        assert!(RunKind::ContainerRun.accepts_task("container+serve"));
        assert!(!RunKind::ContainerRun.accepts_task("kfp+pipeline"));
        assert!(RunKind::KfpBuild.accepts_task("kfp+build"));
    }

    #[test]
    fn test_run_kinds_for_executable() {
        let kinds: Vec<RunKind> = RunKind::for_executable("kfp").collect();
        assert_eq!(kinds, vec![RunKind::KfpRun, RunKind::KfpBuild]);
    }

    #[test]
    fn test_run_kind_serde_as_string() {
        let json = serde_json::to_string(&RunKind::DbtRun).unwrap();
        assert_eq!(json, "\"dbt+run\"");
        let err = serde_json::from_str::<RunKind>("\"nope\"").unwrap_err();
        assert!(err.to_string().contains("invalid kind"));
    }

    #[test]
    fn test_entity_collections() {
        assert_eq!(EntityType::Run.collection(), "runs");
        assert_eq!(EntityType::Dataitem.collection(), "dataitems");
        assert_eq!(EntityType::Task.to_string(), "task");
    }
}
