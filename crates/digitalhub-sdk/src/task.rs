// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task entity: a reusable execution-parameter template bound to an executable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entity::Metadata;
use crate::error::{Result, SdkError};
use crate::reference::TaskReference;

/// Kubernetes service types accepted for serving tasks.
const SERVICE_TYPES: [&str; 3] = ["ClusterIP", "NodePort", "LoadBalancer"];

/// Port exposed by a serving task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    pub port: u16,
    pub target_port: u16,
}

/// Execution parameters of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Reference of the executable, `{exec-kind}://{project}/{name}:{id}`.
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envs: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ports: Option<Vec<ServicePort>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    /// Compiled workflow definition for pipeline tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskSpec {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Self::default()
        }
    }

    /// Check the parameters that the backend would otherwise reject late.
    pub fn validate(&self) -> Result<()> {
        if !self.function.contains("://") {
            return Err(SdkError::InvalidInput(format!(
                "task function reference '{}' is not a reference",
                self.function
            )));
        }
        if self.replicas == Some(0) {
            return Err(SdkError::InvalidInput(
                "replicas must be greater than zero".to_string(),
            ));
        }
        if let Some(service_type) = &self.service_type
            && !SERVICE_TYPES.contains(&service_type.as_str())
        {
            return Err(SdkError::InvalidInput(format!(
                "invalid service type: {}",
                service_type
            )));
        }
        Ok(())
    }
}

/// A task, owned by a function or workflow and referenced by runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub project: String,
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub spec: TaskSpec,
    #[serde(default)]
    pub status: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Task {
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reference runs use to point at this task.
    pub fn reference(&self) -> Result<TaskReference> {
        let function = TaskReference::parse(&self.spec.function)?;
        Ok(TaskReference::new(
            self.kind.clone(),
            self.project.clone(),
            function.exec_name,
            function.exec_id,
        ))
    }
}
