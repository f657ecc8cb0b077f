// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared entity metadata and executables (functions and workflows).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SdkError};
use crate::kind::{EntityType, RunKind};

/// Metadata attached to every entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<bool>,
    /// Fields the SDK does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    /// Metadata for a freshly created entity.
    pub fn new(project: impl Into<String>, name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            project: Some(project.into()),
            name,
            created: Some(now),
            updated: Some(now),
            ..Self::default()
        }
    }

    /// Refresh the update timestamp.
    pub fn touch(&mut self) {
        self.updated = Some(Utc::now());
    }
}

/// The unit of logic a run executes: a function or a workflow.
///
/// Executables are pinned by id once a task references them, so the SDK only
/// ever reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Executable {
    pub project: String,
    pub id: String,
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: Map<String, Value>,
    #[serde(default)]
    pub status: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Executable {
    /// Deserialize an executable returned by a processor.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Function or workflow, derived from the kind.
    pub fn entity_type(&self) -> Result<EntityType> {
        RunKind::for_executable(&self.kind)
            .next()
            .map(|kind| kind.executable_entity_type())
            .ok_or_else(|| SdkError::Config(format!("invalid kind: {}", self.kind)))
    }

    /// Reference stored in the `spec.function` field of tasks.
    pub fn reference(&self) -> String {
        format!("{}://{}/{}:{}", self.kind, self.project, self.name, self.id)
    }
}
